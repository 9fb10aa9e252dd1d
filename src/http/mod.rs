//! HTTP bundle endpoint (§4.4): query parsing, error-response rendering, ZIP streaming, and
//! actix-web wiring.

pub mod error_response;
pub mod handler;
pub mod query;
pub mod server;
pub mod zip_stream;
