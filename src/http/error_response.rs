//! Maps the crate-wide [`Error`] envelope onto HTTP status codes (§7) and renders the aggregated
//! `{bundler, error}` body used when producers report failures without a hard orchestrator error.

use crate::error::{Error, Kind};
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;

pub fn status_for(kind: Kind) -> StatusCode {
    match kind {
        Kind::InvalidRequest => StatusCode::BAD_REQUEST,
        Kind::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        Kind::NotFound => StatusCode::NOT_FOUND,
        Kind::PermissionDenied => StatusCode::FORBIDDEN,
        Kind::Timeout => StatusCode::INTERNAL_SERVER_ERROR,
        Kind::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        Kind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: &Error) -> HttpResponse {
    let status = status_for(err.kind);
    let mut builder = HttpResponse::build(status);
    if err.kind == Kind::MethodNotAllowed {
        builder.insert_header(("Allow", "POST"));
    }
    builder.json(err)
}

#[derive(Serialize)]
struct ProducerErrorEntry {
    bundler: String,
    error: String,
}

#[derive(Serialize)]
struct AggregatedErrorBody {
    code: &'static str,
    message: &'static str,
    retryable: bool,
    details: Vec<ProducerErrorEntry>,
}

/// Renders the 500 body for "aggregated errors present" (§4.4): one `{bundler, error}` pair per
/// producer failure.
pub fn aggregated_error_response(tagged: &[crate::component::TaggedError]) -> HttpResponse {
    let body = AggregatedErrorBody {
        code: "INTERNAL",
        message: "one or more bundle producers failed",
        retryable: true,
        details: tagged
            .iter()
            .map(|e| ProducerErrorEntry {
                bundler: e.tag.clone(),
                error: e.error.clone(),
            })
            .collect(),
    };
    HttpResponse::InternalServerError().json(body)
}
