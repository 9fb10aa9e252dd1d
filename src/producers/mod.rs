//! Built-in bundle producers (§2.1): the umbrella producer and the generic template-rendering
//! producer used for every named component kind.

pub mod generic;
pub mod init;
pub mod templates;
pub mod umbrella;

pub use init::register_builtin_producers;
