//! Uniform error envelope shared by the orchestrator, the HTTP layer, and the cluster agent
//! deployer.
//!
//! Every fallible operation in this crate returns [`Error`], which carries a [`Kind`] plus a
//! human-readable message. The HTTP layer serializes it as `{code, message, retryable, details}`
//! (§7 of the design).

use serde::Serialize;
use std::fmt;

/// Coarse classification of an error, matching the error-kind table in the design doc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Kind {
    InvalidRequest,
    MethodNotAllowed,
    NotFound,
    PermissionDenied,
    Timeout,
    Cancelled,
    Internal,
}

impl Kind {
    /// Whether a caller may reasonably retry an operation that failed with this kind.
    fn retryable(self) -> bool {
        matches!(self, Kind::Timeout | Kind::Internal)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::InvalidRequest => "InvalidRequest",
            Kind::MethodNotAllowed => "MethodNotAllowed",
            Kind::NotFound => "NotFound",
            Kind::PermissionDenied => "PermissionDenied",
            Kind::Timeout => "Timeout",
            Kind::Cancelled => "Cancelled",
            Kind::Internal => "Internal",
        };
        write!(f, "{s}")
    }
}

/// The crate-wide error type.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("{kind}: {message}")]
pub struct Error {
    #[serde(rename = "code")]
    pub kind: Kind,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Error {
    pub fn new(kind: Kind, message: impl Into<String>) -> Self {
        Self {
            retryable: kind.retryable(),
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(Kind::InvalidRequest, message)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(Kind::MethodNotAllowed, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Kind::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(Kind::PermissionDenied, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(Kind::Timeout, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(Kind::Cancelled, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(Kind::Internal, message)
    }

    /// Wraps any `std::error::Error` as an [`Kind::Internal`] error.
    pub fn wrap(err: impl std::error::Error) -> Self {
        Self::internal(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_and_timeout_are_retryable() {
        assert!(Error::internal("boom").retryable);
        assert!(Error::timeout("boom").retryable);
    }

    #[test]
    fn invalid_request_is_not_retryable() {
        assert!(!Error::invalid_request("bad input").retryable);
        assert!(!Error::cancelled("stop").retryable);
    }

    #[test]
    fn serializes_as_envelope() {
        let err = Error::invalid_request("no bundlers selected").with_details(serde_json::json!({
            "field": "selectedTypes"
        }));
        let v = serde_json::to_value(&err).unwrap();
        assert_eq!(v["code"], "INVALID_REQUEST");
        assert_eq!(v["retryable"], false);
        assert_eq!(v["details"]["field"], "selectedTypes");
    }
}
