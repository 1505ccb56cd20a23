use thiserror::Error;

use crate::domain::request::RequestId;

/// The workflow's error taxonomy. Every variant is a distinct, recoverable
/// outcome surfaced synchronously to the caller; none aborts the engine.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("{what} `{id}` was not found")]
    NotFound { what: &'static str, id: String },
    #[error("request `{id}` is not pending")]
    InvalidState { id: RequestId },
    #[error("forbidden: {reason}")]
    Forbidden { reason: String },
    #[error("validation failed: {message}")]
    Validation { message: String },
}

impl WorkflowError {
    pub fn request_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { what: "request", id: id.into() }
    }

    pub fn asset_type_not_found(id: impl Into<String>) -> Self {
        Self::NotFound { what: "asset type", id: id.into() }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden { reason: reason.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into() }
    }
}
