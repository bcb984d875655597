//! Error types for the memoization layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Memo Error Enum ==
/// Unified error type for storage, serialization and quota failures.
#[derive(Error, Debug)]
pub enum MemoError {
    /// Arguments or outcome cannot be encoded (or a stored row decoded)
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The backing database cannot be opened, read or written
    #[error("Storage error: {0}")]
    Storage(String),

    /// The operation already used up its calls for the current date
    #[error("Operation {operation} has reached the daily limit of {max_calls} calls")]
    QuotaExceeded { operation: String, max_calls: u32 },

    /// Requested row or key does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<serde_json::Error> for MemoError {
    fn from(err: serde_json::Error) -> Self {
        MemoError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for MemoError {
    fn from(err: rusqlite::Error) -> Self {
        MemoError::Storage(err.to_string())
    }
}

// == Invoke Error ==
/// Failure delivered by [`Invoker::invoke`](crate::memo::Invoker::invoke).
///
/// `Operation` carries the wrapped operation's own error unchanged, so callers
/// can tell a failure of their operation apart from a failure of the cache.
#[derive(Error, Debug)]
pub enum InvokeError<E> {
    #[error(transparent)]
    Memo(#[from] MemoError),

    #[error("Operation failed: {0}")]
    Operation(E),
}

impl<E> InvokeError<E> {
    /// Returns the memo-layer error, if this is not an operation failure.
    pub fn as_memo(&self) -> Option<&MemoError> {
        match self {
            InvokeError::Memo(err) => Some(err),
            InvokeError::Operation(_) => None,
        }
    }

    /// True when the call was rejected by the daily quota.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, InvokeError::Memo(MemoError::QuotaExceeded { .. }))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for MemoError {
    fn into_response(self) -> Response {
        let status = match &self {
            MemoError::Serialization(_) => StatusCode::BAD_REQUEST,
            MemoError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MemoError::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            MemoError::NotFound(_) => StatusCode::NOT_FOUND,
            MemoError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the memoization layer.
pub type Result<T> = std::result::Result<T, MemoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message_names_operation_and_limit() {
        let err = MemoError::QuotaExceeded {
            operation: "square".to_string(),
            max_calls: 2,
        };
        assert_eq!(
            err.to_string(),
            "Operation square has reached the daily limit of 2 calls"
        );
    }

    #[test]
    fn test_invoke_error_classification() {
        let quota: InvokeError<String> = MemoError::QuotaExceeded {
            operation: "op".to_string(),
            max_calls: 1,
        }
        .into();
        assert!(quota.is_quota_exceeded());
        assert!(quota.as_memo().is_some());

        let failed: InvokeError<String> = InvokeError::Operation("boom".to_string());
        assert!(!failed.is_quota_exceeded());
        assert!(failed.as_memo().is_none());
        assert_eq!(failed.to_string(), "Operation failed: boom");
    }

    #[test]
    fn test_status_codes() {
        let resp = MemoError::NotFound("k".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = MemoError::QuotaExceeded {
            operation: "op".to_string(),
            max_calls: 0,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

        let resp = MemoError::Storage("disk".to_string()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
