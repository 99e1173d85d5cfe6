//! RPC error types and their HTTP rendering.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ballot_coordinator::CoordinatorError;
use ballot_ledger::PendingVote;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),

    #[error("missing or malformed bearer token")]
    Unauthorized,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("server error: {0}")]
    Server(String),
}

/// JSON body of every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub retryable: bool,
    /// Present when a vote's outcome is unknown; post it to `/votes/retry`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<PendingVote>,
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Coordinator(e) => match e.kind() {
                "invalid_credentials" | "session_expired" => StatusCode::UNAUTHORIZED,
                "provider_unavailable" | "ledger_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
                "empty_name" => StatusCode::BAD_REQUEST,
                "duplicate_name" | "duplicate_vote" => StatusCode::CONFLICT,
                "unknown_candidate" => StatusCode::NOT_FOUND,
                "foreign_submission" => StatusCode::FORBIDDEN,
                "read_model_error" => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RpcError::Unauthorized => StatusCode::UNAUTHORIZED,
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (error, retryable, pending) = match self {
            RpcError::Coordinator(e) => (e.kind(), e.is_retryable(), e.pending().cloned()),
            RpcError::Unauthorized => ("unauthorized", false, None),
            RpcError::InvalidRequest(_) => ("invalid_request", false, None),
            RpcError::Server(_) => ("server_error", false, None),
        };
        ErrorBody {
            error,
            message: self.to_string(),
            retryable,
            pending,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        } else {
            tracing::debug!(%status, error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_auth::AuthenticationError;

    #[test]
    fn maps_kinds_to_status() {
        let expired = RpcError::from(CoordinatorError::from(AuthenticationError::expired()));
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(expired.body().error, "session_expired");
        assert!(!expired.body().retryable);

        let down = RpcError::from(CoordinatorError::LedgerUnavailable {
            reason: "timeout".into(),
            pending: None,
        });
        assert_eq!(down.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(down.body().retryable);

        assert_eq!(
            RpcError::InvalidRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
