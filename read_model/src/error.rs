use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadModelError {
    #[error("read model returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("read model unreachable: {0}")]
    Unreachable(String),

    #[error("invalid response from read model: {0}")]
    InvalidResponse(String),

    #[error("no read model configured and ledger fallback failed: {0}")]
    Unavailable(String),
}
