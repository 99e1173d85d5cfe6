use ballot_types::{CandidateId, RecordedVote};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("ledger backend unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("unexpected reply to {query}: {detail}")]
    UnexpectedValue { query: &'static str, detail: String },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl StoreError {
    /// Whether the same request may succeed if repeated later.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// A write refused by the backend's own constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("account {} has already voted", .0.vote.account)]
    AlreadyVoted(Box<RecordedVote>),

    #[error("candidate {0} is not registered")]
    UnknownCandidate(CandidateId),

    #[error("a candidate named {0:?} already exists")]
    DuplicateName(String),

    #[error("malformed command: {0}")]
    Malformed(String),
}
