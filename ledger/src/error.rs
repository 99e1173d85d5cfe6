use ballot_store::StoreError;
use ballot_types::{Account, CandidateId, RecordedVote};
use thiserror::Error;

use crate::PendingVote;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("candidate name must not be empty")]
    EmptyName,

    #[error("a candidate named {0:?} is already registered")]
    DuplicateName(String),
}

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("candidate {0} is not registered")]
    UnknownCandidate(CandidateId),

    #[error("account {account} has already voted")]
    DuplicateVote {
        account: Account,
        existing: Box<RecordedVote>,
    },

    #[error("ledger unavailable: {reason}")]
    Unavailable {
        reason: String,
        /// Set when a vote submission's outcome is unknown; retry with it.
        pending: Option<PendingVote>,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("ledger backend error: {0}")]
    Backend(StoreError),
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Unavailable { .. })
    }

    pub fn pending(&self) -> Option<&PendingVote> {
        match self {
            LedgerError::Unavailable { pending, .. } => pending.as_ref(),
            _ => None,
        }
    }

    /// Map a backend failure that is not a rejection.
    pub(crate) fn from_store(e: StoreError, pending: Option<PendingVote>) -> Self {
        match e {
            StoreError::Unavailable(reason) => LedgerError::Unavailable { reason, pending },
            other => LedgerError::Backend(other),
        }
    }
}
