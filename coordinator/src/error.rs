use ballot_auth::{AuthFailure, AuthenticationError};
use ballot_ledger::{LedgerError, PendingVote, ValidationError};
use ballot_read_model::ReadModelError;
use ballot_store::StoreError;
use ballot_tally::TallyError;
use ballot_types::{Account, CandidateId, RecordedVote};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("candidate {0} is not registered")]
    UnknownCandidate(CandidateId),

    #[error("account {account} has already voted")]
    DuplicateVote {
        account: Account,
        existing: Box<RecordedVote>,
    },

    #[error("ledger unavailable: {reason}")]
    LedgerUnavailable {
        reason: String,
        pending: Option<PendingVote>,
    },

    #[error("ledger backend error: {0}")]
    Ledger(StoreError),

    #[error("read model error: {0}")]
    ReadModel(#[from] ReadModelError),

    #[error("pending vote belongs to another account")]
    ForeignSubmission,

    #[error("config error: {0}")]
    Config(String),
}

impl CoordinatorError {
    /// Whether repeating the operation may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CoordinatorError::Authentication(e) => e.is_retryable(),
            CoordinatorError::LedgerUnavailable { .. } | CoordinatorError::ReadModel(_) => true,
            _ => false,
        }
    }

    /// The submission to pass to `retry_vote`, if the outcome is unknown.
    pub fn pending(&self) -> Option<&PendingVote> {
        match self {
            CoordinatorError::LedgerUnavailable { pending, .. } => pending.as_ref(),
            _ => None,
        }
    }

    /// Stable machine-readable name of the failure.
    pub fn kind(&self) -> &'static str {
        match self {
            CoordinatorError::Authentication(e) => match e.reason {
                AuthFailure::InvalidCredentials => "invalid_credentials",
                AuthFailure::Expired => "session_expired",
                AuthFailure::ProviderUnavailable => "provider_unavailable",
            },
            CoordinatorError::Validation(ValidationError::EmptyName) => "empty_name",
            CoordinatorError::Validation(ValidationError::DuplicateName(_)) => "duplicate_name",
            CoordinatorError::UnknownCandidate(_) => "unknown_candidate",
            CoordinatorError::DuplicateVote { .. } => "duplicate_vote",
            CoordinatorError::LedgerUnavailable { .. } => "ledger_unavailable",
            CoordinatorError::Ledger(_) => "ledger_error",
            CoordinatorError::ReadModel(_) => "read_model_error",
            CoordinatorError::ForeignSubmission => "foreign_submission",
            CoordinatorError::Config(_) => "config_error",
        }
    }
}

impl From<LedgerError> for CoordinatorError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UnknownCandidate(id) => CoordinatorError::UnknownCandidate(id),
            LedgerError::DuplicateVote { account, existing } => {
                CoordinatorError::DuplicateVote { account, existing }
            }
            LedgerError::Unavailable { reason, pending } => {
                CoordinatorError::LedgerUnavailable { reason, pending }
            }
            LedgerError::Validation(v) => CoordinatorError::Validation(v),
            LedgerError::Backend(s) => CoordinatorError::Ledger(s),
        }
    }
}

impl From<TallyError> for CoordinatorError {
    fn from(e: TallyError) -> Self {
        match e {
            TallyError::ReadModel(rm) => CoordinatorError::ReadModel(rm),
            TallyError::Ledger(l) => l.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(CoordinatorError::from(AuthenticationError::provider_unavailable()).is_retryable());
        assert!(!CoordinatorError::from(AuthenticationError::expired()).is_retryable());
        assert!(CoordinatorError::ReadModel(ReadModelError::Unreachable("x".into())).is_retryable());
        assert!(CoordinatorError::LedgerUnavailable {
            reason: "down".into(),
            pending: None
        }
        .is_retryable());
        assert!(!CoordinatorError::ForeignSubmission.is_retryable());
        assert!(!CoordinatorError::Validation(ValidationError::EmptyName).is_retryable());
    }

    #[test]
    fn ledger_errors_flatten() {
        let e: CoordinatorError = LedgerError::Unavailable {
            reason: "timeout".into(),
            pending: None,
        }
        .into();
        assert_eq!(e.kind(), "ledger_unavailable");

        let e: CoordinatorError =
            TallyError::Ledger(LedgerError::UnknownCandidate(CandidateId::from_sequence(3))).into();
        assert_eq!(e.kind(), "unknown_candidate");
    }
}
