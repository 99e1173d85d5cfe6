//! Errors raised while constructing core value types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("account identifier must not be empty")]
    EmptyAccount,

    #[error("candidate id must not be empty")]
    EmptyCandidateId,

    #[error("os randomness unavailable: {0}")]
    Entropy(String),
}
