//! Vote records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::unique_digest_hex;
use crate::{Account, CandidateId, Timestamp};

/// Identifies one castVote attempt.
///
/// A retry of an attempt whose outcome is unknown reuses the same id, which
/// lets the ledger tell "my earlier attempt already landed" apart from a
/// genuine second vote.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(String);

impl SubmissionId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// A fresh id for a new attempt by `account` for `candidate`.
    pub fn generate(account: &Account, candidate: &CandidateId) -> Self {
        Self(unique_digest_hex(
            "submission",
            &[account.as_str().as_bytes(), candidate.as_str().as_bytes()],
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A committed vote. Exactly one may exist per account; never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub account: Account,
    pub candidate_id: CandidateId,
    pub cast_at: Timestamp,
    pub submission_id: SubmissionId,
}
