//! Backend commit receipts.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Vote;

/// Backend-issued commit identifier (hex Blake2b digest).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confirmation that a backend write was committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub commit_id: CommitId,
    /// Position of the write in the backend's monotonic write log.
    pub sequence: u64,
}

/// A vote together with the receipt of the write that committed it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedVote {
    pub vote: Vote,
    pub receipt: Receipt,
}

/// Result of a successful castVote.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReceipt {
    pub vote: Vote,
    pub receipt: Receipt,
    /// The vote had already been committed by an earlier attempt of the same
    /// submission; this call only confirmed it.
    pub replayed: bool,
}

impl VoteReceipt {
    pub fn fresh(recorded: RecordedVote) -> Self {
        Self {
            vote: recorded.vote,
            receipt: recorded.receipt,
            replayed: false,
        }
    }

    pub fn replayed(recorded: RecordedVote) -> Self {
        Self {
            vote: recorded.vote,
            receipt: recorded.receipt,
            replayed: true,
        }
    }
}
