//! Typed methods and values exchanged with a ledger backend.

use ballot_types::{
    Account, Candidate, CandidateId, Receipt, RecordedVote, SubmissionId, Tally, Vote,
};
use serde::{Deserialize, Serialize};

/// Read-only methods (`call`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerQuery {
    /// All candidates in registration order.
    Candidates,
    /// The vote recorded for an account, if any.
    VoteOf(Account),
    /// Number of votes recorded for a candidate.
    VotesFor(CandidateId),
    /// Vote counts for every candidate with at least one vote.
    Tally,
}

impl LedgerQuery {
    pub fn method(&self) -> &'static str {
        match self {
            LedgerQuery::Candidates => "candidates",
            LedgerQuery::VoteOf(_) => "voteOf",
            LedgerQuery::VotesFor(_) => "votesFor",
            LedgerQuery::Tally => "tally",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerValue {
    Candidates(Vec<Candidate>),
    Vote(Option<RecordedVote>),
    Count(u64),
    Tally(Tally),
}

/// Mutating methods (`send`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCommand {
    RegisterCandidate {
        name: String,
    },
    CastVote {
        candidate_id: CandidateId,
        submission_id: SubmissionId,
    },
}

impl LedgerCommand {
    pub fn method(&self) -> &'static str {
        match self {
            LedgerCommand::RegisterCandidate { .. } => "registerCandidate",
            LedgerCommand::CastVote { .. } => "vote",
        }
    }
}

/// What a committed write changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitEffect {
    CandidateRegistered(Candidate),
    VoteRecorded(Vote),
}

/// Reply to a successful `send`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committed {
    pub receipt: Receipt,
    pub effect: CommitEffect,
}
