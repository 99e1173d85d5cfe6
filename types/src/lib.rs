//! Fundamental types for the ballot coordination core.
//!
//! This crate defines the value types shared across every other crate in the
//! workspace: accounts, candidates, votes, receipts, sessions, tallies,
//! timestamps and the clock abstraction.

pub mod account;
pub mod candidate;
pub mod error;
pub mod hash;
pub mod receipt;
pub mod session;
pub mod tally;
pub mod time;
pub mod vote;

pub use account::Account;
pub use candidate::{Candidate, CandidateId};
pub use error::TypeError;
pub use receipt::{CommitId, Receipt, RecordedVote, VoteReceipt};
pub use session::{Session, SessionToken};
pub use tally::Tally;
pub use time::{Clock, SystemClock, Timestamp};
pub use vote::{SubmissionId, Vote};
