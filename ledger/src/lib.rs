//! Candidate registry and vote ledger.
//!
//! Both components are thin, validating fronts over a
//! [`LedgerBackend`](ballot_store::LedgerBackend). The backend is the source
//! of truth: local checks exist to reject bad requests early, while the
//! backend's own write path is what guarantees one vote per account and
//! unique candidate names.

pub mod config;
pub mod error;
pub mod ledger;
pub mod pending;
pub mod registry;

pub use config::LedgerConfig;
pub use error::{LedgerError, ValidationError};
pub use ledger::VoteLedger;
pub use pending::PendingVote;
pub use registry::CandidateRegistry;
