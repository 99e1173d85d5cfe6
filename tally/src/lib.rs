//! Vote tally aggregation.
//!
//! Tallies are served from a TTL cache filled from the read-model service.
//! The read model may lag the ledger; writes confirmed through this node
//! invalidate the affected candidates, whose counts are then re-read from
//! the ledger on the next refresh so a confirmed vote is never hidden.

pub mod aggregator;
pub mod error;

pub use aggregator::{Scope, TallyAggregator, TallyConfig, TallySource};
pub use error::TallyError;
