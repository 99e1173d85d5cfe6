//! Vote coordination core.
//!
//! The coordinator is the entry point an outer surface (CLI, HTTP, UI)
//! invokes. Each operation is one traversal:
//! - Re-validate the caller's session
//! - Validate the candidate against the registry
//! - Commit through the vote ledger (the authoritative backend)
//! - Invalidate the affected tally so the next read reflects the write

pub mod config;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod shutdown;

pub use config::CoordinatorConfig;
pub use coordinator::{Stage, VoteCoordinator};
pub use error::CoordinatorError;
pub use metrics::CoordinatorMetrics;
pub use shutdown::ShutdownController;
