//! Read-model service access.
//!
//! The read model is a secondary, possibly stale query service over
//! aggregated vote data. Its contract is a single endpoint:
//! `GET /votes` → `{"c1": 3, "c2": 0, ...}`.

pub mod client;
pub mod error;

use async_trait::async_trait;
use ballot_types::Tally;

pub use client::HttpReadModel;
pub use error::ReadModelError;

/// Source of aggregated vote counts.
#[async_trait]
pub trait ReadModel: Send + Sync {
    /// Service name for logging.
    fn name(&self) -> &'static str;

    /// Fetch the current per-candidate counts.
    async fn fetch_votes(&self) -> Result<Tally, ReadModelError>;
}
