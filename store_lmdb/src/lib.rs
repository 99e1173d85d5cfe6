//! LMDB ledger backend.
//!
//! A durable [`LedgerBackend`](ballot_store::LedgerBackend) for single-node
//! deployments. Every `send` runs inside one LMDB write transaction, and
//! LMDB admits a single writer at a time, so the per-account vote check and
//! the vote insert cannot interleave with another writer. Candidate ids come
//! from a counter persisted in the same transaction and are never reused
//! across restarts.

pub mod environment;
pub mod error;
pub mod ledger;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use ledger::LmdbLedger;
