//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the coordination core (clock, ledger
//! backend, read-model service, identity provider) sits behind a trait. This
//! crate provides in-memory implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically, including injected outages
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod counter;
pub mod identity;
pub mod ledger;
pub mod read_model;

pub use clock::NullClock;
pub use counter::CallCounter;
pub use identity::NullIdentityProvider;
pub use ledger::NullLedger;
pub use read_model::NullReadModel;
