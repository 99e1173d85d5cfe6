//! Ledger backend abstraction.
//!
//! The authoritative store of candidates and votes (a contract, an LMDB
//! environment, an in-memory double) is reached only through the two
//! primitives of [`LedgerBackend`]: a non-mutating `call` and a mutating
//! `send`. Every backend must reject a second vote for the same account and
//! a second candidate with the same name inside its own write path.

pub mod backend;
pub mod error;
pub mod message;
pub mod reads;

pub use backend::LedgerBackend;
pub use error::{Rejection, StoreError};
pub use message::{CommitEffect, Committed, LedgerCommand, LedgerQuery, LedgerValue};
pub use reads::LedgerReads;
