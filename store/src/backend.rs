use async_trait::async_trait;
use ballot_types::Account;

use crate::{Committed, LedgerCommand, LedgerQuery, LedgerValue, StoreError};

/// The authoritative ledger (e.g. a smart contract).
///
/// `send` must apply each command atomically: a `CastVote` from an account
/// that already has a vote is rejected with
/// [`Rejection::AlreadyVoted`](crate::Rejection::AlreadyVoted), never
/// committed twice. Callers rely on this, not on their own pre-checks.
#[async_trait]
pub trait LedgerBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Non-mutating read.
    async fn call(&self, query: LedgerQuery) -> Result<LedgerValue, StoreError>;

    /// Mutating write submitted on behalf of `from`.
    async fn send(&self, command: LedgerCommand, from: &Account)
        -> Result<Committed, StoreError>;
}
