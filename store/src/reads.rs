//! Typed wrappers over [`LedgerBackend::call`].

use async_trait::async_trait;
use ballot_types::{Account, Candidate, CandidateId, RecordedVote, Tally};

use crate::{LedgerBackend, LedgerQuery, LedgerValue, StoreError};

#[async_trait]
pub trait LedgerReads {
    async fn candidates(&self) -> Result<Vec<Candidate>, StoreError>;
    async fn vote_of(&self, account: &Account) -> Result<Option<RecordedVote>, StoreError>;
    async fn votes_for(&self, candidate: &CandidateId) -> Result<u64, StoreError>;
    async fn tally(&self) -> Result<Tally, StoreError>;
}

fn unexpected(query: &LedgerQuery, value: &LedgerValue) -> StoreError {
    StoreError::UnexpectedValue {
        query: query.method(),
        detail: format!("{value:?}"),
    }
}

#[async_trait]
impl<T: LedgerBackend + ?Sized> LedgerReads for T {
    async fn candidates(&self) -> Result<Vec<Candidate>, StoreError> {
        let query = LedgerQuery::Candidates;
        match self.call(query.clone()).await? {
            LedgerValue::Candidates(list) => Ok(list),
            other => Err(unexpected(&query, &other)),
        }
    }

    async fn vote_of(&self, account: &Account) -> Result<Option<RecordedVote>, StoreError> {
        let query = LedgerQuery::VoteOf(account.clone());
        match self.call(query.clone()).await? {
            LedgerValue::Vote(vote) => Ok(vote),
            other => Err(unexpected(&query, &other)),
        }
    }

    async fn votes_for(&self, candidate: &CandidateId) -> Result<u64, StoreError> {
        let query = LedgerQuery::VotesFor(candidate.clone());
        match self.call(query.clone()).await? {
            LedgerValue::Count(n) => Ok(n),
            other => Err(unexpected(&query, &other)),
        }
    }

    async fn tally(&self) -> Result<Tally, StoreError> {
        let query = LedgerQuery::Tally;
        match self.call(query.clone()).await? {
            LedgerValue::Tally(t) => Ok(t),
            other => Err(unexpected(&query, &other)),
        }
    }
}
