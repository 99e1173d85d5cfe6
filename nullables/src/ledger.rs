//! Nullable ledger backend — thread-safe in-memory ledger for testing.
//!
//! Applies the same rules as a real backend (unique candidate names,
//! monotonic ids, one vote per account, votes only for registered
//! candidates) under a single mutex, and can inject outages:
//! failed reads, failed writes, and writes that commit but whose receipt is
//! lost on the way back.

use async_trait::async_trait;
use ballot_store::{
    CommitEffect, Committed, LedgerBackend, LedgerCommand, LedgerQuery, LedgerValue, Rejection,
    StoreError,
};
use ballot_types::hash::digest_hex;
use ballot_types::{
    Account, Candidate, CandidateId, Clock, CommitId, Receipt, RecordedVote, Tally, Timestamp,
    Vote,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::CallCounter;

#[derive(Default)]
struct State {
    candidates: Vec<Candidate>,
    names: HashSet<String>,
    votes: HashMap<Account, RecordedVote>,
    tally: Tally,
    write_seq: u64,
}

#[derive(Default)]
struct Faults {
    failing_calls: AtomicUsize,
    failing_sends: AtomicUsize,
    lost_receipts: AtomicUsize,
    send_delay: Mutex<Option<Duration>>,
    call_delay: Mutex<Option<Duration>>,
}

/// In-memory ledger backend. Clones share the same ledger, so several
/// coordinators can write to one "external" backend.
#[derive(Clone, Default)]
pub struct NullLedger {
    state: Arc<Mutex<State>>,
    faults: Arc<Faults>,
    clock: Option<Arc<dyn Clock>>,
    calls: CallCounter,
    sends: CallCounter,
}

/// Consume one unit of an injected fault, if any remain.
fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp votes with `clock` instead of the write sequence.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// The next `n` reads fail with `Unavailable`.
    pub fn fail_next_calls(&self, n: usize) {
        self.faults.failing_calls.store(n, Ordering::SeqCst);
    }

    /// The next `n` writes fail with `Unavailable` without committing.
    pub fn fail_next_sends(&self, n: usize) {
        self.faults.failing_sends.store(n, Ordering::SeqCst);
    }

    /// The next `n` writes commit, then report `Unavailable` to the caller.
    pub fn lose_next_receipts(&self, n: usize) {
        self.faults.lost_receipts.store(n, Ordering::SeqCst);
    }

    /// Sleep before applying every write.
    pub fn set_send_delay(&self, delay: Option<Duration>) {
        *lock(&self.faults.send_delay) = delay;
    }

    /// Sleep before answering every read.
    pub fn set_call_delay(&self, delay: Option<Duration>) {
        *lock(&self.faults.call_delay) = delay;
    }

    /// Number of `call` invocations so far.
    pub fn call_count(&self) -> usize {
        self.calls.get()
    }

    /// Number of `send` invocations so far.
    pub fn send_count(&self) -> usize {
        self.sends.get()
    }

    /// Every committed vote, in no particular order.
    pub fn votes(&self) -> Vec<RecordedVote> {
        lock(&self.state).votes.values().cloned().collect()
    }

    /// Votes committed for `account` (0 or 1 if the backend is correct).
    pub fn votes_by(&self, account: &Account) -> usize {
        lock(&self.state)
            .votes
            .values()
            .filter(|r| &r.vote.account == account)
            .count()
    }

    pub fn candidate_names(&self) -> Vec<String> {
        lock(&self.state)
            .candidates
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    fn now(&self, seq: u64) -> Timestamp {
        match &self.clock {
            Some(clock) => clock.now(),
            None => Timestamp::new(seq),
        }
    }

    fn apply(&self, command: LedgerCommand, from: &Account) -> Result<Committed, StoreError> {
        let mut state = lock(&self.state);
        match command {
            LedgerCommand::RegisterCandidate { name } => {
                if name.trim().is_empty() {
                    return Err(Rejection::Malformed("candidate name is empty".into()).into());
                }
                if state.names.contains(&name) {
                    return Err(Rejection::DuplicateName(name).into());
                }
                let candidate = Candidate {
                    id: CandidateId::from_sequence(state.candidates.len() as u64 + 1),
                    name,
                };
                state.names.insert(candidate.name.clone());
                state.candidates.push(candidate.clone());
                let receipt = next_receipt(&mut state, "registerCandidate", from);
                Ok(Committed {
                    receipt,
                    effect: CommitEffect::CandidateRegistered(candidate),
                })
            }
            LedgerCommand::CastVote {
                candidate_id,
                submission_id,
            } => {
                if !state.candidates.iter().any(|c| c.id == candidate_id) {
                    return Err(Rejection::UnknownCandidate(candidate_id).into());
                }
                if let Some(existing) = state.votes.get(from) {
                    return Err(Rejection::AlreadyVoted(Box::new(existing.clone())).into());
                }
                let receipt = next_receipt(&mut state, "vote", from);
                let vote = Vote {
                    account: from.clone(),
                    candidate_id,
                    cast_at: self.now(receipt.sequence),
                    submission_id,
                };
                state.tally.increment(vote.candidate_id.clone());
                state.votes.insert(
                    from.clone(),
                    RecordedVote {
                        vote: vote.clone(),
                        receipt: receipt.clone(),
                    },
                );
                Ok(Committed {
                    receipt,
                    effect: CommitEffect::VoteRecorded(vote),
                })
            }
        }
    }
}

fn next_receipt(state: &mut State, method: &str, from: &Account) -> Receipt {
    state.write_seq += 1;
    let sequence = state.write_seq;
    Receipt {
        commit_id: CommitId::new(digest_hex(
            "commit",
            &[
                method.as_bytes(),
                from.as_str().as_bytes(),
                &sequence.to_le_bytes(),
            ],
        )),
        sequence,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl LedgerBackend for NullLedger {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn call(&self, query: LedgerQuery) -> Result<LedgerValue, StoreError> {
        self.calls.hit();
        let delay = *lock(&self.faults.call_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if take(&self.faults.failing_calls) {
            return Err(StoreError::Unavailable("null ledger read outage".into()));
        }

        let state = lock(&self.state);
        Ok(match query {
            LedgerQuery::Candidates => LedgerValue::Candidates(state.candidates.clone()),
            LedgerQuery::VoteOf(account) => LedgerValue::Vote(state.votes.get(&account).cloned()),
            LedgerQuery::VotesFor(id) => LedgerValue::Count(state.tally.get(&id)),
            LedgerQuery::Tally => LedgerValue::Tally(state.tally.clone()),
        })
    }

    async fn send(
        &self,
        command: LedgerCommand,
        from: &Account,
    ) -> Result<Committed, StoreError> {
        self.sends.hit();
        let delay = *lock(&self.faults.send_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if take(&self.faults.failing_sends) {
            return Err(StoreError::Unavailable("null ledger write outage".into()));
        }

        let committed = self.apply(command, from)?;
        if take(&self.faults.lost_receipts) {
            return Err(StoreError::Unavailable(
                "null ledger dropped the receipt".into(),
            ));
        }
        Ok(committed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_store::LedgerReads;
    use ballot_types::SubmissionId;

    fn acct(s: &str) -> Account {
        Account::new(s).unwrap()
    }

    fn cast(id: &CandidateId, sub: &str) -> LedgerCommand {
        LedgerCommand::CastVote {
            candidate_id: id.clone(),
            submission_id: SubmissionId::new(sub),
        }
    }

    async fn register(ledger: &NullLedger, name: &str) -> Candidate {
        match ledger
            .send(
                LedgerCommand::RegisterCandidate { name: name.into() },
                &acct("admin"),
            )
            .await
            .unwrap()
            .effect
        {
            CommitEffect::CandidateRegistered(c) => c,
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[tokio::test]
    async fn rejects_second_vote_for_account() {
        let ledger = NullLedger::new();
        let c1 = register(&ledger, "Alice").await;
        ledger.send(cast(&c1.id, "s1"), &acct("a1")).await.unwrap();
        let err = ledger
            .send(cast(&c1.id, "s2"), &acct("a1"))
            .await
            .unwrap_err();
        match err {
            StoreError::Rejected(Rejection::AlreadyVoted(existing)) => {
                assert_eq!(existing.vote.submission_id.as_str(), "s1");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(ledger.votes_by(&acct("a1")), 1);
    }

    #[tokio::test]
    async fn lost_receipt_still_commits() {
        let ledger = NullLedger::new();
        let c1 = register(&ledger, "Alice").await;
        ledger.lose_next_receipts(1);
        assert!(ledger.send(cast(&c1.id, "s1"), &acct("a1")).await.is_err());
        assert!(ledger.vote_of(&acct("a1")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_send_does_not_commit() {
        let ledger = NullLedger::new();
        let c1 = register(&ledger, "Alice").await;
        ledger.fail_next_sends(1);
        assert!(ledger.send(cast(&c1.id, "s1"), &acct("a1")).await.is_err());
        assert!(ledger.vote_of(&acct("a1")).await.unwrap().is_none());
        ledger.send(cast(&c1.id, "s1"), &acct("a1")).await.unwrap();
    }

    #[tokio::test]
    async fn ids_are_sequential_and_names_unique() {
        let ledger = NullLedger::new();
        assert_eq!(register(&ledger, "Alice").await.id.as_str(), "c1");
        assert_eq!(register(&ledger, "Bob").await.id.as_str(), "c2");
        let err = ledger
            .send(
                LedgerCommand::RegisterCandidate {
                    name: "Alice".into(),
                },
                &acct("admin"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Rejected(Rejection::DuplicateName(_))
        ));
    }
}
