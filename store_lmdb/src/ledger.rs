//! LMDB implementation of [`LedgerBackend`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use heed::RwTxn;

use ballot_store::{
    CommitEffect, Committed, LedgerBackend, LedgerCommand, LedgerQuery, LedgerValue, Rejection,
    StoreError,
};
use ballot_types::hash::{blake2b_256_multi, digest_hex};
use ballot_types::{
    Account, Candidate, CandidateId, Clock, CommitId, Receipt, RecordedVote, SubmissionId, Tally,
    Vote,
};

use crate::environment::decode_u64;
use crate::{LmdbEnvironment, LmdbError};

const CANDIDATE_SEQ_KEY: &str = "candidate_seq";
const WRITE_SEQ_KEY: &str = "write_seq";

/// Names and accounts are unbounded but LMDB keys stop at 511 bytes, so
/// both are stored under their digest.
fn name_key(name: &str) -> [u8; 32] {
    blake2b_256_multi(&[b"candidate_name", name.as_bytes()])
}

fn account_key(account: &Account) -> [u8; 32] {
    blake2b_256_multi(&[b"account", account.as_str().as_bytes()])
}

/// Default LMDB map size: 256 MiB.
pub const DEFAULT_MAP_SIZE: usize = 256 * 1024 * 1024;

/// Durable ledger backend over a single LMDB environment.
#[derive(Clone)]
pub struct LmdbLedger {
    inner: Arc<Inner>,
}

struct Inner {
    env: LmdbEnvironment,
    clock: Arc<dyn Clock>,
}

impl LmdbLedger {
    pub fn open(path: &Path, clock: Arc<dyn Clock>) -> Result<Self, LmdbError> {
        Self::open_with_map_size(path, DEFAULT_MAP_SIZE, clock)
    }

    pub fn open_with_map_size(
        path: &Path,
        map_size: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LmdbError> {
        let env = LmdbEnvironment::open(path, map_size)?;
        tracing::info!(path = %path.display(), "opened LMDB ledger");
        Ok(Self {
            inner: Arc::new(Inner { env, clock }),
        })
    }

    /// Run a blocking LMDB operation off the async executor.
    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> Result<T, StoreError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&inner))
            .await
            .map_err(|e| StoreError::Unavailable(format!("ledger task failed: {e}")))?
    }
}

#[async_trait]
impl LedgerBackend for LmdbLedger {
    fn name(&self) -> &'static str {
        "lmdb"
    }

    async fn call(&self, query: LedgerQuery) -> Result<LedgerValue, StoreError> {
        self.blocking(move |inner| inner.read(&query)).await
    }

    async fn send(
        &self,
        command: LedgerCommand,
        from: &Account,
    ) -> Result<Committed, StoreError> {
        let from = from.clone();
        self.blocking(move |inner| inner.write(command, &from)).await
    }
}

impl Inner {
    fn read(&self, query: &LedgerQuery) -> Result<LedgerValue, StoreError> {
        let db = &self.env;
        let rtxn = db.env.read_txn().map_err(LmdbError::from)?;
        let value = match query {
            LedgerQuery::Candidates => {
                let mut list = Vec::new();
                for entry in db.candidates_db.iter(&rtxn).map_err(LmdbError::from)? {
                    let (_, bytes) = entry.map_err(LmdbError::from)?;
                    let candidate: Candidate =
                        bincode::deserialize(bytes).map_err(LmdbError::from)?;
                    list.push(candidate);
                }
                LedgerValue::Candidates(list)
            }
            LedgerQuery::VoteOf(account) => {
                let recorded = match db
                    .votes_db
                    .get(&rtxn, &account_key(account))
                    .map_err(LmdbError::from)?
                {
                    Some(bytes) => Some(
                        bincode::deserialize::<RecordedVote>(bytes).map_err(LmdbError::from)?,
                    ),
                    None => None,
                };
                LedgerValue::Vote(recorded)
            }
            LedgerQuery::VotesFor(candidate) => {
                let count = match db
                    .counts_db
                    .get(&rtxn, candidate.as_str())
                    .map_err(LmdbError::from)?
                {
                    Some(bytes) => decode_u64(bytes, "vote count")?,
                    None => 0,
                };
                LedgerValue::Count(count)
            }
            LedgerQuery::Tally => {
                let mut tally = Tally::new();
                for entry in db.counts_db.iter(&rtxn).map_err(LmdbError::from)? {
                    let (id, bytes) = entry.map_err(LmdbError::from)?;
                    let id = CandidateId::new(id)
                        .map_err(|e| StoreError::Corruption(e.to_string()))?;
                    tally.set(id, decode_u64(bytes, "vote count")?);
                }
                LedgerValue::Tally(tally)
            }
        };
        Ok(value)
    }

    fn write(&self, command: LedgerCommand, from: &Account) -> Result<Committed, StoreError> {
        let mut wtxn = self.env.env.write_txn().map_err(LmdbError::from)?;
        let committed = match command {
            LedgerCommand::RegisterCandidate { name } => {
                self.register_candidate(&mut wtxn, name, from)?
            }
            LedgerCommand::CastVote {
                candidate_id,
                submission_id,
            } => self.cast_vote(&mut wtxn, candidate_id, submission_id, from)?,
        };
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(committed)
    }

    fn register_candidate(
        &self,
        wtxn: &mut RwTxn,
        name: String,
        from: &Account,
    ) -> Result<Committed, StoreError> {
        let db = &self.env;
        if name.trim().is_empty() {
            return Err(Rejection::Malformed("candidate name is empty".into()).into());
        }
        if db
            .names_db
            .get(wtxn, &name_key(&name))
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(Rejection::DuplicateName(name).into());
        }

        let seq = self.bump_counter(wtxn, CANDIDATE_SEQ_KEY)?;
        let candidate = Candidate {
            id: CandidateId::from_sequence(seq),
            name,
        };
        let bytes = bincode::serialize(&candidate).map_err(LmdbError::from)?;
        db.candidates_db
            .put(wtxn, &seq.to_be_bytes(), &bytes)
            .map_err(LmdbError::from)?;
        db.names_db
            .put(wtxn, &name_key(&candidate.name), &seq.to_be_bytes())
            .map_err(LmdbError::from)?;

        let receipt = self.next_receipt(
            wtxn,
            "registerCandidate",
            from,
            candidate.id.as_str().as_bytes(),
        )?;
        Ok(Committed {
            receipt,
            effect: CommitEffect::CandidateRegistered(candidate),
        })
    }

    fn cast_vote(
        &self,
        wtxn: &mut RwTxn,
        candidate_id: CandidateId,
        submission_id: SubmissionId,
        from: &Account,
    ) -> Result<Committed, StoreError> {
        let db = &self.env;
        let registered = match candidate_id.sequence() {
            Some(seq) => db
                .candidates_db
                .get(wtxn, &seq.to_be_bytes())
                .map_err(LmdbError::from)?
                .is_some(),
            None => false,
        };
        if !registered {
            return Err(Rejection::UnknownCandidate(candidate_id).into());
        }

        if let Some(bytes) = db
            .votes_db
            .get(wtxn, &account_key(from))
            .map_err(LmdbError::from)?
        {
            let existing: RecordedVote = bincode::deserialize(bytes).map_err(LmdbError::from)?;
            return Err(Rejection::AlreadyVoted(Box::new(existing)).into());
        }

        let vote = Vote {
            account: from.clone(),
            candidate_id,
            cast_at: self.clock.now(),
            submission_id,
        };
        let receipt = self.next_receipt(
            wtxn,
            "vote",
            from,
            vote.submission_id.as_str().as_bytes(),
        )?;
        let recorded = RecordedVote {
            vote: vote.clone(),
            receipt: receipt.clone(),
        };
        let bytes = bincode::serialize(&recorded).map_err(LmdbError::from)?;
        db.votes_db
            .put(wtxn, &account_key(from), &bytes)
            .map_err(LmdbError::from)?;

        let count = match db
            .counts_db
            .get(wtxn, vote.candidate_id.as_str())
            .map_err(LmdbError::from)?
        {
            Some(raw) => decode_u64(raw, "vote count")?,
            None => 0,
        };
        db.counts_db
            .put(wtxn, vote.candidate_id.as_str(), &(count + 1).to_le_bytes())
            .map_err(LmdbError::from)?;

        Ok(Committed {
            receipt,
            effect: CommitEffect::VoteRecorded(vote),
        })
    }

    /// Increment a persisted counter and return its new value.
    fn bump_counter(&self, wtxn: &mut RwTxn, key: &str) -> Result<u64, StoreError> {
        let meta = &self.env.meta_db;
        let current = match meta.get(wtxn, key).map_err(LmdbError::from)? {
            Some(raw) => decode_u64(raw, key)?,
            None => 0,
        };
        let next = current + 1;
        meta.put(wtxn, key, &next.to_le_bytes())
            .map_err(LmdbError::from)?;
        Ok(next)
    }

    fn next_receipt(
        &self,
        wtxn: &mut RwTxn,
        method: &str,
        from: &Account,
        payload: &[u8],
    ) -> Result<Receipt, StoreError> {
        let sequence = self.bump_counter(wtxn, WRITE_SEQ_KEY)?;
        let commit_id = digest_hex(
            "commit",
            &[
                method.as_bytes(),
                from.as_str().as_bytes(),
                &sequence.to_le_bytes(),
                payload,
            ],
        );
        Ok(Receipt {
            commit_id: CommitId::new(commit_id),
            sequence,
        })
    }
}
