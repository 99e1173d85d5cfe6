//! Vote ledger.
//!
//! Submits votes to the backend and reads them back. The one-vote-per-account
//! rule is enforced by the backend's write path; the `vote_of` pre-check here
//! only saves a doomed write and classifies retries.

use std::sync::Arc;

use ballot_store::{CommitEffect, LedgerBackend, LedgerCommand, LedgerReads, Rejection, StoreError};
use ballot_types::{Account, CandidateId, RecordedVote, Tally, VoteReceipt};
use tracing::{debug, info, warn};

use crate::{CandidateRegistry, LedgerConfig, LedgerError, PendingVote};

pub struct VoteLedger {
    backend: Arc<dyn LedgerBackend>,
    registry: Arc<CandidateRegistry>,
    config: LedgerConfig,
}

impl VoteLedger {
    pub fn new(
        backend: Arc<dyn LedgerBackend>,
        registry: Arc<CandidateRegistry>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<CandidateRegistry> {
        &self.registry
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Record a vote for `candidate_id` on behalf of `account`.
    ///
    /// When the outcome cannot be determined the error carries a
    /// [`PendingVote`]; pass it to [`resume`](Self::resume) to retry without
    /// risking a second vote.
    pub async fn submit(
        &self,
        account: &Account,
        candidate_id: &CandidateId,
    ) -> Result<VoteReceipt, LedgerError> {
        self.submit_pending(PendingVote::new(account.clone(), candidate_id.clone()))
            .await
    }

    /// Retry a submission whose outcome was unknown. If the earlier attempt
    /// committed, its receipt is returned with `replayed` set.
    pub async fn resume(&self, pending: &PendingVote) -> Result<VoteReceipt, LedgerError> {
        debug!(
            account = %pending.account,
            submission = %pending.submission_id,
            "resuming pending vote"
        );
        self.submit_pending(pending.clone()).await
    }

    async fn submit_pending(&self, pending: PendingVote) -> Result<VoteReceipt, LedgerError> {
        let unavailable = |e: LedgerError| match e {
            LedgerError::Unavailable { reason, .. } => LedgerError::Unavailable {
                reason,
                pending: Some(pending.clone()),
            },
            other => other,
        };

        if !self
            .registry
            .exists(&pending.candidate_id)
            .await
            .map_err(unavailable)?
        {
            return Err(LedgerError::UnknownCandidate(pending.candidate_id.clone()));
        }

        if let Some(existing) = self
            .vote_of(&pending.account)
            .await
            .map_err(unavailable)?
        {
            return Self::classify_existing(&pending, existing);
        }

        let command = LedgerCommand::CastVote {
            candidate_id: pending.candidate_id.clone(),
            submission_id: pending.submission_id.clone(),
        };
        let sent = self
            .config
            .bounded("vote", self.backend.send(command, &pending.account))
            .await;

        match sent {
            Ok(committed) => match committed.effect {
                CommitEffect::VoteRecorded(vote) => {
                    info!(
                        account = %vote.account,
                        candidate = %vote.candidate_id,
                        commit = %committed.receipt.commit_id,
                        "vote recorded"
                    );
                    Ok(VoteReceipt::fresh(RecordedVote {
                        vote,
                        receipt: committed.receipt,
                    }))
                }
                other => Err(LedgerError::Backend(StoreError::UnexpectedValue {
                    query: "vote",
                    detail: format!("{other:?}"),
                })),
            },
            Err(StoreError::Rejected(Rejection::AlreadyVoted(existing))) => {
                Self::classify_existing(&pending, *existing)
            }
            Err(StoreError::Rejected(Rejection::UnknownCandidate(id))) => {
                Err(LedgerError::UnknownCandidate(id))
            }
            Err(StoreError::Unavailable(reason)) => {
                warn!(
                    account = %pending.account,
                    submission = %pending.submission_id,
                    %reason,
                    "vote outcome unknown"
                );
                Err(LedgerError::Unavailable {
                    reason,
                    pending: Some(pending),
                })
            }
            Err(e) => Err(LedgerError::from_store(e, None)),
        }
    }

    /// An account already has a vote: ours only if it is this exact
    /// submission (same account, candidate and submission id), otherwise a
    /// duplicate.
    fn classify_existing(
        pending: &PendingVote,
        existing: RecordedVote,
    ) -> Result<VoteReceipt, LedgerError> {
        let vote = &existing.vote;
        if vote.account == pending.account
            && vote.candidate_id == pending.candidate_id
            && vote.submission_id == pending.submission_id
        {
            info!(
                account = %pending.account,
                commit = %existing.receipt.commit_id,
                "earlier submission already committed"
            );
            Ok(VoteReceipt::replayed(existing))
        } else {
            Err(LedgerError::DuplicateVote {
                account: pending.account.clone(),
                existing: Box::new(existing),
            })
        }
    }

    pub async fn vote_of(&self, account: &Account) -> Result<Option<RecordedVote>, LedgerError> {
        self.config
            .bounded("voteOf", self.backend.vote_of(account))
            .await
            .map_err(|e| LedgerError::from_store(e, None))
    }

    pub async fn votes_for(&self, candidate_id: &CandidateId) -> Result<u64, LedgerError> {
        self.config
            .bounded("votesFor", self.backend.votes_for(candidate_id))
            .await
            .map_err(|e| LedgerError::from_store(e, None))
    }

    /// Counts for every candidate with at least one vote.
    pub async fn tally(&self) -> Result<Tally, LedgerError> {
        self.config
            .bounded("tally", self.backend.tally())
            .await
            .map_err(|e| LedgerError::from_store(e, None))
    }
}
