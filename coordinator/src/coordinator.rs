//! The vote coordinator and its per-operation state machine.

use std::sync::Arc;
use std::time::Instant;

use ballot_auth::{AuthenticationGate, Credentials, IdentityProvider};
use ballot_ledger::{CandidateRegistry, PendingVote, VoteLedger};
use ballot_read_model::ReadModel;
use ballot_store::LedgerBackend;
use ballot_tally::{Scope, TallyAggregator};
use ballot_types::{Account, Candidate, CandidateId, Clock, Session, SessionToken, Tally, VoteReceipt};
use tracing::{debug, warn};

use crate::{CoordinatorConfig, CoordinatorError, CoordinatorMetrics};

/// Progress of one coordinated operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Start,
    Authenticated,
    CandidateValidated,
    Committed,
    TallyInvalidated,
    Done,
}

/// One traversal of the state machine. Nothing outlives the call.
struct Traversal {
    op: &'static str,
    stage: Stage,
}

impl Traversal {
    fn start(op: &'static str) -> Self {
        debug!(op, stage = ?Stage::Start, "operation started");
        Self {
            op,
            stage: Stage::Start,
        }
    }

    fn advance(&mut self, stage: Stage) {
        debug!(op = self.op, from = ?self.stage, to = ?stage, "stage transition");
        self.stage = stage;
    }

    fn fail(&self, error: CoordinatorError) -> CoordinatorError {
        warn!(
            op = self.op,
            stage = ?self.stage,
            kind = error.kind(),
            retryable = error.is_retryable(),
            %error,
            "operation failed"
        );
        error
    }
}

pub struct VoteCoordinator {
    gate: Arc<AuthenticationGate>,
    registry: Arc<CandidateRegistry>,
    ledger: Arc<VoteLedger>,
    tally: Arc<TallyAggregator>,
    metrics: Arc<CoordinatorMetrics>,
}

impl VoteCoordinator {
    pub fn new(
        gate: Arc<AuthenticationGate>,
        ledger: Arc<VoteLedger>,
        tally: Arc<TallyAggregator>,
        metrics: Arc<CoordinatorMetrics>,
    ) -> Self {
        Self {
            gate,
            registry: ledger.registry().clone(),
            ledger,
            tally,
            metrics,
        }
    }

    /// Wire every component from `config` around the given collaborators.
    pub fn from_config(
        config: &CoordinatorConfig,
        backend: Arc<dyn LedgerBackend>,
        read_model: Option<Arc<dyn ReadModel>>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger_config = config.ledger_config();
        let registry = Arc::new(CandidateRegistry::new(backend.clone(), ledger_config));
        let ledger = Arc::new(VoteLedger::new(backend, registry, ledger_config));
        let tally = Arc::new(TallyAggregator::new(
            read_model,
            ledger.clone(),
            clock.clone(),
            config.tally_config(),
        ));
        let gate = Arc::new(AuthenticationGate::new(
            identity,
            clock,
            config.gate_config(),
        ));
        Self::new(gate, ledger, tally, Arc::new(CoordinatorMetrics::new()))
    }

    pub fn metrics(&self) -> &Arc<CoordinatorMetrics> {
        &self.metrics
    }

    pub fn gate(&self) -> &Arc<AuthenticationGate> {
        &self.gate
    }

    /// Open a session.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Session, CoordinatorError> {
        match self.gate.authenticate(credentials).await {
            Ok(session) => {
                self.metrics.active_sessions.set(self.gate.active_sessions() as i64);
                Ok(session)
            }
            Err(e) => {
                self.metrics.auth_failures.inc();
                Err(e.into())
            }
        }
    }

    /// Look up a live session by token.
    pub fn session(&self, token: &SessionToken) -> Option<Session> {
        self.gate.session(token)
    }

    /// End a session. Returns whether it existed.
    pub fn logout(&self, token: &SessionToken) -> bool {
        let existed = self.gate.logout(token);
        self.gate.purge_expired();
        self.metrics.active_sessions.set(self.gate.active_sessions() as i64);
        existed
    }

    pub async fn register_candidate(
        &self,
        name: &str,
        session: &Session,
    ) -> Result<Candidate, CoordinatorError> {
        let mut op = Traversal::start("register_candidate");
        let account = self.require(&op, session)?;
        op.advance(Stage::Authenticated);

        let candidate = self
            .registry
            .register(name, &account)
            .await
            .map_err(|e| op.fail(e.into()))?;
        op.advance(Stage::Committed);
        self.metrics.candidates_registered.inc();

        op.advance(Stage::Done);
        Ok(candidate)
    }

    pub async fn cast_vote(
        &self,
        candidate_id: &CandidateId,
        session: &Session,
    ) -> Result<VoteReceipt, CoordinatorError> {
        let started = Instant::now();
        let mut op = Traversal::start("cast_vote");
        let account = self.require(&op, session)?;
        op.advance(Stage::Authenticated);

        let known = self
            .registry
            .exists(candidate_id)
            .await
            .map_err(|e| op.fail(e.into()))?;
        if !known {
            self.metrics.unknown_candidate_votes.inc();
            return Err(op.fail(CoordinatorError::UnknownCandidate(candidate_id.clone())));
        }
        op.advance(Stage::CandidateValidated);

        let submitted = self.ledger.submit(&account, candidate_id).await;
        let receipt = self.settle(&mut op, submitted).await?;
        self.metrics
            .vote_latency_ms
            .observe(started.elapsed().as_secs_f64() * 1_000.0);
        Ok(receipt)
    }

    /// Retry a vote whose outcome was unknown. The ledger is re-read for the
    /// account first; an earlier attempt that landed is returned as success.
    pub async fn retry_vote(
        &self,
        pending: &PendingVote,
        session: &Session,
    ) -> Result<VoteReceipt, CoordinatorError> {
        let mut op = Traversal::start("retry_vote");
        let account = self.require(&op, session)?;
        if account != pending.account {
            return Err(op.fail(CoordinatorError::ForeignSubmission));
        }
        op.advance(Stage::Authenticated);

        let known = self
            .registry
            .exists(&pending.candidate_id)
            .await
            .map_err(|e| op.fail(self.with_pending(e.into(), pending)))?;
        if !known {
            self.metrics.unknown_candidate_votes.inc();
            return Err(op.fail(CoordinatorError::UnknownCandidate(
                pending.candidate_id.clone(),
            )));
        }
        op.advance(Stage::CandidateValidated);

        let resumed = self.ledger.resume(pending).await;
        self.settle(&mut op, resumed).await
    }

    /// Current counts for every registered candidate; those without votes
    /// report zero.
    pub async fn get_results(&self) -> Result<Tally, CoordinatorError> {
        let op = Traversal::start("get_results");
        let mut tally = match self.tally.tally_all().await {
            Ok(tally) => tally,
            Err(e) => {
                self.metrics.read_model_failures.inc();
                return Err(op.fail(e.into()));
            }
        };
        self.metrics
            .tally_refreshes
            .set(self.tally.refresh_count() as i64);

        let candidates = match self.registry.list().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "candidate list unavailable, zero-filling from snapshot");
                self.registry.snapshot()
            }
        };
        tally.ensure_listed(candidates.iter().map(|c| &c.id));
        debug!(op = op.op, stage = ?Stage::Done, candidates = tally.len(), "results ready");
        Ok(tally)
    }

    /// One candidate's count.
    pub async fn tally_for(&self, candidate_id: &CandidateId) -> Result<u64, CoordinatorError> {
        Ok(self.tally.tally_for(candidate_id).await?)
    }

    /// Registered candidates in registration order.
    pub async fn candidates(&self) -> Result<Vec<Candidate>, CoordinatorError> {
        Ok(self.registry.list().await?)
    }

    /// Counts read straight from the ledger, zero-filled for registered
    /// candidates. Same shape as the read-model service.
    pub async fn ledger_tally(&self) -> Result<Tally, CoordinatorError> {
        let mut tally = self.ledger.tally().await?;
        let candidates = self.registry.list().await?;
        tally.ensure_listed(candidates.iter().map(|c| &c.id));
        Ok(tally)
    }

    fn require(&self, op: &Traversal, session: &Session) -> Result<Account, CoordinatorError> {
        self.gate.require_session(session).map_err(|e| {
            self.metrics.auth_failures.inc();
            op.fail(e.into())
        })
    }

    /// Finish a vote traversal from the ledger's answer.
    async fn settle(
        &self,
        op: &mut Traversal,
        submitted: Result<VoteReceipt, ballot_ledger::LedgerError>,
    ) -> Result<VoteReceipt, CoordinatorError> {
        let receipt = match submitted {
            Ok(receipt) => receipt,
            Err(e) => {
                let e = CoordinatorError::from(e);
                match &e {
                    CoordinatorError::DuplicateVote { .. } => self.metrics.duplicate_votes.inc(),
                    CoordinatorError::UnknownCandidate(_) => {
                        self.metrics.unknown_candidate_votes.inc()
                    }
                    CoordinatorError::LedgerUnavailable { .. } => {
                        self.metrics.ledger_unavailable.inc()
                    }
                    _ => {}
                }
                return Err(op.fail(e));
            }
        };
        op.advance(Stage::Committed);
        self.metrics.votes_cast.inc();
        if receipt.replayed {
            self.metrics.votes_replayed.inc();
        }

        self.tally
            .invalidate(Scope::Candidate(receipt.vote.candidate_id.clone()))
            .await;
        op.advance(Stage::TallyInvalidated);

        op.advance(Stage::Done);
        Ok(receipt)
    }

    /// Keep the caller's pending vote on a retryable failure before the
    /// ledger was reached, so it can be retried as-is.
    fn with_pending(&self, e: CoordinatorError, pending: &PendingVote) -> CoordinatorError {
        match e {
            CoordinatorError::LedgerUnavailable { reason, .. } => {
                CoordinatorError::LedgerUnavailable {
                    reason,
                    pending: Some(pending.clone()),
                }
            }
            other => other,
        }
    }
}
