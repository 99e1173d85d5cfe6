//! Candidate registry.
//!
//! Keeps a local snapshot of the backend's candidate list so existence
//! checks on the vote path rarely cost a round trip. The snapshot only ever
//! grows: candidates are never removed from the ledger.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use ballot_store::{CommitEffect, LedgerBackend, LedgerCommand, LedgerReads, Rejection, StoreError};
use ballot_types::{Account, Candidate, CandidateId};
use tracing::{debug, info, warn};

use crate::{LedgerConfig, LedgerError, ValidationError};

pub struct CandidateRegistry {
    backend: Arc<dyn LedgerBackend>,
    config: LedgerConfig,
    known: RwLock<Vec<Candidate>>,
}

impl CandidateRegistry {
    pub fn new(backend: Arc<dyn LedgerBackend>, config: LedgerConfig) -> Self {
        Self {
            backend,
            config,
            known: RwLock::new(Vec::new()),
        }
    }

    /// Register a new candidate, submitted on behalf of `from`.
    ///
    /// Names are compared exactly. If the write's outcome is lost (timeout
    /// or outage) the backend is read again and a candidate that did land
    /// under this name is returned as success.
    pub async fn register(&self, name: &str, from: &Account) -> Result<Candidate, LedgerError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let current = self.list().await?;
        if current.iter().any(|c| c.name == name) {
            return Err(ValidationError::DuplicateName(name.to_string()).into());
        }

        let command = LedgerCommand::RegisterCandidate {
            name: name.to_string(),
        };
        let sent = self
            .config
            .bounded("registerCandidate", self.backend.send(command, from))
            .await;

        match sent {
            Ok(committed) => match committed.effect {
                CommitEffect::CandidateRegistered(candidate) => {
                    info!(
                        id = %candidate.id,
                        name = %candidate.name,
                        commit = %committed.receipt.commit_id,
                        "candidate registered"
                    );
                    self.remember(&candidate);
                    Ok(candidate)
                }
                other => Err(LedgerError::Backend(StoreError::UnexpectedValue {
                    query: "registerCandidate",
                    detail: format!("{other:?}"),
                })),
            },
            Err(StoreError::Rejected(Rejection::DuplicateName(name))) => {
                Err(ValidationError::DuplicateName(name).into())
            }
            Err(StoreError::Rejected(Rejection::Malformed(_))) => {
                Err(ValidationError::EmptyName.into())
            }
            Err(StoreError::Unavailable(reason)) => self.reconcile(name, reason).await,
            Err(e) => Err(LedgerError::from_store(e, None)),
        }
    }

    /// Look for `name` after a registration whose outcome is unknown.
    async fn reconcile(&self, name: &str, reason: String) -> Result<Candidate, LedgerError> {
        warn!(name, %reason, "registration outcome unknown, re-reading candidates");
        match self.list().await {
            Ok(list) => match list.into_iter().find(|c| c.name == name) {
                Some(candidate) => {
                    info!(id = %candidate.id, name, "registration confirmed after reconcile");
                    Ok(candidate)
                }
                None => Err(LedgerError::Unavailable {
                    reason,
                    pending: None,
                }),
            },
            Err(e) => {
                debug!(error = %e, "reconcile read failed");
                Err(LedgerError::Unavailable {
                    reason,
                    pending: None,
                })
            }
        }
    }

    /// Whether `id` is registered. Hits the backend only when the snapshot
    /// does not already contain it.
    pub async fn exists(&self, id: &CandidateId) -> Result<bool, LedgerError> {
        if self.read().iter().any(|c| &c.id == id) {
            return Ok(true);
        }
        let list = self.list().await?;
        Ok(list.iter().any(|c| &c.id == id))
    }

    /// All registered candidates in registration order, read from the
    /// backend. Merged into the snapshot by id.
    pub async fn list(&self) -> Result<Vec<Candidate>, LedgerError> {
        let list = self
            .config
            .bounded("candidates", self.backend.candidates())
            .await
            .map_err(|e| LedgerError::from_store(e, None))?;
        self.merge(&list);
        Ok(list)
    }

    /// The last candidate list seen, without a backend round trip.
    pub fn snapshot(&self) -> Vec<Candidate> {
        self.read().clone()
    }

    fn remember(&self, candidate: &Candidate) {
        self.merge(std::slice::from_ref(candidate));
    }

    /// Add unseen candidates, keeping id order. An older list arriving
    /// late never drops entries.
    fn merge(&self, candidates: &[Candidate]) {
        let mut known = self.write();
        let before = known.len();
        for candidate in candidates {
            if !known.iter().any(|c| c.id == candidate.id) {
                known.push(candidate.clone());
            }
        }
        if known.len() != before {
            known.sort_by_key(|c| c.id.sequence());
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Candidate>> {
        self.known.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Candidate>> {
        self.known.write().unwrap_or_else(|e| e.into_inner())
    }
}
