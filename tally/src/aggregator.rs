//! Tally cache with TTL, targeted invalidation and single-flight refresh.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ballot_ledger::VoteLedger;
use ballot_read_model::ReadModel;
use ballot_types::{CandidateId, Clock, Tally, Timestamp};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::TallyError;

const DEFAULT_TTL_SECS: u64 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TallyConfig {
    pub ttl_secs: u64,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            ttl_secs: DEFAULT_TTL_SECS,
        }
    }
}

/// What to drop from the cache after a write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    Candidate(CandidateId),
    All,
}

/// Where the cached counts came from on the last refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TallySource {
    ReadModel,
    Ledger,
}

#[derive(Default)]
struct CacheState {
    tally: Tally,
    fetched_at: Option<Timestamp>,
    source: Option<TallySource>,
    all_dirty: bool,
    dirty: HashSet<CandidateId>,
}

impl CacheState {
    fn is_fresh(&self, ttl_secs: u64, now: Timestamp) -> bool {
        match self.fetched_at {
            Some(at) => !at.has_expired(ttl_secs, now),
            None => false,
        }
    }

    fn is_clean(&self) -> bool {
        !self.all_dirty && self.dirty.is_empty()
    }
}

pub struct TallyAggregator {
    read_model: Option<Arc<dyn ReadModel>>,
    ledger: Arc<VoteLedger>,
    clock: Arc<dyn Clock>,
    config: TallyConfig,
    /// Held across a refresh, so concurrent readers share one fetch.
    cache: Mutex<CacheState>,
    refreshes: AtomicU64,
}

impl TallyAggregator {
    /// Without a read model every refresh reads the ledger.
    pub fn new(
        read_model: Option<Arc<dyn ReadModel>>,
        ledger: Arc<VoteLedger>,
        clock: Arc<dyn Clock>,
        config: TallyConfig,
    ) -> Self {
        Self {
            read_model,
            ledger,
            clock,
            config,
            cache: Mutex::new(CacheState::default()),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Count for one candidate. Unknown candidates count zero.
    pub async fn tally_for(&self, candidate_id: &CandidateId) -> Result<u64, TallyError> {
        let mut cache = self.cache.lock().await;
        let now = self.clock.now();
        let invalidated = cache.all_dirty || cache.dirty.contains(candidate_id);
        if invalidated || !cache.is_fresh(self.config.ttl_secs, now) {
            self.refresh(&mut cache, now).await?;
        } else {
            debug!(candidate = %candidate_id, "tally cache hit");
        }
        Ok(cache.tally.get(candidate_id))
    }

    /// Counts for every candidate the sources know about.
    pub async fn tally_all(&self) -> Result<Tally, TallyError> {
        let mut cache = self.cache.lock().await;
        let now = self.clock.now();
        if !cache.is_clean() || !cache.is_fresh(self.config.ttl_secs, now) {
            self.refresh(&mut cache, now).await?;
        } else {
            debug!("tally cache hit");
        }
        Ok(cache.tally.clone())
    }

    /// Mark counts stale. The next read covering them refreshes.
    pub async fn invalidate(&self, scope: Scope) {
        let mut cache = self.cache.lock().await;
        debug!(?scope, "tally invalidated");
        match scope {
            Scope::Candidate(id) => {
                cache.dirty.insert(id);
            }
            Scope::All => cache.all_dirty = true,
        }
    }

    /// Number of completed refreshes.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Source of the current cached counts, if any refresh has completed.
    pub async fn last_source(&self) -> Option<TallySource> {
        self.cache.lock().await.source
    }

    async fn refresh(&self, cache: &mut CacheState, now: Timestamp) -> Result<(), TallyError> {
        let Some(read_model) = &self.read_model else {
            let tally = self.ledger.tally().await?;
            self.store(cache, tally, TallySource::Ledger, now);
            return Ok(());
        };

        match read_model.fetch_votes().await {
            Ok(mut tally) => {
                let confirmed = self.merge_confirmed(cache, &mut tally).await;
                let still_all_dirty = cache.all_dirty && !confirmed;
                let still_dirty = if confirmed {
                    HashSet::new()
                } else {
                    std::mem::take(&mut cache.dirty)
                };
                self.store(cache, tally, TallySource::ReadModel, now);
                cache.all_dirty = still_all_dirty;
                cache.dirty = still_dirty;
                Ok(())
            }
            Err(rm_err) => {
                warn!(
                    service = read_model.name(),
                    error = %rm_err,
                    "read model unavailable, falling back to ledger tally"
                );
                match self.ledger.tally().await {
                    Ok(tally) => {
                        self.store(cache, tally, TallySource::Ledger, now);
                        Ok(())
                    }
                    Err(ledger_err) => {
                        warn!(error = %ledger_err, "ledger tally fallback failed");
                        Err(rm_err.into())
                    }
                }
            }
        }
    }

    /// Raise read-model counts to the ledger's for invalidated candidates.
    /// Returns false if a ledger read failed; those candidates stay dirty.
    async fn merge_confirmed(&self, cache: &CacheState, tally: &mut Tally) -> bool {
        if cache.all_dirty {
            return match self.ledger.tally().await {
                Ok(confirmed) => {
                    tally.merge_max(&confirmed);
                    true
                }
                Err(e) => {
                    warn!(error = %e, "could not confirm tally against ledger");
                    false
                }
            };
        }

        let mut confirmed = Tally::new();
        for id in &cache.dirty {
            match self.ledger.votes_for(id).await {
                Ok(count) => confirmed.set(id.clone(), count),
                Err(e) => {
                    warn!(candidate = %id, error = %e, "could not confirm count against ledger");
                    return false;
                }
            }
        }
        tally.merge_max(&confirmed);
        true
    }

    fn store(&self, cache: &mut CacheState, tally: Tally, source: TallySource, now: Timestamp) {
        debug!(?source, candidates = tally.len(), total = tally.total(), "tally refreshed");
        cache.tally = tally;
        cache.fetched_at = Some(now);
        cache.source = Some(source);
        cache.all_dirty = false;
        cache.dirty.clear();
        self.refreshes.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_ledger::{CandidateRegistry, LedgerConfig};
    use ballot_nullables::{NullClock, NullLedger, NullReadModel};
    use ballot_types::{Account, Candidate};

    struct Fixture {
        backend: NullLedger,
        ledger: Arc<VoteLedger>,
        clock: Arc<NullClock>,
        alice: Candidate,
        bob: Candidate,
    }

    fn acct(s: &str) -> Account {
        Account::new(s).unwrap()
    }

    async fn fixture() -> Fixture {
        let backend = NullLedger::new();
        let registry = Arc::new(CandidateRegistry::new(
            Arc::new(backend.clone()),
            LedgerConfig::default(),
        ));
        let alice = registry.register("Alice", &acct("admin")).await.unwrap();
        let bob = registry.register("Bob", &acct("admin")).await.unwrap();
        let ledger = Arc::new(VoteLedger::new(
            Arc::new(backend.clone()),
            registry,
            LedgerConfig::default(),
        ));
        Fixture {
            backend,
            ledger,
            clock: Arc::new(NullClock::new(1_000)),
            alice,
            bob,
        }
    }

    fn aggregator(f: &Fixture, rm: Option<NullReadModel>) -> TallyAggregator {
        TallyAggregator::new(
            rm.map(|rm| Arc::new(rm) as Arc<dyn ReadModel>),
            f.ledger.clone(),
            f.clock.clone(),
            TallyConfig { ttl_secs: 30 },
        )
    }

    #[tokio::test]
    async fn serves_from_cache_within_ttl() {
        let f = fixture().await;
        let rm = NullReadModel::mirroring(f.backend.clone());
        let agg = aggregator(&f, Some(rm.clone()));

        f.ledger.submit(&acct("a1"), &f.alice.id).await.unwrap();
        assert_eq!(agg.tally_for(&f.alice.id).await.unwrap(), 1);
        assert_eq!(rm.fetch_count(), 1);

        // A vote from another node, not invalidated here.
        f.ledger.submit(&acct("a2"), &f.alice.id).await.unwrap();
        assert_eq!(agg.tally_for(&f.alice.id).await.unwrap(), 1);
        assert_eq!(rm.fetch_count(), 1);

        f.clock.advance(30);
        assert_eq!(agg.tally_for(&f.alice.id).await.unwrap(), 2);
        assert_eq!(rm.fetch_count(), 2);
        assert_eq!(agg.last_source().await, Some(TallySource::ReadModel));
    }

    #[tokio::test]
    async fn invalidated_candidate_reflects_ledger_despite_lag() {
        let f = fixture().await;
        let rm = NullReadModel::mirroring(f.backend.clone());
        let agg = aggregator(&f, Some(rm.clone()));
        assert_eq!(agg.tally_for(&f.alice.id).await.unwrap(), 0);

        rm.freeze(Tally::new());
        f.ledger.submit(&acct("a1"), &f.alice.id).await.unwrap();
        agg.invalidate(Scope::Candidate(f.alice.id.clone())).await;

        assert_eq!(agg.tally_for(&f.alice.id).await.unwrap(), 1);
        assert_eq!(agg.tally_for(&f.bob.id).await.unwrap(), 0);
        assert_eq!(rm.fetch_count(), 2);
    }

    #[tokio::test]
    async fn invalidate_all_confirms_every_count() {
        let f = fixture().await;
        let rm = NullReadModel::mirroring(f.backend.clone());
        let agg = aggregator(&f, Some(rm.clone()));
        agg.tally_all().await.unwrap();

        rm.freeze(Tally::new());
        f.ledger.submit(&acct("a1"), &f.alice.id).await.unwrap();
        f.ledger.submit(&acct("a2"), &f.bob.id).await.unwrap();
        agg.invalidate(Scope::All).await;

        let tally = agg.tally_all().await.unwrap();
        assert_eq!(tally.get(&f.alice.id), 1);
        assert_eq!(tally.get(&f.bob.id), 1);
    }

    #[tokio::test]
    async fn falls_back_to_ledger_when_read_model_fails() {
        let f = fixture().await;
        let rm = NullReadModel::mirroring(f.backend.clone());
        rm.set_failing(true);
        let agg = aggregator(&f, Some(rm));

        f.ledger.submit(&acct("a1"), &f.bob.id).await.unwrap();
        assert_eq!(agg.tally_for(&f.bob.id).await.unwrap(), 1);
        assert_eq!(agg.last_source().await, Some(TallySource::Ledger));
    }

    #[tokio::test]
    async fn surfaces_read_model_error_when_both_fail() {
        let f = fixture().await;
        let rm = NullReadModel::mirroring(f.backend.clone());
        rm.set_failing(true);
        let agg = aggregator(&f, Some(rm));

        f.backend.fail_next_calls(1);
        let err = agg.tally_all().await.unwrap_err();
        assert!(matches!(err, TallyError::ReadModel(_)));
    }

    #[tokio::test]
    async fn ledger_only_without_read_model() {
        let f = fixture().await;
        let agg = aggregator(&f, None);
        f.ledger.submit(&acct("a1"), &f.alice.id).await.unwrap();
        assert_eq!(agg.tally_for(&f.alice.id).await.unwrap(), 1);
        assert_eq!(agg.last_source().await, Some(TallySource::Ledger));

        f.backend.fail_next_calls(1);
        agg.invalidate(Scope::All).await;
        assert!(matches!(agg.tally_all().await, Err(TallyError::Ledger(_))));
    }

    #[tokio::test]
    async fn failed_confirmation_keeps_candidate_dirty() {
        let f = fixture().await;
        let rm = NullReadModel::fixed(Tally::new());
        let agg = aggregator(&f, Some(rm.clone()));

        f.ledger.submit(&acct("a1"), &f.alice.id).await.unwrap();
        agg.invalidate(Scope::Candidate(f.alice.id.clone())).await;
        f.backend.fail_next_calls(1);
        assert_eq!(agg.tally_for(&f.alice.id).await.unwrap(), 0);

        // Still dirty, so the next read refreshes and confirms.
        assert_eq!(agg.tally_for(&f.alice.id).await.unwrap(), 1);
        assert_eq!(rm.fetch_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_refresh() {
        let f = fixture().await;
        let rm = NullReadModel::mirroring(f.backend.clone());
        let agg = Arc::new(aggregator(&f, Some(rm.clone())));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let agg = agg.clone();
            handles.push(tokio::spawn(async move { agg.tally_all().await }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(rm.fetch_count(), 1);
        assert_eq!(agg.refresh_count(), 1);
    }
}
