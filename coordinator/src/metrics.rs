//! Prometheus metrics for the vote coordinator.
//!
//! [`CoordinatorMetrics`] owns a dedicated [`Registry`] that the RPC
//! `/metrics` endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge,
    Opts, Registry, TextEncoder,
};

pub struct CoordinatorMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Votes committed by this coordinator, including confirmed replays.
    pub votes_cast: IntCounter,
    /// Retries that found their earlier submission already committed.
    pub votes_replayed: IntCounter,
    pub duplicate_votes: IntCounter,
    pub unknown_candidate_votes: IntCounter,
    /// Submissions whose outcome could not be determined.
    pub ledger_unavailable: IntCounter,
    pub candidates_registered: IntCounter,
    pub auth_failures: IntCounter,
    pub read_model_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub active_sessions: IntGauge,
    /// Completed tally cache refreshes.
    pub tally_refreshes: IntGauge,

    // ── Histograms ──────────────────────────────────────────────────────
    /// End-to-end `cast_vote` latency, in milliseconds.
    pub vote_latency_ms: Histogram,
}

impl CoordinatorMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let votes_cast = register_int_counter_with_registry!(
            Opts::new("ballot_votes_cast_total", "Votes committed to the ledger"),
            registry
        )
        .expect("failed to register votes_cast counter");

        let votes_replayed = register_int_counter_with_registry!(
            Opts::new(
                "ballot_votes_replayed_total",
                "Retried submissions found already committed"
            ),
            registry
        )
        .expect("failed to register votes_replayed counter");

        let duplicate_votes = register_int_counter_with_registry!(
            Opts::new(
                "ballot_duplicate_votes_total",
                "Votes rejected because the account already voted"
            ),
            registry
        )
        .expect("failed to register duplicate_votes counter");

        let unknown_candidate_votes = register_int_counter_with_registry!(
            Opts::new(
                "ballot_unknown_candidate_votes_total",
                "Votes rejected for an unregistered candidate"
            ),
            registry
        )
        .expect("failed to register unknown_candidate_votes counter");

        let ledger_unavailable = register_int_counter_with_registry!(
            Opts::new(
                "ballot_ledger_unavailable_total",
                "Ledger operations that timed out or hit an outage"
            ),
            registry
        )
        .expect("failed to register ledger_unavailable counter");

        let candidates_registered = register_int_counter_with_registry!(
            Opts::new(
                "ballot_candidates_registered_total",
                "Candidates registered through this coordinator"
            ),
            registry
        )
        .expect("failed to register candidates_registered counter");

        let auth_failures = register_int_counter_with_registry!(
            Opts::new(
                "ballot_auth_failures_total",
                "Failed logins and rejected sessions"
            ),
            registry
        )
        .expect("failed to register auth_failures counter");

        let read_model_failures = register_int_counter_with_registry!(
            Opts::new(
                "ballot_read_model_failures_total",
                "Result reads that failed on both read model and ledger"
            ),
            registry
        )
        .expect("failed to register read_model_failures counter");

        let active_sessions = register_int_gauge_with_registry!(
            Opts::new("ballot_active_sessions", "Sessions currently held"),
            registry
        )
        .expect("failed to register active_sessions gauge");

        let tally_refreshes = register_int_gauge_with_registry!(
            Opts::new(
                "ballot_tally_refreshes",
                "Completed tally cache refreshes"
            ),
            registry
        )
        .expect("failed to register tally_refreshes gauge");

        // 1 ms → ~16 s.
        let vote_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new("ballot_vote_latency_ms", "cast_vote latency in milliseconds")
                .buckets(prometheus::exponential_buckets(1.0, 2.0, 15).unwrap()),
            registry
        )
        .expect("failed to register vote_latency_ms histogram");

        Self {
            registry,
            votes_cast,
            votes_replayed,
            duplicate_votes,
            unknown_candidate_votes,
            ledger_unavailable,
            candidates_registered,
            auth_failures,
            read_model_failures,
            active_sessions,
            tally_refreshes,
            vote_latency_ms,
        }
    }

    /// Encode every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl Default for CoordinatorMetrics {
    fn default() -> Self {
        Self::new()
    }
}
