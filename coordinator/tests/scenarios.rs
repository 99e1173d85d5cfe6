//! End-to-end coordinator behaviour over nullable collaborators.

use std::sync::Arc;
use std::time::Duration;

use ballot_auth::{AuthFailure, Credentials};
use ballot_coordinator::{CoordinatorConfig, CoordinatorError, VoteCoordinator};
use ballot_ledger::PendingVote;
use ballot_nullables::{NullClock, NullIdentityProvider, NullLedger, NullReadModel};
use ballot_read_model::ReadModel;
use ballot_store::LedgerBackend;
use ballot_store_lmdb::LmdbLedger;
use ballot_types::{Account, CandidateId, Session, Tally};

struct Harness {
    coordinator: Arc<VoteCoordinator>,
    backend: NullLedger,
    read_model: NullReadModel,
    clock: Arc<NullClock>,
}

fn config() -> CoordinatorConfig {
    CoordinatorConfig {
        ledger_timeout_ms: 200,
        session_ttl_secs: 60,
        tally_ttl_secs: 30,
        identity_timeout_ms: 200,
        ..CoordinatorConfig::default()
    }
}

fn identity() -> NullIdentityProvider {
    ["admin", "acct1", "acct2", "acct3", "acct4"]
        .iter()
        .fold(NullIdentityProvider::new(), |p, u| p.with_user(u, "pw"))
}

fn harness() -> Harness {
    let backend = NullLedger::new();
    let read_model = NullReadModel::mirroring(backend.clone());
    let clock = Arc::new(NullClock::new(1_000));
    let coordinator = VoteCoordinator::from_config(
        &config(),
        Arc::new(backend.clone()),
        Some(Arc::new(read_model.clone()) as Arc<dyn ReadModel>),
        Arc::new(identity()),
        clock.clone(),
    );
    Harness {
        coordinator: Arc::new(coordinator),
        backend,
        read_model,
        clock,
    }
}

async fn login(h: &Harness, user: &str) -> Session {
    h.coordinator
        .authenticate(&Credentials::new(user, "pw"))
        .await
        .unwrap()
}

fn id(s: &str) -> CandidateId {
    CandidateId::new(s).unwrap()
}

fn acct(s: &str) -> Account {
    Account::new(s).unwrap()
}

async fn register_alice_and_bob(h: &Harness) {
    let admin = login(h, "admin").await;
    let alice = h.coordinator.register_candidate("Alice", &admin).await.unwrap();
    let bob = h.coordinator.register_candidate("Bob", &admin).await.unwrap();
    assert_eq!(alice.id, id("c1"));
    assert_eq!(bob.id, id("c2"));
}

#[tokio::test]
async fn scenario_a_second_vote_is_duplicate() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s1 = login(&h, "acct1").await;

    let receipt = h.coordinator.cast_vote(&id("c1"), &s1).await.unwrap();
    assert!(!receipt.replayed);
    assert_eq!(receipt.vote.account, acct("acct1"));

    let err = h.coordinator.cast_vote(&id("c2"), &s1).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::DuplicateVote { .. }));
    assert!(!err.is_retryable());
    assert_eq!(h.backend.votes_by(&acct("acct1")), 1);
    assert_eq!(h.coordinator.metrics().duplicate_votes.get(), 1);
}

#[tokio::test]
async fn scenario_b_unknown_candidate_writes_nothing() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s2 = login(&h, "acct2").await;
    let sends = h.backend.send_count();

    let err = h.coordinator.cast_vote(&id("c99"), &s2).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::UnknownCandidate(ref c) if *c == id("c99")));
    assert_eq!(h.backend.send_count(), sends);
    assert_eq!(h.backend.votes_by(&acct("acct2")), 0);
}

#[tokio::test]
async fn scenario_c_concurrent_votes_one_succeeds() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s3 = login(&h, "acct3").await;
    h.backend.set_send_delay(Some(Duration::from_millis(10)));

    let a = {
        let (c, s) = (h.coordinator.clone(), s3.clone());
        tokio::spawn(async move { c.cast_vote(&id("c1"), &s).await })
    };
    let b = {
        let (c, s) = (h.coordinator.clone(), s3.clone());
        tokio::spawn(async move { c.cast_vote(&id("c1"), &s).await })
    };
    let results = [a.await.unwrap(), b.await.unwrap()];

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let dup = results
        .iter()
        .filter(|r| matches!(r, Err(CoordinatorError::DuplicateVote { .. })))
        .count();
    assert_eq!((ok, dup), (1, 1));
    assert_eq!(h.backend.votes_by(&acct("acct3")), 1);
}

#[tokio::test]
async fn scenario_d_results_before_any_vote() {
    let h = harness();
    let empty = h.coordinator.get_results().await.unwrap();
    assert!(empty.is_empty());

    register_alice_and_bob(&h).await;
    h.clock.advance(30);
    let results = h.coordinator.get_results().await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.get(&id("c1")), 0);
    assert_eq!(results.get(&id("c2")), 0);
}

#[tokio::test]
async fn scenario_e_expired_session_touches_nothing() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s1 = login(&h, "acct1").await;
    h.clock.advance(61);

    let calls = h.backend.call_count();
    let sends = h.backend.send_count();
    let err = h.coordinator.cast_vote(&id("c1"), &s1).await.unwrap_err();
    match err {
        CoordinatorError::Authentication(e) => assert_eq!(e.reason, AuthFailure::Expired),
        other => panic!("expected expired session, got {other:?}"),
    }
    assert_eq!(h.backend.call_count(), calls);
    assert_eq!(h.backend.send_count(), sends);
}

#[tokio::test]
async fn logged_out_session_is_rejected() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s1 = login(&h, "acct1").await;
    assert!(h.coordinator.logout(&s1.token));
    let err = h.coordinator.cast_vote(&id("c1"), &s1).await.unwrap_err();
    assert_eq!(err.kind(), "session_expired");
}

#[tokio::test]
async fn bad_credentials_are_not_retryable() {
    let h = harness();
    let err = h
        .coordinator
        .authenticate(&Credentials::new("acct1", "wrong"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_credentials");
    assert!(!err.is_retryable());
    assert_eq!(h.coordinator.metrics().auth_failures.get(), 1);
}

#[tokio::test]
async fn registration_validates_names() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let admin = login(&h, "admin").await;
    let dup = h.coordinator.register_candidate("Alice", &admin).await.unwrap_err();
    assert_eq!(dup.kind(), "duplicate_name");
    let empty = h.coordinator.register_candidate("", &admin).await.unwrap_err();
    assert_eq!(empty.kind(), "empty_name");
    assert_eq!(h.coordinator.candidates().await.unwrap().len(), 2);
}

// ── Properties ─────────────────────────────────────────────────────────

#[tokio::test]
async fn p1_many_racing_votes_commit_once() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s = login(&h, "acct4").await;
    h.backend.set_send_delay(Some(Duration::from_millis(5)));

    let mut handles = Vec::new();
    for i in 0..10 {
        let (c, s) = (h.coordinator.clone(), s.clone());
        let target = if i % 2 == 0 { id("c1") } else { id("c2") };
        handles.push(tokio::spawn(async move { c.cast_vote(&target, &s).await }));
    }
    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }
    assert_eq!(ok, 1);
    assert_eq!(h.backend.votes_by(&acct("acct4")), 1);
}

#[tokio::test]
async fn p2_committed_votes_reference_registered_candidates() {
    let h = harness();
    register_alice_and_bob(&h).await;
    for (user, target) in [("acct1", "c1"), ("acct2", "c7"), ("acct3", "c2")] {
        let s = login(&h, user).await;
        let _ = h.coordinator.cast_vote(&id(target), &s).await;
    }
    let registered: Vec<_> = h
        .coordinator
        .candidates()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    let votes = h.backend.votes();
    assert_eq!(votes.len(), 2);
    assert!(votes.iter().all(|r| registered.contains(&r.vote.candidate_id)));
}

#[tokio::test]
async fn p3_retry_after_lost_receipt_is_replay() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s1 = login(&h, "acct1").await;

    h.backend.lose_next_receipts(1);
    let err = h.coordinator.cast_vote(&id("c1"), &s1).await.unwrap_err();
    assert!(err.is_retryable());
    let pending = err.pending().cloned().expect("pending vote");

    let receipt = h.coordinator.retry_vote(&pending, &s1).await.unwrap();
    assert!(receipt.replayed);
    assert_eq!(h.backend.votes_by(&acct("acct1")), 1);
    assert_eq!(h.coordinator.metrics().votes_replayed.get(), 1);

    // A retry that never reached the ledger commits on the second attempt.
    let s2 = login(&h, "acct2").await;
    h.backend.fail_next_sends(1);
    let err = h.coordinator.cast_vote(&id("c2"), &s2).await.unwrap_err();
    let pending = err.pending().cloned().expect("pending vote");
    let receipt = h.coordinator.retry_vote(&pending, &s2).await.unwrap();
    assert!(!receipt.replayed);
    assert_eq!(h.backend.votes_by(&acct("acct2")), 1);
}

#[tokio::test]
async fn p3_retry_after_timeout_never_double_counts() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s1 = login(&h, "acct1").await;

    // Slower than the 200ms ledger timeout.
    h.backend.set_send_delay(Some(Duration::from_millis(400)));
    let err = h.coordinator.cast_vote(&id("c1"), &s1).await.unwrap_err();
    assert_eq!(err.kind(), "ledger_unavailable");
    let pending = err.pending().cloned().expect("pending vote");
    h.backend.set_send_delay(None);

    let receipt = h.coordinator.retry_vote(&pending, &s1).await.unwrap();
    assert_eq!(receipt.vote.submission_id, pending.submission_id);
    assert_eq!(h.backend.votes_by(&acct("acct1")), 1);

    // Retrying again only replays.
    let again = h.coordinator.retry_vote(&pending, &s1).await.unwrap();
    assert!(again.replayed);
    assert_eq!(h.backend.votes_by(&acct("acct1")), 1);
}

#[tokio::test]
async fn reused_submission_id_for_other_candidate_is_duplicate() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s1 = login(&h, "acct1").await;

    let first = h.coordinator.cast_vote(&id("c1"), &s1).await.unwrap();
    let forged = PendingVote {
        account: acct("acct1"),
        candidate_id: id("c2"),
        submission_id: first.vote.submission_id.clone(),
    };
    let err = h.coordinator.retry_vote(&forged, &s1).await.unwrap_err();
    match &err {
        CoordinatorError::DuplicateVote { existing, .. } => {
            assert_eq!(existing.vote.candidate_id, id("c1"));
        }
        other => panic!("expected DuplicateVote, got {other:?}"),
    }
    assert!(!err.is_retryable());
    assert_eq!(h.backend.votes_by(&acct("acct1")), 1);
    assert_eq!(h.coordinator.metrics().votes_replayed.get(), 0);
}

#[tokio::test]
async fn retry_of_another_accounts_vote_is_refused() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s1 = login(&h, "acct1").await;
    let s2 = login(&h, "acct2").await;

    h.backend.fail_next_sends(1);
    let err = h.coordinator.cast_vote(&id("c1"), &s1).await.unwrap_err();
    let pending = err.pending().cloned().expect("pending vote");
    let err = h.coordinator.retry_vote(&pending, &s2).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::ForeignSubmission));
    assert_eq!(h.backend.send_count(), 3);
}

#[tokio::test]
async fn p4_confirmed_vote_visible_despite_lagging_read_model() {
    let h = harness();
    register_alice_and_bob(&h).await;
    assert_eq!(h.coordinator.get_results().await.unwrap().total(), 0);

    h.read_model.freeze(Tally::new());
    let s1 = login(&h, "acct1").await;
    h.coordinator.cast_vote(&id("c1"), &s1).await.unwrap();

    let results = h.coordinator.get_results().await.unwrap();
    assert_eq!(results.get(&id("c1")), 1);
    assert_eq!(results.get(&id("c2")), 0);
}

#[tokio::test]
async fn results_fall_back_to_ledger_when_read_model_down() {
    let h = harness();
    register_alice_and_bob(&h).await;
    let s1 = login(&h, "acct1").await;
    h.coordinator.cast_vote(&id("c2"), &s1).await.unwrap();

    h.read_model.set_failing(true);
    let results = h.coordinator.get_results().await.unwrap();
    assert_eq!(results.get(&id("c2")), 1);

    // Both down: the read-model error surfaces.
    h.clock.advance(30);
    h.backend.fail_next_calls(1);
    let err = h.coordinator.get_results().await.unwrap_err();
    assert!(matches!(err, CoordinatorError::ReadModel(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn ledger_only_results_report_ledger_outage() {
    let backend = NullLedger::new();
    let coordinator = VoteCoordinator::from_config(
        &config(),
        Arc::new(backend.clone()),
        None,
        Arc::new(identity()),
        Arc::new(NullClock::new(1_000)),
    );
    let admin = coordinator
        .authenticate(&Credentials::new("admin", "pw"))
        .await
        .unwrap();
    let alice = coordinator.register_candidate("Alice", &admin).await.unwrap();

    // No read model is configured, so the ledger is the only tally source.
    backend.fail_next_calls(1);
    let err = coordinator.get_results().await.unwrap_err();
    assert_eq!(err.kind(), "ledger_unavailable");
    assert!(err.is_retryable());

    let results = coordinator.get_results().await.unwrap();
    assert_eq!(results.get(&alice.id), 0);
}

#[tokio::test]
async fn p5_candidate_ids_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(NullClock::new(1_000));

    let open = |clock: Arc<NullClock>| -> VoteCoordinator {
        let ledger = LmdbLedger::open(dir.path(), clock.clone()).unwrap();
        VoteCoordinator::from_config(
            &config(),
            Arc::new(ledger) as Arc<dyn LedgerBackend>,
            None,
            Arc::new(identity()),
            clock,
        )
    };

    {
        let coordinator = open(clock.clone());
        let admin = coordinator
            .authenticate(&Credentials::new("admin", "pw"))
            .await
            .unwrap();
        coordinator.register_candidate("Alice", &admin).await.unwrap();
        coordinator.register_candidate("Bob", &admin).await.unwrap();
    }

    let coordinator = open(clock);
    let admin = coordinator
        .authenticate(&Credentials::new("admin", "pw"))
        .await
        .unwrap();
    let carol = coordinator.register_candidate("Carol", &admin).await.unwrap();
    assert_eq!(carol.id, id("c3"));
    let ids: Vec<_> = coordinator
        .candidates()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(ids, vec![id("c1"), id("c2"), id("c3")]);
}
