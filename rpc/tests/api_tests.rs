//! HTTP API behaviour, driven through the router without a socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ballot_coordinator::{CoordinatorConfig, VoteCoordinator};
use ballot_nullables::{NullClock, NullIdentityProvider, NullLedger, NullReadModel};
use ballot_read_model::ReadModel;
use ballot_rpc::router;
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApi {
    app: Router,
    backend: NullLedger,
    clock: Arc<NullClock>,
}

fn api() -> TestApi {
    let backend = NullLedger::new();
    let clock = Arc::new(NullClock::new(1_000));
    let identity = NullIdentityProvider::new()
        .with_user("admin", "pw")
        .with_user("alice", "pw")
        .with_user("bob", "pw");
    let coordinator = VoteCoordinator::from_config(
        &CoordinatorConfig {
            session_ttl_secs: 60,
            ..CoordinatorConfig::default()
        },
        Arc::new(backend.clone()),
        Some(Arc::new(NullReadModel::mirroring(backend.clone())) as Arc<dyn ReadModel>),
        Arc::new(identity),
        clock.clone(),
    );
    TestApi {
        app: router(Arc::new(coordinator)),
        backend,
        clock,
    }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn login(app: &Router, user: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/login",
        None,
        Some(json!({"identifier": user, "secret": "pw"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

async fn seed(app: &Router) {
    let admin = login(app, "admin").await;
    for name in ["Alice", "Bob"] {
        let (status, _) = send(
            app,
            "POST",
            "/candidates",
            Some(&admin),
            Some(json!({"name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn login_rejects_bad_password() {
    let t = api();
    let (status, body) = send(
        &t.app,
        "POST",
        "/login",
        None,
        Some(json!({"identifier": "alice", "secret": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_credentials");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn register_and_list_candidates() {
    let t = api();
    seed(&t.app).await;
    let (status, body) = send(&t.app, "GET", "/candidates", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"id": "c1", "name": "Alice"}, {"id": "c2", "name": "Bob"}]));

    let admin = login(&t.app, "admin").await;
    let (status, body) = send(
        &t.app,
        "POST",
        "/candidates",
        Some(&admin),
        Some(json!({"name": "Alice"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_name");
}

#[tokio::test]
async fn vote_then_duplicate() {
    let t = api();
    seed(&t.app).await;
    let alice = login(&t.app, "alice").await;

    let (status, body) = send(
        &t.app,
        "POST",
        "/votes",
        Some(&alice),
        Some(json!({"candidate_id": "c1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vote"]["candidate_id"], "c1");
    assert_eq!(body["replayed"], false);

    let (status, body) = send(
        &t.app,
        "POST",
        "/votes",
        Some(&alice),
        Some(json!({"candidate_id": "c2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "duplicate_vote");

    let (status, body) = send(&t.app, "GET", "/results", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"c1": 1, "c2": 0}));

    let (_, body) = send(&t.app, "GET", "/votes", None, None).await;
    assert_eq!(body, json!({"c1": 1, "c2": 0}));
}

#[tokio::test]
async fn unknown_candidate_is_not_found() {
    let t = api();
    seed(&t.app).await;
    let bob = login(&t.app, "bob").await;
    let (status, body) = send(
        &t.app,
        "POST",
        "/votes",
        Some(&bob),
        Some(json!({"candidate_id": "c99"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "unknown_candidate");
}

#[tokio::test]
async fn missing_or_stale_token_is_unauthorized() {
    let t = api();
    seed(&t.app).await;
    let (status, body) = send(
        &t.app,
        "POST",
        "/votes",
        None,
        Some(json!({"candidate_id": "c1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let alice = login(&t.app, "alice").await;
    t.clock.advance(61);
    let (status, body) = send(
        &t.app,
        "POST",
        "/votes",
        Some(&alice),
        Some(json!({"candidate_id": "c1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "session_expired");
}

#[tokio::test]
async fn logout_ends_session() {
    let t = api();
    let alice = login(&t.app, "alice").await;
    let (status, body) = send(&t.app, "POST", "/logout", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["logged_out"], true);
    let (status, _) = send(&t.app, "POST", "/logout", Some(&alice), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unavailable_ledger_returns_pending_for_retry() {
    let t = api();
    seed(&t.app).await;
    let alice = login(&t.app, "alice").await;

    t.backend.lose_next_receipts(1);
    let (status, body) = send(
        &t.app,
        "POST",
        "/votes",
        Some(&alice),
        Some(json!({"candidate_id": "c2"})),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "ledger_unavailable");
    assert_eq!(body["retryable"], true);
    let pending = body["pending"].clone();
    assert_eq!(pending["candidate_id"], "c2");

    let (status, body) = send(&t.app, "POST", "/votes/retry", Some(&alice), Some(pending)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["replayed"], true);
}

#[tokio::test]
async fn metrics_are_exposed() {
    let t = api();
    seed(&t.app).await;
    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("ballot_candidates_registered_total 2"));
}
