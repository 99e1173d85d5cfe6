//! Request handlers and their payloads.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use ballot_auth::{AuthenticationError, Credentials};
use ballot_coordinator::{CoordinatorError, VoteCoordinator};
use ballot_ledger::PendingVote;
use ballot_types::{
    Account, Candidate, CandidateId, Session, SessionToken, Tally, Timestamp, VoteReceipt,
};
use serde::{Deserialize, Serialize};

use crate::RpcError;

pub type AppState = Arc<VoteCoordinator>;

// ── Session ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub account: Account,
    pub expires_at: Timestamp,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub logged_out: bool,
}

// ── Candidates ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterCandidateRequest {
    pub name: String,
}

// ── Votes ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub candidate_id: String,
}

/// Resolve the bearer token to the live session it names. Unknown and
/// expired tokens are both an expired session.
fn bearer_session(headers: &HeaderMap, coordinator: &VoteCoordinator) -> Result<Session, RpcError> {
    let raw = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(RpcError::Unauthorized)?;
    coordinator
        .session(&SessionToken::new(raw))
        .ok_or_else(|| CoordinatorError::from(AuthenticationError::expired()).into())
}

/// `POST /login`
pub async fn login(
    State(coordinator): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<LoginResponse>, RpcError> {
    let session = coordinator.authenticate(&credentials).await?;
    Ok(Json(LoginResponse {
        token: session.token.as_str().to_string(),
        account: session.account,
        expires_at: session.expires_at,
    }))
}

/// `POST /logout`
pub async fn logout(
    State(coordinator): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, RpcError> {
    let session = bearer_session(&headers, &coordinator)?;
    Ok(Json(LogoutResponse {
        logged_out: coordinator.logout(&session.token),
    }))
}

/// `POST /candidates`
pub async fn register_candidate(
    State(coordinator): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<RegisterCandidateRequest>,
) -> Result<(StatusCode, Json<Candidate>), RpcError> {
    let session = bearer_session(&headers, &coordinator)?;
    let candidate = coordinator.register_candidate(&req.name, &session).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

/// `GET /candidates`
pub async fn list_candidates(
    State(coordinator): State<AppState>,
) -> Result<Json<Vec<Candidate>>, RpcError> {
    Ok(Json(coordinator.candidates().await?))
}

/// `POST /votes`
pub async fn cast_vote(
    State(coordinator): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CastVoteRequest>,
) -> Result<Json<VoteReceipt>, RpcError> {
    let session = bearer_session(&headers, &coordinator)?;
    let candidate_id =
        CandidateId::new(req.candidate_id).map_err(|e| RpcError::InvalidRequest(e.to_string()))?;
    Ok(Json(coordinator.cast_vote(&candidate_id, &session).await?))
}

/// `POST /votes/retry` with the `pending` object from a 503 response.
pub async fn retry_vote(
    State(coordinator): State<AppState>,
    headers: HeaderMap,
    Json(pending): Json<PendingVote>,
) -> Result<Json<VoteReceipt>, RpcError> {
    let session = bearer_session(&headers, &coordinator)?;
    Ok(Json(coordinator.retry_vote(&pending, &session).await?))
}

/// `GET /results`
pub async fn results(State(coordinator): State<AppState>) -> Result<Json<Tally>, RpcError> {
    Ok(Json(coordinator.get_results().await?))
}

/// `GET /votes`
pub async fn ledger_votes(State(coordinator): State<AppState>) -> Result<Json<Tally>, RpcError> {
    Ok(Json(coordinator.ledger_tally().await?))
}

/// `GET /metrics`
pub async fn metrics(State(coordinator): State<AppState>) -> Result<impl IntoResponse, RpcError> {
    let text = coordinator
        .metrics()
        .encode()
        .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok(([(CONTENT_TYPE, "text/plain; version=0.0.4")], text))
}
