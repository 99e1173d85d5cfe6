//! Axum-based RPC server.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use ballot_coordinator::{ShutdownController, VoteCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::handlers::{self, AppState};
use crate::RpcError;

/// Build the API router over a shared coordinator.
pub fn router(coordinator: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/login", post(handlers::login))
        .route("/logout", post(handlers::logout))
        .route(
            "/candidates",
            get(handlers::list_candidates).post(handlers::register_candidate),
        )
        .route(
            "/votes",
            get(handlers::ledger_votes).post(handlers::cast_vote),
        )
        .route("/votes/retry", post(handlers::retry_vote))
        .route("/results", get(handlers::results))
        .route("/metrics", get(handlers::metrics))
        .layer(cors)
        .with_state(coordinator)
}

pub struct RpcServer {
    pub port: u16,
    coordinator: Arc<VoteCoordinator>,
}

impl RpcServer {
    pub fn new(port: u16, coordinator: Arc<VoteCoordinator>) -> Self {
        Self { port, coordinator }
    }

    /// Serve until `shutdown` fires.
    pub async fn start(&self, shutdown: ShutdownController) -> Result<(), RpcError> {
        let app = router(self.coordinator.clone());
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| RpcError::Server(format!("failed to bind {addr}: {e}")))?;
        info!("RPC server listening on {}", addr);
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.stopped().await })
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        info!("RPC server stopped");
        Ok(())
    }
}
