//! Ballot daemon — entry point for serving and driving a vote coordinator.

mod cli;

use std::sync::Arc;

use anyhow::Context;
use ballot_auth::{hash_password, Credentials, PasswordIdentityProvider};
use ballot_coordinator::{CoordinatorConfig, ShutdownController, VoteCoordinator};
use ballot_read_model::{HttpReadModel, ReadModel};
use ballot_rpc::RpcServer;
use ballot_store::LedgerBackend;
use ballot_store_lmdb::LmdbLedger;
use ballot_types::{CandidateId, SystemClock};
use ballot_utils::format_duration;
use clap::Parser;

use crate::cli::{Cli, Command, Login};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::HashPassword { password } = &cli.command {
        let hash = hash_password(password)?;
        println!("{hash}");
        return Ok(());
    }

    let config = cli.resolve_config()?;
    ballot_utils::init_logging(config.log_format, &config.log_level);
    let coordinator = Arc::new(build_coordinator(&config)?);

    match cli.command {
        Command::Serve => serve(&config, coordinator).await?,
        Command::Register { login, name } => {
            let session = coordinator.authenticate(&credentials(&login)).await?;
            let candidate = coordinator.register_candidate(&name, &session).await?;
            println!("{}", serde_json::to_string_pretty(&candidate)?);
        }
        Command::Vote {
            login,
            candidate_id,
        } => {
            let candidate_id = CandidateId::new(candidate_id)?;
            let session = coordinator.authenticate(&credentials(&login)).await?;
            let receipt = match coordinator.cast_vote(&candidate_id, &session).await {
                Ok(receipt) => receipt,
                // The outcome is unknown: resolve it once against the ledger.
                Err(e) => {
                    let Some(pending) = e.pending().cloned() else {
                        return Err(e.into());
                    };
                    tracing::warn!(error = %e, "vote outcome unknown, retrying once");
                    coordinator.retry_vote(&pending, &session).await?
                }
            };
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
        Command::Results => {
            let results = coordinator.get_results().await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        // Handled before the config is loaded.
        Command::HashPassword { .. } => {}
    }

    Ok(())
}

fn credentials(login: &Login) -> Credentials {
    Credentials::new(login.user.clone(), login.password.clone())
}

fn build_coordinator(config: &CoordinatorConfig) -> anyhow::Result<VoteCoordinator> {
    let clock = Arc::new(SystemClock);
    let ledger = LmdbLedger::open(&config.data_dir, clock.clone()).with_context(|| {
        format!("failed to open ledger at {}", config.data_dir.display())
    })?;
    let backend: Arc<dyn LedgerBackend> = Arc::new(ledger);

    let read_model = match &config.read_model_url {
        Some(url) => {
            let client = HttpReadModel::with_timeout(url.clone(), config.read_model_timeout())
                .context("failed to build read-model client")?;
            tracing::info!(url = %url, "using read-model service for tallies");
            Some(Arc::new(client) as Arc<dyn ReadModel>)
        }
        None => {
            tracing::info!("no read-model service configured, tallies come from the ledger");
            None
        }
    };

    if config.users.is_empty() {
        tracing::warn!("no users configured, every login will be rejected");
    }
    let identity = Arc::new(PasswordIdentityProvider::new(config.users.clone()));

    Ok(VoteCoordinator::from_config(
        config, backend, read_model, identity, clock,
    ))
}

async fn serve(config: &CoordinatorConfig, coordinator: Arc<VoteCoordinator>) -> anyhow::Result<()> {
    tracing::info!(
        "Starting ballot coordinator (RPC:{}, data:{})",
        config.rpc_port,
        config.data_dir.display()
    );
    tracing::info!(
        "sessions last {}, tally cache refreshes after {}",
        format_duration(config.session_ttl_secs),
        format_duration(config.tally_ttl_secs)
    );

    let shutdown = ShutdownController::new();
    let server = RpcServer::new(config.rpc_port, coordinator);
    let mut serving = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { server.start(shutdown).await })
    };

    tokio::select! {
        _ = shutdown.wait_for_signal() => {}
        // The server stopped on its own, e.g. it could not bind.
        result = &mut serving => {
            result
                .context("RPC server task panicked")?
                .context("RPC server failed")?;
            return Ok(());
        }
    }

    serving
        .await
        .context("RPC server task panicked")?
        .context("RPC server failed")?;
    tracing::info!("ballot daemon exited cleanly");
    Ok(())
}
