//! Command-line interface and config layering.

use std::path::PathBuf;

use anyhow::Context;
use ballot_coordinator::CoordinatorConfig;
use ballot_utils::LogFormat;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "ballot", about = "Election vote coordinator")]
pub struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "BALLOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory for the LMDB ledger.
    #[arg(long, env = "BALLOT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, env = "BALLOT_RPC_PORT")]
    pub rpc_port: Option<u16>,

    /// Base URL of the read-model service (tallies come from the ledger
    /// when unset).
    #[arg(long, env = "BALLOT_READ_MODEL_URL")]
    pub read_model_url: Option<String>,

    #[arg(long, env = "BALLOT_LEDGER_TIMEOUT_MS")]
    pub ledger_timeout_ms: Option<u64>,

    #[arg(long, env = "BALLOT_SESSION_TTL_SECS")]
    pub session_ttl_secs: Option<u64>,

    #[arg(long, env = "BALLOT_TALLY_TTL_SECS")]
    pub tally_ttl_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[arg(long, env = "BALLOT_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "BALLOT_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API until SIGINT/SIGTERM.
    Serve,

    /// Register a candidate.
    Register {
        #[command(flatten)]
        login: Login,
        name: String,
    },

    /// Cast a vote.
    Vote {
        #[command(flatten)]
        login: Login,
        candidate_id: String,
    },

    /// Print current results as JSON.
    Results,

    /// Print an argon2 hash for a `[[users]]` config entry.
    HashPassword { password: String },
}

#[derive(clap::Args, Debug)]
pub struct Login {
    #[arg(long, env = "BALLOT_USER")]
    pub user: String,

    #[arg(long, env = "BALLOT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

impl Cli {
    /// File settings (or defaults), overridden by any flag or env var given.
    pub fn resolve_config(&self) -> anyhow::Result<CoordinatorConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let path = path.to_str().context("config path is not valid UTF-8")?;
                CoordinatorConfig::from_toml_file(path)
                    .with_context(|| format!("failed to load config from {path}"))?
            }
            None => CoordinatorConfig::default(),
        };

        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(port) = self.rpc_port {
            config.rpc_port = port;
        }
        if let Some(url) = &self.read_model_url {
            config.read_model_url = Some(url.clone());
        }
        if let Some(ms) = self.ledger_timeout_ms {
            config.ledger_timeout_ms = ms;
        }
        if let Some(secs) = self.session_ttl_secs {
            config.session_ttl_secs = secs;
        }
        if let Some(secs) = self.tally_ttl_secs {
            config.tally_ttl_secs = secs;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }
}
