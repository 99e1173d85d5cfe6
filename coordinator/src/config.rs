//! Coordinator configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use ballot_auth::{GateConfig, UserEntry};
use ballot_ledger::LedgerConfig;
use ballot_tally::TallyConfig;
use ballot_utils::LogFormat;

use crate::CoordinatorError;

/// Configuration for a ballot coordinator.
///
/// Can be loaded from a TOML file via [`CoordinatorConfig::from_toml_file`]
/// or built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Upper bound on every ledger backend round trip, in milliseconds.
    #[serde(default = "default_ledger_timeout_ms")]
    pub ledger_timeout_ms: u64,

    /// Session lifetime after a successful login.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Freshness bound of the tally cache.
    #[serde(default = "default_tally_ttl_secs")]
    pub tally_ttl_secs: u64,

    /// Upper bound on identity provider verification, in milliseconds.
    #[serde(default = "default_identity_timeout_ms")]
    pub identity_timeout_ms: u64,

    /// Base URL of the read-model service. Tallies come from the ledger
    /// when unset.
    #[serde(default)]
    pub read_model_url: Option<String>,

    #[serde(default = "default_read_model_timeout_ms")]
    pub read_model_timeout_ms: u64,

    /// Data directory for the LMDB ledger.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Accounts accepted by the password identity provider.
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_ledger_timeout_ms() -> u64 {
    5_000
}

fn default_session_ttl_secs() -> u64 {
    3_600
}

fn default_tally_ttl_secs() -> u64 {
    30
}

fn default_identity_timeout_ms() -> u64 {
    5_000
}

fn default_read_model_timeout_ms() -> u64 {
    10_000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ballot_data")
}

fn default_rpc_port() -> u16 {
    7090
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl CoordinatorConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, CoordinatorError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| CoordinatorError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CoordinatorError> {
        toml::from_str(s).map_err(|e| CoordinatorError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("CoordinatorConfig is always serializable to TOML")
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            timeout: Duration::from_millis(self.ledger_timeout_ms),
        }
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            session_ttl_secs: self.session_ttl_secs,
            verify_timeout: Duration::from_millis(self.identity_timeout_ms),
        }
    }

    pub fn tally_config(&self) -> TallyConfig {
        TallyConfig {
            ttl_secs: self.tally_ttl_secs,
        }
    }

    pub fn read_model_timeout(&self) -> Duration {
        Duration::from_millis(self.read_model_timeout_ms)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ledger_timeout_ms: default_ledger_timeout_ms(),
            session_ttl_secs: default_session_ttl_secs(),
            tally_ttl_secs: default_tally_ttl_secs(),
            identity_timeout_ms: default_identity_timeout_ms(),
            read_model_url: None,
            read_model_timeout_ms: default_read_model_timeout_ms(),
            data_dir: default_data_dir(),
            rpc_port: default_rpc_port(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            users: Vec::new(),
        }
    }
}
