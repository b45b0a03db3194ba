//! Configuration for anvild. Layered the way `DaemonConfig::load` does:
//! built-in defaults, then an optional file, then `ANVIL_`-prefixed
//! environment variables, each layer overriding the last.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub policy: PolicyConfig,

    #[serde(default)]
    pub privacy: PrivacyConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            scheduler: SchedulerConfig::default(),
            policy: PolicyConfig::default(),
            privacy: PrivacyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,

    #[serde(default = "default_true")]
    pub enable_cors: bool,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8070".parse().unwrap(),
            enable_cors: true,
            request_timeout_secs: 30,
        }
    }
}

/// Cadence for the background sweeps. Spec §4.7 targets a 5-minute
/// reclaim cadence; retention and agreement batch recompute run less
/// often since they scan the full label table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_reclaim_interval")]
    pub reclaim_interval_secs: u64,

    #[serde(default = "default_retention_interval")]
    pub retention_interval_secs: u64,

    #[serde(default = "default_agreement_interval")]
    pub agreement_interval_secs: u64,

    #[serde(default = "default_reclaim_batch_size")]
    pub reclaim_batch_size: usize,

    #[serde(default = "default_low_score_threshold")]
    pub agreement_low_score_threshold: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reclaim_interval_secs: default_reclaim_interval(),
            retention_interval_secs: default_retention_interval(),
            agreement_interval_secs: default_agreement_interval(),
            reclaim_batch_size: default_reclaim_batch_size(),
            agreement_low_score_threshold: default_low_score_threshold(),
        }
    }
}

/// Default selection/requeue policy applied uniformly across queues by
/// the reference daemon. A real deployment would look this up per queue;
/// kept as one global policy here since the thin harness has no
/// queue-policy registry of its own (see DESIGN.md).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_max_requeue_attempts")]
    pub max_requeue_attempts: u32,

    #[serde(default = "default_requeue_delay_secs")]
    pub requeue_delay_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_requeue_attempts: default_max_requeue_attempts(),
            requeue_delay_secs: default_requeue_delay_secs(),
        }
    }
}

/// Pseudonym/redaction secret source. Rotating `hmac_secret` is an
/// explicit operator action per spec §4.10 and is never done implicitly
/// by this daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    #[serde(default = "default_hmac_secret")]
    pub hmac_secret: String,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            hmac_secret: default_hmac_secret(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_reclaim_interval() -> u64 {
    300
}

fn default_retention_interval() -> u64 {
    3600
}

fn default_agreement_interval() -> u64 {
    900
}

fn default_reclaim_batch_size() -> usize {
    100
}

fn default_low_score_threshold() -> f64 {
    0.4
}

fn default_max_requeue_attempts() -> u32 {
    3
}

fn default_requeue_delay_secs() -> u64 {
    60
}

fn default_hmac_secret() -> String {
    "anvil-development-secret-change-me".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Loads defaults, an optional config file, then `ANVIL_`-prefixed
    /// environment variables (e.g. `ANVIL_SERVER_LISTEN_ADDR`), the last
    /// layer winning. Mirrors `DaemonConfig::load`'s
    /// `config::Config::builder()` layering.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("ANVIL")
                .separator("_")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
