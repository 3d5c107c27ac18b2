//! Configuration for the quota ledger

use crate::types::{AccountId, Height, PoolId};
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Initial admin identity
    pub admin: AccountId,

    /// Initial oracle identity
    pub oracle: Option<AccountId>,

    /// Validation parameters
    pub ledger: LedgerParams,

    /// Actor host configuration
    pub actor: ActorConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "quota-ledger".to_string(),
            admin: AccountId::new("ledger-admin"),
            oracle: None,
            ledger: LedgerParams::default(),
            actor: ActorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Validation parameters fixed for the lifetime of a ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerParams {
    /// Maximum cumulative issuance per pool
    pub pool_cap: u64,

    /// Lowest accepted expiration height at mint
    pub min_expiration: Height,

    /// Longest accepted pool name, in characters
    pub max_pool_id_len: usize,
}

impl Default for LedgerParams {
    fn default() -> Self {
        Self {
            pool_cap: 1_000_000_000,
            min_expiration: 2025,
            max_pool_id_len: PoolId::MAX_LEN,
        }
    }
}

/// Actor host configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Bounded mailbox size (backpressure)
    pub mailbox_capacity: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(admin) = std::env::var("QUOTA_LEDGER_ADMIN") {
            config.admin = AccountId::new(admin);
        }

        if let Ok(oracle) = std::env::var("QUOTA_LEDGER_ORACLE") {
            config.oracle = Some(AccountId::new(oracle));
        }

        if let Ok(cap) = std::env::var("QUOTA_LEDGER_POOL_CAP") {
            config.ledger.pool_cap = parse_var("QUOTA_LEDGER_POOL_CAP", &cap)?;
        }

        if let Ok(capacity) = std::env::var("QUOTA_LEDGER_MAILBOX_CAPACITY") {
            config.actor.mailbox_capacity = parse_var("QUOTA_LEDGER_MAILBOX_CAPACITY", &capacity)?;
        }

        if let Ok(level) = std::env::var("QUOTA_LEDGER_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(json) = std::env::var("QUOTA_LEDGER_LOG_JSON") {
            config.logging.json = parse_var("QUOTA_LEDGER_LOG_JSON", &json)?;
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, value: &str) -> crate::Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| crate::Error::Config(format!("Invalid {}={:?}: {}", name, value, e)))
}
