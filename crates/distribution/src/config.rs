//! Engine parameters and genesis configuration

use crate::constants::{
    DEFAULT_TOKENS_PER_BENEFICIARY, MAX_BATCH_SIZE, MAX_PER_BENEFICIARY, MIN_ROUND_INTERVAL,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use stipend_types::{AccountId, Amount, RegionCode, Timestamp};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Fixed limits the engine runs with. Not changeable by governance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Elapsed time required (strictly exceeded) between round advances
    pub min_round_interval: Timestamp,
    /// Ceiling on any single payout
    pub max_per_beneficiary: Amount,
    /// Maximum beneficiaries per batch call
    pub max_batch_size: usize,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            min_round_interval: MIN_ROUND_INTERVAL,
            max_per_beneficiary: MAX_PER_BENEFICIARY,
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl EngineParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_round_interval == 0 {
            return Err(ConfigError::Invalid(
                "min_round_interval must be greater than zero".to_string(),
            ));
        }
        if self.max_per_beneficiary == 0 {
            return Err(ConfigError::Invalid(
                "max_per_beneficiary must be greater than zero".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_tokens_per_beneficiary() -> Amount {
    DEFAULT_TOKENS_PER_BENEFICIARY
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Initial ledger configuration, usually read from a TOML file:
///
/// ```toml
/// admin = "s0000…"
/// tokens_per_beneficiary = 250
/// allowed_regions = ["A", "B"]
/// log_level = "debug"
///
/// [regional_caps]
/// A = 600
///
/// [params]
/// min_round_interval = 86400
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub admin: AccountId,
    #[serde(default = "default_tokens_per_beneficiary")]
    pub tokens_per_beneficiary: Amount,
    #[serde(default)]
    pub allowed_regions: Vec<RegionCode>,
    #[serde(default)]
    pub regional_caps: BTreeMap<RegionCode, Amount>,
    #[serde(default)]
    pub params: EngineParams,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl GenesisConfig {
    pub fn new(admin: AccountId) -> Self {
        Self {
            admin,
            tokens_per_beneficiary: DEFAULT_TOKENS_PER_BENEFICIARY,
            allowed_regions: Vec::new(),
            regional_caps: BTreeMap::new(),
            params: EngineParams::default(),
            log_level: default_log_level(),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: GenesisConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load from a TOML file, apply environment overrides and validate.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading genesis configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `STIPEND_TOKENS_PER_BENEFICIARY` and `STIPEND_LOG_LEVEL`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("STIPEND_TOKENS_PER_BENEFICIARY") {
            match val.parse::<Amount>() {
                Ok(amount) => self.tokens_per_beneficiary = amount,
                Err(_) => warn!("Ignoring invalid STIPEND_TOKENS_PER_BENEFICIARY: {}", val),
            }
        }
        if let Ok(val) = std::env::var("STIPEND_LOG_LEVEL") {
            self.log_level = val;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()?;
        if self.admin.is_zero() {
            return Err(ConfigError::Invalid("admin must not be the zero account".to_string()));
        }
        if self.tokens_per_beneficiary == 0 {
            return Err(ConfigError::Invalid(
                "tokens_per_beneficiary must be greater than zero".to_string(),
            ));
        }
        if self.tokens_per_beneficiary > self.params.max_per_beneficiary {
            return Err(ConfigError::Invalid(format!(
                "tokens_per_beneficiary {} exceeds max_per_beneficiary {}",
                self.tokens_per_beneficiary, self.params.max_per_beneficiary
            )));
        }
        Ok(())
    }
}
