//! Explorer configuration
//!
//! Loaded from an optional YAML file, then overridden from the environment
//! with priority ENV > file > default.

use std::path::Path;

use attr_link::Target;
use common::{get_bool_config, get_config_value};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ExplorerError, Result};
use crate::pacing::{Pacer, DEFAULT_ITEM_DELAY_MS};
use crate::rolling_log::DEFAULT_HISTORY_CAPACITY;
use crate::snapshot::CompareMode;

pub const ENV_ENDPOINT: &str = "ATTRSCOPE_ENDPOINT";
pub const ENV_RAW_HEX: &str = "ATTRSCOPE_RAW_HEX";
pub const ENV_ITEM_DELAY_MS: &str = "ATTRSCOPE_ITEM_DELAY_MS";
pub const ENV_HISTORY_CAPACITY: &str = "ATTRSCOPE_HISTORY_CAPACITY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Target namespace (cluster) name
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Vendor (manufacturer) code qualifying the namespace
    #[serde(default = "default_vendor_qualifier")]
    pub vendor_qualifier: u16,
    /// Endpoint selected at startup
    #[serde(default = "default_endpoint")]
    pub endpoint: u8,
    #[serde(default)]
    pub raw_hex: bool,
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Delay between batch items (default: 50ms)
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
    #[serde(default)]
    pub compare_mode: CompareMode,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions for serde
fn default_namespace() -> String {
    "manuSpecificExplorer".to_string()
}
fn default_vendor_qualifier() -> u16 {
    0x115F
}
fn default_endpoint() -> u8 {
    1
}
fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}
fn default_item_delay_ms() -> u64 {
    DEFAULT_ITEM_DELAY_MS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            vendor_qualifier: default_vendor_qualifier(),
            endpoint: default_endpoint(),
            raw_hex: false,
            history_capacity: default_history_capacity(),
            item_delay_ms: default_item_delay_ms(),
            compare_mode: CompareMode::default(),
            log_level: default_log_level(),
        }
    }
}

impl ExplorerConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| ExplorerError::config(format!("Invalid YAML: {e}")))
    }

    /// Load file (if any), apply environment overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ExplorerError::config(format!("Cannot read {}: {}", path.display(), e))
                })?;
                debug!("Loaded explorer config from {}", path.display());
                Self::from_yaml_str(&text)?
            },
            None => Self::default(),
        };

        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.endpoint = get_config_value(Some(self.endpoint), ENV_ENDPOINT, default_endpoint());
        self.raw_hex = get_bool_config(Some(self.raw_hex), ENV_RAW_HEX, false);
        self.item_delay_ms = get_config_value(
            Some(self.item_delay_ms),
            ENV_ITEM_DELAY_MS,
            default_item_delay_ms(),
        );
        self.history_capacity = get_config_value(
            Some(self.history_capacity),
            ENV_HISTORY_CAPACITY,
            default_history_capacity(),
        );
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(ExplorerError::config("namespace must not be empty"));
        }
        if self.history_capacity == 0 {
            return Err(ExplorerError::config("history_capacity must be at least 1"));
        }
        Ok(())
    }

    pub fn target(&self) -> Target {
        Target {
            namespace: self.namespace.clone(),
            vendor_qualifier: self.vendor_qualifier,
        }
    }

    pub fn pacer(&self) -> Pacer {
        Pacer::from_millis(self.item_delay_ms)
    }
}
