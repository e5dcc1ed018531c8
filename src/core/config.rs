//! Project configuration from `.barnacle/config.toml`.
//!
//! A missing file means defaults; a malformed file is a caller-fixable error.

use crate::core::error::BarnacleError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BarnacleConfig {
    #[serde(default)]
    pub verify: VerifyConfig,
    #[serde(default)]
    pub anchor: AnchorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VerifyConfig {
    /// Worker-pool bound for batch verification.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AnchorConfig {
    /// When true, anchoring requests are acknowledged as pending and
    /// completed later by `barnacle anchor sync`.
    #[serde(default)]
    pub deferred: bool,
}

fn default_concurrency() -> usize {
    4
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

/// Load config given either the project root (parent of `.barnacle`) or the
/// store root (`.barnacle/data`).
pub fn load_config(dir: &Path) -> Result<BarnacleConfig, BarnacleError> {
    let candidates = [
        dir.join(".barnacle").join(CONFIG_FILE_NAME),
        dir.parent()
            .map(|p| p.join(CONFIG_FILE_NAME))
            .unwrap_or_else(|| dir.join(CONFIG_FILE_NAME)),
    ];

    for config_path in candidates {
        if config_path.exists() {
            let content = fs::read_to_string(&config_path).map_err(BarnacleError::IoError)?;
            let config: BarnacleConfig = toml::from_str(&content)
                .map_err(|e| BarnacleError::ValidationError(e.to_string()))?;
            return Ok(config);
        }
    }

    // No config = defaults (not an error).
    Ok(BarnacleConfig::default())
}

pub fn default_config_toml() -> String {
    let config = BarnacleConfig::default();
    toml::to_string_pretty(&config).unwrap_or_default()
}
