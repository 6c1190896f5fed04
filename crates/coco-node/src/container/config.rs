//! # Node Configuration
//!
//! `config.toml` under the node home, with `COCO_*` environment overrides.
//!
//! ```toml
//! [chain]
//! chain_id = "coco-devnet"
//! app_name = "CoCo"
//! inv_check_period = 1
//! halt_height = 0
//!
//! [upgrade]
//! skip_heights = [120, 480]
//!
//! [driver]
//! block_interval_ms = 1000
//! max_blocks = 0
//!
//! [logging]
//! level = "info"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Directory under `$HOME` used when no `--home` is given.
pub const DEFAULT_HOME_DIR: &str = ".cocod";

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub chain: ChainConfig,
    pub upgrade: UpgradeConfig,
    pub driver: DriverConfig,
    pub logging: LoggingConfig,
}

/// Chain-level settings passed to the application at assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: String,
    pub app_name: String,
    /// Assert crisis invariants every N blocks (0 disables).
    pub inv_check_period: u64,
    /// Stop producing blocks after this height (0 disables).
    pub halt_height: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: "coco-devnet".to_string(),
            app_name: "CoCo".to_string(),
            inv_check_period: 1,
            halt_height: 0,
        }
    }
}

/// Heights at which a scheduled upgrade is skipped instead of halting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpgradeConfig {
    pub skip_heights: Vec<u64>,
}

/// Local block loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub block_interval_ms: u64,
    /// Stop after this many blocks (0 runs until interrupted).
    pub max_blocks: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            block_interval_ms: 1000,
            max_blocks: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {message}")]
    Io {
        /// File that failed
        path: String,
        /// I/O error message
        message: String,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Load from a TOML file. Missing sections and fields take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::Io {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
        }
        fs::write(path, content).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Apply `COCO_*` environment overrides.
    ///
    /// # Errors
    ///
    /// `Invalid` when a numeric override does not parse.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(chain_id) = lookup("COCO_CHAIN_ID") {
            self.chain.chain_id = chain_id;
        }
        override_u64(&lookup, "COCO_INV_CHECK_PERIOD", &mut self.chain.inv_check_period)?;
        override_u64(&lookup, "COCO_HALT_HEIGHT", &mut self.chain.halt_height)?;
        override_u64(&lookup, "COCO_BLOCK_INTERVAL_MS", &mut self.driver.block_interval_ms)?;
        override_u64(&lookup, "COCO_MAX_BLOCKS", &mut self.driver.max_blocks)?;
        if let Some(level) = lookup("COCO_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(raw) = lookup("COCO_SKIP_UPGRADE_HEIGHTS") {
            self.upgrade.skip_heights = parse_heights(&raw).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "COCO_SKIP_UPGRADE_HEIGHTS must be comma separated heights, got {raw:?}"
                ))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.chain_id.trim().is_empty() {
            return Err(ConfigError::Invalid("chain.chain_id must not be empty".into()));
        }
        if self.chain.app_name.trim().is_empty() {
            return Err(ConfigError::Invalid("chain.app_name must not be empty".into()));
        }
        if self.driver.block_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "driver.block_interval_ms must be positive".into(),
            ));
        }
        if self.upgrade.skip_heights.contains(&0) {
            return Err(ConfigError::Invalid(
                "upgrade.skip_heights must not contain 0".into(),
            ));
        }
        Ok(())
    }
}

/// `$HOME/.cocod`, or `./.cocod` when `HOME` is unset.
pub fn default_home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_HOME_DIR)
}

pub fn config_path(home: &Path) -> PathBuf {
    home.join("config").join("config.toml")
}

pub fn genesis_path(home: &Path) -> PathBuf {
    home.join("config").join("genesis.json")
}

/// Load the config under `home`, falling back to defaults when absent.
pub fn load_config(home: &Path) -> Result<NodeConfig, ConfigError> {
    let path = config_path(home);
    let mut config = if path.exists() {
        info!("Loading config from {}", path.display());
        NodeConfig::load(&path)?
    } else {
        warn!("No config at {}, using defaults", path.display());
        NodeConfig::default()
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

/// Log filter to install before the config is loaded: `COCO_LOG_LEVEL`,
/// else the level in `config.toml`, else `info`.
///
/// Never fails; a broken file is reported later by `load_config`.
pub fn startup_log_level(home: &Path) -> String {
    std::env::var("COCO_LOG_LEVEL")
        .ok()
        .or_else(|| {
            NodeConfig::load(&config_path(home))
                .ok()
                .map(|config| config.logging.level)
        })
        .unwrap_or_else(|| LoggingConfig::default().level)
}

fn override_u64<F>(lookup: &F, key: &str, target: &mut u64) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *target = raw.trim().parse().map_err(|_| {
            ConfigError::Invalid(format!("{key} must be an unsigned integer, got {raw:?}"))
        })?;
    }
    Ok(())
}

fn parse_heights(raw: &str) -> Option<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_takes_defaults() {
        let config = NodeConfig::parse(
            r#"
            [chain]
            chain_id = "coco-1"

            [upgrade]
            skip_heights = [10, 20]
            "#,
        )
        .unwrap();

        assert_eq!(config.chain.chain_id, "coco-1");
        assert_eq!(config.chain.inv_check_period, 1);
        assert_eq!(config.upgrade.skip_heights, vec![10, 20]);
        assert_eq!(config.driver, DriverConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("COCO_CHAIN_ID", "coco-test"),
            ("COCO_INV_CHECK_PERIOD", "5"),
            ("COCO_MAX_BLOCKS", "12"),
            ("COCO_SKIP_UPGRADE_HEIGHTS", "7, 9"),
        ]
        .into_iter()
        .collect();

        let mut config = NodeConfig::default();
        config
            .apply_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.chain.chain_id, "coco-test");
        assert_eq!(config.chain.inv_check_period, 5);
        assert_eq!(config.driver.max_blocks, 12);
        assert_eq!(config.upgrade.skip_heights, vec![7, 9]);
    }

    #[test]
    fn test_unparseable_override_rejected() {
        let mut config = NodeConfig::default();
        let err = config
            .apply_overrides(|k| (k == "COCO_MAX_BLOCKS").then(|| "not-a-number".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref msg) if msg.contains("COCO_MAX_BLOCKS")));
        assert_eq!(config.driver.max_blocks, 0);

        let err = config
            .apply_overrides(|k| (k == "COCO_SKIP_UPGRADE_HEIGHTS").then(|| "7,x".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(config.upgrade.skip_heights.is_empty());
    }

    #[test]
    fn test_startup_log_level_reads_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NodeConfig::default();
        config.logging.level = "debug".to_string();
        config.save(&config_path(dir.path())).unwrap();

        if std::env::var("COCO_LOG_LEVEL").is_err() {
            assert_eq!(startup_log_level(dir.path()), "debug");
            assert_eq!(startup_log_level(&dir.path().join("missing")), "info");
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = NodeConfig::default();
        assert!(config.validate().is_ok());

        config.driver.block_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = NodeConfig::default();
        config.chain.chain_id = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(dir.path());

        let mut config = NodeConfig::default();
        config.chain.halt_height = 42;
        config.save(&path).unwrap();

        assert_eq!(NodeConfig::load(&path).unwrap(), config);
    }
}
