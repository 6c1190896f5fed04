//! # Container
//!
//! Node-level configuration: file layout under the home directory,
//! TOML loading, environment overrides and validation.

pub mod config;

pub use config::{
    config_path, default_home, genesis_path, load_config, startup_log_level, ChainConfig,
    ConfigError, DriverConfig, LoggingConfig, NodeConfig, UpgradeConfig,
};
