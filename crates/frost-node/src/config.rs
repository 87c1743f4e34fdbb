// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node configuration.
//!
//! Supports both programmatic and file-based configuration.

use frost::WeaverConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Node configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Cluster name (for identification).
    #[serde(default = "default_name")]
    pub name: String,

    /// Number of in-process nodes.
    #[serde(default = "default_nodes")]
    pub nodes: u32,

    /// Index of the leader node.
    #[serde(default)]
    pub leader: u32,

    /// Type definition files (JSON) loaded at startup, in order.
    #[serde(default)]
    pub definitions: Vec<PathBuf>,

    /// Log filter.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Codec weaver settings.
    #[serde(default)]
    pub weaver: WeaverConfig,
}

fn default_name() -> String {
    "frost".to_string()
}

fn default_nodes() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            nodes: default_nodes(),
            leader: 0,
            definitions: Vec::new(),
            log_level: default_log_level(),
            weaver: WeaverConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Relative definition paths are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        if let Some(dir) = path.parent() {
            for def in &mut config.definitions {
                if def.is_relative() {
                    *def = dir.join(&*def);
                }
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes == 0 {
            return Err(ConfigError::Invalid("At least one node is required".into()));
        }
        if self.leader >= self.nodes {
            return Err(ConfigError::Invalid(format!(
                "Leader {} is out of range for {} nodes",
                self.leader, self.nodes
            )));
        }
        self.weaver
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}
