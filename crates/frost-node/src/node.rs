// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node runtime: an in-process cluster plus the definitions loaded into it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use frost::{LocalCluster, NodeId, ReloadReport, TypeDef, TypeId, TypeRegistry, WeaveError};
use thiserror::Error;

use crate::config::{ConfigError, NodeConfig};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Weave(#[from] WeaveError),

    #[error("Cannot read definition {path}: {source}")]
    Definition {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Reload of {name} failed on {failed} node(s)")]
    Incomplete { name: String, failed: usize },
}

/// One instance in both wire forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcoded {
    pub type_id: TypeId,
    /// Binary form prefixed with the Type ID.
    pub binary: Vec<u8>,
    pub text: String,
}

pub struct NodeRuntime {
    config: NodeConfig,
    cluster: LocalCluster,
}

impl NodeRuntime {
    /// Start the cluster and load the configured definitions.
    pub fn start(config: NodeConfig) -> Result<Self, NodeError> {
        config.validate()?;
        let cluster = LocalCluster::builder(config.nodes)
            .leader(NodeId(config.leader))
            .config(config.weaver.clone())
            .build()?;
        tracing::info!(
            "Cluster {} up: {} nodes, leader {}",
            config.name,
            config.nodes,
            cluster.leader()
        );

        let runtime = Self { config, cluster };
        for path in &runtime.config.definitions {
            runtime.load_file(path)?;
        }
        Ok(runtime)
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn cluster(&self) -> &LocalCluster {
        &self.cluster
    }

    /// Registry of the leader node.
    pub fn registry(&self) -> Result<&Arc<TypeRegistry>, NodeError> {
        let leader = self.cluster.leader();
        self.cluster
            .registry(leader)
            .ok_or_else(|| WeaveError::Cluster(format!("{leader} has no registry")).into())
    }

    /// Load (or reload) the definition stored in `path` on every node.
    pub fn load_file(&self, path: &Path) -> Result<ReloadReport, NodeError> {
        let blob = std::fs::read(path).map_err(|source| NodeError::Definition {
            path: path.to_path_buf(),
            source,
        })?;
        let name = TypeDef::from_blob(&blob)?.name;
        self.load(&name, blob)
    }

    pub fn load(&self, name: &str, blob: Vec<u8>) -> Result<ReloadReport, NodeError> {
        let report = self
            .cluster
            .loader(self.cluster.leader())?
            .load_or_reload(name, blob)?;
        let failed = report.failures().count();
        if failed > 0 {
            for (node, err) in report.failures() {
                tracing::error!("{} rejected {}: {}", node, name, err);
            }
            return Err(NodeError::Incomplete {
                name: name.to_string(),
                failed,
            });
        }
        tracing::info!("Loaded {} as type id {}", name, report.type_id);
        Ok(report)
    }

    /// Generated plan of `name`'s codec.
    pub fn describe(&self, name: &str) -> Result<String, NodeError> {
        Ok(self.registry()?.codec_for(name)?.describe())
    }

    /// Parse a text-form instance of `name` and render it in both forms.
    pub fn transcode(&self, name: &str, text: &str) -> Result<Transcoded, NodeError> {
        let registry = self.registry()?;
        let inst = registry.decode_text(name, text)?;
        Ok(Transcoded {
            type_id: registry.type_id(name)?,
            binary: registry.encode_tagged(&inst)?,
            text: registry.encode_text(&inst)?,
        })
    }
}

impl std::fmt::Debug for NodeRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRuntime")
            .field("name", &self.config.name)
            .field("cluster", &self.cluster)
            .finish()
    }
}

/// Lowercase hex, two digits per byte.
pub fn to_hex(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}
