// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cluster-wide dynamic type loading.
//!
//! A reload runs in two rounds. The leader installs the definition first and
//! binds a fresh Type ID; only after it acknowledges is the definition fanned
//! out to every node, where followers adopt the leader's binding. The caller
//! blocks on both rounds. Follower failures are reported, never rolled back.

mod cluster;
mod local;

use std::sync::Arc;

pub use cluster::{Cluster, LoadDefinition, LoadOutcome, LoadPhase, NodeId};
pub use local::{ClusterHandle, LocalCluster, LocalClusterBuilder};

use crate::error::{WeaveError, WeaveResult};
use crate::model::TypeDef;
use crate::registry::TypeId;

/// Per-node results of one reload.
#[derive(Debug)]
pub struct ReloadReport {
    pub name: String,
    pub leader: NodeId,
    /// Type ID bound by the leader.
    pub type_id: TypeId,
    pub nodes: Vec<(NodeId, WeaveResult<LoadOutcome>)>,
}

impl ReloadReport {
    /// True if every node installed the definition (or was the leader).
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|(_, r)| r.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (NodeId, &WeaveError)> {
        self.nodes
            .iter()
            .filter_map(|(node, r)| r.as_ref().err().map(|e| (*node, e)))
    }
}

pub struct DynamicLoader<C: Cluster> {
    cluster: C,
}

impl<C: Cluster> DynamicLoader<C> {
    pub fn new(cluster: C) -> Self {
        Self { cluster }
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    /// Introduce `name` to the cluster, replacing any prior definition.
    ///
    /// Fails without contacting any node if the blob does not define `name`,
    /// and without contacting the followers if the leader fails.
    pub fn load_or_reload(&self, name: &str, blob: impl Into<Arc<[u8]>>) -> WeaveResult<ReloadReport> {
        let blob = blob.into();
        let def = TypeDef::from_blob(&blob)?;
        if def.name != name {
            return Err(WeaveError::Definition(format!(
                "blob defines `{}`, expected `{name}`",
                def.name
            )));
        }

        let leader = self.cluster.leader();
        let task = LoadDefinition::new(name, blob);
        log::info!(
            "[Loader] {} reloading {} via leader {}",
            self.cluster.self_node(),
            name,
            leader
        );
        let type_id = match self.cluster.send_to_leader(task.clone())? {
            LoadOutcome::Installed(outcome) => outcome.type_id,
            LoadOutcome::SkippedLeader => {
                return Err(WeaveError::Cluster(format!("leader {leader} skipped the leader round")));
            }
        };

        let nodes = self.cluster.fan_out(task.for_followers(type_id));
        let report = ReloadReport {
            name: name.to_string(),
            leader,
            type_id,
            nodes,
        };
        for (node, err) in report.failures() {
            log::warn!("[Loader] {} did not reload {}: {}", node, name, err);
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_path::ICED;
    use crate::model::{ScalarKind, TypeDefBuilder};

    fn blob(def: &TypeDef) -> Vec<u8> {
        def.to_blob().unwrap()
    }

    fn gauge(fields: &[&str]) -> TypeDef {
        fields
            .iter()
            .fold(TypeDefBuilder::new("Gauge").extends(ICED), |b, f| {
                b.scalar_field(*f, ScalarKind::Double)
            })
            .build()
    }

    #[test]
    fn test_reload_reaches_every_node() {
        let cluster = LocalCluster::builder(3).leader(NodeId(1)).build().unwrap();
        let loader = cluster.loader(NodeId(2)).unwrap();

        let report = loader.load_or_reload("Gauge", blob(&gauge(&["value"]))).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.leader, NodeId(1));
        assert_eq!(report.nodes.len(), 3);

        for (node, result) in &report.nodes {
            match result.as_ref().unwrap() {
                LoadOutcome::SkippedLeader => assert_eq!(*node, NodeId(1)),
                LoadOutcome::Installed(outcome) => assert_eq!(outcome.type_id, report.type_id),
            }
            let reg = cluster.registry(*node).unwrap();
            assert_eq!(reg.type_id("Gauge").unwrap(), report.type_id);
        }
    }

    #[test]
    fn test_reload_changes_field_set_everywhere() {
        let cluster = LocalCluster::builder(2).build().unwrap();
        let loader = cluster.loader(NodeId(0)).unwrap();
        let first = loader.load_or_reload("Gauge", blob(&gauge(&["value"]))).unwrap();
        let second = loader
            .load_or_reload("Gauge", blob(&gauge(&["value", "min", "max"])))
            .unwrap();
        assert_ne!(first.type_id, second.type_id);

        for node in cluster.node_ids() {
            let codec = cluster.registry(node).unwrap().codec_for("Gauge").unwrap();
            assert_eq!(codec.type_id(), second.type_id);
            assert_eq!(codec.plan().count(), 3);
        }
    }

    #[test]
    fn test_bad_blob_contacts_no_node() {
        let cluster = LocalCluster::builder(2).build().unwrap();
        let loader = cluster.loader(NodeId(0)).unwrap();
        assert!(matches!(
            loader.load_or_reload("Gauge", b"not json".to_vec()),
            Err(WeaveError::Definition(_))
        ));
        assert!(matches!(
            loader.load_or_reload("Other", blob(&gauge(&[]))),
            Err(WeaveError::Definition(_))
        ));
        assert!(cluster.registry(NodeId(0)).unwrap().definition("Gauge").is_none());
    }

    #[test]
    fn test_leader_failure_stops_followers() {
        let cluster = LocalCluster::builder(2)
            .bootstrap(|node, reg| {
                // Only the follower knows the parent.
                if node == NodeId(1) {
                    reg.define(TypeDefBuilder::new("Base").extends(ICED).build())?;
                }
                Ok(())
            })
            .build()
            .unwrap();
        let loader = cluster.loader(NodeId(1)).unwrap();
        let child = TypeDefBuilder::new("Child").extends("Base").build();

        assert!(loader.load_or_reload("Child", blob(&child)).is_err());
        assert!(cluster.registry(NodeId(1)).unwrap().definition("Child").is_none());
    }

    #[test]
    fn test_follower_failure_is_reported() {
        let cluster = LocalCluster::builder(3)
            .bootstrap(|node, reg| {
                if node != NodeId(2) {
                    reg.define(TypeDefBuilder::new("Base").extends(ICED).build())?;
                }
                Ok(())
            })
            .build()
            .unwrap();
        let loader = cluster.loader(NodeId(0)).unwrap();
        let child = TypeDefBuilder::new("Child").extends("Base").build();

        let report = loader.load_or_reload("Child", blob(&child)).unwrap();
        assert!(!report.is_complete());
        let failed: Vec<_> = report.failures().map(|(node, _)| node).collect();
        assert_eq!(failed, [NodeId(2)]);
        assert!(cluster.registry(NodeId(1)).unwrap().definition("Child").is_some());
    }

    #[test]
    fn test_builder_rejects_bad_leader() {
        assert!(LocalCluster::builder(2).leader(NodeId(2)).build().is_err());
        assert!(LocalCluster::builder(0).build().is_err());
    }
}
