// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cluster boundary used by the dynamic loader.

use std::fmt;
use std::sync::Arc;

use crate::error::WeaveResult;
use crate::registry::{InstallOutcome, Role, TypeId, TypeRegistry};

/// Cluster member identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Which round of the reload protocol a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Sent to the leader alone, which assigns the new Type ID.
    Leader,
    /// Fanned out to every node with the Type ID the leader bound; the
    /// leader skips it.
    Followers(TypeId),
}

/// Remote task carrying one type definition.
#[derive(Debug, Clone)]
pub struct LoadDefinition {
    pub name: String,
    pub blob: Arc<[u8]>,
    pub phase: LoadPhase,
}

/// What one node did with a [`LoadDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Installed(InstallOutcome),
    /// Follower round reaching the leader, which already reloaded.
    SkippedLeader,
}

impl LoadDefinition {
    pub fn new(name: impl Into<String>, blob: Arc<[u8]>) -> Self {
        Self {
            name: name.into(),
            blob,
            phase: LoadPhase::Leader,
        }
    }

    /// The same definition, addressed to the follower round for the Type ID
    /// the leader assigned.
    pub fn for_followers(&self, type_id: TypeId) -> Self {
        Self {
            phase: LoadPhase::Followers(type_id),
            ..self.clone()
        }
    }

    /// Run the task on the node `self_id`.
    pub fn compute2(&self, registry: &TypeRegistry, self_id: NodeId, leader: NodeId) -> WeaveResult<LoadOutcome> {
        let role = match self.phase {
            LoadPhase::Leader => Role::Leader,
            LoadPhase::Followers(_) if self_id == leader => {
                log::debug!("[Loader] {} is the leader, skipping {}", self_id, self.name);
                return Ok(LoadOutcome::SkippedLeader);
            }
            LoadPhase::Followers(type_id) => Role::Follower(type_id),
        };
        registry
            .install_definition(&self.name, self.blob.clone(), role)
            .map(LoadOutcome::Installed)
    }
}

/// Membership and task delivery.
pub trait Cluster: Send + Sync {
    fn self_node(&self) -> NodeId;

    fn leader(&self) -> NodeId;

    /// Run `task` on the leader and block until it answers.
    fn send_to_leader(&self, task: LoadDefinition) -> WeaveResult<LoadOutcome>;

    /// Run `task` on every node, the leader included, and wait for all.
    fn fan_out(&self, task: LoadDefinition) -> Vec<(NodeId, WeaveResult<LoadOutcome>)>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WeaverConfig;
    use crate::model::TypeDefBuilder;

    fn blob() -> Arc<[u8]> {
        let def = TypeDefBuilder::new("Gauge").extends("Iced").build();
        Arc::from(def.to_blob().unwrap())
    }

    #[test]
    fn test_follower_round_skips_leader() {
        let reg = TypeRegistry::standalone(WeaverConfig::default()).unwrap();
        let task = LoadDefinition::new("Gauge", blob()).for_followers(TypeId(1));
        let outcome = task.compute2(&reg, NodeId(0), NodeId(0)).unwrap();
        assert_eq!(outcome, LoadOutcome::SkippedLeader);
        assert!(reg.definition("Gauge").is_none());
    }

    #[test]
    fn test_leader_round_installs() {
        let reg = TypeRegistry::standalone(WeaverConfig::default()).unwrap();
        let task = LoadDefinition::new("Gauge", blob());
        let LoadOutcome::Installed(outcome) = task.compute2(&reg, NodeId(0), NodeId(0)).unwrap() else {
            panic!("leader round must install");
        };
        assert!(!outcome.replaced);
        assert_eq!(reg.type_id("Gauge").unwrap(), outcome.type_id);
    }

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(3).to_string(), "node-3");
    }
}
