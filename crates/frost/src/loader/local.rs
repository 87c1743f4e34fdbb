// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process cluster.
//!
//! Every node owns a [`TypeRegistry`] and a worker thread draining its task
//! channel. All registries share one [`LocalTypeMap`], standing in for the
//! cluster-wide id service. The leader is fixed at build time.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver, Sender};

use super::cluster::{Cluster, LoadDefinition, LoadOutcome, NodeId};
use super::DynamicLoader;
use crate::config::WeaverConfig;
use crate::error::{WeaveError, WeaveResult};
use crate::registry::{LocalTypeMap, TypeIdService, TypeRegistry};

struct Envelope {
    task: LoadDefinition,
    reply: Sender<WeaveResult<LoadOutcome>>,
}

struct NodeLink {
    id: NodeId,
    registry: Arc<TypeRegistry>,
    tx: Option<Sender<Envelope>>,
    handle: Option<JoinHandle<()>>,
}

type Bootstrap = Box<dyn Fn(NodeId, &TypeRegistry) -> WeaveResult<()>>;

pub struct LocalClusterBuilder {
    nodes: u32,
    leader: NodeId,
    config: WeaverConfig,
    bootstrap: Option<Bootstrap>,
}

impl LocalClusterBuilder {
    pub fn leader(mut self, leader: NodeId) -> Self {
        self.leader = leader;
        self
    }

    pub fn config(mut self, config: WeaverConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `f` on every node's registry before its worker starts, e.g. to
    /// define host types and register natives.
    pub fn bootstrap<F>(mut self, f: F) -> Self
    where
        F: Fn(NodeId, &TypeRegistry) -> WeaveResult<()> + 'static,
    {
        self.bootstrap = Some(Box::new(f));
        self
    }

    pub fn build(self) -> WeaveResult<LocalCluster> {
        if self.nodes == 0 {
            return Err(WeaveError::Config("a cluster needs at least one node".to_string()));
        }
        if self.leader.0 >= self.nodes {
            return Err(WeaveError::Config(format!(
                "leader {} is not one of the {} nodes",
                self.leader, self.nodes
            )));
        }
        self.config.validate()?;

        let ids: Arc<dyn TypeIdService> = Arc::new(LocalTypeMap::new(self.config.first_type_id));
        let mut cluster = LocalCluster {
            nodes: Vec::with_capacity(self.nodes as usize),
            leader: self.leader,
        };
        for n in 0..self.nodes {
            let id = NodeId(n);
            let registry = Arc::new(TypeRegistry::new(self.config.clone(), ids.clone())?);
            if let Some(bootstrap) = &self.bootstrap {
                bootstrap(id, registry.as_ref())?;
            }
            // Dropping `cluster` on error joins the workers spawned so far.
            cluster.nodes.push(spawn_node(id, self.leader, registry)?);
        }
        log::info!(
            "[Cluster] started {} nodes, leader {}",
            cluster.nodes.len(),
            cluster.leader
        );
        Ok(cluster)
    }
}

fn spawn_node(id: NodeId, leader: NodeId, registry: Arc<TypeRegistry>) -> WeaveResult<NodeLink> {
    let (tx, rx) = channel::unbounded::<Envelope>();
    let worker_registry = Arc::clone(&registry);
    let handle = std::thread::Builder::new()
        .name(format!("frost-{id}"))
        .spawn(move || run_worker(id, leader, &worker_registry, &rx))
        .map_err(|e| WeaveError::Cluster(format!("cannot spawn worker for {id}: {e}")))?;
    Ok(NodeLink {
        id,
        registry,
        tx: Some(tx),
        handle: Some(handle),
    })
}

fn run_worker(id: NodeId, leader: NodeId, registry: &TypeRegistry, rx: &Receiver<Envelope>) {
    for Envelope { task, reply } in rx.iter() {
        let result = task.compute2(registry, id, leader);
        if let Err(e) = &result {
            log::warn!("[Cluster] {} failed to load {}: {}", id, task.name, e);
        }
        // The requester may have given up; nothing to do then.
        let _ = reply.send(result);
    }
    log::debug!("[Cluster] {} worker stopped", id);
}

/// A fixed set of nodes running in this process.
pub struct LocalCluster {
    nodes: Vec<NodeLink>,
    leader: NodeId,
}

impl LocalCluster {
    pub fn builder(nodes: u32) -> LocalClusterBuilder {
        LocalClusterBuilder {
            nodes,
            leader: NodeId(0),
            config: WeaverConfig::default(),
            bootstrap: None,
        }
    }

    pub fn leader(&self) -> NodeId {
        self.leader
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    pub fn registry(&self, node: NodeId) -> Option<&Arc<TypeRegistry>> {
        self.link(node).map(|n| &n.registry)
    }

    /// View of the cluster from `node`.
    pub fn handle(&self, node: NodeId) -> WeaveResult<ClusterHandle<'_>> {
        self.link(node)
            .map(|_| ClusterHandle {
                cluster: self,
                self_id: node,
            })
            .ok_or_else(|| WeaveError::Cluster(format!("{node} is not a member")))
    }

    /// A loader issuing reloads from `node`.
    pub fn loader(&self, node: NodeId) -> WeaveResult<DynamicLoader<ClusterHandle<'_>>> {
        self.handle(node).map(DynamicLoader::new)
    }

    fn link(&self, node: NodeId) -> Option<&NodeLink> {
        self.nodes.iter().find(|n| n.id == node)
    }

    /// Queue `task` on `node`; the answer arrives on the returned receiver.
    fn submit(&self, node: NodeId, task: LoadDefinition) -> WeaveResult<Receiver<WeaveResult<LoadOutcome>>> {
        let tx = self
            .link(node)
            .and_then(|n| n.tx.as_ref())
            .ok_or_else(|| WeaveError::Cluster(format!("{node} is not running")))?;
        let (reply, answer) = channel::bounded(1);
        tx.send(Envelope { task, reply })
            .map_err(|_| WeaveError::Cluster(format!("{node} stopped accepting tasks")))?;
        Ok(answer)
    }

    fn wait(node: NodeId, answer: &Receiver<WeaveResult<LoadOutcome>>) -> WeaveResult<LoadOutcome> {
        answer
            .recv()
            .map_err(|_| WeaveError::Cluster(format!("{node} dropped the task without answering")))?
    }
}

impl Drop for LocalCluster {
    fn drop(&mut self) {
        // Closing the channels ends the worker loops.
        for node in &mut self.nodes {
            node.tx.take();
        }
        for node in &mut self.nodes {
            if let Some(handle) = node.handle.take() {
                let _ = handle.join();
            }
        }
    }
}

impl std::fmt::Debug for LocalCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCluster")
            .field("nodes", &self.node_ids())
            .field("leader", &self.leader)
            .finish()
    }
}

/// [`Cluster`] as seen from one member of a [`LocalCluster`].
#[derive(Clone, Copy)]
pub struct ClusterHandle<'a> {
    cluster: &'a LocalCluster,
    self_id: NodeId,
}

impl Cluster for ClusterHandle<'_> {
    fn self_node(&self) -> NodeId {
        self.self_id
    }

    fn leader(&self) -> NodeId {
        self.cluster.leader
    }

    fn send_to_leader(&self, task: LoadDefinition) -> WeaveResult<LoadOutcome> {
        let leader = self.cluster.leader;
        let answer = self.cluster.submit(leader, task)?;
        LocalCluster::wait(leader, &answer)
    }

    fn fan_out(&self, task: LoadDefinition) -> Vec<(NodeId, WeaveResult<LoadOutcome>)> {
        let pending: Vec<_> = self
            .cluster
            .node_ids()
            .into_iter()
            .map(|node| (node, self.cluster.submit(node, task.clone())))
            .collect();
        pending
            .into_iter()
            .map(|(node, submitted)| {
                let result = submitted.and_then(|answer| LocalCluster::wait(node, &answer));
                (node, result)
            })
            .collect()
    }
}
