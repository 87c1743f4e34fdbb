// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cluster-wide Type ID assignment.

use std::collections::HashMap;
use std::fmt;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{WeaveError, WeaveResult};

/// Compact cluster-wide type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub u16);

impl TypeId {
    /// Wire marker for a null nested object; never assigned to a type.
    pub const NULL: TypeId = TypeId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The external registry mapping type names to Type IDs.
///
/// Every node of a cluster must observe the same service.
pub trait TypeIdService: Send + Sync {
    /// Bind `name` to an id, returning the existing binding if there is one.
    fn register(&self, name: &str) -> WeaveResult<TypeId>;

    fn lookup(&self, name: &str) -> Option<TypeId>;

    fn name_of(&self, id: TypeId) -> Option<String>;

    /// Forget the binding of `name`. Its id is never handed out again.
    fn drop_name(&self, name: &str) -> Option<TypeId>;
}

#[derive(Debug)]
struct Bindings {
    by_name: HashMap<String, TypeId>,
    by_id: HashMap<TypeId, String>,
    next: u16,
}

/// In-process [`TypeIdService`], shared between nodes by `Arc`.
#[derive(Debug)]
pub struct LocalTypeMap {
    inner: RwLock<Bindings>,
}

impl LocalTypeMap {
    pub fn new(first_id: u16) -> Self {
        Self {
            inner: RwLock::new(Bindings {
                by_name: HashMap::new(),
                by_id: HashMap::new(),
                next: first_id.max(1),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LocalTypeMap {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TypeIdService for LocalTypeMap {
    fn register(&self, name: &str) -> WeaveResult<TypeId> {
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }
        let mut inner = self.inner.write();
        // Double-check: another thread may have registered while we waited
        if let Some(id) = inner.by_name.get(name) {
            return Ok(*id);
        }
        let id = TypeId(inner.next);
        inner.next = inner
            .next
            .checked_add(1)
            .ok_or_else(|| WeaveError::Config("type id space exhausted".to_string()))?;
        inner.by_name.insert(name.to_string(), id);
        inner.by_id.insert(id, name.to_string());
        log::debug!("[TypeMap] {} -> {}", name, id);
        Ok(id)
    }

    fn lookup(&self, name: &str) -> Option<TypeId> {
        self.inner.read().by_name.get(name).copied()
    }

    fn name_of(&self, id: TypeId) -> Option<String> {
        self.inner.read().by_id.get(&id).cloned()
    }

    fn drop_name(&self, name: &str) -> Option<TypeId> {
        let mut inner = self.inner.write();
        let id = inner.by_name.remove(name)?;
        inner.by_id.remove(&id);
        log::debug!("[TypeMap] dropped {} ({})", name, id);
        Some(id)
    }
}
