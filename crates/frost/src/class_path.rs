// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Node-local table of installed type definitions.
//!
//! Every class path starts with the built-in roots: [`ICED`], [`COMPLETER`]
//! and [`TASK`]. Host types are added with [`ClassPath::define`]; definitions
//! shipped by the dynamic loader are installed with
//! [`ClassPath::install_dynamic`], each under its own [`LoadContext`].

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{WeaveError, WeaveResult};
use crate::model::{FieldDef, ScalarKind, TypeDef, TypeDefBuilder, TypeRef, Visibility};
use crate::overrides::MethodTable;

/// Plain serializable root.
pub const ICED: &str = "Iced";
/// Completion-task root.
pub const COMPLETER: &str = "Completer";
/// Task base; its descendants get field-copy.
pub const TASK: &str = "Task";

/// Isolation token for one dynamically installed definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadContext {
    pub generation: u64,
    pub blob: Arc<[u8]>,
}

#[derive(Debug, Clone)]
struct Installed {
    def: Arc<TypeDef>,
    context: Option<LoadContext>,
}

#[derive(Debug)]
pub struct ClassPath {
    types: HashMap<String, Installed>,
    natives: MethodTable,
    reserved_field: String,
    next_generation: u64,
}

impl ClassPath {
    pub fn new(reserved_field: &str) -> Self {
        let mut cp = Self {
            types: HashMap::new(),
            natives: MethodTable::new(),
            reserved_field: reserved_field.to_string(),
            next_generation: 1,
        };
        let tag = || FieldDef::new(reserved_field, ScalarKind::Short).visibility(Visibility::Protected);
        let roots = [
            TypeDefBuilder::new(ICED).field_def(tag()).build(),
            TypeDefBuilder::new(COMPLETER).abstract_().field_def(tag()).build(),
            TypeDefBuilder::new(TASK).extends(COMPLETER).abstract_().build(),
        ];
        for def in roots {
            cp.types.insert(
                def.name.clone(),
                Installed {
                    def: Arc::new(def),
                    context: None,
                },
            );
        }
        cp
    }

    pub fn reserved_field(&self) -> &str {
        &self.reserved_field
    }

    pub fn natives(&self) -> &MethodTable {
        &self.natives
    }

    pub fn natives_mut(&mut self) -> &mut MethodTable {
        &mut self.natives
    }

    pub fn is_root(&self, name: &str) -> bool {
        name == ICED || name == COMPLETER
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<TypeDef>> {
        self.types.get(name).map(|t| &t.def)
    }

    pub fn resolve(&self, name: &str) -> WeaveResult<&Arc<TypeDef>> {
        self.get(name)
            .ok_or_else(|| WeaveError::UnknownType(name.to_string()))
    }

    pub fn context(&self, name: &str) -> Option<&LoadContext> {
        self.types.get(name).and_then(|t| t.context.as_ref())
    }

    /// Add a host type. Replacing an existing type goes through the loader.
    pub fn define(&mut self, def: TypeDef) -> WeaveResult<()> {
        if self.contains(&def.name) {
            return Err(WeaveError::Definition(format!(
                "type `{}` is already defined; reload it instead",
                def.name
            )));
        }
        self.check_definition(&def)?;
        log::debug!("[ClassPath] defined {}", def.name);
        self.types.insert(
            def.name.clone(),
            Installed {
                def: Arc::new(def),
                context: None,
            },
        );
        Ok(())
    }

    /// Install a definition shipped as `blob` under a fresh load context.
    /// Any prior installation of the same name must have been removed first.
    pub fn install_dynamic(&mut self, def: TypeDef, blob: Arc<[u8]>) -> WeaveResult<LoadContext> {
        if self.contains(&def.name) {
            return Err(WeaveError::Definition(format!(
                "type `{}` is still installed",
                def.name
            )));
        }
        self.check_definition(&def)?;
        let context = LoadContext {
            generation: self.next_generation,
            blob,
        };
        self.next_generation += 1;
        log::debug!(
            "[ClassPath] installed {} (generation {})",
            def.name,
            context.generation
        );
        self.types.insert(
            def.name.clone(),
            Installed {
                def: Arc::new(def),
                context: Some(context.clone()),
            },
        );
        Ok(context)
    }

    /// Remove a type and its load context. Roots cannot be removed.
    pub fn remove(&mut self, name: &str) -> Option<Arc<TypeDef>> {
        if self.is_root(name) || name == TASK {
            return None;
        }
        self.types.remove(name).map(|t| t.def)
    }

    /// True for the roots and any class whose chain reaches one, or that
    /// implements the capability itself.
    pub fn is_serializable(&self, name: &str) -> bool {
        let mut current = name;
        for _ in 0..=self.types.len() {
            if self.is_root(current) {
                return true;
            }
            let Some(def) = self.get(current) else {
                return false;
            };
            if !def.is_class() {
                return false;
            }
            if def.is_freezable() {
                return true;
            }
            match &def.parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// The parent, if it is serializable itself.
    pub fn serializable_parent(&self, name: &str) -> Option<&str> {
        let parent = self.get(name)?.parent.as_deref()?;
        self.is_serializable(parent).then_some(parent)
    }

    /// `name` followed by each installed ancestor.
    pub fn lineage(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = Some(name);
        while let Some(n) = current {
            if out.iter().any(|seen| seen == n) || !self.contains(n) {
                break;
            }
            out.push(n.to_string());
            current = self.get(n).and_then(|d| d.parent.as_deref());
        }
        out
    }

    pub fn is_subclass_of(&self, name: &str, base: &str) -> bool {
        self.lineage(name).iter().any(|t| t == base)
    }

    /// Every installed type that has `name` as a strict ancestor.
    pub fn descendants(&self, name: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .types
            .keys()
            .filter(|t| t.as_str() != name && self.is_subclass_of(t, name))
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Every installed type outside `names` that declares a field, or an
    /// array of elements, of one of `names`.
    pub fn referrers(&self, names: &[String]) -> Vec<String> {
        let mut out: Vec<String> = self
            .types
            .iter()
            .filter(|(t, installed)| {
                !names.contains(*t)
                    && installed.def.fields.iter().any(
                        |f| matches!(f.ty.base(), TypeRef::Named(n) if names.contains(n)),
                    )
            })
            .map(|(t, _)| t.clone())
            .collect();
        out.sort();
        out
    }

    /// Validate `def` against the installed types without installing it.
    /// Does not depend on whether a prior version of `def` is installed.
    pub fn check_definition(&self, def: &TypeDef) -> WeaveResult<()> {
        def.check()?;
        let Some(parent) = def.parent.as_deref() else {
            return Ok(());
        };
        let parent_def = self.resolve(parent).map_err(|_| {
            WeaveError::Definition(format!("{}: parent `{}` is not installed", def.name, parent))
        })?;
        if !parent_def.is_class() {
            return Err(WeaveError::Definition(format!(
                "{}: parent `{}` is not a class",
                def.name, parent
            )));
        }
        // Parent names are followed even through types that are not installed
        // right now, so a reinstall cannot close a loop.
        let mut current = Some(parent);
        let mut steps = 0;
        while let Some(n) = current {
            if n == def.name || steps > self.types.len() {
                return Err(WeaveError::Definition(format!(
                    "{}: parent chain through `{}` is cyclic",
                    def.name, parent
                )));
            }
            current = self.get(n).and_then(|d| d.parent.as_deref());
            steps += 1;
        }
        Ok(())
    }
}
