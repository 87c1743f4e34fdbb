// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime instances of installed types.
//!
//! An [`Instance`] holds one [`Value`] slot per instance field of its type's
//! whole chain (transient fields included). Public accessors enforce the
//! declared visibility and finality; codecs reach slots directly through the
//! crate-private `slot`/`slot_mut` pair.

use std::sync::Arc;

use super::type_def::Visibility;
use super::type_ref::TypeRef;
use super::value::Value;
use crate::error::{WeaveError, WeaveResult};

/// One instance field, as laid out in an [`Instance`].
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDef {
    pub name: String,
    pub declared_by: String,
    pub ty: TypeRef,
    pub visibility: Visibility,
    pub is_final: bool,
    pub transient: bool,
}

/// Slot layout shared by every instance of one type version.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceLayout {
    type_name: String,
    /// The type itself first, then each ancestor up to the root.
    lineage: Vec<String>,
    is_abstract: bool,
    slots: Vec<SlotDef>,
}

impl InstanceLayout {
    pub(crate) fn new(type_name: String, lineage: Vec<String>, is_abstract: bool, slots: Vec<SlotDef>) -> Self {
        Self {
            type_name,
            lineage,
            is_abstract,
            slots,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn slots(&self) -> &[SlotDef] {
        &self.slots
    }

    /// True if the type is `name` or descends from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.lineage.iter().any(|t| t == name)
    }

    /// Most-derived slot with this name; an ancestor field hidden by a
    /// subclass field of the same name is only reachable through `slot_index_in`.
    pub fn slot_index(&self, name: &str) -> Option<usize> {
        self.slots.iter().rposition(|s| s.name == name)
    }

    pub fn slot_index_in(&self, owner: &str, name: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.declared_by == owner && s.name == name)
    }
}

/// Runtime object of an installed type.
#[derive(Debug, Clone)]
pub struct Instance {
    layout: Arc<InstanceLayout>,
    slots: Vec<Value>,
}

impl Instance {
    /// Create an instance with every slot at its default.
    pub(crate) fn new(layout: Arc<InstanceLayout>) -> Self {
        let slots = layout.slots.iter().map(|s| Value::default_for(&s.ty)).collect();
        Self { layout, slots }
    }

    pub fn type_name(&self) -> &str {
        &self.layout.type_name
    }

    pub fn layout(&self) -> &Arc<InstanceLayout> {
        &self.layout
    }

    pub fn is_a(&self, name: &str) -> bool {
        self.layout.is_a(name)
    }

    /// Read a non-private field.
    pub fn get(&self, name: &str) -> WeaveResult<&Value> {
        let idx = self.find(name)?;
        self.readable(idx)
    }

    /// Read a non-private field declared by `owner`.
    pub fn get_in(&self, owner: &str, name: &str) -> WeaveResult<&Value> {
        let idx = self.find_in(owner, name)?;
        self.readable(idx)
    }

    /// Assign a non-private, non-final field.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> WeaveResult<()> {
        let idx = self.find(name)?;
        self.assign(idx, value.into())
    }

    pub fn set_in(&mut self, owner: &str, name: &str, value: impl Into<Value>) -> WeaveResult<()> {
        let idx = self.find_in(owner, name)?;
        self.assign(idx, value.into())
    }

    /// Construction-time initialization: any field, private and final ones included.
    pub fn init(mut self, name: &str, value: impl Into<Value>) -> WeaveResult<Self> {
        let idx = self.find(name)?;
        let value = value.into();
        self.check_shape(idx, &value)?;
        self.slots[idx] = value;
        Ok(self)
    }

    pub(crate) fn slot(&self, idx: usize) -> &Value {
        &self.slots[idx]
    }

    pub(crate) fn slot_mut(&mut self, idx: usize) -> &mut Value {
        &mut self.slots[idx]
    }

    fn find(&self, name: &str) -> WeaveResult<usize> {
        self.layout
            .slot_index(name)
            .ok_or_else(|| WeaveError::access(self.type_name(), name, "no such field"))
    }

    fn find_in(&self, owner: &str, name: &str) -> WeaveResult<usize> {
        self.layout
            .slot_index_in(owner, name)
            .ok_or_else(|| WeaveError::access(owner, name, "no such field"))
    }

    fn readable(&self, idx: usize) -> WeaveResult<&Value> {
        let slot = &self.layout.slots[idx];
        if slot.visibility == Visibility::Private {
            return Err(WeaveError::access(&slot.declared_by, &slot.name, "field is private"));
        }
        Ok(&self.slots[idx])
    }

    fn assign(&mut self, idx: usize, value: Value) -> WeaveResult<()> {
        let slot = &self.layout.slots[idx];
        if slot.visibility == Visibility::Private {
            return Err(WeaveError::access(&slot.declared_by, &slot.name, "field is private"));
        }
        if slot.is_final {
            return Err(WeaveError::access(
                &slot.declared_by,
                &slot.name,
                "final field cannot be assigned after construction",
            ));
        }
        self.check_shape(idx, &value)?;
        self.slots[idx] = value;
        Ok(())
    }

    fn check_shape(&self, idx: usize, value: &Value) -> WeaveResult<()> {
        let slot = &self.layout.slots[idx];
        if value.conforms_to(&slot.ty) {
            Ok(())
        } else {
            Err(WeaveError::access(
                &slot.declared_by,
                &slot.name,
                "value does not match the declared type",
            ))
        }
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        self.layout.type_name == other.layout.type_name && self.slots == other.slots
    }
}
