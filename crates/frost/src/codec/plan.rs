// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-field generation plan: category plus accessor strategy.

use std::fmt;

use crate::classify::FieldCategory;
use crate::error::WeaveResult;
use crate::introspect::FieldDescriptor;
use crate::model::{Instance, Value, Visibility};

/// How generated code reaches a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Through the public accessors.
    Direct,
    /// Straight to the slot, bypassing visibility and finality.
    Privileged,
}

#[derive(Debug, Clone)]
pub struct FieldPlan {
    pub field: FieldDescriptor,
    pub category: FieldCategory,
    /// Used when the value is fetched (encode, copy source).
    pub get: Access,
    /// Used when the value is assigned (decode, copy target).
    pub set: Access,
}

impl FieldPlan {
    pub fn new(field: FieldDescriptor, category: FieldCategory) -> Self {
        let private = field.visibility == Visibility::Private;
        let get = if private { Access::Privileged } else { Access::Direct };
        let set = if private || field.is_final {
            Access::Privileged
        } else {
            Access::Direct
        };
        Self {
            field,
            category,
            get,
            set,
        }
    }

    pub(crate) fn fetch<'a>(&self, inst: &'a Instance) -> WeaveResult<&'a Value> {
        match self.get {
            Access::Direct => inst.get_in(&self.field.declared_by, &self.field.name),
            Access::Privileged => Ok(inst.slot(self.field.slot)),
        }
    }

    pub(crate) fn store(&self, inst: &mut Instance, value: Value) -> WeaveResult<()> {
        match self.set {
            Access::Direct => inst.set_in(&self.field.declared_by, &self.field.name, value),
            Access::Privileged => {
                *inst.slot_mut(self.field.slot) = value;
                Ok(())
            }
        }
    }
}

impl fmt::Display for FieldPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "slot {:>2}  {}.{}: {} (get {:?}, set {:?}{})",
            self.field.slot,
            self.field.declared_by,
            self.field.name,
            self.category,
            self.get,
            self.set,
            if self.field.text { "" } else { ", binary only" }
        )
    }
}
