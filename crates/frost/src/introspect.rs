// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field introspection over a class path.
//!
//! Woven fields are the non-static, non-transient instance fields of a type
//! and of each ancestor while the ancestor is serializable, ancestor fields
//! first and each type's fields in declaration order. That order is the
//! binary layout.

use std::sync::Arc;

use crate::class_path::ClassPath;
use crate::error::{WeaveError, WeaveResult};
use crate::model::{InstanceLayout, SlotDef, TypeDef, TypeRef, Visibility};

/// A persistable field, with the instance slot it lives in.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub declared_by: String,
    pub ty: TypeRef,
    pub visibility: Visibility,
    pub is_final: bool,
    pub text: bool,
    pub slot: usize,
}

/// Slot layout of every instance field of `name`'s chain, transient ones and
/// those of non-serializable ancestors included.
pub fn instance_layout(cp: &ClassPath, name: &str) -> WeaveResult<InstanceLayout> {
    let def = cp.resolve(name)?;
    if !def.is_class() {
        return Err(WeaveError::Definition(format!("`{name}` is not a class")));
    }
    let lineage = cp.lineage(name);
    if let Some(missing) = lineage
        .last()
        .and_then(|top| cp.get(top))
        .and_then(|top| top.parent.clone())
    {
        return Err(WeaveError::UnknownType(missing));
    }

    let mut slots = Vec::new();
    for owner in lineage.iter().rev() {
        let owner_def = cp.resolve(owner)?;
        let is_root = cp.is_root(owner);
        for field in owner_def.fields.iter().filter(|f| !f.is_static) {
            if field.name == cp.reserved_field() {
                if is_root {
                    continue;
                }
                return Err(WeaveError::Config(format!(
                    "{owner}.{}: field name is reserved for the type tag",
                    field.name
                )));
            }
            slots.push(SlotDef {
                name: field.name.clone(),
                declared_by: owner.clone(),
                ty: field.ty.clone(),
                visibility: field.visibility,
                is_final: field.is_final,
                transient: field.transient,
            });
        }
    }

    Ok(InstanceLayout::new(
        name.to_string(),
        lineage,
        def.is_abstract(),
        slots,
    ))
}

/// All woven fields of the layout's type, ancestors first.
pub fn woven_fields(cp: &ClassPath, layout: &InstanceLayout) -> WeaveResult<Vec<FieldDescriptor>> {
    let chain: Vec<&String> = layout
        .lineage()
        .iter()
        .take_while(|t| cp.is_serializable(t))
        .collect();
    let mut out = Vec::new();
    for owner in chain.into_iter().rev() {
        out.extend(declared_fields(cp, layout, owner)?);
    }
    Ok(out)
}

/// Woven fields declared by `owner` itself.
pub fn declared_fields(
    cp: &ClassPath,
    layout: &InstanceLayout,
    owner: &str,
) -> WeaveResult<Vec<FieldDescriptor>> {
    let def: &Arc<TypeDef> = cp.resolve(owner)?;
    Ok(def
        .fields
        .iter()
        .filter(|f| !f.is_static && !f.transient)
        .filter_map(|f| {
            let slot = layout.slot_index_in(owner, &f.name)?;
            Some(FieldDescriptor {
                name: f.name.clone(),
                declared_by: owner.to_string(),
                ty: f.ty.clone(),
                visibility: f.visibility,
                is_final: f.is_final,
                text: f.text,
                slot,
            })
        })
        .collect())
}
