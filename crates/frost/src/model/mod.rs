// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type model: definitions, declared types, instances and values.

mod builder;
mod instance;
mod type_def;
mod type_ref;
mod value;

pub use builder::TypeDefBuilder;
pub use instance::{Instance, InstanceLayout, SlotDef};
pub use type_def::{FieldDef, MethodDef, MethodModifier, TypeDef, TypeKind, Visibility};
pub use type_ref::{ScalarKind, TypeRef};
pub use value::Value;
