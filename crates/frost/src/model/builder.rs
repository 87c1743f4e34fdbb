// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for TypeDef.

use super::type_def::{FieldDef, MethodDef, MethodModifier, TypeDef, TypeKind};
use super::type_ref::{ScalarKind, TypeRef};

/// Builder for class definitions.
#[derive(Debug)]
pub struct TypeDefBuilder {
    def: TypeDef,
}

impl TypeDefBuilder {
    /// Create a new builder for a concrete class with no parent.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: TypeDef::class(name, None),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.def.parent = Some(parent.into());
        self
    }

    pub fn abstract_(mut self) -> Self {
        if let TypeKind::Class { is_abstract, .. } = &mut self.def.kind {
            *is_abstract = true;
        }
        self
    }

    /// Mark the class as implementing the serializable capability itself.
    pub fn freezable(mut self) -> Self {
        if let TypeKind::Class { freezable, .. } = &mut self.def.kind {
            *freezable = true;
        }
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.def.version = version;
        self
    }

    /// Add a package-visible field.
    pub fn field(self, name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        self.field_def(FieldDef::new(name, ty))
    }

    pub fn scalar_field(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.field(name, kind)
    }

    pub fn string_field(self, name: impl Into<String>) -> Self {
        self.field(name, TypeRef::Str)
    }

    /// Add a field referring to another type by name (nested, enum or fallback).
    pub fn named_field(self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.field(name, TypeRef::named(type_name))
    }

    pub fn array_field(self, name: impl Into<String>, element: impl Into<TypeRef>) -> Self {
        self.field(name, TypeRef::array_of(element.into()))
    }

    /// Add a fully specified field.
    pub fn field_def(mut self, field: FieldDef) -> Self {
        self.def.fields.push(field);
        self
    }

    pub fn method(mut self, name: impl Into<String>, modifier: MethodModifier, native: Option<&str>) -> Self {
        self.def.methods.push(MethodDef::new(name, modifier, native));
        self
    }

    /// Bind `method` to a static native taking the instance and the buffer.
    pub fn static_override(self, method: &str, native: &str) -> Self {
        self.method(method, MethodModifier::Static, Some(native))
    }

    /// Bind `method` to a final native invoked on the instance.
    pub fn final_override(self, method: &str, native: &str) -> Self {
        self.method(method, MethodModifier::Final, Some(native))
    }

    /// Declare `method` abstract; concrete subclasses supply it.
    pub fn abstract_override(self, method: &str) -> Self {
        self.method(method, MethodModifier::Abstract, None)
    }

    /// Build the TypeDef.
    pub fn build(self) -> TypeDef {
        self.def
    }
}
