// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type definitions: the run-time description of a serializable type.
//!
//! A `TypeDef` is what a node installs into its class path. Its JSON form is
//! the definition blob shipped by the dynamic loader.

use serde::{Deserialize, Serialize};

use super::type_ref::TypeRef;
use crate::error::{WeaveError, WeaveResult};

/// Field or type visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    #[default]
    Package,
    Private,
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub transient: bool,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    /// Included in the text form.
    #[serde(default = "default_text")]
    pub text: bool,
}

fn default_text() -> bool {
    true
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            visibility: Visibility::default(),
            is_static: false,
            transient: false,
            is_final: false,
            text: true,
        }
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn public(self) -> Self {
        self.visibility(Visibility::Public)
    }

    pub fn private(self) -> Self {
        self.visibility(Visibility::Private)
    }

    pub fn final_(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn static_(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Omit from the text form.
    pub fn hidden_from_text(mut self) -> Self {
        self.text = false;
        self
    }
}

/// Declared modifier of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodModifier {
    Static,
    Final,
    Abstract,
    /// Overridable instance method; not a valid custom codec binding.
    Virtual,
}

/// A declared method, bound to a native function by symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub modifier: MethodModifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<String>,
}

impl MethodDef {
    pub fn new(name: impl Into<String>, modifier: MethodModifier, native: Option<&str>) -> Self {
        Self {
            name: name.into(),
            modifier,
            native: native.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeKind {
    Class {
        #[serde(default, rename = "abstract")]
        is_abstract: bool,
        /// Implements the serializable capability directly.
        #[serde(default)]
        freezable: bool,
    },
    Enum {
        constants: Vec<String>,
    },
    /// Not woven; serializable only through the generic fallback.
    Opaque {
        #[serde(default)]
        serializable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(flatten)]
    pub kind: TypeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub version: u32,
}

impl TypeDef {
    pub fn class(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(str::to_string),
            kind: TypeKind::Class {
                is_abstract: false,
                freezable: false,
            },
            fields: Vec::new(),
            methods: Vec::new(),
            version: 0,
        }
    }

    pub fn enumeration<I, S>(name: impl Into<String>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parent: None,
            kind: TypeKind::Enum {
                constants: constants.into_iter().map(Into::into).collect(),
            },
            fields: Vec::new(),
            methods: Vec::new(),
            version: 0,
        }
    }

    pub fn opaque(name: impl Into<String>, serializable: bool) -> Self {
        Self {
            name: name.into(),
            parent: None,
            kind: TypeKind::Opaque { serializable },
            fields: Vec::new(),
            methods: Vec::new(),
            version: 0,
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class { .. })
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self.kind, TypeKind::Class { is_abstract: true, .. })
    }

    pub fn is_freezable(&self) -> bool {
        matches!(self.kind, TypeKind::Class { freezable: true, .. })
    }

    pub fn enum_constants(&self) -> Option<&[String]> {
        match &self.kind {
            TypeKind::Enum { constants } => Some(constants),
            _ => None,
        }
    }

    pub fn is_fallback_serializable(&self) -> bool {
        matches!(self.kind, TypeKind::Opaque { serializable: true })
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared method by name; inherited methods are not visible here.
    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Decode a definition blob.
    pub fn from_blob(blob: &[u8]) -> WeaveResult<Self> {
        let def: Self = serde_json::from_slice(blob)
            .map_err(|e| WeaveError::Definition(format!("malformed definition blob: {e}")))?;
        def.check()?;
        Ok(def)
    }

    /// Encode as a definition blob.
    pub fn to_blob(&self) -> WeaveResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Structural checks that need no other type.
    pub fn check(&self) -> WeaveResult<()> {
        if self.name.trim().is_empty() {
            return Err(WeaveError::Definition("type name is empty".to_string()));
        }
        if self.parent.as_deref() == Some(self.name.as_str()) {
            return Err(WeaveError::Definition(format!(
                "{} names itself as parent",
                self.name
            )));
        }
        for (i, field) in self.fields.iter().enumerate() {
            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(WeaveError::Definition(format!(
                    "{}: duplicate field `{}`",
                    self.name, field.name
                )));
            }
        }
        if !self.is_class() && (self.parent.is_some() || !self.fields.is_empty()) {
            return Err(WeaveError::Definition(format!(
                "{}: only classes may declare a parent or fields",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::type_ref::ScalarKind;

    #[test]
    fn test_blob_shape() {
        let mut def = TypeDef::class("demo.Point", Some("Iced"));
        def.fields.push(FieldDef::new("x", ScalarKind::Int).public());
        def.fields.push(FieldDef::new("label", TypeRef::Str).private().final_());

        let json: serde_json::Value = serde_json::from_slice(&def.to_blob().unwrap()).unwrap();
        assert_eq!(json["kind"], "class");
        assert_eq!(json["parent"], "Iced");
        assert_eq!(json["fields"][0]["type"], "int");
        assert_eq!(json["fields"][1]["visibility"], "private");
        assert_eq!(json["fields"][1]["final"], true);
    }

    #[test]
    fn test_blob_defaults() {
        let blob = br#"{"name":"A","parent":"Iced","kind":"class","fields":[{"name":"n","type":"long"}]}"#;
        let def = TypeDef::from_blob(blob).unwrap();
        assert!(!def.is_abstract());
        assert_eq!(def.fields[0].visibility, Visibility::Package);
        assert!(def.fields[0].text);
        assert_eq!(def.version, 0);
    }

    #[test]
    fn test_enum_blob() {
        let def = TypeDef::enumeration("Color", ["RED", "GREEN"]);
        let back = TypeDef::from_blob(&def.to_blob().unwrap()).unwrap();
        assert_eq!(back.enum_constants().unwrap(), ["RED", "GREEN"]);
    }

    #[test]
    fn test_check_rejects_duplicates() {
        let mut def = TypeDef::class("Dup", Some("Iced"));
        def.fields.push(FieldDef::new("a", ScalarKind::Int));
        def.fields.push(FieldDef::new("a", ScalarKind::Long));
        assert!(matches!(def.check(), Err(WeaveError::Definition(_))));
    }

    #[test]
    fn test_malformed_blob() {
        let err = TypeDef::from_blob(b"{\"name\":").unwrap_err();
        assert!(matches!(err, WeaveError::Definition(_)));
    }
}
