// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Declared field types.

use std::fmt;

use crate::error::{WeaveError, WeaveResult};

/// The eight scalar kinds a field can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Float,
    Long,
    Double,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Char,
        Self::Short,
        Self::Int,
        Self::Float,
        Self::Long,
        Self::Double,
    ];

    /// Canonical name used in definitions and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Long => "long",
            Self::Double => "double",
        }
    }

    /// Accepts canonical names and the matching Rust primitive names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "boolean" | "bool" => Some(Self::Boolean),
            "byte" | "i8" => Some(Self::Byte),
            "char" | "u16" => Some(Self::Char),
            "short" | "i16" => Some(Self::Short),
            "int" | "i32" => Some(Self::Int),
            "float" | "f32" => Some(Self::Float),
            "long" | "i64" => Some(Self::Long),
            "double" | "f64" => Some(Self::Double),
            _ => None,
        }
    }

    /// Encoded width in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Boolean | Self::Byte => 1,
            Self::Char | Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Long | Self::Double => 8,
        }
    }
}

/// A field's declared type, as written in a definition.
///
/// Textual form: a scalar name, `str`, a type name, or `[T]` for an array of `T`.
/// Arrays may nest syntactically; the classifier rejects more than one level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Scalar(ScalarKind),
    Str,
    Named(String),
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub fn parse(text: &str) -> WeaveResult<Self> {
        let text = text.trim();
        if let Some(inner) = text.strip_prefix('[') {
            let inner = inner
                .strip_suffix(']')
                .ok_or_else(|| WeaveError::Definition(format!("unbalanced array type `{text}`")))?;
            return Ok(Self::Array(Box::new(Self::parse(inner)?)));
        }
        if text == "str" || text == "String" {
            return Ok(Self::Str);
        }
        if let Some(kind) = ScalarKind::from_name(text) {
            return Ok(Self::Scalar(kind));
        }
        let valid = !text.is_empty()
            && text
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | ':' | '$'));
        if !valid {
            return Err(WeaveError::Definition(format!("invalid type name `{text}`")));
        }
        Ok(Self::Named(text.to_string()))
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn array_of(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// Number of array levels wrapped around the base type.
    pub fn array_depth(&self) -> usize {
        match self {
            Self::Array(inner) => 1 + inner.array_depth(),
            _ => 0,
        }
    }

    /// The type with every array level stripped.
    pub fn base(&self) -> &TypeRef {
        match self {
            Self::Array(inner) => inner.base(),
            other => other,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => f.write_str(kind.name()),
            Self::Str => f.write_str("str"),
            Self::Named(name) => f.write_str(name),
            Self::Array(inner) => write!(f, "[{inner}]"),
        }
    }
}

impl TryFrom<String> for TypeRef {
    type Error = WeaveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

impl From<ScalarKind> for TypeRef {
    fn from(kind: ScalarKind) -> Self {
        Self::Scalar(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalars_and_aliases() {
        assert_eq!(TypeRef::parse("int").unwrap(), TypeRef::Scalar(ScalarKind::Int));
        assert_eq!(TypeRef::parse("i64").unwrap(), TypeRef::Scalar(ScalarKind::Long));
        assert_eq!(TypeRef::parse(" bool ").unwrap(), TypeRef::Scalar(ScalarKind::Boolean));
        assert_eq!(TypeRef::parse("str").unwrap(), TypeRef::Str);
    }

    #[test]
    fn test_parse_arrays() {
        let two_d = TypeRef::parse("[[double]]").unwrap();
        assert_eq!(two_d.array_depth(), 2);
        assert_eq!(two_d.base(), &TypeRef::Scalar(ScalarKind::Double));
        assert_eq!(two_d.to_string(), "[[double]]");

        let named = TypeRef::parse("[demo.Point]").unwrap();
        assert_eq!(named, TypeRef::array_of(TypeRef::named("demo.Point")));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TypeRef::parse("[int").is_err());
        assert!(TypeRef::parse("").is_err());
        assert!(TypeRef::parse("a b").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&TypeRef::array_of(TypeRef::Str)).unwrap();
        assert_eq!(json, "\"[str]\"");
        let back: TypeRef = serde_json::from_str("\"[short]\"").unwrap();
        assert_eq!(back, TypeRef::array_of(ScalarKind::Short.into()));
    }

    #[test]
    fn test_scalar_sizes() {
        let total: usize = ScalarKind::ALL.iter().map(|k| k.size()).sum();
        assert_eq!(total, 1 + 1 + 2 + 2 + 4 + 4 + 8 + 8);
    }
}
