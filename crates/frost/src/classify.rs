// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field classification: which buffer primitive a field uses.

use std::fmt;

use crate::class_path::ClassPath;
use crate::error::{WeaveError, WeaveResult};
use crate::introspect::FieldDescriptor;
use crate::model::{ScalarKind, TypeRef};

/// Category of a field's element type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseCategory {
    Scalar(ScalarKind),
    Str,
    Enum(String),
    Nested(String),
    Fallback(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCategory {
    pub base: BaseCategory,
    pub array: bool,
}

impl fmt::Display for BaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(kind) => f.write_str(kind.name()),
            Self::Str => f.write_str("str"),
            Self::Enum(name) => write!(f, "enum {name}"),
            Self::Nested(name) => write!(f, "nested {name}"),
            Self::Fallback(name) => write!(f, "fallback {name}"),
        }
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.array {
            write!(f, "[{}]", self.base)
        } else {
            self.base.fmt(f)
        }
    }
}

pub fn classify(cp: &ClassPath, field: &FieldDescriptor) -> WeaveResult<FieldCategory> {
    let unsupported = || WeaveError::unsupported(&field.declared_by, &field.name, &field.ty);
    let (element, array) = match &field.ty {
        TypeRef::Array(inner) if matches!(**inner, TypeRef::Array(_)) => return Err(unsupported()),
        TypeRef::Array(inner) => (&**inner, true),
        other => (other, false),
    };
    let base = classify_base(cp, element).ok_or_else(unsupported)?;
    Ok(FieldCategory { base, array })
}

fn classify_base(cp: &ClassPath, ty: &TypeRef) -> Option<BaseCategory> {
    match ty {
        TypeRef::Scalar(kind) => Some(BaseCategory::Scalar(*kind)),
        TypeRef::Str => Some(BaseCategory::Str),
        TypeRef::Array(_) => None,
        TypeRef::Named(name) => {
            let def = cp.get(name)?;
            if cp.is_serializable(name) {
                Some(BaseCategory::Nested(name.clone()))
            } else if def.enum_constants().is_some() {
                Some(BaseCategory::Enum(name.clone()))
            } else if def.is_fallback_serializable() {
                Some(BaseCategory::Fallback(name.clone()))
            } else {
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_path::ICED;
    use crate::model::{TypeDef, TypeDefBuilder, Visibility};

    fn field(ty: TypeRef) -> FieldDescriptor {
        FieldDescriptor {
            name: "f".to_string(),
            declared_by: "Holder".to_string(),
            ty,
            visibility: Visibility::Public,
            is_final: false,
            text: true,
            slot: 0,
        }
    }

    fn cp() -> ClassPath {
        let mut cp = ClassPath::new("__type_id");
        cp.define(TypeDefBuilder::new("Point").extends(ICED).build()).unwrap();
        cp.define(TypeDef::enumeration("Color", ["RED"])).unwrap();
        cp.define(TypeDef::opaque("Blob", true)).unwrap();
        cp.define(TypeDef::opaque("Socket", false)).unwrap();
        cp.define(TypeDefBuilder::new("Plain").build()).unwrap();
        cp
    }

    #[test]
    fn test_categories() {
        let cp = cp();
        let cat = |ty| classify(&cp, &field(ty)).unwrap().to_string();
        assert_eq!(cat(TypeRef::Scalar(ScalarKind::Char)), "char");
        assert_eq!(cat(TypeRef::Str), "str");
        assert_eq!(cat(TypeRef::named("Point")), "nested Point");
        assert_eq!(cat(TypeRef::named("Color")), "enum Color");
        assert_eq!(cat(TypeRef::named("Blob")), "fallback Blob");
        assert_eq!(cat(TypeRef::array_of(TypeRef::named("Point"))), "[nested Point]");
        assert_eq!(cat(TypeRef::array_of(ScalarKind::Long.into())), "[long]");
    }

    #[test]
    fn test_unsupported() {
        let cp = cp();
        for ty in [
            TypeRef::named("Socket"),
            TypeRef::named("Plain"),
            TypeRef::named("Missing"),
            TypeRef::array_of(TypeRef::array_of(ScalarKind::Int.into())),
        ] {
            let err = classify(&cp, &field(ty)).unwrap_err();
            match err {
                WeaveError::UnsupportedField { type_name, field, .. } => {
                    assert_eq!(type_name, "Holder");
                    assert_eq!(field, "f");
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }
}
