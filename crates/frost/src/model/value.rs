// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field values.

use super::instance::Instance;
use super::type_ref::{ScalarKind, TypeRef};

/// A value held in one instance slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,

    // Scalars
    Boolean(bool),
    Byte(i8),
    Char(u16),
    Short(i16),
    Int(i32),
    Float(f32),
    Long(i64),
    Double(f64),

    Str(String),
    /// Enum constant, by name.
    Enum(String),
    Object(Box<Instance>),
    /// Fallback-serializable payload.
    Opaque(serde_json::Value),
    Array(Vec<Value>),
}

macro_rules! impl_scalar_access {
    ($as_fn:ident, $variant:ident, $type:ty) => {
        pub fn $as_fn(&self) -> Option<$type> {
            match self {
                Self::$variant(v) => Some(*v),
                _ => None,
            }
        }
    };
}

macro_rules! impl_from_scalar {
    ($type:ty, $variant:ident) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Self::$variant(v)
            }
        }
    };
}

impl Value {
    /// Initial slot content for a field of type `ty`.
    pub fn default_for(ty: &TypeRef) -> Self {
        match ty {
            TypeRef::Scalar(kind) => Self::zero(*kind),
            _ => Self::Null,
        }
    }

    pub fn zero(kind: ScalarKind) -> Self {
        match kind {
            ScalarKind::Boolean => Self::Boolean(false),
            ScalarKind::Byte => Self::Byte(0),
            ScalarKind::Char => Self::Char(0),
            ScalarKind::Short => Self::Short(0),
            ScalarKind::Int => Self::Int(0),
            ScalarKind::Float => Self::Float(0.0),
            ScalarKind::Long => Self::Long(0),
            ScalarKind::Double => Self::Double(0.0),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    impl_scalar_access!(as_bool, Boolean, bool);
    impl_scalar_access!(as_byte, Byte, i8);
    impl_scalar_access!(as_char, Char, u16);
    impl_scalar_access!(as_short, Short, i16);
    impl_scalar_access!(as_int, Int, i32);
    impl_scalar_access!(as_float, Float, f32);
    impl_scalar_access!(as_long, Long, i64);
    impl_scalar_access!(as_double, Double, f64);

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&str> {
        match self {
            Self::Enum(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Byte(_) => "byte",
            Self::Char(_) => "char",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::Str(_) => "str",
            Self::Enum(_) => "enum",
            Self::Object(_) => "object",
            Self::Opaque(_) => "opaque",
            Self::Array(_) => "array",
        }
    }

    /// Loose shape check against a declared type. Named types accept any
    /// reference-like value; the codec checks them precisely.
    pub fn conforms_to(&self, ty: &TypeRef) -> bool {
        match (ty, self) {
            (TypeRef::Scalar(kind), v) => v.kind_name() == kind.name(),
            (_, Self::Null) => true,
            (TypeRef::Str, Self::Str(_)) => true,
            (TypeRef::Named(_), Self::Enum(_) | Self::Object(_) | Self::Opaque(_)) => true,
            (TypeRef::Array(inner), Self::Array(items)) => {
                items.iter().all(|item| item.conforms_to(inner))
            }
            _ => false,
        }
    }
}

impl_from_scalar!(bool, Boolean);
impl_from_scalar!(i8, Byte);
impl_from_scalar!(u16, Char);
impl_from_scalar!(i16, Short);
impl_from_scalar!(i32, Int);
impl_from_scalar!(f32, Float);
impl_from_scalar!(i64, Long);
impl_from_scalar!(f64, Double);

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Instance> for Value {
    fn from(v: Instance) -> Self {
        Self::Object(Box::new(v))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_values() {
        assert_eq!(Value::from(42i32).as_int(), Some(42));
        assert_eq!(Value::from(42i32).as_long(), None);
        assert_eq!(Value::from('A' as u16).as_char(), Some(65));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert!(Value::from(None::<i32>).is_null());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Value::default_for(&TypeRef::Scalar(ScalarKind::Double)), Value::Double(0.0));
        assert_eq!(Value::default_for(&TypeRef::Str), Value::Null);
        assert_eq!(Value::default_for(&TypeRef::named("Color")), Value::Null);
    }

    #[test]
    fn test_conforms_to() {
        let ints = TypeRef::array_of(ScalarKind::Int.into());
        assert!(Value::from(vec![1i32, 2, 3]).conforms_to(&ints));
        assert!(!Value::from(vec![1i64]).conforms_to(&ints));
        assert!(Value::Null.conforms_to(&ints));
        assert!(!Value::Null.conforms_to(&TypeRef::Scalar(ScalarKind::Int)));
        assert!(Value::Enum("RED".into()).conforms_to(&TypeRef::named("Color")));
        assert!(!Value::from(1i32).conforms_to(&TypeRef::Str));
    }
}
