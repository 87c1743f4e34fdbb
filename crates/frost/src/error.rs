// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by codec generation, the registry and the loader.

use thiserror::Error;

/// Errors raised while weaving, running or reloading codecs.
#[derive(Debug, Error)]
pub enum WeaveError {
    /// A woven field's declared type falls in no supported category.
    #[error("{type_name}.{field}: serialization not implemented for field type `{ty}`")]
    UnsupportedField {
        type_name: String,
        field: String,
        ty: String,
    },

    /// A custom serialization method is declared with the wrong binding.
    #[error("{type_name}.{method}: {reason}")]
    MalformedOverride {
        type_name: String,
        method: String,
        reason: String,
    },

    /// A type declares the reserved tag field, or a configuration value is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("no type registered for id {0}")]
    UnknownTypeId(u16),

    #[error("cannot instantiate abstract type `{0}`")]
    AbstractInstantiation(String),

    /// Public field access violated visibility or finality.
    #[error("{type_name}.{field}: {reason}")]
    Access {
        type_name: String,
        field: String,
        reason: &'static str,
    },

    #[error("buffer underflow at offset {offset}: need {need} bytes, {have} available")]
    Underflow {
        offset: usize,
        need: usize,
        have: usize,
    },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    /// A type definition blob is malformed or inconsistent.
    #[error("invalid type definition: {0}")]
    Definition(String),

    #[error("cluster error: {0}")]
    Cluster(String),

    /// A follower could not see the leader's binding for a reloaded type.
    #[error("reload inconsistency: {0}")]
    ReloadInconsistency(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WeaveError {
    pub(crate) fn unsupported(type_name: &str, field: &str, ty: impl ToString) -> Self {
        Self::UnsupportedField {
            type_name: type_name.to_string(),
            field: field.to_string(),
            ty: ty.to_string(),
        }
    }

    pub(crate) fn malformed(type_name: &str, method: &str, reason: impl Into<String>) -> Self {
        Self::MalformedOverride {
            type_name: type_name.to_string(),
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn access(type_name: &str, field: &str, reason: &'static str) -> Self {
        Self::Access {
            type_name: type_name.to_string(),
            field: field.to_string(),
            reason,
        }
    }
}

pub type WeaveResult<T> = Result<T, WeaveError>;
