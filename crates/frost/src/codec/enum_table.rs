// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-codec cache of an enum type's constants.

use std::collections::HashMap;

use crate::error::{WeaveError, WeaveResult};

/// Ordinal ↔ constant lookup, built once when a codec is generated.
#[derive(Debug)]
pub struct EnumTable {
    type_name: String,
    constants: Vec<String>,
    ordinals: HashMap<String, i32>,
}

impl EnumTable {
    pub fn new(type_name: &str, constants: &[String]) -> WeaveResult<Self> {
        let mut ordinals = HashMap::with_capacity(constants.len());
        for (i, constant) in constants.iter().enumerate() {
            let ordinal = i32::try_from(i)
                .map_err(|_| WeaveError::Definition(format!("{type_name}: too many constants")))?;
            if ordinals.insert(constant.clone(), ordinal).is_some() {
                return Err(WeaveError::Definition(format!(
                    "{type_name}: duplicate constant `{constant}`"
                )));
            }
        }
        Ok(Self {
            type_name: type_name.to_string(),
            constants: constants.to_vec(),
            ordinals,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn ordinal(&self, constant: &str) -> WeaveResult<i32> {
        self.ordinals.get(constant).copied().ok_or_else(|| {
            WeaveError::Encode(format!("`{constant}` is not a constant of {}", self.type_name))
        })
    }

    pub fn constant(&self, ordinal: i32) -> WeaveResult<&str> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| self.constants.get(i))
            .map(String::as_str)
            .ok_or_else(|| {
                WeaveError::Decode(format!(
                    "ordinal {ordinal} out of range for {} ({} constants)",
                    self.type_name,
                    self.constants.len()
                ))
            })
    }
}
