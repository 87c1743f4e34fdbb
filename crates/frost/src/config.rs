// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Weaver configuration

use serde::{Deserialize, Serialize};

use crate::error::{WeaveError, WeaveResult};

/// Codec weaver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaverConfig {
    /// Name of the type-tag field only the roots may declare
    pub reserved_field: String,

    /// First Type ID handed out by the local id service (0 is the null tag)
    pub first_type_id: u16,

    /// Types whose generated plan is logged at debug level
    pub trace_types: Vec<String>,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            reserved_field: "__type_id".to_string(),
            first_type_id: 1,
            trace_types: Vec::new(),
        }
    }
}

impl WeaverConfig {
    /// Create a new config builder
    pub fn builder() -> WeaverConfigBuilder {
        WeaverConfigBuilder::default()
    }

    pub fn validate(&self) -> WeaveResult<()> {
        if self.reserved_field.trim().is_empty() {
            return Err(WeaveError::Config(
                "reserved_field must not be empty".to_string(),
            ));
        }
        if self.first_type_id == 0 {
            return Err(WeaveError::Config(
                "first_type_id must be non-zero (0 marks null on the wire)".to_string(),
            ));
        }
        Ok(())
    }

    pub fn traces(&self, type_name: &str) -> bool {
        self.trace_types.iter().any(|t| t == type_name || t == "*")
    }
}

/// Config builder for fluent API
#[derive(Debug, Default)]
pub struct WeaverConfigBuilder {
    reserved_field: Option<String>,
    first_type_id: Option<u16>,
    trace_types: Vec<String>,
}

impl WeaverConfigBuilder {
    pub fn reserved_field(mut self, name: impl Into<String>) -> Self {
        self.reserved_field = Some(name.into());
        self
    }

    pub fn first_type_id(mut self, id: u16) -> Self {
        self.first_type_id = Some(id);
        self
    }

    /// Log the generated plan of `type_name` ("*" traces every type)
    pub fn trace_type(mut self, type_name: impl Into<String>) -> Self {
        self.trace_types.push(type_name.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> WeaverConfig {
        let defaults = WeaverConfig::default();

        WeaverConfig {
            reserved_field: self.reserved_field.unwrap_or(defaults.reserved_field),
            first_type_id: self.first_type_id.unwrap_or(defaults.first_type_id),
            trace_types: self.trace_types,
        }
    }
}
