// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! frost node runtime
//!
//! Runs an in-process cluster of frost nodes, loads type definition files
//! into it leader first, and transcodes instances between the text and
//! binary forms.
//!
//! # Configuration File
//!
//! ```toml
//! name = "sensors"
//! nodes = 3
//! leader = 0
//! definitions = ["types/point.json", "types/reading.json"]
//!
//! [weaver]
//! first_type_id = 100
//! trace_types = ["geo.Point"]
//! ```
//!
//! Each definition file holds one JSON type definition:
//!
//! ```json
//! {"name": "geo.Point", "parent": "Iced", "kind": "class",
//!  "fields": [{"name": "x", "type": "int"}, {"name": "y", "type": "int"}]}
//! ```

pub mod config;
pub mod node;

pub use config::{ConfigError, NodeConfig};
pub use node::{to_hex, NodeError, NodeRuntime, Transcoded};
