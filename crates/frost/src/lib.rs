// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # frost - per-type codec weaving
//!
//! Generates, per data type, a [`Codec`] that writes and reads instances in a
//! compact binary form and a JSON text form, and copies fields between task
//! instances. Types are described at run time by a [`TypeDef`]; codecs are
//! generated on first use and cached per [`TypeId`] until the type is
//! reloaded.
//!
//! ## Quick Start
//!
//! ```rust
//! use frost::{ScalarKind, TypeDefBuilder, TypeRegistry, WeaverConfig, ICED};
//!
//! # fn main() -> frost::WeaveResult<()> {
//! let registry = TypeRegistry::standalone(WeaverConfig::default())?;
//! registry.define(
//!     TypeDefBuilder::new("Point")
//!         .extends(ICED)
//!         .scalar_field("x", ScalarKind::Int)
//!         .scalar_field("y", ScalarKind::Int)
//!         .build(),
//! )?;
//!
//! let p = registry.new_instance("Point")?.init("x", 3)?.init("y", 4)?;
//! let bytes = registry.encode(&p)?;
//! assert_eq!(registry.decode("Point", &bytes)?, p);
//! assert_eq!(registry.encode_text(&p)?, r#"{"x":3,"y":4}"#);
//! # Ok(())
//! # }
//! ```
//!
//! ## Layers
//!
//! ```text
//! DynamicLoader --> Cluster --> TypeRegistry (per node)
//!                                  |  get_codec(id)
//!                                  v
//!                CodecGenerator <- classify <- introspect <- ClassPath
//! ```
//!
//! A subtype's codec runs its ancestor's codec first, so the binary form of
//! an instance is its ancestors' fields followed by its own.

// Allow the derive macro to work inside this crate's tests
extern crate self as frost;

/// Growable positional byte buffer.
pub mod buffer;
/// Node-local table of installed type definitions.
pub mod class_path;
/// Field categories.
pub mod classify;
/// Generated codecs.
pub mod codec;
/// Weaver configuration.
pub mod config;
/// Compile-time type descriptions.
pub mod describe;
/// Error types.
pub mod error;
/// Field introspection.
pub mod introspect;
/// Cluster-wide dynamic loading.
pub mod loader;
/// Type definitions, instances and values.
pub mod model;
/// Custom codec overrides.
pub mod overrides;
/// Per-node codec registry.
pub mod registry;
/// Task execution hook.
pub mod task;

pub use buffer::AutoBuffer;
pub use class_path::{ClassPath, LoadContext, COMPLETER, ICED, TASK};
pub use classify::{BaseCategory, FieldCategory};
pub use codec::{Codec, CodecResolver, EnumTable};
pub use config::{WeaverConfig, WeaverConfigBuilder};
pub use describe::Described;
pub use error::{WeaveError, WeaveResult};
pub use introspect::FieldDescriptor;
pub use loader::{Cluster, DynamicLoader, LocalCluster, NodeId, ReloadReport};
pub use model::{
    FieldDef, Instance, ScalarKind, TypeDef, TypeDefBuilder, TypeRef, Value, Visibility,
};
pub use overrides::{MethodTable, Operation};
pub use registry::{CodecState, Role, TypeId, TypeIdService, TypeRegistry};
pub use task::Completion;

// Derive macro; shares the trait's name in the macro namespace.
pub use frost_codegen::Described;
