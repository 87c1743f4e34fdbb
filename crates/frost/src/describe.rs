// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compile-time type descriptions.
//!
//! `#[derive(Described)]` implements [`Described`] for a struct or a
//! fieldless enum, so host types can be defined without hand-written
//! [`TypeDef`]s.

use crate::model::TypeDef;

pub trait Described {
    fn type_def() -> TypeDef;
}
