// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Custom codec overrides.
//!
//! A type replaces the generated per-field logic of one operation by declaring
//! a method named after it (`write_impl`, `read_impl`, `write_json_impl`). The
//! declaration names a native symbol registered in the node's [`MethodTable`].
//! Only the type's own declarations are consulted; inherited ones are reached
//! through the ancestor codec.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::buffer::AutoBuffer;
use crate::error::{WeaveError, WeaveResult};
use crate::model::{Instance, MethodModifier, TypeDef};

pub type WriteHook = Arc<dyn Fn(&Instance, &mut AutoBuffer) -> WeaveResult<()> + Send + Sync>;
pub type ReadHook = Arc<dyn Fn(&mut Instance, &mut AutoBuffer) -> WeaveResult<()> + Send + Sync>;

/// Operation a custom method replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Write,
    Read,
    WriteJson,
}

impl Operation {
    pub const ALL: [Operation; 3] = [Self::Write, Self::Read, Self::WriteJson];

    /// Method name looked up on the type.
    pub fn method_name(self) -> &'static str {
        match self {
            Self::Write => "write_impl",
            Self::Read => "read_impl",
            Self::WriteJson => "write_json_impl",
        }
    }
}

/// Receiver style of a registered native.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeKind {
    /// Free function taking the instance and the buffer.
    Static,
    /// Invoked on the instance, taking only the buffer.
    Instance,
}

#[derive(Clone)]
enum NativeFn {
    Write(WriteHook),
    Read(ReadHook),
}

#[derive(Clone)]
struct Native {
    kind: NativeKind,
    func: NativeFn,
}

/// Native functions available to type definitions on one node, by symbol.
#[derive(Clone, Default)]
pub struct MethodTable {
    entries: HashMap<String, Native>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_static_writer<F>(&mut self, symbol: &str, f: F) -> &mut Self
    where
        F: Fn(&Instance, &mut AutoBuffer) -> WeaveResult<()> + Send + Sync + 'static,
    {
        self.insert(symbol, NativeKind::Static, NativeFn::Write(Arc::new(f)))
    }

    pub fn register_static_reader<F>(&mut self, symbol: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Instance, &mut AutoBuffer) -> WeaveResult<()> + Send + Sync + 'static,
    {
        self.insert(symbol, NativeKind::Static, NativeFn::Read(Arc::new(f)))
    }

    pub fn register_instance_writer<F>(&mut self, symbol: &str, f: F) -> &mut Self
    where
        F: Fn(&Instance, &mut AutoBuffer) -> WeaveResult<()> + Send + Sync + 'static,
    {
        self.insert(symbol, NativeKind::Instance, NativeFn::Write(Arc::new(f)))
    }

    pub fn register_instance_reader<F>(&mut self, symbol: &str, f: F) -> &mut Self
    where
        F: Fn(&mut Instance, &mut AutoBuffer) -> WeaveResult<()> + Send + Sync + 'static,
    {
        self.insert(symbol, NativeKind::Instance, NativeFn::Read(Arc::new(f)))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.entries.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, symbol: &str, kind: NativeKind, func: NativeFn) -> &mut Self {
        if self.entries.insert(symbol.to_string(), Native { kind, func }).is_some() {
            log::warn!("[Overrides] native `{}` re-registered", symbol);
        }
        self
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut symbols: Vec<_> = self.entries.keys().collect();
        symbols.sort();
        f.debug_struct("MethodTable").field("symbols", &symbols).finish()
    }
}

/// How a declared override is invoked.
#[derive(Clone)]
pub enum OverrideBinding<H> {
    Static(H),
    FinalInstance(H),
    /// Abstract declaration: the generated operation passes its input through.
    DeferredToSubclass,
}

impl<H> OverrideBinding<H> {
    pub fn hook(&self) -> Option<&H> {
        match self {
            Self::Static(h) | Self::FinalInstance(h) => Some(h),
            Self::DeferredToSubclass => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Static(_) => "static",
            Self::FinalInstance(_) => "final",
            Self::DeferredToSubclass => "deferred",
        }
    }
}

impl<H> fmt::Debug for OverrideBinding<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn resolve_writer(
    def: &TypeDef,
    table: &MethodTable,
    op: Operation,
) -> WeaveResult<Option<OverrideBinding<WriteHook>>> {
    resolve(def, table, op, |func| match func {
        NativeFn::Write(h) => Some(h.clone()),
        NativeFn::Read(_) => None,
    })
}

pub fn resolve_reader(
    def: &TypeDef,
    table: &MethodTable,
) -> WeaveResult<Option<OverrideBinding<ReadHook>>> {
    resolve(def, table, Operation::Read, |func| match func {
        NativeFn::Read(h) => Some(h.clone()),
        NativeFn::Write(_) => None,
    })
}

fn resolve<H>(
    def: &TypeDef,
    table: &MethodTable,
    op: Operation,
    pick: impl Fn(&NativeFn) -> Option<H>,
) -> WeaveResult<Option<OverrideBinding<H>>> {
    let method = op.method_name();
    let Some(decl) = def.method(method) else {
        return Ok(None);
    };

    let expected = match decl.modifier {
        MethodModifier::Abstract => return Ok(Some(OverrideBinding::DeferredToSubclass)),
        MethodModifier::Static => NativeKind::Static,
        MethodModifier::Final => NativeKind::Instance,
        MethodModifier::Virtual => {
            return Err(WeaveError::malformed(
                &def.name,
                method,
                "custom serialization methods must be declared either static or final",
            ))
        }
    };

    let symbol = decl
        .native
        .as_deref()
        .ok_or_else(|| WeaveError::malformed(&def.name, method, "no native symbol declared"))?;
    let native = table.entries.get(symbol).ok_or_else(|| {
        WeaveError::malformed(&def.name, method, format!("native `{symbol}` is not registered"))
    })?;
    if native.kind != expected {
        return Err(WeaveError::malformed(
            &def.name,
            method,
            format!("native `{symbol}` is {:?} but the method is declared {:?}", native.kind, decl.modifier),
        ));
    }
    let hook = pick(&native.func).ok_or_else(|| {
        WeaveError::malformed(&def.name, method, format!("native `{symbol}` has the wrong signature"))
    })?;

    Ok(Some(match expected {
        NativeKind::Static => OverrideBinding::Static(hook),
        NativeKind::Instance => OverrideBinding::FinalInstance(hook),
    }))
}
