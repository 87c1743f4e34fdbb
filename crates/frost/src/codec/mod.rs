// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generated per-type codecs.
//!
//! A [`Codec`] is bound to one Type ID and one definition version. Binary
//! write/read and field-copy always run the ancestor codec's layer first;
//! text-write does too, and uses whether the ancestor wrote anything to place
//! the separator before its own first field.

mod enum_table;
mod generate;
mod plan;
mod text;

use std::fmt::Write as _;
use std::sync::Arc;

pub use enum_table::EnumTable;
pub use plan::{Access, FieldPlan};

pub(crate) use generate::CodecGenerator;

use crate::buffer::AutoBuffer;
use crate::error::{WeaveError, WeaveResult};
use crate::model::{Instance, InstanceLayout, Value};
use crate::overrides::{OverrideBinding, ReadHook, WriteHook};
use crate::registry::TypeId;
use crate::task::Completion;
use generate::FieldOps;

pub(crate) type ValueWriter =
    Arc<dyn Fn(&dyn CodecResolver, &mut AutoBuffer, &Value) -> WeaveResult<()> + Send + Sync>;
pub(crate) type ValueReader =
    Arc<dyn Fn(&dyn CodecResolver, &mut AutoBuffer) -> WeaveResult<Value> + Send + Sync>;
pub(crate) type JsonReader =
    Arc<dyn Fn(&dyn CodecResolver, &serde_json::Value) -> WeaveResult<Value> + Send + Sync>;

/// Looks up the codecs of nested values while a codec runs.
pub trait CodecResolver: Send + Sync {
    fn codec_by_id(&self, id: TypeId) -> WeaveResult<Arc<Codec>>;
    fn codec_by_name(&self, name: &str) -> WeaveResult<Arc<Codec>>;
}

pub struct Codec {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: String,
    pub(crate) version: u32,
    pub(crate) parent: Option<Arc<Codec>>,
    pub(crate) layout: Arc<InstanceLayout>,
    /// Own woven fields only; ancestors are reached through `parent`.
    pub(crate) fields: Vec<FieldOps>,
    pub(crate) write: Option<OverrideBinding<WriteHook>>,
    pub(crate) read: Option<OverrideBinding<ReadHook>>,
    pub(crate) write_json: Option<OverrideBinding<WriteHook>>,
    pub(crate) copies: bool,
    pub(crate) enum_tables: Vec<Arc<EnumTable>>,
}

impl Codec {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn parent(&self) -> Option<&Arc<Codec>> {
        self.parent.as_ref()
    }

    pub fn layout(&self) -> &Arc<InstanceLayout> {
        &self.layout
    }

    /// True if this codec's type is `name` or descends from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.layout.is_a(name)
    }

    /// Field plans of the whole chain, ancestors first.
    pub fn plan(&self) -> impl Iterator<Item = &FieldPlan> {
        let mut layers = Vec::new();
        let mut current = Some(self);
        while let Some(codec) = current {
            layers.push(codec);
            current = codec.parent.as_deref();
        }
        layers
            .into_iter()
            .rev()
            .flat_map(|codec| codec.fields.iter().map(|f| &f.plan))
    }

    pub fn enum_table(&self, enum_name: &str) -> Option<&Arc<EnumTable>> {
        self.enum_tables.iter().find(|t| t.type_name() == enum_name)
    }

    /// True if field-copy was generated (task types only).
    pub fn supports_copy(&self) -> bool {
        self.copies
    }

    pub fn new_instance(&self) -> WeaveResult<Instance> {
        if self.layout.is_abstract() {
            return Err(WeaveError::AbstractInstantiation(self.type_name.clone()));
        }
        Ok(Instance::new(self.layout.clone()))
    }

    /// Dispatch shim for the task-execution collaborator.
    pub fn compute1(&self, task: &mut dyn Completion) {
        task.compute1();
    }

    // ------------------------------------------------------------------
    // Binary form
    // ------------------------------------------------------------------

    pub fn write(&self, cx: &dyn CodecResolver, ab: &mut AutoBuffer, inst: &Instance) -> WeaveResult<()> {
        self.check(inst)?;
        self.write_layer(cx, ab, inst)
    }

    fn write_layer(&self, cx: &dyn CodecResolver, ab: &mut AutoBuffer, inst: &Instance) -> WeaveResult<()> {
        if let Some(parent) = &self.parent {
            parent.write_layer(cx, ab, inst)?;
        }
        match &self.write {
            Some(binding) => binding.hook().map_or(Ok(()), |hook| hook(inst, ab)),
            None => self.fields.iter().try_for_each(|f| {
                let value = f.plan.fetch(inst)?;
                (f.write)(cx, ab, value).map_err(|e| self.field_error(f, e))
            }),
        }
    }

    pub fn read(&self, cx: &dyn CodecResolver, ab: &mut AutoBuffer, inst: &mut Instance) -> WeaveResult<()> {
        self.check(inst)?;
        self.read_layer(cx, ab, inst)
    }

    fn read_layer(&self, cx: &dyn CodecResolver, ab: &mut AutoBuffer, inst: &mut Instance) -> WeaveResult<()> {
        if let Some(parent) = &self.parent {
            parent.read_layer(cx, ab, inst)?;
        }
        match &self.read {
            Some(binding) => binding.hook().map_or(Ok(()), |hook| hook(inst, ab)),
            None => self.fields.iter().try_for_each(|f| {
                let value = (f.read)(cx, ab).map_err(|e| self.field_error(f, e))?;
                f.plan.store(inst, value)
            }),
        }
    }

    // ------------------------------------------------------------------
    // Text form
    // ------------------------------------------------------------------

    /// Write `{"name":value,...}` for every text field of the chain.
    pub fn write_json(&self, cx: &dyn CodecResolver, ab: &mut AutoBuffer, inst: &Instance) -> WeaveResult<()> {
        self.check(inst)?;
        ab.put_ascii("{");
        self.write_json_layer(cx, ab, inst)?;
        ab.put_ascii("}");
        Ok(())
    }

    fn write_json_layer(&self, cx: &dyn CodecResolver, ab: &mut AutoBuffer, inst: &Instance) -> WeaveResult<()> {
        let supers = match &self.parent {
            Some(parent) => {
                let start = ab.position();
                parent.write_json_layer(cx, ab, inst)?;
                ab.position() != start
            }
            None => false,
        };

        match &self.write_json {
            Some(binding) => {
                let Some(hook) = binding.hook() else {
                    return Ok(());
                };
                if !supers {
                    return hook(inst, ab);
                }
                ab.put_ascii(",");
                let after_separator = ab.position();
                hook(inst, ab)?;
                if ab.position() == after_separator {
                    ab.set_position(after_separator - 1);
                }
                Ok(())
            }
            None => {
                let mut first = !supers;
                for f in self.fields.iter().filter(|f| f.plan.field.text) {
                    if !first {
                        ab.put_ascii(",");
                    }
                    first = false;
                    ab.put_ascii(&f.key);
                    let value = f.plan.fetch(inst)?;
                    (f.write_json)(cx, ab, value).map_err(|e| self.field_error(f, e))?;
                }
                Ok(())
            }
        }
    }

    /// Parse one text-form object from the buffer into `inst`.
    ///
    /// Keys may come in any order; absent fields keep their current value.
    pub fn read_json(&self, cx: &dyn CodecResolver, ab: &mut AutoBuffer, inst: &mut Instance) -> WeaveResult<()> {
        let (value, consumed) = {
            let mut stream = serde_json::Deserializer::from_slice(ab.unread()).into_iter::<serde_json::Value>();
            let value = stream
                .next()
                .ok_or_else(|| WeaveError::Decode("empty text input".to_string()))?
                .map_err(|e| WeaveError::Decode(format!("malformed text form: {e}")))?;
            (value, stream.byte_offset())
        };
        ab.skip(consumed)?;
        let serde_json::Value::Object(map) = value else {
            return Err(WeaveError::Decode(format!(
                "{}: text form must be an object",
                self.type_name
            )));
        };
        self.read_json_object(cx, &map, inst)
    }

    pub(crate) fn read_json_object(
        &self,
        cx: &dyn CodecResolver,
        map: &serde_json::Map<String, serde_json::Value>,
        inst: &mut Instance,
    ) -> WeaveResult<()> {
        self.check(inst)?;
        // Custom text writers may emit keys no field accounts for.
        if !self.has_text_override() {
            if let Some(unknown) = map.keys().find(|k| !self.knows_text_field(k)) {
                return Err(WeaveError::Decode(format!(
                    "{}: unknown field `{unknown}`",
                    self.type_name
                )));
            }
        }
        self.read_json_layer(cx, map, inst)
    }

    fn read_json_layer(
        &self,
        cx: &dyn CodecResolver,
        map: &serde_json::Map<String, serde_json::Value>,
        inst: &mut Instance,
    ) -> WeaveResult<()> {
        if let Some(parent) = &self.parent {
            parent.read_json_layer(cx, map, inst)?;
        }
        for f in self.fields.iter().filter(|f| f.plan.field.text) {
            if let Some(j) = map.get(&f.plan.field.name) {
                let value = (f.read_json)(cx, j).map_err(|e| self.field_error(f, e))?;
                f.plan.store(inst, value)?;
            }
        }
        Ok(())
    }

    fn knows_text_field(&self, key: &str) -> bool {
        self.fields
            .iter()
            .any(|f| f.plan.field.text && f.plan.field.name == key)
            || self.parent.as_ref().is_some_and(|p| p.knows_text_field(key))
    }

    fn has_text_override(&self) -> bool {
        self.write_json.as_ref().is_some_and(|b| b.hook().is_some())
            || self.parent.as_ref().is_some_and(|p| p.has_text_override())
    }

    // ------------------------------------------------------------------
    // Field copy
    // ------------------------------------------------------------------

    /// Copy every woven field of `src` into `dst`.
    pub fn copy_over(&self, dst: &mut Instance, src: &Instance) -> WeaveResult<()> {
        if !self.copies {
            return Err(WeaveError::Config(format!(
                "{}: field copy is only generated for task types",
                self.type_name
            )));
        }
        self.check(dst)?;
        self.check(src)?;
        self.copy_layer(dst, src)
    }

    fn copy_layer(&self, dst: &mut Instance, src: &Instance) -> WeaveResult<()> {
        if let Some(parent) = self.parent.as_ref().filter(|p| p.copies) {
            parent.copy_layer(dst, src)?;
        }
        for f in &self.fields {
            let value = f.plan.fetch(src)?.clone();
            f.plan.store(dst, value)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------

    fn check(&self, inst: &Instance) -> WeaveResult<()> {
        if Arc::ptr_eq(inst.layout(), &self.layout) || **inst.layout() == *self.layout {
            return Ok(());
        }
        Err(WeaveError::Decode(format!(
            "codec for {} (id {}) cannot handle this {} instance",
            self.type_name,
            self.type_id,
            inst.type_name()
        )))
    }

    fn field_error(&self, f: &FieldOps, err: WeaveError) -> WeaveError {
        let field = &f.plan.field;
        match err {
            WeaveError::Encode(msg) => {
                WeaveError::Encode(format!("{}.{}: {msg}", field.declared_by, field.name))
            }
            WeaveError::Decode(msg) => {
                WeaveError::Decode(format!("{}.{}: {msg}", field.declared_by, field.name))
            }
            other => {
                log::trace!("[Codec] {} failed on {}: {}", self.type_name, field.name, other);
                other
            }
        }
    }

    /// Human-readable summary of the generated operations.
    pub fn describe(&self) -> String {
        let mut out = format!(
            "codec {} (id {}, version {})",
            self.type_name, self.type_id, self.version
        );
        if let Some(parent) = &self.parent {
            let _ = write!(out, " extends {}", parent.type_name);
        }
        for (op, binding) in [
            ("write", self.write.as_ref().map(OverrideBinding::label)),
            ("read", self.read.as_ref().map(OverrideBinding::label)),
            ("write_json", self.write_json.as_ref().map(OverrideBinding::label)),
        ] {
            let _ = write!(out, "\n  {op}: {}", binding.unwrap_or("fields"));
        }
        if self.copies {
            out.push_str("\n  copy_over: fields");
        }
        for plan in self.plan() {
            let _ = write!(out, "\n  {plan}");
        }
        out
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("type_id", &self.type_id)
            .field("type_name", &self.type_name)
            .field("version", &self.version)
            .field("parent", &self.parent.as_ref().map(|p| p.type_name.as_str()))
            .field("fields", &self.fields.len())
            .finish()
    }
}
