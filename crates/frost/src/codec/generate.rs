// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec generation.
//!
//! Every per-field decision (category, buffer primitive, accessor, enum
//! table, override binding) is taken once here and baked into closures;
//! running a codec never re-inspects the type definition.

use std::collections::HashMap;
use std::sync::Arc;

use super::enum_table::EnumTable;
use super::plan::FieldPlan;
use super::text::{array_text, missing_table, text_io};
use super::{Codec, CodecResolver, JsonReader, ValueReader, ValueWriter};
use crate::buffer::{AutoBuffer, NULL_LEN};
use crate::class_path::{ClassPath, TASK};
use crate::classify::{classify, BaseCategory};
use crate::config::WeaverConfig;
use crate::error::{WeaveError, WeaveResult};
use crate::introspect;
use crate::model::{MethodModifier, ScalarKind, TypeDef, Value};
use crate::overrides::{resolve_reader, resolve_writer, Operation};
use crate::registry::TypeId;

pub(crate) fn writer<F>(f: F) -> ValueWriter
where
    F: Fn(&dyn CodecResolver, &mut AutoBuffer, &Value) -> WeaveResult<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn reader<F>(f: F) -> ValueReader
where
    F: Fn(&dyn CodecResolver, &mut AutoBuffer) -> WeaveResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn json_reader<F>(f: F) -> JsonReader
where
    F: Fn(&dyn CodecResolver, &serde_json::Value) -> WeaveResult<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn mismatch(expected: &str, found: &Value) -> WeaveError {
    WeaveError::Encode(format!("expected {expected}, found {}", found.kind_name()))
}

/// Binary write/read pair for one scalar kind
macro_rules! scalar_io {
    ($variant:ident, $put:ident, $get:ident, $kind:expr) => {
        (
            writer(|_, ab, v| match v {
                Value::$variant(x) => {
                    ab.$put(*x);
                    Ok(())
                }
                other => Err(mismatch($kind.name(), other)),
            }),
            reader(|_, ab| Ok(Value::$variant(ab.$get()?))),
        )
    };
}

/// Compiled operations for one woven field.
pub(crate) struct FieldOps {
    pub plan: FieldPlan,
    /// `"name":` prefix in the text form.
    pub key: String,
    pub write: ValueWriter,
    pub read: ValueReader,
    pub write_json: ValueWriter,
    pub read_json: JsonReader,
}

impl FieldOps {
    fn compile(plan: FieldPlan, table: Option<Arc<EnumTable>>) -> WeaveResult<Self> {
        let base = &plan.category.base;
        let (mut write, mut read) = binary_io(base, table.clone())?;
        let (mut write_json, mut read_json) = text_io(base, table)?;
        if plan.category.array {
            (write, read) = array_binary(write, read);
            (write_json, read_json) = array_text(write_json, read_json);
        }
        let key = format!("{}:", serde_json::to_string(&plan.field.name)?);
        Ok(Self {
            plan,
            key,
            write,
            read,
            write_json,
            read_json,
        })
    }
}

fn binary_io(base: &BaseCategory, table: Option<Arc<EnumTable>>) -> WeaveResult<(ValueWriter, ValueReader)> {
    Ok(match base {
        BaseCategory::Scalar(kind) => match kind {
            ScalarKind::Boolean => scalar_io!(Boolean, put_bool, get_bool, ScalarKind::Boolean),
            ScalarKind::Byte => scalar_io!(Byte, put1, get1, ScalarKind::Byte),
            ScalarKind::Char => scalar_io!(Char, put2, get2, ScalarKind::Char),
            ScalarKind::Short => scalar_io!(Short, put2s, get2s, ScalarKind::Short),
            ScalarKind::Int => scalar_io!(Int, put4, get4, ScalarKind::Int),
            ScalarKind::Float => scalar_io!(Float, put4f, get4f, ScalarKind::Float),
            ScalarKind::Long => scalar_io!(Long, put8, get8, ScalarKind::Long),
            ScalarKind::Double => scalar_io!(Double, put8d, get8d, ScalarKind::Double),
        },
        BaseCategory::Str => (
            writer(|_, ab, v| match v {
                Value::Str(s) => ab.put_str(Some(s.as_str())).map(|_| ()),
                Value::Null => ab.put_str(None).map(|_| ()),
                other => Err(mismatch("str", other)),
            }),
            reader(|_, ab| Ok(ab.get_str()?.map_or(Value::Null, Value::Str))),
        ),
        BaseCategory::Enum(name) => {
            let table = table.ok_or_else(|| missing_table(name))?;
            let read_table = table.clone();
            (
                writer(move |_, ab, v| match v {
                    Value::Enum(c) => {
                        ab.put4(table.ordinal(c)?);
                        Ok(())
                    }
                    Value::Null => {
                        ab.put4(NULL_LEN);
                        Ok(())
                    }
                    other => Err(mismatch("enum", other)),
                }),
                reader(move |_, ab| match ab.get4()? {
                    NULL_LEN => Ok(Value::Null),
                    ordinal => Ok(Value::Enum(read_table.constant(ordinal)?.to_string())),
                }),
            )
        }
        BaseCategory::Nested(name) => nested_binary(name),
        BaseCategory::Fallback(_) => (
            writer(|_, ab, v| match v {
                Value::Opaque(j) => {
                    let bytes = serde_json::to_vec(j)?;
                    ab.put_len(bytes.len())?.put_bytes(&bytes);
                    Ok(())
                }
                Value::Null => {
                    ab.put4(NULL_LEN);
                    Ok(())
                }
                other => Err(mismatch("opaque", other)),
            }),
            reader(|_, ab| match ab.get_len()? {
                None => Ok(Value::Null),
                Some(len) => serde_json::from_slice(ab.get_bytes(len)?)
                    .map(Value::Opaque)
                    .map_err(|e| WeaveError::Decode(format!("fallback payload: {e}"))),
            }),
        ),
    })
}

/// Nested objects are prefixed with their concrete Type ID; `TypeId::NULL` marks null.
fn nested_binary(declared: &str) -> (ValueWriter, ValueReader) {
    let declared: Arc<str> = Arc::from(declared);
    let read_declared = declared.clone();
    (
        writer(move |cx, ab, v| match v {
            Value::Object(inst) => {
                if !inst.is_a(&declared) {
                    return Err(WeaveError::Encode(format!(
                        "{} is not a {declared}",
                        inst.type_name()
                    )));
                }
                let codec = cx.codec_by_name(inst.type_name())?;
                ab.put2(codec.type_id().0);
                codec.write(cx, ab, inst)
            }
            Value::Null => {
                ab.put2(TypeId::NULL.0);
                Ok(())
            }
            other => Err(mismatch(&declared, other)),
        }),
        reader(move |cx, ab| {
            let offset = ab.position();
            let id = TypeId(ab.get2()?);
            if id.is_null() {
                return Ok(Value::Null);
            }
            let codec = cx.codec_by_id(id)?;
            if !codec.is_a(&read_declared) {
                return Err(WeaveError::Decode(format!(
                    "tag {id} at offset {offset} names {}, which is not a {read_declared}",
                    codec.type_name()
                )));
            }
            let mut inst = codec.new_instance()?;
            ab.nested(|ab| codec.read(cx, ab, &mut inst))?;
            Ok(Value::Object(Box::new(inst)))
        }),
    )
}

fn array_binary(element: ValueWriter, element_reader: ValueReader) -> (ValueWriter, ValueReader) {
    (
        writer(move |cx, ab, v| match v {
            Value::Array(items) => {
                ab.put_len(items.len())?;
                items.iter().try_for_each(|item| element(cx, ab, item))
            }
            Value::Null => {
                ab.put4(NULL_LEN);
                Ok(())
            }
            other => Err(mismatch("array", other)),
        }),
        reader(move |cx, ab| {
            let Some(len) = ab.get_len()? else {
                return Ok(Value::Null);
            };
            let mut items = Vec::with_capacity(len.min(ab.remaining()));
            for _ in 0..len {
                items.push(element_reader(cx, ab)?);
            }
            Ok(Value::Array(items))
        }),
    )
}

/// Builds a codec from one consistent view of the class path.
pub(crate) struct CodecGenerator<'a> {
    cp: &'a ClassPath,
    config: &'a WeaverConfig,
}

impl<'a> CodecGenerator<'a> {
    pub fn new(cp: &'a ClassPath, config: &'a WeaverConfig) -> Self {
        Self { cp, config }
    }

    /// Generate the codec of `name`. `parent` must be the codec of its
    /// serializable parent, if it has one.
    pub fn generate(&self, type_id: TypeId, name: &str, parent: Option<Arc<Codec>>) -> WeaveResult<Codec> {
        let def = self.cp.resolve(name)?.clone();
        if !def.is_class() || !self.cp.is_serializable(name) {
            return Err(WeaveError::Definition(format!(
                "`{name}` is not a serializable class"
            )));
        }
        let layout = Arc::new(introspect::instance_layout(self.cp, name)?);

        let natives = self.cp.natives();
        let write = resolve_writer(&def, natives, Operation::Write)?;
        let read = resolve_reader(&def, natives)?;
        let write_json = resolve_writer(&def, natives, Operation::WriteJson)?;
        self.check_deferred(&def)?;

        let copies = self.cp.is_subclass_of(name, TASK);
        // A type overriding every operation may hold fields no category covers.
        let field_based = write.is_none() || read.is_none() || write_json.is_none() || copies;

        let mut tables: HashMap<String, Arc<EnumTable>> = HashMap::new();
        let mut fields = Vec::new();
        if field_based {
            for field in introspect::declared_fields(self.cp, &layout, name)? {
                let category = classify(self.cp, &field)?;
                let table = match &category.base {
                    BaseCategory::Enum(enum_name) => Some(self.enum_table(&mut tables, enum_name)?),
                    _ => None,
                };
                fields.push(FieldOps::compile(FieldPlan::new(field, category), table)?);
            }
        }

        let codec = Codec {
            type_id,
            type_name: name.to_string(),
            version: def.version,
            parent,
            layout,
            fields,
            write,
            read,
            write_json,
            copies,
            enum_tables: tables.into_values().collect(),
        };
        if self.config.traces(name) {
            log::debug!("[Weaver] generated codec\n{}", codec.describe());
        }
        Ok(codec)
    }

    fn enum_table(
        &self,
        tables: &mut HashMap<String, Arc<EnumTable>>,
        name: &str,
    ) -> WeaveResult<Arc<EnumTable>> {
        if let Some(table) = tables.get(name) {
            return Ok(table.clone());
        }
        let constants = self
            .cp
            .resolve(name)?
            .enum_constants()
            .ok_or_else(|| missing_table(name))?;
        let table = Arc::new(EnumTable::new(name, constants)?);
        tables.insert(name.to_string(), table.clone());
        Ok(table)
    }

    /// A concrete type must supply every override an ancestor left abstract.
    fn check_deferred(&self, def: &TypeDef) -> WeaveResult<()> {
        if def.is_abstract() {
            return Ok(());
        }
        for op in Operation::ALL {
            let method = op.method_name();
            let nearest = self
                .cp
                .lineage(&def.name)
                .into_iter()
                .take_while(|t| self.cp.is_serializable(t))
                .find_map(|t| {
                    let modifier = self.cp.get(&t)?.method(method)?.modifier;
                    Some((t, modifier))
                });
            if let Some((owner, MethodModifier::Abstract)) = nearest {
                return Err(WeaveError::malformed(
                    &def.name,
                    method,
                    format!("concrete type must implement the override {owner} leaves abstract"),
                ));
            }
        }
        Ok(())
    }
}
