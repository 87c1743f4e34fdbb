// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object-notation (JSON) field writers and readers.
//!
//! Non-finite floats are written as the strings `"NaN"`, `"Infinity"` and
//! `"-Infinity"`. Nested objects carry no type tag in this form, so reading
//! one always builds the field's declared type.

use std::sync::Arc;

use super::enum_table::EnumTable;
use super::generate::{json_reader, mismatch, writer};
use super::{JsonReader, ValueWriter};
use crate::buffer::AutoBuffer;
use crate::classify::BaseCategory;
use crate::error::{WeaveError, WeaveResult};
use crate::model::{ScalarKind, Value};

const NULL: &str = "null";

pub(crate) fn text_io(
    base: &BaseCategory,
    table: Option<Arc<EnumTable>>,
) -> WeaveResult<(ValueWriter, JsonReader)> {
    Ok(match base {
        BaseCategory::Scalar(kind) => {
            let kind = *kind;
            (
                writer(move |_, ab, v| write_scalar(kind, ab, v)),
                json_reader(move |_, j| read_scalar(kind, j)),
            )
        }
        BaseCategory::Str => (
            writer(|_, ab, v| match v {
                Value::Str(s) => put_json(ab, s),
                Value::Null => put_null(ab),
                other => Err(mismatch("str", other)),
            }),
            json_reader(|_, j| match j {
                serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
                serde_json::Value::Null => Ok(Value::Null),
                other => Err(unexpected("str", other)),
            }),
        ),
        BaseCategory::Enum(name) => {
            let table = table.ok_or_else(|| missing_table(name))?;
            let read_table = table.clone();
            (
                writer(move |_, ab, v| match v {
                    Value::Enum(c) => {
                        table.ordinal(c)?;
                        put_json(ab, c)
                    }
                    Value::Null => put_null(ab),
                    other => Err(mismatch("enum", other)),
                }),
                json_reader(move |_, j| match j {
                    serde_json::Value::String(s) => {
                        read_table
                            .ordinal(s)
                            .map_err(|e| WeaveError::Decode(e.to_string()))?;
                        Ok(Value::Enum(s.clone()))
                    }
                    serde_json::Value::Null => Ok(Value::Null),
                    other => Err(unexpected(read_table.type_name(), other)),
                }),
            )
        }
        BaseCategory::Nested(name) => {
            let declared: Arc<str> = Arc::from(name.as_str());
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
                        cx.codec_by_name(inst.type_name())?.write_json(cx, ab, inst)
                    }
                    Value::Null => put_null(ab),
                    other => Err(mismatch(&declared, other)),
                }),
                json_reader(move |cx, j| match j {
                    serde_json::Value::Object(map) => {
                        let codec = cx.codec_by_name(&read_declared)?;
                        let mut inst = codec.new_instance()?;
                        codec.read_json_object(cx, map, &mut inst)?;
                        Ok(Value::Object(Box::new(inst)))
                    }
                    serde_json::Value::Null => Ok(Value::Null),
                    other => Err(unexpected(&read_declared, other)),
                }),
            )
        }
        BaseCategory::Fallback(_) => (
            writer(|_, ab, v| match v {
                Value::Opaque(j) => {
                    ab.put_ascii(&serde_json::to_string(j)?);
                    Ok(())
                }
                Value::Null => put_null(ab),
                other => Err(mismatch("opaque", other)),
            }),
            json_reader(|_, j| match j {
                serde_json::Value::Null => Ok(Value::Null),
                other => Ok(Value::Opaque(other.clone())),
            }),
        ),
    })
}

pub(crate) fn array_text(element: ValueWriter, element_reader: JsonReader) -> (ValueWriter, JsonReader) {
    (
        writer(move |cx, ab, v| match v {
            Value::Array(items) => {
                ab.put_ascii("[");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        ab.put_ascii(",");
                    }
                    element(cx, ab, item)?;
                }
                ab.put_ascii("]");
                Ok(())
            }
            Value::Null => put_null(ab),
            other => Err(mismatch("array", other)),
        }),
        json_reader(move |cx, j| match j {
            serde_json::Value::Array(items) => items
                .iter()
                .map(|item| element_reader(cx, item))
                .collect::<WeaveResult<Vec<_>>>()
                .map(Value::Array),
            serde_json::Value::Null => Ok(Value::Null),
            other => Err(unexpected("array", other)),
        }),
    )
}

fn write_scalar(kind: ScalarKind, ab: &mut AutoBuffer, v: &Value) -> WeaveResult<()> {
    let text = match (kind, v) {
        (ScalarKind::Boolean, Value::Boolean(x)) => x.to_string(),
        (ScalarKind::Byte, Value::Byte(x)) => x.to_string(),
        (ScalarKind::Char, Value::Char(x)) => x.to_string(),
        (ScalarKind::Short, Value::Short(x)) => x.to_string(),
        (ScalarKind::Int, Value::Int(x)) => x.to_string(),
        (ScalarKind::Long, Value::Long(x)) => x.to_string(),
        (ScalarKind::Float, Value::Float(x)) => {
            non_finite(f64::from(*x)).map_or_else(|| x.to_string(), str::to_string)
        }
        (ScalarKind::Double, Value::Double(x)) => {
            non_finite(*x).map_or_else(|| x.to_string(), str::to_string)
        }
        (_, other) => return Err(mismatch(kind.name(), other)),
    };
    ab.put_ascii(&text);
    Ok(())
}

fn read_scalar(kind: ScalarKind, j: &serde_json::Value) -> WeaveResult<Value> {
    let bad = || unexpected(kind.name(), j);
    Ok(match kind {
        ScalarKind::Boolean => Value::Boolean(j.as_bool().ok_or_else(bad)?),
        ScalarKind::Byte => Value::Byte(narrow(j).ok_or_else(bad)?),
        ScalarKind::Char => Value::Char(
            j.as_u64()
                .and_then(|n| u16::try_from(n).ok())
                .ok_or_else(bad)?,
        ),
        ScalarKind::Short => Value::Short(narrow(j).ok_or_else(bad)?),
        ScalarKind::Int => Value::Int(narrow(j).ok_or_else(bad)?),
        ScalarKind::Long => Value::Long(j.as_i64().ok_or_else(bad)?),
        ScalarKind::Float => Value::Float(float(j).ok_or_else(bad)? as f32),
        ScalarKind::Double => Value::Double(float(j).ok_or_else(bad)?),
    })
}

fn narrow<T: TryFrom<i64>>(j: &serde_json::Value) -> Option<T> {
    j.as_i64().and_then(|n| T::try_from(n).ok())
}

fn float(j: &serde_json::Value) -> Option<f64> {
    match j {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => match s.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn non_finite(x: f64) -> Option<&'static str> {
    if x.is_nan() {
        Some("\"NaN\"")
    } else if x == f64::INFINITY {
        Some("\"Infinity\"")
    } else if x == f64::NEG_INFINITY {
        Some("\"-Infinity\"")
    } else {
        None
    }
}

fn put_json(ab: &mut AutoBuffer, s: &str) -> WeaveResult<()> {
    ab.put_ascii(&serde_json::to_string(s)?);
    Ok(())
}

fn put_null(ab: &mut AutoBuffer) -> WeaveResult<()> {
    ab.put_ascii(NULL);
    Ok(())
}

fn unexpected(expected: &str, found: &serde_json::Value) -> WeaveError {
    WeaveError::Decode(format!("expected {expected}, found {found}"))
}

pub(crate) fn missing_table(name: &str) -> WeaveError {
    WeaveError::Definition(format!("no constant table for enum {name}"))
}
