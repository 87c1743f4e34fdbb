// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Generated codec behaviour through the public registry API.

use frost::model::MethodModifier;
use frost::{
    AutoBuffer, Described, FieldDef, Instance, ScalarKind, TypeDef, TypeDefBuilder, TypeRef,
    TypeRegistry, Value, WeaveError, WeaverConfig, ICED, TASK,
};
use serde_json::json;

fn registry() -> TypeRegistry {
    TypeRegistry::standalone(WeaverConfig::builder().trace_type("*").build()).unwrap()
}

fn define_geometry(reg: &TypeRegistry) {
    reg.define(TypeDef::enumeration("Color", ["RED", "GREEN", "BLUE"])).unwrap();
    reg.define(TypeDef::opaque("Meta", true)).unwrap();
    reg.define(
        TypeDefBuilder::new("Point")
            .extends(ICED)
            .scalar_field("x", ScalarKind::Int)
            .scalar_field("y", ScalarKind::Int)
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Point3")
            .extends("Point")
            .scalar_field("z", ScalarKind::Int)
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Shape")
            .extends(ICED)
            .string_field("name")
            .named_field("color", "Color")
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Polygon")
            .extends("Shape")
            .array_field("points", TypeRef::named("Point"))
            .array_field("tags", TypeRef::Str)
            .named_field("center", "Point")
            .named_field("meta", "Meta")
            .scalar_field("area", ScalarKind::Double)
            .field_def(FieldDef::new("serial", ScalarKind::Long).private().final_())
            .field_def(FieldDef::new("cache", ScalarKind::Int).transient())
            .build(),
    )
    .unwrap();
}

fn point(reg: &TypeRegistry, x: i32, y: i32) -> Instance {
    reg.new_instance("Point").unwrap().init("x", x).unwrap().init("y", y).unwrap()
}

fn polygon(reg: &TypeRegistry) -> Instance {
    let center = reg.new_instance("Point3").unwrap().init("z", 9).unwrap();
    reg.new_instance("Polygon")
        .unwrap()
        .init("name", "tri")
        .unwrap()
        .init("color", Value::Enum("GREEN".into()))
        .unwrap()
        .init("points", vec![point(reg, 0, 0), point(reg, 4, 0), point(reg, 0, 3)])
        .unwrap()
        .init("tags", vec!["a", "b"])
        .unwrap()
        .init("center", center)
        .unwrap()
        .init("meta", Value::Opaque(json!({"source": "survey", "rev": [1, 2]})))
        .unwrap()
        .init("area", 6.0f64)
        .unwrap()
        .init("serial", 77i64)
        .unwrap()
}

#[test]
fn test_binary_round_trip_with_ancestors() {
    let reg = registry();
    define_geometry(&reg);
    let poly = polygon(&reg);

    let bytes = reg.encode(&poly).unwrap();
    let back = reg.decode("Polygon", &bytes).unwrap();
    assert_eq!(back, poly);

    // Nested values keep their concrete type.
    let center = back.get("center").unwrap().as_object().unwrap();
    assert_eq!(center.type_name(), "Point3");
    assert_eq!(center.get("z").unwrap(), &Value::Int(9));
}

#[test]
fn test_transient_field_is_not_written() {
    let reg = registry();
    define_geometry(&reg);
    let mut poly = polygon(&reg);
    poly.set("cache", 123).unwrap();

    let back = reg.decode("Polygon", &reg.encode(&poly).unwrap()).unwrap();
    assert_eq!(back.get("cache").unwrap(), &Value::Int(0));
}

#[test]
fn test_private_final_field_round_trips() {
    let reg = registry();
    define_geometry(&reg);
    let poly = polygon(&reg);
    assert!(matches!(poly.get("serial"), Err(WeaveError::Access { .. })));

    let mut back = reg.decode("Polygon", &reg.encode(&poly).unwrap()).unwrap();
    assert_eq!(back, poly);
    assert!(back.set("serial", 1i64).is_err());
}

#[test]
fn test_nulls_round_trip() {
    let reg = registry();
    define_geometry(&reg);
    let empty = reg.new_instance("Polygon").unwrap();
    let back = reg.decode("Polygon", &reg.encode(&empty).unwrap()).unwrap();
    assert_eq!(back, empty);
    assert!(back.get("center").unwrap().is_null());
}

#[test]
fn test_randomized_round_trip() {
    let reg = registry();
    define_geometry(&reg);
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    for _ in 0..64 {
        let n = rng.usize(0..8);
        let points: Vec<Instance> = (0..n).map(|_| point(&reg, rng.i32(..), rng.i32(..))).collect();
        let poly = reg
            .new_instance("Polygon")
            .unwrap()
            .init("points", points)
            .unwrap()
            .init("area", f64::from(rng.i32(..)) / 4.0)
            .unwrap()
            .init("name", "x".repeat(rng.usize(0..40)))
            .unwrap();
        assert_eq!(reg.decode("Polygon", &reg.encode(&poly).unwrap()).unwrap(), poly);
        assert_eq!(reg.decode_text("Polygon", &reg.encode_text(&poly).unwrap()).unwrap(), poly);
    }
}

#[test]
fn test_layout_is_ancestor_first_in_declaration_order() {
    let reg = registry();
    reg.define(
        TypeDefBuilder::new("A")
            .extends(ICED)
            .scalar_field("a", ScalarKind::Int)
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("B")
            .extends("A")
            .scalar_field("b1", ScalarKind::Byte)
            .scalar_field("b2", ScalarKind::Short)
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("B2")
            .extends("A")
            .scalar_field("b2", ScalarKind::Short)
            .scalar_field("b1", ScalarKind::Byte)
            .build(),
    )
    .unwrap();

    let b = reg
        .new_instance("B")
        .unwrap()
        .init("a", 0x0102_0304)
        .unwrap()
        .init("b1", 5i8)
        .unwrap()
        .init("b2", 0x0607i16)
        .unwrap();
    assert_eq!(reg.encode(&b).unwrap(), [4, 3, 2, 1, 5, 7, 6]);

    let b2 = reg
        .new_instance("B2")
        .unwrap()
        .init("a", 0x0102_0304)
        .unwrap()
        .init("b1", 5i8)
        .unwrap()
        .init("b2", 0x0607i16)
        .unwrap();
    assert_eq!(reg.encode(&b2).unwrap(), [4, 3, 2, 1, 7, 6, 5]);

    let plan: Vec<_> = reg
        .codec_for("B")
        .unwrap()
        .plan()
        .map(|p| p.field.name.clone())
        .collect();
    assert_eq!(plan, ["a", "b1", "b2"]);
}

#[test]
fn test_nested_tag_and_null() {
    let reg = registry();
    define_geometry(&reg);
    reg.define(
        TypeDefBuilder::new("Holder")
            .extends(ICED)
            .named_field("p", "Point")
            .build(),
    )
    .unwrap();

    let empty = reg.new_instance("Holder").unwrap();
    assert_eq!(reg.encode(&empty).unwrap(), [0, 0]);

    let p3 = reg.new_instance("Point3").unwrap();
    let holder = reg.new_instance("Holder").unwrap().init("p", p3).unwrap();
    let bytes = reg.encode(&holder).unwrap();
    let tag = reg.type_id("Point3").unwrap().0.to_le_bytes();
    assert_eq!(&bytes[..2], &tag);
    assert_eq!(bytes.len(), 2 + 12);
}

#[test]
fn test_nested_tag_of_unrelated_type_rejected() {
    let reg = registry();
    define_geometry(&reg);
    reg.define(
        TypeDefBuilder::new("Holder")
            .extends(ICED)
            .named_field("p", "Point")
            .build(),
    )
    .unwrap();

    let mut ab = AutoBuffer::new();
    ab.put2(reg.type_id("Shape").unwrap().0);
    let err = reg.decode("Holder", ab.as_bytes()).unwrap_err();
    assert!(matches!(err, WeaveError::Decode(ref msg) if msg.contains("not a Point")));
}

#[test]
fn test_self_referencing_nesting_is_bounded() {
    let reg = registry();
    reg.define(
        TypeDefBuilder::new("Node")
            .extends(ICED)
            .named_field("next", "Node")
            .build(),
    )
    .unwrap();

    let chain = (0..3).fold(reg.new_instance("Node").unwrap(), |next, _| {
        reg.new_instance("Node").unwrap().init("next", next).unwrap()
    });
    let bytes = reg.encode(&chain).unwrap();
    assert_eq!(bytes.len(), 4 * 2);
    assert_eq!(reg.decode("Node", &bytes).unwrap(), chain);

    // A tag chain far deeper than any real instance fails cleanly.
    let tag = reg.type_id("Node").unwrap().0;
    let mut ab = AutoBuffer::new();
    for _ in 0..100_000 {
        ab.put2(tag);
    }
    let err = reg.decode("Node", ab.as_bytes()).unwrap_err();
    assert!(matches!(err, WeaveError::Decode(ref msg) if msg.contains("nested deeper")));
}

#[test]
fn test_enum_ordinals() {
    let reg = registry();
    define_geometry(&reg);
    let shape = reg
        .new_instance("Shape")
        .unwrap()
        .init("color", Value::Enum("BLUE".into()))
        .unwrap();
    let bytes = reg.encode(&shape).unwrap();
    // null name, then ordinal 2
    assert_eq!(bytes, [0xff, 0xff, 0xff, 0xff, 2, 0, 0, 0]);

    let mut bad = bytes.clone();
    bad[4] = 3;
    let err = reg.decode("Shape", &bad).unwrap_err();
    assert!(matches!(err, WeaveError::Decode(ref msg) if msg.contains("out of range")));

    let codec = reg.codec_for("Shape").unwrap();
    let table = codec.enum_table("Color").unwrap();
    assert_eq!(table.constant(0).unwrap(), "RED");
    assert!(table.constant(-2).is_err());
}

#[test]
fn test_unknown_enum_constant_rejected_on_write() {
    let reg = registry();
    define_geometry(&reg);
    let shape = reg
        .new_instance("Shape")
        .unwrap()
        .init("color", Value::Enum("PURPLE".into()))
        .unwrap();
    assert!(matches!(reg.encode(&shape), Err(WeaveError::Encode(_))));
}

#[test]
fn test_two_dimensional_array_unsupported() {
    let reg = registry();
    reg.define(
        TypeDefBuilder::new("Grid")
            .extends(ICED)
            .array_field("cells", TypeRef::array_of(ScalarKind::Int.into()))
            .build(),
    )
    .unwrap();
    let err = reg.codec_for("Grid").unwrap_err();
    assert!(matches!(err, WeaveError::UnsupportedField { ref field, .. } if field == "cells"));
    // No partial codec is left behind.
    let id = reg.type_id("Grid").unwrap();
    assert!(!reg.is_active(id));
}

#[test]
fn test_field_of_unknown_type_unsupported() {
    let reg = registry();
    reg.define(TypeDefBuilder::new("Plain").build()).unwrap();
    reg.define(
        TypeDefBuilder::new("User")
            .extends(ICED)
            .named_field("plain", "Plain")
            .build(),
    )
    .unwrap();
    assert!(matches!(
        reg.codec_for("User"),
        Err(WeaveError::UnsupportedField { .. })
    ));
}

#[test]
fn test_reserved_field_outside_roots() {
    let reg = registry();
    reg.define(
        TypeDefBuilder::new("Sneaky")
            .extends(ICED)
            .scalar_field("__type_id", ScalarKind::Short)
            .build(),
    )
    .unwrap();
    assert!(matches!(reg.codec_for("Sneaky"), Err(WeaveError::Config(_))));
}

// ----------------------------------------------------------------------
// Text form
// ----------------------------------------------------------------------

fn define_text_types(reg: &TypeRegistry) {
    reg.with_natives(|natives| {
        natives
            .register_static_writer("quiet", |_, _| Ok(()))
            .register_static_writer("loud", |_, ab| {
                ab.put_ascii("\"extra\":true");
                Ok(())
            })
            .register_instance_writer("loud_final", |_, ab| {
                ab.put_ascii("\"extra\":true");
                Ok(())
            });
    });
    reg.define(
        TypeDefBuilder::new("Base")
            .extends(ICED)
            .scalar_field("a", ScalarKind::Int)
            .field_def(FieldDef::new("hidden", ScalarKind::Int).hidden_from_text())
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Quiet")
            .extends("Base")
            .static_override("write_json_impl", "quiet")
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Loud")
            .extends("Base")
            .static_override("write_json_impl", "loud")
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Bare")
            .extends(ICED)
            .final_override("write_json_impl", "loud_final")
            .build(),
    )
    .unwrap();
    reg.define(TypeDefBuilder::new("Empty").extends(ICED).build()).unwrap();
    reg.define(
        TypeDefBuilder::new("AfterEmpty")
            .extends("Empty")
            .scalar_field("b", ScalarKind::Int)
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Sub")
            .extends("Base")
            .scalar_field("c", ScalarKind::Boolean)
            .build(),
    )
    .unwrap();
}

fn text_of(reg: &TypeRegistry, name: &str) -> String {
    let mut inst = reg.new_instance(name).unwrap();
    if inst.layout().slot_index("a").is_some() {
        inst.set("a", 1).unwrap();
    }
    reg.encode_text(&inst).unwrap()
}

#[test]
fn test_text_separators() {
    let reg = registry();
    define_text_types(&reg);
    assert_eq!(text_of(&reg, "Base"), r#"{"a":1}"#);
    assert_eq!(text_of(&reg, "Sub"), r#"{"a":1,"c":false}"#);
    assert_eq!(text_of(&reg, "Empty"), "{}");
    assert_eq!(text_of(&reg, "AfterEmpty"), r#"{"b":0}"#);
}

#[test]
fn test_text_override_separators() {
    let reg = registry();
    define_text_types(&reg);
    // The separator written before an empty override is taken back.
    assert_eq!(text_of(&reg, "Quiet"), r#"{"a":1}"#);
    assert_eq!(text_of(&reg, "Loud"), r#"{"a":1,"extra":true}"#);
    assert_eq!(text_of(&reg, "Bare"), r#"{"extra":true}"#);
}

#[test]
fn test_text_read() {
    let reg = registry();
    define_text_types(&reg);

    let sub = reg.decode_text("Sub", r#"{"c":true,"a":7}"#).unwrap();
    assert_eq!(sub.get("a").unwrap(), &Value::Int(7));
    assert_eq!(sub.get("c").unwrap(), &Value::Boolean(true));

    // Fields hidden from text are unknown keys there.
    assert!(matches!(
        reg.decode_text("Sub", r#"{"hidden":1}"#),
        Err(WeaveError::Decode(_))
    ));
    // Custom text writers may add keys of their own.
    let loud = reg.decode_text("Loud", r#"{"a":1,"extra":true}"#).unwrap();
    assert_eq!(loud.get("a").unwrap(), &Value::Int(1));
}

#[test]
fn test_text_round_trip_of_nested_and_non_finite() {
    let reg = registry();
    define_geometry(&reg);
    let poly = polygon(&reg)
        .init("area", f64::INFINITY)
        .unwrap()
        .init("center", point(&reg, 1, 1))
        .unwrap();
    let text = reg.encode_text(&poly).unwrap();
    assert!(text.contains(r#""area":"Infinity""#));
    assert!(text.contains(r#""points":[{"x":0,"y":0},{"x":4,"y":0},{"x":0,"y":3}]"#));
    assert!(text.contains(r#""meta":{"#));

    let back = reg.decode_text("Polygon", &text).unwrap();
    assert_eq!(back, poly);
}

#[test]
fn test_text_read_builds_declared_nested_type() {
    let reg = registry();
    define_geometry(&reg);
    // The text form carries no tags, so a subtype's extra keys are unknown
    // to the declared type.
    let poly = polygon(&reg);
    let text = reg.encode_text(&poly).unwrap();
    assert!(text.contains(r#""center":{"x":0,"y":0,"z":9}"#));
    assert!(matches!(
        reg.decode_text("Polygon", &text),
        Err(WeaveError::Decode(ref msg)) if msg.contains("unknown field `z`")
    ));
}

// ----------------------------------------------------------------------
// Overrides
// ----------------------------------------------------------------------

fn define_shapes(reg: &TypeRegistry) {
    reg.with_natives(|natives| {
        natives
            .register_static_writer("square_write", |inst, ab| {
                ab.put4(inst.get("side")?.as_int().unwrap_or(0));
                Ok(())
            })
            .register_static_reader("square_read", |inst, ab| {
                let side = ab.get4()?;
                inst.set("side", side)
            });
    });
    reg.define(
        TypeDefBuilder::new("AbstractShape")
            .extends(ICED)
            .abstract_()
            .scalar_field("sides", ScalarKind::Int)
            .abstract_override("write_impl")
            .abstract_override("read_impl")
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Square")
            .extends("AbstractShape")
            .scalar_field("side", ScalarKind::Int)
            .static_override("write_impl", "square_write")
            .static_override("read_impl", "square_read")
            .build(),
    )
    .unwrap();
}

#[test]
fn test_abstract_override_passes_through() {
    let reg = registry();
    define_shapes(&reg);
    let square = reg
        .new_instance("Square")
        .unwrap()
        .init("sides", 4)
        .unwrap()
        .init("side", 3)
        .unwrap();

    // The abstract layer writes nothing; only the override's bytes remain.
    let bytes = reg.encode(&square).unwrap();
    assert_eq!(bytes, [3, 0, 0, 0]);

    let back = reg.decode("Square", &bytes).unwrap();
    assert_eq!(back.get("side").unwrap(), &Value::Int(3));
    assert_eq!(back.get("sides").unwrap(), &Value::Int(0));

    // Text form is still field based.
    assert_eq!(reg.encode_text(&square).unwrap(), r#"{"sides":4,"side":3}"#);
}

#[test]
fn test_abstract_types_cannot_be_decoded() {
    let reg = registry();
    define_shapes(&reg);
    assert!(matches!(
        reg.new_instance("AbstractShape"),
        Err(WeaveError::AbstractInstantiation(_))
    ));
    assert!(matches!(
        reg.decode("AbstractShape", &[]),
        Err(WeaveError::AbstractInstantiation(_))
    ));
    let tag = reg.type_id("AbstractShape").unwrap().0.to_le_bytes();
    assert!(matches!(
        reg.decode_tagged(&tag),
        Err(WeaveError::AbstractInstantiation(_))
    ));
}

#[test]
fn test_malformed_overrides() {
    let reg = registry();
    reg.with_natives(|natives| {
        natives.register_static_writer("w", |_, _| Ok(()));
    });
    reg.define(
        TypeDefBuilder::new("Virtual")
            .extends(ICED)
            .method("write_impl", MethodModifier::Virtual, Some("w"))
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("Missing")
            .extends(ICED)
            .static_override("write_impl", "nowhere")
            .build(),
    )
    .unwrap();
    reg.define(
        TypeDefBuilder::new("WrongKind")
            .extends(ICED)
            .final_override("write_impl", "w")
            .build(),
    )
    .unwrap();

    for name in ["Virtual", "Missing", "WrongKind"] {
        let err = reg.codec_for(name).unwrap_err();
        assert!(
            matches!(err, WeaveError::MalformedOverride { ref method, .. } if method == "write_impl"),
            "{name}: {err}"
        );
    }
}

// ----------------------------------------------------------------------
// Field copy
// ----------------------------------------------------------------------

#[test]
fn test_copy_over_for_tasks_only() {
    let reg = registry();
    define_geometry(&reg);
    reg.define(
        TypeDefBuilder::new("Job")
            .extends(TASK)
            .scalar_field("count", ScalarKind::Int)
            .string_field("label")
            .field_def(FieldDef::new("secret", ScalarKind::Long).private())
            .field_def(FieldDef::new("id", ScalarKind::Int).final_())
            .build(),
    )
    .unwrap();

    let src = reg
        .new_instance("Job")
        .unwrap()
        .init("count", 3)
        .unwrap()
        .init("label", "crunch")
        .unwrap()
        .init("secret", 42i64)
        .unwrap()
        .init("id", 7)
        .unwrap();
    let mut dst = reg.new_instance("Job").unwrap();
    reg.copy_over(&mut dst, &src).unwrap();
    assert_eq!(dst, src);
    assert!(reg.codec_for("Job").unwrap().supports_copy());

    let p = point(&reg, 1, 2);
    let mut q = reg.new_instance("Point").unwrap();
    assert!(matches!(reg.copy_over(&mut q, &p), Err(WeaveError::Config(_))));
}

#[test]
fn test_compute1_dispatch() {
    let reg = registry();
    reg.define(TypeDefBuilder::new("Step").extends(TASK).build()).unwrap();
    let codec = reg.codec_for("Step").unwrap();
    assert_eq!(codec.type_name(), "Step");
    assert_eq!(codec.type_id(), reg.type_id("Step").unwrap());

    let mut runs = 0;
    let mut step = || runs += 1;
    codec.compute1(&mut step);
    codec.compute1(&mut step);
    assert_eq!(runs, 2);
}

#[test]
fn test_codec_rejects_instance_of_other_type() {
    let reg = registry();
    define_geometry(&reg);
    let p = point(&reg, 1, 1);
    let codec = reg.codec_for("Point3").unwrap();
    let mut ab = AutoBuffer::new();
    assert!(matches!(codec.write(&reg, &mut ab, &p), Err(WeaveError::Decode(_))));
}

// ----------------------------------------------------------------------
// Derived descriptions
// ----------------------------------------------------------------------

#[derive(Described)]
#[frost(name = "demo.Level")]
#[allow(dead_code)]
enum Level {
    Low,
    High,
}

#[derive(Described)]
#[frost(name = "demo.Reading", parent = "Iced", version = 3)]
#[allow(dead_code)]
struct Reading {
    pub sensor: String,
    pub samples: Vec<f32>,
    #[frost(ty = "demo.Level")]
    pub level: Level,
    #[frost(transient)]
    pub scratch: i64,
}

#[test]
fn test_derived_types_round_trip() {
    let reg = registry();
    reg.define(Level::type_def()).unwrap();
    reg.define(Reading::type_def()).unwrap();
    assert_eq!(reg.codec_for("demo.Reading").unwrap().version(), 3);

    let reading = reg
        .new_instance("demo.Reading")
        .unwrap()
        .init("sensor", "t1")
        .unwrap()
        .init("samples", vec![1.5f32, -2.0])
        .unwrap()
        .init("level", Value::Enum("High".into()))
        .unwrap();
    let back = reg.decode("demo.Reading", &reg.encode(&reading).unwrap()).unwrap();
    assert_eq!(back, reading);
    assert_eq!(
        reg.encode_text(&reading).unwrap(),
        r#"{"sensor":"t1","samples":[1.5,-2],"level":"High"}"#
    );
}
