// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Every strict prefix of a valid frame must fail as truncated, never panic,
// never allocate for counts the buffer cannot back, and never move the cursor.

use orpc::array;
use orpc::variant::{self, Decimal, InterfaceRef, Record};
use orpc::{
    CodecError, InterfaceDescriptor, InterfaceId, Marshaler, MethodDescriptor, RecordDescriptor,
    SafeArray, TaggedValue, TypeDescriptor, TypeStore, VarType,
};
use std::sync::Arc;

const CANVAS: InterfaceId = InterfaceId::from_u128(0xCA);

fn store() -> Arc<TypeStore> {
    let mut store = TypeStore::new();
    store
        .register_record(
            RecordDescriptor::new("Point")
                .field("x", TypeDescriptor::I32)
                .field("y", TypeDescriptor::I32),
        )
        .unwrap();
    store
        .register(
            InterfaceDescriptor::builder(CANVAS, "ICanvas")
                .method(
                    MethodDescriptor::new("Draw")
                        .input("label", TypeDescriptor::STRING)
                        .input(
                            "points",
                            TypeDescriptor::variable_array(TypeDescriptor::named("Point")),
                        )
                        .input("amount", TypeDescriptor::DECIMAL)
                        .input("owner", TypeDescriptor::interface(InterfaceId::NIL))
                        .input("extra", TypeDescriptor::VARIANT)
                        .returns(TypeDescriptor::BOOL),
                )
                .build(),
        )
        .unwrap();
    store.publish()
}

fn point(x: i32, y: i32) -> TaggedValue {
    TaggedValue::Record(Record::new("Point").with("x", x).with("y", y))
}

fn draw_args() -> Vec<TaggedValue> {
    let points = SafeArray::vector(VarType::Record, vec![point(1, 2), point(-3, 4)]).unwrap();
    let extra = SafeArray::vector(
        VarType::Variant,
        vec![TaggedValue::from("x"), TaggedValue::F64(0.5), TaggedValue::Null],
    )
    .unwrap();
    vec![
        TaggedValue::from("triangle"),
        TaggedValue::Array(points),
        TaggedValue::Decimal("-12.345".parse::<Decimal>().unwrap()),
        TaggedValue::Interface(InterfaceRef::new(CANVAS, 7)),
        TaggedValue::Array(extra),
    ]
}

#[test]
fn call_frame_prefixes_are_truncated() {
    let marshaler = Marshaler::new(store());
    let frame = marshaler.marshal_call(CANVAS, 0, &draw_args()).unwrap();
    assert_eq!(marshaler.unmarshal_call(&frame).unwrap().args, draw_args());

    for len in 0..frame.len() {
        let err = marshaler.unmarshal_call(&frame[..len]).unwrap_err();
        assert!(err.is_truncated(), "prefix {len}: {err}");
    }
}

#[test]
fn value_prefixes_leave_cursor_alone() {
    for value in draw_args() {
        let mut bytes = Vec::new();
        variant::encode(&value, &mut bytes).unwrap();
        for len in 0..bytes.len() {
            let mut cursor = 0;
            let err = variant::decode(&bytes[..len], &mut cursor).unwrap_err();
            assert!(
                matches!(err, CodecError::TruncatedBuffer { .. }),
                "{} prefix {len}: {err}",
                value.type_name()
            );
            assert_eq!(cursor, 0);
        }
    }
}

#[test]
fn reply_prefixes_are_truncated() {
    let store = store();
    let method = store.resolve_method(CANVAS, 0).unwrap();
    let marshaler = Marshaler::new(store.clone());
    let frame = marshaler
        .marshal_reply(method, &[], Some(&TaggedValue::Bool(true)))
        .unwrap();

    for len in 0..frame.len() {
        let err = marshaler.unmarshal_reply(&frame[..len], method).unwrap_err();
        assert!(err.is_truncated(), "prefix {len}: {err}");
    }
}

#[test]
fn huge_declared_count_fails_before_allocating() {
    // One dimension of u32::MAX strings with no element bytes behind it.
    let mut bytes = vec![0x01, 0x00];
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());

    let mut cursor = 0;
    let err = array::decode(&bytes, &mut cursor, VarType::String).unwrap_err();
    assert!(matches!(err, CodecError::TruncatedBuffer { .. }), "{err}");
    assert_eq!(cursor, 0);

    let err = array::decode(&bytes, &mut cursor, VarType::F64).unwrap_err();
    assert!(
        matches!(
            err,
            CodecError::TruncatedBuffer { .. } | CodecError::SizeOverflow { .. }
        ),
        "{err}"
    );
}
