// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Array codec tests: layouts, shapes, size limits and lock conflicts.

use super::*;
use crate::error::CodecError;
use crate::types::InterfaceId;
use crate::variant::{Decimal, InterfaceRef, Record, TaggedValue, VarType, VariantCell};

fn encoded(array: &SafeArray) -> Vec<u8> {
    let mut out = Vec::new();
    encode(array, &mut out).expect("encode");
    assert_eq!(out.len(), encoded_len(array));
    out
}

fn round_trip(array: &SafeArray) -> SafeArray {
    let bytes = encoded(array);
    let mut cursor = 0;
    let decoded = decode(&bytes, &mut cursor, array.kind()).expect("decode");
    assert_eq!(cursor, bytes.len());
    decoded
}

#[test]
fn test_scenario_three_int32_elements() {
    let array = SafeArray::vector(
        VarType::I32,
        vec![TaggedValue::I32(1), TaggedValue::I32(2), TaggedValue::I32(3)],
    )
    .expect("vector");

    let bytes = encoded(&array);
    assert_eq!(
        bytes,
        [
            1, 0, // dims
            0, 0, 0, 0, 3, 0, 0, 0, // (lower 0, count 3)
            1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0,
        ]
    );

    let decoded = round_trip(&array);
    assert_eq!(
        decoded.to_values().expect("values"),
        vec![TaggedValue::I32(1), TaggedValue::I32(2), TaggedValue::I32(3)]
    );
}

#[test]
fn test_zero_dimensions_is_canonical_empty() {
    let empty = SafeArray::empty(VarType::F64);
    let bytes = encoded(&empty);
    assert_eq!(bytes, [0, 0]);

    let decoded = round_trip(&empty);
    assert_eq!(decoded, empty);
    assert!(decoded.bounds().expect("bounds").is_empty());

    // Zero dims with elements is inconsistent.
    let mut out = Vec::new();
    let err = encode_elements(
        VarType::I32,
        &[],
        ArrayElements::Values(&[TaggedValue::I32(1)]),
        &mut out,
    )
    .unwrap_err();
    assert_eq!(err, CodecError::ElementCount { expected: 0, found: 1 });
    assert!(out.is_empty());
}

#[test]
fn test_zero_count_dimension_is_not_canonical_empty() {
    let array = SafeArray::new(VarType::I16, vec![Bound::zero_based(0)], vec![]).expect("new");
    let decoded = round_trip(&array);
    assert_eq!(decoded.bounds().expect("bounds"), vec![Bound::zero_based(0)]);
    assert_ne!(decoded, SafeArray::empty(VarType::I16));
}

#[test]
fn test_multi_dimensional_round_trips() {
    let mut rng = fastrand::Rng::with_seed(0x5AFE);
    for dims in 1..=4usize {
        let bounds: Vec<Bound> = (0..dims)
            .map(|_| Bound::new(rng.i32(-5..5), rng.u32(0..4)))
            .collect();
        let total: usize = bounds.iter().map(|b| b.count as usize).product();
        let values: Vec<TaggedValue> = (0..total).map(|_| TaggedValue::F32(rng.f32())).collect();

        let array = SafeArray::new(VarType::F32, bounds.clone(), values.clone()).expect("new");
        let decoded = round_trip(&array);
        assert_eq!(decoded.bounds().expect("bounds"), bounds);
        assert_eq!(decoded.to_values().expect("values"), values);
    }
}

#[test]
fn test_payload_kinds_without_discriminant() {
    let strings = SafeArray::vector(
        VarType::String,
        vec![TaggedValue::from("ab"), TaggedValue::from("")],
    )
    .expect("vector");
    let bytes = encoded(&strings);
    assert_eq!(
        &bytes[10..],
        [2, 0, 0, 0, b'a', b'b', 0, 0, 0, 0],
        "strings are length-prefixed payloads"
    );
    assert_eq!(round_trip(&strings), strings);

    let iid = InterfaceId::from_u128(0xABCD);
    let ifaces = SafeArray::vector(
        VarType::Interface,
        vec![TaggedValue::Interface(InterfaceRef::new(iid, 1))],
    )
    .expect("vector");
    assert_eq!(encoded(&ifaces).len(), 2 + 8 + 24);
    assert_eq!(round_trip(&ifaces), ifaces);

    let decimals = SafeArray::vector(
        VarType::Decimal,
        vec![TaggedValue::Decimal("-1.50".parse::<Decimal>().expect("decimal"))],
    )
    .expect("vector");
    assert_eq!(round_trip(&decimals), decimals);
}

#[test]
fn test_record_and_variant_elements() {
    let records = SafeArray::vector(
        VarType::Record,
        vec![
            TaggedValue::Record(Record::new("Point").with("x", 1i32).with("y", 2i32)),
            TaggedValue::Record(Record::new("Point").with("x", 3i32).with("y", 4i32)),
        ],
    )
    .expect("vector");
    assert_eq!(round_trip(&records), records);

    let nested = SafeArray::vector(VarType::U8, vec![TaggedValue::U8(9)]).expect("vector");
    let variants = SafeArray::vector(
        VarType::Variant,
        vec![
            TaggedValue::I32(1),
            TaggedValue::from("two"),
            TaggedValue::Empty,
            TaggedValue::Array(nested),
        ],
    )
    .expect("vector");
    assert_eq!(round_trip(&variants), variants);
}

#[test]
fn test_raw_elements_from_bytes() {
    let mut out = Vec::new();
    encode_elements(
        VarType::U16,
        &[Bound::zero_based(2)],
        ArrayElements::Raw(&[1, 0, 2, 0]),
        &mut out,
    )
    .expect("encode raw");
    let decoded = decode(&out, &mut 0, VarType::U16).expect("decode");
    assert_eq!(
        decoded.to_values().expect("values"),
        vec![TaggedValue::U16(1), TaggedValue::U16(2)]
    );

    let err = encode_elements(
        VarType::U16,
        &[Bound::zero_based(2)],
        ArrayElements::Raw(&[1, 0, 2]),
        &mut out,
    )
    .unwrap_err();
    assert!(matches!(err, CodecError::ElementCount { .. }));
}

#[test]
fn test_huge_count_is_size_overflow() {
    // Two dimensions of u32::MAX elements of u64.
    let mut bytes = vec![2, 0];
    for _ in 0..2 {
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    }
    let mut cursor = 0;
    assert_eq!(
        decode(&bytes, &mut cursor, VarType::U64).unwrap_err(),
        CodecError::SizeOverflow { offset: 0 }
    );
    assert_eq!(cursor, 0);
}

#[test]
fn test_declared_count_beyond_buffer_is_truncation() {
    let mut bytes = vec![1, 0];
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&1_000_000u32.to_le_bytes());
    bytes.extend_from_slice(&[0; 16]);
    assert!(matches!(
        decode(&bytes, &mut 0, VarType::I32),
        Err(CodecError::TruncatedBuffer { .. })
    ));
}

#[test]
fn test_truncated_at_every_offset() {
    let array = SafeArray::vector(
        VarType::Variant,
        vec![
            TaggedValue::from("text"),
            TaggedValue::Record(Record::new("R").with("a", 1u64)),
        ],
    )
    .expect("vector");
    let bytes = encoded(&array);
    for end in 0..bytes.len() {
        let mut cursor = 0;
        let err = decode(&bytes[..end], &mut cursor, VarType::Variant).unwrap_err();
        assert!(
            matches!(err, CodecError::TruncatedBuffer { .. }),
            "offset {}: {:?}",
            end,
            err
        );
        assert_eq!(cursor, 0);
    }
}

#[test]
fn test_bool_elements_are_validated() {
    let mut bytes = vec![1, 0];
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&2u32.to_le_bytes());
    bytes.extend_from_slice(&[1, 7]);
    assert!(matches!(
        decode(&bytes, &mut 0, VarType::Bool),
        Err(CodecError::InvalidPayload { offset: 11, .. })
    ));
}

#[test]
fn test_byref_variant_element_is_rejected() {
    let mut bytes = vec![1, 0];
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    bytes.extend_from_slice(&[0x03, 0x40, 1, 0, 0, 0]);
    assert!(matches!(
        decode(&bytes, &mut 0, VarType::Variant),
        Err(CodecError::InvalidPayload { .. })
    ));
}

#[test]
fn test_byref_inside_record_element_is_rejected() {
    let cell = VariantCell::new(TaggedValue::I32(1));
    let holder = TaggedValue::Record(
        Record::new("R")
            .with("plain", 2i32)
            .with(
                "inner",
                TaggedValue::Record(Record::new("S").with("f", TaggedValue::ByRef(cell.reference()))),
            ),
    );

    for kind in [VarType::Variant, VarType::Record] {
        assert!(
            matches!(
                SafeArray::vector(kind, vec![holder.clone()]),
                Err(CodecError::TypeMismatch { .. })
            ),
            "{:?}",
            kind
        );
    }

    let owned = TaggedValue::Record(Record::new("R").with("plain", 2i32));
    let array = SafeArray::vector(VarType::Variant, vec![owned.clone()]).expect("vector");
    {
        let mut guard = array.lock_exclusive().expect("exclusive");
        assert!(guard.put(&[0], holder).is_err());
    }
    assert_eq!(round_trip(&array).to_values().expect("values"), vec![owned]);
}

#[test]
fn test_encode_while_exclusively_locked_is_busy() {
    let array = SafeArray::vector(VarType::I32, vec![TaggedValue::I32(5)]).expect("vector");
    let guard = array.lock_exclusive().expect("exclusive");

    let mut out = vec![0xEE];
    assert_eq!(
        encode(&array, &mut out),
        Err(CodecError::Busy { lock_count: 1 })
    );
    assert_eq!(out, [0xEE]);
    drop(guard);

    encode(&array, &mut out).expect("encode after release");
}

#[test]
fn test_decode_into_needs_exclusive_lock() {
    let source = SafeArray::vector(VarType::I32, vec![TaggedValue::I32(1), TaggedValue::I32(2)])
        .expect("vector");
    let bytes = encoded(&source);

    let target = SafeArray::empty(VarType::I32);
    {
        let _reader = target.lock().expect("reader");
        assert!(matches!(
            decode_into(&target, &bytes, &mut 0),
            Err(CodecError::Busy { .. })
        ));
    }

    let mut cursor = 0;
    decode_into(&target, &bytes, &mut cursor).expect("decode_into");
    assert_eq!(cursor, bytes.len());
    assert_eq!(target, source);
    assert_eq!(target.lock_count(), 0);

    // A failed decode leaves the target untouched.
    assert!(decode_into(&target, &bytes[..bytes.len() - 1], &mut 0).is_err());
    assert_eq!(target, source);
}

#[test]
fn test_shared_locks_allow_concurrent_encoding() {
    let array = SafeArray::vector(VarType::U32, (0..64).map(TaggedValue::U32).collect())
        .expect("vector");
    let _held = array.lock().expect("reader");
    let a = encoded(&array);
    let b = encoded(&array);
    assert_eq!(a, b);
}
