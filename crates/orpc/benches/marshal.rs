// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::cast_possible_truncation)] // Bench parameters
#![allow(clippy::missing_panics_doc)] // Benches panic on failure

//! Marshaling throughput
//!
//! - Tagged value encode/decode for scalars, strings and records
//! - Array codec for fixed-width and payload elements
//! - Full call marshal/unmarshal and method lookup on a deep chain

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use orpc::array;
use orpc::variant::{self, Record};
use orpc::{
    InterfaceDescriptor, InterfaceId, Marshaler, MethodDescriptor, SafeArray, TaggedValue,
    TypeDescriptor, TypeStore, VarType,
};
use std::sync::Arc;

fn chain_store(depth: u32) -> Arc<TypeStore> {
    let mut store = TypeStore::new();
    let mut previous: Option<InterfaceDescriptor> = None;
    for level in 0..depth {
        let id = InterfaceId::from_u128(0x1000 + u128::from(level));
        let mut builder = InterfaceDescriptor::builder(id, format!("ILevel{level}"));
        if let Some(base) = &previous {
            builder = builder.inherits(base);
        }
        let desc = builder
            .method(
                MethodDescriptor::new(format!("Op{level}"))
                    .input("name", TypeDescriptor::STRING)
                    .input("values", TypeDescriptor::variable_array(TypeDescriptor::F64))
                    .returns(TypeDescriptor::I32),
            )
            .build();
        store.register(desc.clone()).expect("register");
        previous = Some(desc);
    }
    store.publish()
}

// ============================================================================
// Tagged values
// ============================================================================

fn bench_variant(c: &mut Criterion) {
    let mut group = c.benchmark_group("variant");

    let samples = [
        ("i32", TaggedValue::I32(41)),
        ("string", TaggedValue::from("hello world, this is a string")),
        (
            "record",
            TaggedValue::Record(
                Record::new("Point")
                    .with("x", 1i32)
                    .with("y", 2i32)
                    .with("label", "origin"),
            ),
        ),
    ];

    for (name, value) in &samples {
        let mut encoded = Vec::new();
        variant::encode(value, &mut encoded).expect("encode");
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", name), value, |b, value| {
            let mut out = Vec::with_capacity(encoded.len());
            b.iter(|| {
                out.clear();
                variant::encode(black_box(value), &mut out).expect("encode");
            });
        });

        group.bench_with_input(BenchmarkId::new("decode", name), &encoded, |b, encoded| {
            b.iter(|| {
                let mut cursor = 0;
                black_box(variant::decode(black_box(encoded), &mut cursor).expect("decode"))
            });
        });
    }
    group.finish();
}

// ============================================================================
// Arrays
// ============================================================================

fn bench_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("array");

    for count in [16usize, 1024, 65_536] {
        let values: Vec<TaggedValue> = (0..count).map(|i| TaggedValue::F64(i as f64)).collect();
        let array = SafeArray::vector(VarType::F64, values).expect("vector");
        let mut encoded = Vec::new();
        array::encode(&array, &mut encoded).expect("encode");
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode_f64", count), &array, |b, array| {
            let mut out = Vec::with_capacity(encoded.len());
            b.iter(|| {
                out.clear();
                array::encode(black_box(array), &mut out).expect("encode");
            });
        });

        group.bench_with_input(BenchmarkId::new("decode_f64", count), &encoded, |b, encoded| {
            b.iter(|| {
                let mut cursor = 0;
                black_box(array::decode(black_box(encoded), &mut cursor, VarType::F64).expect("decode"))
            });
        });
    }

    let strings: Vec<TaggedValue> = (0..256).map(|i| TaggedValue::String(format!("item-{i}"))).collect();
    let array = SafeArray::vector(VarType::String, strings).expect("vector");
    group.bench_function("encode_string_256", |b| {
        let mut out = Vec::new();
        b.iter(|| {
            out.clear();
            array::encode(black_box(&array), &mut out).expect("encode");
        });
    });

    group.finish();
}

// ============================================================================
// Calls
// ============================================================================

fn bench_call(c: &mut Criterion) {
    let mut group = c.benchmark_group("call");
    let store = chain_store(32);
    let leaf = InterfaceId::from_u128(0x1000 + 31);
    let marshaler = Marshaler::new(store.clone());

    let values: Vec<TaggedValue> = (0..128).map(|i| TaggedValue::F64(f64::from(i))).collect();
    let args = [
        TaggedValue::from("bench"),
        TaggedValue::Array(SafeArray::vector(VarType::F64, values).expect("vector")),
    ];

    group.bench_function("marshal", |b| {
        b.iter(|| black_box(marshaler.marshal_call(leaf, 0, black_box(&args)).expect("marshal")));
    });

    let frame = marshaler.marshal_call(leaf, 0, &args).expect("marshal");
    group.bench_function("unmarshal", |b| {
        b.iter(|| black_box(marshaler.unmarshal_call(black_box(&frame)).expect("unmarshal")));
    });

    for ordinal in [0u32, 31] {
        group.bench_with_input(BenchmarkId::new("resolve_method", ordinal), &ordinal, |b, &ordinal| {
            b.iter(|| black_box(store.resolve_method(black_box(leaf), ordinal)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_variant, bench_array, bench_call);
criterion_main!(benches);
