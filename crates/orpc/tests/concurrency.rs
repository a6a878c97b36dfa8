// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Shared store and stub under parallel load.

use orpc::transport::LoopbackTransport;
use orpc::{
    InterfaceDescriptor, InterfaceId, MarshalError, Marshaler, MethodDescriptor, ObjectBuilder,
    ObjectTable, Proxy, SafeArray, Stub, TaggedValue, TypeDescriptor, TypeStore, VarType,
};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const CALLS_PER_THREAD: usize = 200;

fn chain_store(depth: u32) -> Arc<TypeStore> {
    let mut store = TypeStore::new();
    let mut previous: Option<InterfaceDescriptor> = None;
    for level in 0..depth {
        let id = InterfaceId::from_u128(0x100 + u128::from(level));
        let mut builder = InterfaceDescriptor::builder(id, format!("ILevel{level}"));
        if let Some(base) = &previous {
            builder = builder.inherits(base);
        }
        let desc = builder
            .method(
                MethodDescriptor::new(format!("Op{level}"))
                    .input("values", TypeDescriptor::variable_array(TypeDescriptor::I32))
                    .returns(TypeDescriptor::I64),
            )
            .build();
        store.register(desc.clone()).unwrap();
        previous = Some(desc);
    }
    store.publish()
}

#[test]
fn parallel_lookups_agree() {
    let store = chain_store(16);
    let leaf = InterfaceId::from_u128(0x10F);
    let barrier = Arc::new(Barrier::new(THREADS));

    thread::scope(|s| {
        for t in 0..THREADS {
            let store = store.clone();
            let barrier = barrier.clone();
            s.spawn(move || {
                barrier.wait();
                for i in 0..1_000u32 {
                    let ordinal = (i + t as u32) % 16;
                    let method = store.resolve_method(leaf, ordinal).unwrap();
                    assert_eq!(method.ordinal, ordinal);
                    assert_eq!(method.name, format!("Op{ordinal}"));
                    assert!(store.resolve_method(leaf, 16).is_none());
                }
            });
        }
    });
}

#[test]
fn parallel_marshal_is_deterministic() {
    let store = chain_store(4);
    let leaf = InterfaceId::from_u128(0x103);
    let values: Vec<TaggedValue> = (0..64).map(TaggedValue::I32).collect();
    let array = TaggedValue::Array(SafeArray::vector(VarType::I32, values).unwrap());
    let reference = Marshaler::new(store.clone())
        .marshal_call(leaf, 2, std::slice::from_ref(&array))
        .unwrap();

    thread::scope(|s| {
        for _ in 0..THREADS {
            let marshaler = Marshaler::new(store.clone());
            let array = &array;
            let reference = &reference;
            s.spawn(move || {
                for _ in 0..CALLS_PER_THREAD {
                    let frame = marshaler
                        .marshal_call(leaf, 2, std::slice::from_ref(array))
                        .unwrap();
                    assert_eq!(&frame, reference);
                    let call = marshaler.unmarshal_call(&frame).unwrap();
                    assert_eq!(call.args[0], *array);
                }
            });
        }
    });
    // Shared locks were all released.
    assert_eq!(array.as_array().unwrap().lock_count(), 0);
}

#[test]
fn many_proxies_one_stub() {
    let store = chain_store(2);
    let leaf = InterfaceId::from_u128(0x101);
    let object = ObjectBuilder::new(&store, leaf)
        .unwrap()
        .handle("Op0", |call| {
            let values = call.value("values")?;
            let elements = match values.as_array() {
                Some(array) => array.to_values().map_err(MarshalError::from)?,
                None => Vec::new(),
            };
            let sum: i64 = elements
                .iter()
                .filter_map(TaggedValue::as_i32)
                .map(i64::from)
                .sum();
            call.set_return(sum)?;
            Ok(())
        })
        .unwrap()
        .build();
    let objects = ObjectTable::new();
    objects.insert(Arc::new(object));
    let stub = Stub::new(Marshaler::new(store.clone()), objects);

    thread::scope(|s| {
        for t in 0..THREADS {
            let (client_end, server_end) = LoopbackTransport::pair();
            let stub = &stub;
            s.spawn(move || stub.serve(&server_end).unwrap());

            let store = store.clone();
            s.spawn(move || {
                let mut proxy = Proxy::new(Marshaler::new(store), client_end, leaf).unwrap();
                for n in 0..CALLS_PER_THREAD as i32 {
                    let values = vec![TaggedValue::I32(n), TaggedValue::I32(t as i32)];
                    let arg = TaggedValue::Array(SafeArray::vector(VarType::I32, values).unwrap());
                    let out = proxy.invoke(0, &[arg]).unwrap();
                    let expected = i64::from(n) + t as i64;
                    assert_eq!(out.into_return(), Some(TaggedValue::I64(expected)));
                }
            });
        }
    });

    let stats = stub.stats();
    assert_eq!(stats.received, (THREADS * CALLS_PER_THREAD) as u64);
    assert_eq!(stats.faults, 0);
}
