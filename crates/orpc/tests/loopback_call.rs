// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Proxy and stub talking over an in-process transport, the way an
// application would wire them.

use orpc::transport::LoopbackTransport;
use orpc::variant::VariantCell;
use orpc::{
    ClientCallState, Fault, FaultCode, InterfaceDescriptor, InterfaceId, Marshaler, MarshalError,
    MethodDescriptor, ObjectBuilder, ObjectTable, Proxy, Stub, TaggedValue, Transport,
    TypeDescriptor, TypeStore,
};
use std::sync::Arc;
use std::thread;

const COUNTER: InterfaceId = InterfaceId::from_u128(0xC0);
const NAMED_COUNTER: InterfaceId = InterfaceId::from_u128(0xC1);

fn store() -> Arc<TypeStore> {
    let counter = InterfaceDescriptor::builder(COUNTER, "ICounter")
        .method(
            MethodDescriptor::new("Add")
                .input("by", TypeDescriptor::I64)
                .returns(TypeDescriptor::I64),
        )
        .method(MethodDescriptor::new("Swap").in_out("value", TypeDescriptor::I64))
        .build();
    let named = InterfaceDescriptor::builder(NAMED_COUNTER, "INamedCounter")
        .inherits(&counter)
        .method(MethodDescriptor::new("Name").returns(TypeDescriptor::STRING))
        .build();

    let mut store = TypeStore::new();
    store.register(counter).unwrap();
    store.register(named).unwrap();
    store.publish()
}

fn counter_object(store: &TypeStore, total: Arc<parking_lot::Mutex<i64>>) -> orpc::DispatchObject {
    let swap_total = total.clone();
    ObjectBuilder::new(store, NAMED_COUNTER)
        .unwrap()
        .handle("Add", move |call| {
            let by = call.value("by")?.as_i64().unwrap_or_default();
            if by < 0 {
                return Err(Fault::invalid_argument("by must be positive"));
            }
            let mut total = total.lock();
            *total += by;
            call.set_return(*total)?;
            Ok(())
        })
        .unwrap()
        .handle("Swap", move |call| {
            let incoming = call.value("value")?.as_i64().unwrap_or_default();
            let mut total = swap_total.lock();
            call.set_output("value", *total)?;
            *total = incoming;
            Ok(())
        })
        .unwrap()
        .handle("Name", |call| {
            call.set_return("counter")?;
            Ok(())
        })
        .unwrap()
        .build()
}

#[test]
fn calls_through_base_and_derived_ids() {
    let store = store();
    let total = Arc::new(parking_lot::Mutex::new(0));
    let object = Arc::new(counter_object(&store, total.clone()));
    let objects = ObjectTable::new();
    objects.insert(object.clone());
    objects.insert_as(COUNTER, object);

    let (client_end, server_end) = LoopbackTransport::pair();
    let stub = Stub::new(Marshaler::new(store.clone()), objects);

    thread::scope(|s| {
        let server = s.spawn(|| stub.serve(&server_end));

        {
            let mut base = Proxy::new(Marshaler::new(store.clone()), &client_end, COUNTER).unwrap();
            let out = base.invoke_by_name("Add", &[TaggedValue::I64(5)]).unwrap();
            assert_eq!(out.into_return(), Some(TaggedValue::I64(5)));
            assert_eq!(base.state(), Some(ClientCallState::Completed));

            let mut named =
                Proxy::new(Marshaler::new(store.clone()), &client_end, NAMED_COUNTER).unwrap();
            let out = named.invoke(0, &[TaggedValue::I64(2)]).unwrap();
            assert_eq!(out.into_return(), Some(TaggedValue::I64(7)));
            let out = named.invoke_by_name("Name", &[]).unwrap();
            assert_eq!(out.into_return(), Some(TaggedValue::from("counter")));
        }
        drop(client_end);

        assert_eq!(server.join().unwrap().unwrap(), 3);
    });

    assert_eq!(*total.lock(), 7);
    let stats = stub.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.replies, 3);
    assert_eq!(stats.faults, 0);
}

#[test]
fn inout_writes_back_through_reference() {
    let store = store();
    let total = Arc::new(parking_lot::Mutex::new(100));
    let objects = ObjectTable::new();
    objects.insert(Arc::new(counter_object(&store, total.clone())));

    let (client_end, server_end) = LoopbackTransport::pair();
    let stub = Stub::new(Marshaler::new(store.clone()), objects);
    let mut proxy = Proxy::new(Marshaler::new(store), client_end, NAMED_COUNTER).unwrap();

    let cell = VariantCell::new(TaggedValue::I64(1));
    thread::scope(|s| {
        s.spawn(|| stub.serve_one(&server_end).unwrap());
        let out = proxy
            .invoke_by_name("Swap", &[TaggedValue::ByRef(cell.reference())])
            .unwrap();
        assert_eq!(out.output("value"), Some(&TaggedValue::I64(100)));
    });

    assert_eq!(cell.get(), TaggedValue::I64(100));
    assert_eq!(*total.lock(), 1);
}

#[test]
fn remote_fault_reaches_caller() {
    let store = store();
    let objects = ObjectTable::new();
    objects.insert(Arc::new(counter_object(&store, Arc::default())));

    let (client_end, server_end) = LoopbackTransport::pair();
    let stub = Stub::new(Marshaler::new(store.clone()), objects);
    let mut proxy = Proxy::new(Marshaler::new(store), client_end, NAMED_COUNTER).unwrap();

    thread::scope(|s| {
        s.spawn(|| stub.serve_one(&server_end).unwrap());
        let err = proxy
            .invoke_by_name("Add", &[TaggedValue::I64(-1)])
            .unwrap_err();
        match err {
            MarshalError::Remote { code, message } => {
                assert_eq!(code, FaultCode::InvalidArgument);
                assert!(message.contains("positive"));
            }
            other => panic!("expected remote fault, got {other:?}"),
        }
    });
    assert_eq!(stub.stats().faults, 1);
}

#[test]
fn caller_side_checks_do_not_touch_transport() {
    let store = store();
    let (client_end, server_end) = LoopbackTransport::pair();
    let mut proxy = Proxy::new(Marshaler::new(store), client_end, NAMED_COUNTER).unwrap();

    // Wrong type: i32 where i64 is declared.
    assert!(matches!(
        proxy.invoke_by_name("Add", &[TaggedValue::I32(1)]),
        Err(MarshalError::TypeMismatch { .. })
    ));
    assert!(matches!(
        proxy.invoke(9, &[]),
        Err(MarshalError::UnknownOrdinal { ordinal: 9, .. })
    ));
    assert_eq!(server_end.pending(), 0);
    assert_eq!(proxy.transport().stats().frames_sent, 0);
}
