// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Call marshaling across a process or machine boundary.
//!
//! # Overview
//!
//! - [`Marshaler`] turns a call (interface id, ordinal, arguments) into a
//!   frame and back, checking every value against the method descriptor
//! - [`Proxy`] is the caller: marshal, send, wait, unmarshal, write back
//! - [`Stub`] is the receiver: unmarshal, activate, dispatch, reply
//! - [`ObjectBuilder`] binds handlers to methods by name and produces a
//!   [`Dispatch`] implementation
//!
//! # Example
//!
//! ```rust
//! use orpc::transport::LoopbackTransport;
//! use orpc::{InterfaceDescriptor, InterfaceId, Marshaler, MethodDescriptor, ObjectBuilder,
//!            ObjectTable, Proxy, Stub, TaggedValue, TypeDescriptor, TypeStore};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let id = InterfaceId::from_u128(0x42);
//! let mut store = TypeStore::new();
//! store.register(
//!     InterfaceDescriptor::builder(id, "IAdder")
//!         .method(
//!             MethodDescriptor::new("Add")
//!                 .input("a", TypeDescriptor::I32)
//!                 .input("b", TypeDescriptor::I32)
//!                 .returns(TypeDescriptor::I32),
//!         )
//!         .build(),
//! )?;
//! let store = store.publish();
//!
//! let adder = ObjectBuilder::new(&store, id)?
//!     .handle("Add", |call| {
//!         let a = call.value("a")?.as_i32().unwrap_or_default();
//!         let b = call.value("b")?.as_i32().unwrap_or_default();
//!         call.set_return(a + b)?;
//!         Ok(())
//!     })?
//!     .build();
//! let objects = ObjectTable::new();
//! objects.insert(Arc::new(adder));
//!
//! let (client_end, server_end) = LoopbackTransport::pair();
//! let stub = Stub::new(Marshaler::new(store.clone()), objects);
//! let mut proxy = Proxy::new(Marshaler::new(store), client_end, id)?;
//!
//! std::thread::scope(|s| {
//!     s.spawn(|| stub.serve_one(&server_end));
//!     let out = proxy.invoke_by_name("Add", &[TaggedValue::I32(2), TaggedValue::I32(40)]);
//!     assert_eq!(out.unwrap().into_return(), Some(TaggedValue::I32(42)));
//! });
//! # Ok(())
//! # }
//! ```

mod dispatch;
mod fault;
mod marshal;
mod proxy;
mod stub;

pub use dispatch::{Dispatch, DispatchObject, Invocation, ObjectActivator, ObjectBuilder, ObjectTable};
pub use fault::{Fault, FaultCode};
pub use marshal::{Marshaler, UnmarshaledCall, CALL_HEADER_SIZE};
pub use proxy::{CallOutput, ClientCallState, Proxy};
pub use stub::{ServerCallState, Stub, StubStats};
