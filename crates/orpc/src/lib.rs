// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # ORPC - interface-driven call marshaling
//!
//! Turns a call on an abstract interface into bytes, moves the bytes through a
//! caller-supplied [`Transport`], and rebuilds the call on the far side.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                  Proxy (caller)      |      Stub (receiver)         |
//! |   Built -> Sent -> AwaitingReply ->  |  Received -> Dispatched ->   |
//! |   Completed                          |  ReplySent                   |
//! +---------------------------------------------------------------------+
//! |                         Call Marshaler                              |
//! |   call frame: interface id | ordinal | in/inout arguments           |
//! |   reply frame: status | out/inout values | return value             |
//! +---------------------------------------------------------------------+
//! |        Tagged Value Codec         |          Array Codec            |
//! |   u16 discriminant + payload      |   u16 dims, (lb, count)*, elems |
//! +---------------------------------------------------------------------+
//! |                     Type Descriptor Store                           |
//! |   interfaces, ordinals (inherited), parameter types, records        |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use orpc::{InterfaceDescriptor, InterfaceId, Marshaler, MethodDescriptor, TaggedValue,
//!            TypeDescriptor, TypeStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let id = InterfaceId::from_u128(1);
//! let mut store = TypeStore::new();
//! store.register(
//!     InterfaceDescriptor::builder(id, "ICounter")
//!         .method(
//!             MethodDescriptor::new("Bump")
//!                 .input("by", TypeDescriptor::I32)
//!                 .output("total", TypeDescriptor::I32),
//!         )
//!         .build(),
//! )?;
//!
//! let marshaler = Marshaler::new(store.publish());
//! let frame = marshaler.marshal_call(id, 0, &[TaggedValue::I32(41)])?;
//! let call = marshaler.unmarshal_call(&frame)?;
//! assert_eq!(call.args, vec![TaggedValue::I32(41)]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules Overview
//!
//! - [`types`] - descriptors, the store, dispatch tables
//! - [`variant`] - the tagged value and its codec
//! - [`array`] - multi-dimensional arrays and their codec
//! - [`rpc`] - marshaler, proxy, stub, dispatch objects
//! - [`transport`] - the byte-exchange seam and an in-memory loopback
//! - [`identity`] - interface id allocation
//! - [`config`] - TOML interface files (feature `config`)

/// Array container with lock accounting, plus its wire codec.
pub mod array;
/// TOML interface definition files.
#[cfg(feature = "config")]
pub mod config;
/// Error types shared across layers.
pub mod error;
/// Interface identity allocation.
pub mod identity;
/// Call marshaling, proxy/stub state machines and dispatch objects.
pub mod rpc;
/// Opaque buffer exchange between caller and receiver.
pub mod transport;
/// Type descriptors and the Type Descriptor Store.
pub mod types;
/// Tagged (self-describing) values and their codec.
pub mod variant;
/// Bounds-checked little-endian reader/writer.
pub mod wire;

pub use array::{ArrayElements, ArrayReadGuard, ArrayWriteGuard, Bound, SafeArray};
pub use error::{CodecError, MarshalError, RegistryError};
pub use identity::{IdentityAllocator, RandomIdAllocator, SequentialIdAllocator};
pub use rpc::{
    CallOutput, ClientCallState, Dispatch, DispatchObject, Fault, FaultCode, Invocation,
    Marshaler, ObjectActivator, ObjectBuilder, ObjectTable, Proxy, ServerCallState, Stub,
    UnmarshaledCall,
};
pub use transport::{Buffer, Transport, TransportError};
pub use types::{
    Direction, FieldDescriptor, FloatWidth, IntWidth, InterfaceBuilder, InterfaceDescriptor,
    InterfaceId, MethodDescriptor, ParameterDescriptor, RecordDescriptor, StringEncoding,
    TypeDescriptor, TypeFingerprint, TypeStore, VTable,
};
pub use variant::{
    Decimal, Discriminant, InterfaceRef, Record, ReferentSlots, TaggedValue, VarType,
    VariantCell, VariantRef,
};

/// ORPC version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
