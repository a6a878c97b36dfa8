// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type Descriptor Store
//!
//! Describes interfaces, their methods and parameter shapes, and resolves
//! method ordinals through the base-interface chain.
//!
//! # Features
//!
//! - **TypeDescriptor**: recursive parameter type (scalars, pointers, arrays, records)
//! - **InterfaceBuilder**: fluent construction with automatic ordinal assignment
//! - **TypeStore**: validated registration, then lock-free shared lookup after `publish()`
//! - **VTable**: ordinal-indexed dispatch table generated from a descriptor
//! - **TypeFingerprint**: MD5 digest of the canonical layout, for drift reports
//!
//! # Example
//!
//! ```rust
//! use orpc::{InterfaceDescriptor, InterfaceId, MethodDescriptor, TypeDescriptor, TypeStore};
//!
//! let base = InterfaceDescriptor::builder(InterfaceId::from_u128(0xA), "IBase")
//!     .method(MethodDescriptor::new("Ping"))
//!     .build();
//! let derived = InterfaceDescriptor::builder(InterfaceId::from_u128(0xB), "IDerived")
//!     .inherits(&base)
//!     .method(MethodDescriptor::new("Get").returns(TypeDescriptor::STRING))
//!     .build();
//!
//! let mut store = TypeStore::new();
//! store.register(base).unwrap();
//! store.register(derived).unwrap();
//! let store = store.publish();
//!
//! // Ordinal 0 is inherited from IBase.
//! let ping = store.resolve_method(InterfaceId::from_u128(0xB), 0).unwrap();
//! assert_eq!(ping.name, "Ping");
//! ```

mod check;
mod descriptor;
mod fingerprint;
mod grammar;
mod id;
mod store;
mod vtable;

pub(crate) use check::element_kind;
pub use descriptor::{
    Direction, FieldDescriptor, FloatWidth, IntWidth, InterfaceBuilder, InterfaceDescriptor,
    MethodDescriptor, ParameterDescriptor, RecordDescriptor, StringEncoding, TypeDescriptor,
};
pub use fingerprint::TypeFingerprint;
pub use grammar::TypeParseError;
pub use id::{InterfaceId, InterfaceIdParseError};
pub use store::{Chain, TypeStore};
pub use vtable::{VTable, VTableEntry};
