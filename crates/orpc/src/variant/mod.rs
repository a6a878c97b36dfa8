// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagged values and the Tagged Value Codec.
//!
//! A [`TaggedValue`] is a sum type, so its discriminant and payload cannot
//! disagree. On the wire every value is a little-endian `u16`
//! [`Discriminant`] followed by a payload whose layout depends on it.
//!
//! Byref values are location references ([`VariantRef`]) into a
//! [`VariantCell`] owned elsewhere. Decoding one needs a place to put the
//! referent, supplied through [`ReferentSlots`].
//!
//! # Example
//!
//! ```rust
//! use orpc::variant::{decode, encode, size_of};
//! use orpc::TaggedValue;
//!
//! let value = TaggedValue::from("hello\0world");
//! let mut buffer = Vec::new();
//! encode(&value, &mut buffer).unwrap();
//! assert_eq!(buffer.len(), size_of(&value));
//!
//! let mut cursor = 0;
//! assert_eq!(decode(&buffer, &mut cursor).unwrap(), value);
//! assert_eq!(cursor, buffer.len());
//! ```

mod cell;
mod codec;
mod decimal;
mod value;

pub use cell::{ReferentSlots, VariantCell, VariantRef};
pub use codec::{decode, decode_with, encode, size_of, DISCRIMINANT_SIZE, MAX_NESTING};
pub use decimal::{Decimal, DecimalParseError};
pub use value::{Discriminant, InterfaceRef, Record, TaggedValue, VarType, ARRAY_FLAG, BYREF_FLAG};

pub(crate) use codec::{payload_size, read_payload, read_value, write_payload, write_value};
