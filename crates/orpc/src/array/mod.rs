// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-dimensional arrays and the Array Codec.
//!
//! A [`SafeArray`] carries its element kind, per-dimension
//! `(lower_bound, count)` pairs and element storage. Fixed-width scalar
//! kinds are stored and transmitted as raw little-endian bytes; every
//! other kind is stored as tagged values.
//!
//! Storage access goes through scoped guards that maintain `lock_count`.
//! A conflicting request fails with [`CodecError::Busy`](crate::CodecError::Busy)
//! instead of blocking.
//!
//! ```text
//! +--------+------------------------------+---------------------------+
//! | dims   | (lower: i32, count: u32) x n | elements, row-major       |
//! | u16    |                              | (last dimension fastest)  |
//! +--------+------------------------------+---------------------------+
//! ```

mod codec;
mod safe_array;

pub use codec::{decode, decode_into, encode, encode_elements, encoded_len};
pub use safe_array::{ArrayElements, ArrayReadGuard, ArrayWriteGuard, Bound, SafeArray};

pub(crate) use codec::{read_array, write_array};

#[cfg(test)]
mod tests;
