// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Array Codec.
//!
//! Fixed-width scalar elements are copied as raw bytes. Decimal, string,
//! interface and record elements are written as payloads without a
//! discriminant. `variant` elements are full tagged values.

use super::safe_array::{
    check_element, element_count, ArrayData, ArrayElements, ArrayStorage, Bound, SafeArray,
};
use crate::error::{CodecError, CodecResult};
use crate::variant::{
    payload_size, read_payload, read_value, size_of, write_payload, write_value, ReferentSlots,
    VarType, BYREF_FLAG, MAX_NESTING,
};
use crate::wire::{WireReader, WireWriter};

const BOUND_SIZE: usize = 8;
const HEADER_SIZE: usize = 2;

/// Append the array stream (header and elements, no discriminant).
///
/// Takes a shared lock; fails with `Busy` while an exclusive guard is alive.
/// On error `out` is restored to its previous length.
pub fn encode(array: &SafeArray, out: &mut Vec<u8>) -> CodecResult<()> {
    let start = out.len();
    let result = write_array(array, &mut WireWriter::new(out), 0);
    if result.is_err() {
        out.truncate(start);
    }
    result
}

/// Append an array stream from loose parts.
pub fn encode_elements(
    kind: VarType,
    bounds: &[Bound],
    elements: ArrayElements<'_>,
    out: &mut Vec<u8>,
) -> CodecResult<()> {
    let start = out.len();
    let result = write_elements(kind, bounds, elements, &mut WireWriter::new(out), 0);
    if result.is_err() {
        out.truncate(start);
    }
    result
}

/// Decode an array stream of `kind` at `*cursor`.
///
/// The cursor advances only on success.
pub fn decode(input: &[u8], cursor: &mut usize, kind: VarType) -> CodecResult<SafeArray> {
    if !kind.is_array_element() {
        return Err(CodecError::mismatch("array element kind", kind.name()));
    }
    let mut reader = WireReader::at(input, *cursor);
    let array = read_array(&mut reader, kind, 0)?;
    *cursor = reader.offset();
    Ok(array)
}

/// Decode into an existing array, replacing its shape and elements.
///
/// Holds the exclusive lock for the duration; fails with `Busy` if any
/// guard is alive. On failure the array is unchanged.
pub fn decode_into(array: &SafeArray, input: &[u8], cursor: &mut usize) -> CodecResult<()> {
    let mut guard = array.lock_exclusive()?;
    let mut reader = WireReader::at(input, *cursor);
    let storage = read_storage(&mut reader, array.kind(), 0)?;
    guard.replace(storage);
    *cursor = reader.offset();
    Ok(())
}

/// Exact number of bytes [`encode`] writes.
///
/// An exclusively locked array reports only its header size.
pub fn encoded_len(array: &SafeArray) -> usize {
    match array.lock() {
        Ok(guard) => elements_len(array.kind(), guard.bounds(), guard.elements()),
        Err(_) => HEADER_SIZE,
    }
}

fn elements_len(kind: VarType, bounds: &[Bound], elements: ArrayElements<'_>) -> usize {
    let body = match elements {
        ArrayElements::Raw(bytes) => bytes.len(),
        ArrayElements::Values(values) if kind == VarType::Variant => values.iter().map(size_of).sum(),
        ArrayElements::Values(values) => values.iter().map(payload_size).sum(),
    };
    HEADER_SIZE + bounds.len() * BOUND_SIZE + body
}

pub(crate) fn write_array(
    array: &SafeArray,
    w: &mut WireWriter<'_>,
    depth: usize,
) -> CodecResult<()> {
    let guard = array.lock()?;
    write_elements(array.kind(), guard.bounds(), guard.elements(), w, depth)
}

fn write_elements(
    kind: VarType,
    bounds: &[Bound],
    elements: ArrayElements<'_>,
    w: &mut WireWriter<'_>,
    depth: usize,
) -> CodecResult<()> {
    if !kind.is_array_element() {
        return Err(CodecError::mismatch("array element kind", kind.name()));
    }
    let offset = w.len();
    let dims = u16::try_from(bounds.len()).map_err(|_| CodecError::SizeOverflow { offset })?;
    let total = element_count(bounds).ok_or(CodecError::SizeOverflow { offset })?;

    match elements {
        ArrayElements::Raw(bytes) => {
            let size = kind
                .fixed_size()
                .ok_or_else(|| CodecError::mismatch("fixed-width element kind", kind.name()))?;
            if total.checked_mul(size) != Some(bytes.len()) {
                return Err(CodecError::ElementCount {
                    expected: total,
                    found: bytes.len() / size,
                });
            }
            write_header(w, dims, bounds);
            w.write_bytes(bytes);
        }
        ArrayElements::Values(values) => {
            if values.len() != total {
                return Err(CodecError::ElementCount {
                    expected: total,
                    found: values.len(),
                });
            }
            write_header(w, dims, bounds);
            for value in values {
                check_element(kind, value)?;
                if kind == VarType::Variant {
                    write_value(value, w, depth + 1)?;
                } else {
                    write_payload(value, w, depth + 1)?;
                }
            }
        }
    }
    Ok(())
}

fn write_header(w: &mut WireWriter<'_>, dims: u16, bounds: &[Bound]) {
    w.write_u16(dims);
    for bound in bounds {
        w.write_i32(bound.lower);
        w.write_u32(bound.count);
    }
}

pub(crate) fn read_array(
    r: &mut WireReader<'_>,
    kind: VarType,
    depth: usize,
) -> CodecResult<SafeArray> {
    read_storage(r, kind, depth).map(|storage| SafeArray::from_storage(kind, storage))
}

fn read_storage(r: &mut WireReader<'_>, kind: VarType, depth: usize) -> CodecResult<ArrayStorage> {
    let start = r.offset();
    if depth > MAX_NESTING {
        return Err(CodecError::invalid(start, format!("nesting deeper than {}", MAX_NESTING)));
    }
    let dims = r.read_u16()? as usize;
    if dims == 0 {
        return Ok(ArrayStorage::empty(kind));
    }

    r.require(dims * BOUND_SIZE)?;
    let mut bounds = Vec::with_capacity(dims);
    let mut total: u64 = 1;
    for _ in 0..dims {
        let lower = r.read_i32()?;
        let count = r.read_u32()?;
        total = total
            .checked_mul(u64::from(count))
            .ok_or(CodecError::SizeOverflow { offset: start })?;
        bounds.push(Bound { lower, count });
    }

    // Reject impossible sizes before touching the allocator.
    let overflow = CodecError::SizeOverflow { offset: start };
    let min_bytes = total
        .checked_mul(kind.min_element_size() as u64)
        .filter(|n| *n <= isize::MAX as u64)
        .ok_or(overflow.clone())?;
    let min_bytes = usize::try_from(min_bytes).map_err(|_| overflow.clone())?;
    let total = usize::try_from(total).map_err(|_| overflow)?;
    r.require(min_bytes)?;

    let data = if kind.fixed_size().is_some() {
        let at = r.offset();
        let bytes = r.take(min_bytes)?;
        SafeArray::check_raw_bytes(kind, bytes, at)?;
        ArrayData::Raw(bytes.to_vec())
    } else {
        let mut values = Vec::with_capacity(total);
        let mut no_slots = ReferentSlots::none();
        for _ in 0..total {
            let value = if kind == VarType::Variant {
                let at = r.offset();
                let mut peek = r.clone();
                if peek.read_u16()? & BYREF_FLAG != 0 {
                    return Err(CodecError::invalid(at, "byref array element"));
                }
                read_value(r, &mut no_slots, depth + 1)?
            } else {
                read_payload(kind, r, &mut no_slots, depth + 1)?
            };
            values.push(value);
        }
        ArrayData::Values(values)
    };

    log::trace!(
        "[array] decoded {} x {} ({} dims) in {} bytes",
        total,
        kind,
        dims,
        r.offset() - start
    );
    Ok(ArrayStorage { bounds, data })
}
