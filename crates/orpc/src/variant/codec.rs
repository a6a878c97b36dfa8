// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tagged Value Codec.
//!
//! Wire layout (little-endian):
//!
//! ```text
//! +----------------+-------------------------------------------+
//! | discriminant   | payload (layout fixed per discriminant)   |
//! | u16            |                                           |
//! +----------------+-------------------------------------------+
//! ```
//!
//! Byref values carry `BYREF | referent tag` followed by the referent's
//! payload. Array payloads are delegated to the array codec.

use super::cell::ReferentSlots;
use super::decimal::{Decimal, MAX_SCALE};
use super::value::{Discriminant, InterfaceRef, Record, TaggedValue, VarType};
use crate::array;
use crate::error::{CodecError, CodecResult};
use crate::types::InterfaceId;
use crate::wire::{str_size, WireReader, WireWriter};

/// Size of the wire discriminant.
pub const DISCRIMINANT_SIZE: usize = 2;
/// Deepest record/array/byref nesting accepted by the codec.
pub const MAX_NESTING: usize = 64;

const DECIMAL_SIZE: usize = 14;
const INTERFACE_SIZE: usize = 24;
const SIGN_NEGATIVE: u8 = 0x80;

/// Append `value` to `out`.
///
/// On error `out` is restored to its previous length.
pub fn encode(value: &TaggedValue, out: &mut Vec<u8>) -> CodecResult<()> {
    let start = out.len();
    let result = write_value(value, &mut WireWriter::new(out), 0);
    if result.is_err() {
        out.truncate(start);
    }
    result
}

/// Decode one value at `*cursor`. Byref values fail with `DanglingReference`.
///
/// The cursor advances only on success.
pub fn decode(input: &[u8], cursor: &mut usize) -> CodecResult<TaggedValue> {
    decode_with(input, cursor, &mut ReferentSlots::none())
}

/// Decode one value, binding byref referents through `slots`.
pub fn decode_with(
    input: &[u8],
    cursor: &mut usize,
    slots: &mut ReferentSlots<'_>,
) -> CodecResult<TaggedValue> {
    let mut reader = WireReader::at(input, *cursor);
    let mark = slots.mark();
    match read_value(&mut reader, slots, 0) {
        Ok(value) => {
            *cursor = reader.offset();
            Ok(value)
        }
        Err(e) => {
            slots.rollback(mark);
            Err(e)
        }
    }
}

/// Exact number of bytes [`encode`] writes for `value`.
///
/// For values that cannot be encoded (dangling byref, locked array) the
/// result covers what could be measured.
pub fn size_of(value: &TaggedValue) -> usize {
    match value {
        TaggedValue::ByRef(r) => {
            DISCRIMINANT_SIZE + r.with(payload_size).unwrap_or(0)
        }
        other => DISCRIMINANT_SIZE + payload_size(other),
    }
}

/// Payload size without discriminant.
pub(crate) fn payload_size(value: &TaggedValue) -> usize {
    match value {
        TaggedValue::Empty | TaggedValue::Null => 0,
        TaggedValue::Bool(_) | TaggedValue::I8(_) | TaggedValue::U8(_) => 1,
        TaggedValue::I16(_) | TaggedValue::U16(_) => 2,
        TaggedValue::I32(_) | TaggedValue::U32(_) | TaggedValue::F32(_) | TaggedValue::Error(_) => {
            4
        }
        TaggedValue::I64(_)
        | TaggedValue::U64(_)
        | TaggedValue::F64(_)
        | TaggedValue::Currency(_)
        | TaggedValue::Date(_) => 8,
        TaggedValue::Decimal(_) => DECIMAL_SIZE,
        TaggedValue::String(s) => str_size(s),
        TaggedValue::Interface(_) => INTERFACE_SIZE,
        TaggedValue::Array(a) => array::encoded_len(a),
        TaggedValue::Record(record) => {
            str_size(&record.type_name)
                + 4
                + record
                    .fields
                    .iter()
                    .map(|(name, v)| str_size(name) + size_of(v))
                    .sum::<usize>()
        }
        TaggedValue::ByRef(_) => 0,
    }
}

fn check_depth(depth: usize, offset: usize) -> CodecResult<()> {
    if depth > MAX_NESTING {
        return Err(CodecError::invalid(
            offset,
            format!("nesting deeper than {}", MAX_NESTING),
        ));
    }
    Ok(())
}

pub(crate) fn write_value(
    value: &TaggedValue,
    w: &mut WireWriter<'_>,
    depth: usize,
) -> CodecResult<()> {
    check_depth(depth, w.len())?;
    match value {
        TaggedValue::ByRef(r) => r.with(|target| {
            if target.is_byref() {
                return Err(CodecError::invalid(w.len(), "byref to byref"));
            }
            w.write_u16(target.discriminant()?.with_byref().code());
            write_payload(target, w, depth + 1)
        })?,
        other => {
            w.write_u16(other.discriminant()?.code());
            write_payload(other, w, depth)
        }
    }
}

/// Write the payload of a non-byref value.
pub(crate) fn write_payload(
    value: &TaggedValue,
    w: &mut WireWriter<'_>,
    depth: usize,
) -> CodecResult<()> {
    match value {
        TaggedValue::Empty | TaggedValue::Null => {}
        TaggedValue::Bool(v) => w.write_u8(u8::from(*v)),
        TaggedValue::I8(v) => w.write_i8(*v),
        TaggedValue::I16(v) => w.write_i16(*v),
        TaggedValue::I32(v) => w.write_i32(*v),
        TaggedValue::I64(v) => w.write_i64(*v),
        TaggedValue::U8(v) => w.write_u8(*v),
        TaggedValue::U16(v) => w.write_u16(*v),
        TaggedValue::U32(v) => w.write_u32(*v),
        TaggedValue::U64(v) => w.write_u64(*v),
        TaggedValue::F32(v) => w.write_f32(*v),
        TaggedValue::F64(v) | TaggedValue::Date(v) => w.write_f64(*v),
        TaggedValue::Currency(v) => w.write_i64(*v),
        TaggedValue::Error(v) => w.write_u32(*v),
        TaggedValue::Decimal(d) => {
            w.write_u8(d.scale());
            w.write_u8(if d.is_negative() { SIGN_NEGATIVE } else { 0 });
            w.write_bytes(&d.mantissa().to_le_bytes()[..12]);
        }
        TaggedValue::String(s) => w.write_str(s)?,
        TaggedValue::Interface(r) => {
            w.write_u128(r.interface_id.as_u128());
            w.write_u64(r.object_id);
        }
        TaggedValue::Array(a) => array::write_array(a, w, depth + 1)?,
        TaggedValue::Record(record) => {
            w.write_str(&record.type_name)?;
            w.write_len(record.fields.len())?;
            for (name, field) in &record.fields {
                w.write_str(name)?;
                write_value(field, w, depth + 1)?;
            }
        }
        TaggedValue::ByRef(_) => {
            return Err(CodecError::invalid(w.len(), "byref value in payload position"))
        }
    }
    Ok(())
}

pub(crate) fn read_value(
    r: &mut WireReader<'_>,
    slots: &mut ReferentSlots<'_>,
    depth: usize,
) -> CodecResult<TaggedValue> {
    check_depth(depth, r.offset())?;
    let at = r.offset();
    let disc = Discriminant::from_code(r.read_u16()?, at)?;

    if disc.byref {
        let referent = read_body(disc.without_byref(), r, slots, depth + 1)?;
        return slots.bind(referent);
    }
    read_body(disc, r, slots, depth)
}

fn read_body(
    disc: Discriminant,
    r: &mut WireReader<'_>,
    slots: &mut ReferentSlots<'_>,
    depth: usize,
) -> CodecResult<TaggedValue> {
    if disc.array {
        return array::read_array(r, disc.base, depth + 1).map(TaggedValue::Array);
    }
    read_payload(disc.base, r, slots, depth)
}

/// Read the payload of a scalar, string, decimal, interface or record.
pub(crate) fn read_payload(
    kind: VarType,
    r: &mut WireReader<'_>,
    slots: &mut ReferentSlots<'_>,
    depth: usize,
) -> CodecResult<TaggedValue> {
    let at = r.offset();
    let value = match kind {
        VarType::Empty => TaggedValue::Empty,
        VarType::Null => TaggedValue::Null,
        VarType::Bool => match r.read_u8()? {
            0 => TaggedValue::Bool(false),
            1 => TaggedValue::Bool(true),
            other => return Err(CodecError::invalid(at, format!("bool byte {}", other))),
        },
        VarType::I8 => TaggedValue::I8(r.read_i8()?),
        VarType::I16 => TaggedValue::I16(r.read_i16()?),
        VarType::I32 => TaggedValue::I32(r.read_i32()?),
        VarType::I64 => TaggedValue::I64(r.read_i64()?),
        VarType::U8 => TaggedValue::U8(r.read_u8()?),
        VarType::U16 => TaggedValue::U16(r.read_u16()?),
        VarType::U32 => TaggedValue::U32(r.read_u32()?),
        VarType::U64 => TaggedValue::U64(r.read_u64()?),
        VarType::F32 => TaggedValue::F32(r.read_f32()?),
        VarType::F64 => TaggedValue::F64(r.read_f64()?),
        VarType::Date => TaggedValue::Date(r.read_f64()?),
        VarType::Currency => TaggedValue::Currency(r.read_i64()?),
        VarType::Error => TaggedValue::Error(r.read_u32()?),
        VarType::Decimal => TaggedValue::Decimal(read_decimal(r)?),
        VarType::String => TaggedValue::String(r.read_str()?),
        VarType::Interface => {
            let interface_id = InterfaceId::from_u128(r.read_u128()?);
            let object_id = r.read_u64()?;
            TaggedValue::Interface(InterfaceRef::new(interface_id, object_id))
        }
        VarType::Record => TaggedValue::Record(read_record(r, slots, depth)?),
        VarType::Variant => {
            return Err(CodecError::invalid(at, "variant kind outside an array"));
        }
    };
    Ok(value)
}

fn read_decimal(r: &mut WireReader<'_>) -> CodecResult<Decimal> {
    let at = r.offset();
    let bytes = r.take(DECIMAL_SIZE)?;
    let scale = bytes[0];
    let negative = match bytes[1] {
        0 => false,
        SIGN_NEGATIVE => true,
        other => return Err(CodecError::invalid(at + 1, format!("decimal sign byte 0x{:02x}", other))),
    };
    if scale > MAX_SCALE {
        return Err(CodecError::invalid(at, format!("decimal scale {}", scale)));
    }
    let mut mantissa = [0u8; 16];
    mantissa[..12].copy_from_slice(&bytes[2..]);
    Decimal::new(u128::from_le_bytes(mantissa), scale, negative)
        .map_err(|e| CodecError::invalid(at, e.to_string()))
}

fn read_record(
    r: &mut WireReader<'_>,
    slots: &mut ReferentSlots<'_>,
    depth: usize,
) -> CodecResult<Record> {
    let type_name = r.read_str()?;
    let count = r.read_u32()? as usize;
    // Each field is at least a name length and a discriminant.
    let min_field = 4 + DISCRIMINANT_SIZE;
    let needed = count.checked_mul(min_field).ok_or(CodecError::SizeOverflow {
        offset: r.offset(),
    })?;
    r.require(needed)?;

    let mut fields = Vec::with_capacity(count);
    for _ in 0..count {
        let name = r.read_str()?;
        let value = read_value(r, slots, depth + 1)?;
        fields.push((name, value));
    }
    Ok(Record { type_name, fields })
}
