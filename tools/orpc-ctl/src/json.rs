// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! JSON <-> tagged values.
//!
//! Conversion into tagged values is driven by the declared parameter type:
//! `5` becomes `U8(5)` for a `u8` parameter and `I64(5)` for an `i64` one.
//! Only `variant` parameters infer the kind from the JSON value.

use anyhow::{anyhow, bail, Context};
use orpc::array::{Bound, SafeArray};
use orpc::types::{FloatWidth, IntWidth, RecordDescriptor, TypeDescriptor, TypeStore};
use orpc::variant::{Decimal, InterfaceRef, Record, TaggedValue, VarType};
use orpc::InterfaceId;
use serde_json::{json, Map, Value};

const CURRENCY_SCALE: f64 = 10_000.0;

/// Convert `value` to a tagged value of type `ty`.
pub fn to_tagged(store: &TypeStore, ty: &TypeDescriptor, value: &Value) -> anyhow::Result<TaggedValue> {
    let converted = match ty {
        TypeDescriptor::Void => bail!("void has no values"),
        TypeDescriptor::Bool => TaggedValue::Bool(
            value
                .as_bool()
                .ok_or_else(|| anyhow!("expected bool, got {}", value))?,
        ),
        TypeDescriptor::Integer { width, signed } => integer(*width, *signed, value)?,
        TypeDescriptor::Float(FloatWidth::W32) => TaggedValue::F32(float(value)? as f32),
        TypeDescriptor::Float(FloatWidth::W64) => TaggedValue::F64(float(value)?),
        TypeDescriptor::Currency => TaggedValue::Currency((float(value)? * CURRENCY_SCALE).round() as i64),
        TypeDescriptor::Decimal => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                other => bail!("expected decimal string, got {}", other),
            };
            TaggedValue::Decimal(text.parse::<Decimal>().with_context(|| format!("decimal '{}'", text))?)
        }
        TypeDescriptor::Date => TaggedValue::Date(float(value)?),
        TypeDescriptor::ErrorCode => TaggedValue::Error(unsigned(value, u64::from(u32::MAX))? as u32),
        TypeDescriptor::String(_) => TaggedValue::String(
            value
                .as_str()
                .ok_or_else(|| anyhow!("expected string, got {}", value))?
                .to_string(),
        ),
        TypeDescriptor::Pointer(inner) => match value {
            Value::Null => TaggedValue::Null,
            other => to_tagged(store, inner, other)?,
        },
        TypeDescriptor::FixedArray { element, dims } => {
            let values = elements(store, element, value)?;
            let bounds: Vec<Bound> = dims.iter().map(|&d| Bound::zero_based(d)).collect();
            TaggedValue::Array(SafeArray::new(element_kind(element)?, bounds, values)?)
        }
        TypeDescriptor::VariableArray(element) => {
            let values = elements(store, element, value)?;
            TaggedValue::Array(SafeArray::vector(element_kind(element)?, values)?)
        }
        TypeDescriptor::TaggedValue => infer(value)?,
        TypeDescriptor::InterfaceRef(declared) => interface(*declared, value)?,
        TypeDescriptor::Record(layout) => record(store, layout, value)?,
        TypeDescriptor::Named(name) => {
            let layout = store
                .resolve_record(name)
                .ok_or_else(|| anyhow!("unknown record '{}'", name))?;
            record(store, layout, value)?
        }
    };
    Ok(converted)
}

/// Render a tagged value for display.
pub fn from_tagged(value: &TaggedValue) -> anyhow::Result<Value> {
    let rendered = match value {
        TaggedValue::Empty | TaggedValue::Null => Value::Null,
        TaggedValue::Bool(b) => json!(b),
        TaggedValue::I8(v) => json!(v),
        TaggedValue::I16(v) => json!(v),
        TaggedValue::I32(v) => json!(v),
        TaggedValue::I64(v) => json!(v),
        TaggedValue::U8(v) => json!(v),
        TaggedValue::U16(v) => json!(v),
        TaggedValue::U32(v) => json!(v),
        TaggedValue::U64(v) => json!(v),
        TaggedValue::F32(v) => json!(v),
        TaggedValue::F64(v) => json!(v),
        TaggedValue::Currency(v) => json!(*v as f64 / CURRENCY_SCALE),
        TaggedValue::Decimal(d) => json!(d.to_string()),
        TaggedValue::Date(v) => json!(v),
        TaggedValue::String(s) => json!(s),
        TaggedValue::Error(code) => json!(format!("0x{:08x}", code)),
        TaggedValue::Interface(r) => json!({
            "interface": r.interface_id.to_string(),
            "object": r.object_id,
        }),
        TaggedValue::Array(array) => Value::Array(
            array
                .to_values()?
                .iter()
                .map(from_tagged)
                .collect::<anyhow::Result<_>>()?,
        ),
        TaggedValue::Record(record) => {
            let mut fields = Map::new();
            for (name, field) in &record.fields {
                fields.insert(name.clone(), from_tagged(field)?);
            }
            Value::Object(fields)
        }
        TaggedValue::ByRef(_) => from_tagged(&value.deref_value()?)?,
    };
    Ok(rendered)
}

fn element_kind(element: &TypeDescriptor) -> anyhow::Result<VarType> {
    element
        .element_kind()
        .ok_or_else(|| anyhow!("'{}' cannot be an array element", element))
}

fn elements(store: &TypeStore, element: &TypeDescriptor, value: &Value) -> anyhow::Result<Vec<TaggedValue>> {
    let items = value
        .as_array()
        .ok_or_else(|| anyhow!("expected array of {}, got {}", element, value))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| to_tagged(store, element, item).with_context(|| format!("element {}", i)))
        .collect()
}

fn float(value: &Value) -> anyhow::Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow!("expected number, got {}", value))
}

fn unsigned(value: &Value, max: u64) -> anyhow::Result<u64> {
    value
        .as_u64()
        .filter(|v| *v <= max)
        .ok_or_else(|| anyhow!("expected unsigned integer <= {}, got {}", max, value))
}

fn signed(value: &Value, min: i64, max: i64) -> anyhow::Result<i64> {
    value
        .as_i64()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| anyhow!("expected integer in {}..={}, got {}", min, max, value))
}

fn integer(width: IntWidth, signed_int: bool, value: &Value) -> anyhow::Result<TaggedValue> {
    let converted = match (width, signed_int) {
        (IntWidth::W8, true) => TaggedValue::I8(signed(value, i8::MIN.into(), i8::MAX.into())? as i8),
        (IntWidth::W16, true) => TaggedValue::I16(signed(value, i16::MIN.into(), i16::MAX.into())? as i16),
        (IntWidth::W32, true) => TaggedValue::I32(signed(value, i32::MIN.into(), i32::MAX.into())? as i32),
        (IntWidth::W64, true) => TaggedValue::I64(signed(value, i64::MIN, i64::MAX)?),
        (IntWidth::W8, false) => TaggedValue::U8(unsigned(value, u8::MAX.into())? as u8),
        (IntWidth::W16, false) => TaggedValue::U16(unsigned(value, u16::MAX.into())? as u16),
        (IntWidth::W32, false) => TaggedValue::U32(unsigned(value, u32::MAX.into())? as u32),
        (IntWidth::W64, false) => TaggedValue::U64(unsigned(value, u64::MAX)?),
    };
    Ok(converted)
}

fn interface(declared: InterfaceId, value: &Value) -> anyhow::Result<TaggedValue> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("expected {{\"interface\": .., \"object\": ..}}, got {}", value))?;
    let interface_id = match object.get("interface").and_then(Value::as_str) {
        Some(text) => text.parse::<InterfaceId>()?,
        None if !declared.is_nil() => declared,
        None => bail!("missing \"interface\" for an untyped interface reference"),
    };
    let object_id = object
        .get("object")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow!("missing \"object\" handle"))?;
    Ok(TaggedValue::Interface(InterfaceRef::new(interface_id, object_id)))
}

fn record(store: &TypeStore, layout: &RecordDescriptor, value: &Value) -> anyhow::Result<TaggedValue> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("expected object for record {}, got {}", layout.name, value))?;
    if let Some(extra) = object.keys().find(|k| layout.get(k).is_none()) {
        bail!("record {} has no field '{}'", layout.name, extra);
    }

    let mut record = Record::new(&layout.name);
    for field in &layout.fields {
        let raw = object
            .get(&field.name)
            .ok_or_else(|| anyhow!("record {}: missing field '{}'", layout.name, field.name))?;
        let converted = to_tagged(store, &field.ty, raw)
            .with_context(|| format!("{}.{}", layout.name, field.name))?;
        record = record.with(&field.name, converted);
    }
    Ok(TaggedValue::Record(record))
}

/// Kind inference for `variant` parameters.
fn infer(value: &Value) -> anyhow::Result<TaggedValue> {
    let inferred = match value {
        Value::Null => TaggedValue::Null,
        Value::Bool(b) => TaggedValue::Bool(*b),
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                match i32::try_from(v) {
                    Ok(small) => TaggedValue::I32(small),
                    Err(_) => TaggedValue::I64(v),
                }
            } else if let Some(v) = n.as_u64() {
                TaggedValue::U64(v)
            } else {
                TaggedValue::F64(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => TaggedValue::String(s.clone()),
        Value::Array(items) => {
            let values = items.iter().map(infer).collect::<anyhow::Result<Vec<_>>>()?;
            TaggedValue::Array(SafeArray::vector(VarType::Variant, values)?)
        }
        Value::Object(_) => bail!("cannot infer a variant from an object; declare a record type"),
    };
    Ok(inferred)
}
