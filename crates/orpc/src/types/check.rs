// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type check of a tagged value against a declared type.

use super::descriptor::{FloatWidth, IntWidth, RecordDescriptor, TypeDescriptor};
use super::store::TypeStore;
use crate::array::ArrayElements;
use crate::error::CodecResult;
use crate::variant::{Record, TaggedValue, VarType};

/// Array element kind for a declared element type.
///
/// `None` if values of this type cannot be array elements.
pub(crate) fn element_kind(ty: &TypeDescriptor) -> Option<VarType> {
    let kind = match ty {
        TypeDescriptor::Bool => VarType::Bool,
        TypeDescriptor::Integer { width, signed } => match (width, signed) {
            (IntWidth::W8, true) => VarType::I8,
            (IntWidth::W16, true) => VarType::I16,
            (IntWidth::W32, true) => VarType::I32,
            (IntWidth::W64, true) => VarType::I64,
            (IntWidth::W8, false) => VarType::U8,
            (IntWidth::W16, false) => VarType::U16,
            (IntWidth::W32, false) => VarType::U32,
            (IntWidth::W64, false) => VarType::U64,
        },
        TypeDescriptor::Float(FloatWidth::W32) => VarType::F32,
        TypeDescriptor::Float(FloatWidth::W64) => VarType::F64,
        TypeDescriptor::Currency => VarType::Currency,
        TypeDescriptor::Decimal => VarType::Decimal,
        TypeDescriptor::Date => VarType::Date,
        TypeDescriptor::ErrorCode => VarType::Error,
        TypeDescriptor::String(_) => VarType::String,
        TypeDescriptor::TaggedValue => VarType::Variant,
        TypeDescriptor::InterfaceRef(_) => VarType::Interface,
        TypeDescriptor::Record(_) | TypeDescriptor::Named(_) => VarType::Record,
        TypeDescriptor::Void
        | TypeDescriptor::Pointer(_)
        | TypeDescriptor::FixedArray { .. }
        | TypeDescriptor::VariableArray(_) => return None,
    };
    Some(kind)
}

impl TypeDescriptor {
    /// Kind of the elements when this type is used as an array element.
    pub fn element_kind(&self) -> Option<VarType> {
        element_kind(self)
    }
}

impl TypeStore {
    /// True if `value` is a valid runtime value of `ty`.
    ///
    /// Discriminants must match exactly; nothing is coerced. `Pointer(T)`
    /// admits `T`, a byref to `T`, or `Null`. Fails only if a byref has no
    /// live referent or an array is exclusively locked.
    pub fn admits(&self, ty: &TypeDescriptor, value: &TaggedValue) -> CodecResult<bool> {
        use TaggedValue as V;

        let ok = match (ty, value) {
            (TypeDescriptor::TaggedValue, _) => true,
            (TypeDescriptor::Pointer(_), V::Null) => true,
            (TypeDescriptor::Pointer(inner), V::ByRef(r)) => {
                return r.with(|target| self.admits(inner, target))?
            }
            (TypeDescriptor::Pointer(inner), v) => return self.admits(inner, v),
            (TypeDescriptor::InterfaceRef(_), V::Null) => true,
            (TypeDescriptor::InterfaceRef(id), V::Interface(r)) => {
                id.is_nil() || r.interface_id == *id
            }
            (TypeDescriptor::VariableArray(element), V::Array(array)) => {
                if element_kind(element) != Some(array.kind()) {
                    return Ok(false);
                }
                return self.admits_elements(element, array);
            }
            (TypeDescriptor::FixedArray { element, dims }, V::Array(array)) => {
                if element_kind(element) != Some(array.kind()) {
                    return Ok(false);
                }
                let shape_matches = {
                    let guard = array.lock()?;
                    guard.bounds().len() == dims.len()
                        && guard.bounds().iter().zip(dims).all(|(b, d)| b.count == *d)
                };
                if !shape_matches {
                    return Ok(false);
                }
                return self.admits_elements(element, array);
            }
            (TypeDescriptor::Record(layout), V::Record(record)) => {
                return self.admits_record(layout, record)
            }
            (TypeDescriptor::Named(name), V::Record(record)) => match self.resolve_record(name) {
                Some(layout) => return self.admits_record(layout, record),
                None => false,
            },
            (ty, v) => match element_kind(ty) {
                Some(kind) => !v.is_array() && v.var_type() == Some(kind),
                None => false,
            },
        };
        Ok(ok)
    }

    fn admits_record(&self, layout: &RecordDescriptor, record: &Record) -> CodecResult<bool> {
        if record.type_name != layout.name || record.fields.len() != layout.fields.len() {
            return Ok(false);
        }
        for ((name, value), field) in record.fields.iter().zip(&layout.fields) {
            if *name != field.name || !self.admits(&field.ty, value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Element-level check for kinds whose discriminant alone is not enough.
    fn admits_elements(
        &self,
        element: &TypeDescriptor,
        array: &crate::array::SafeArray,
    ) -> CodecResult<bool> {
        let needs_walk = match element {
            TypeDescriptor::Record(_) | TypeDescriptor::Named(_) => true,
            TypeDescriptor::InterfaceRef(id) => !id.is_nil(),
            _ => false,
        };
        if !needs_walk {
            return Ok(true);
        }
        let guard = array.lock()?;
        match guard.elements() {
            ArrayElements::Values(values) => {
                for value in values {
                    if !self.admits(element, value)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            ArrayElements::Raw(_) => Ok(false),
        }
    }
}
