// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Array container with lock accounting.

use crate::error::{CodecError, CodecResult};
use crate::variant::{read_payload, write_payload, ReferentSlots, TaggedValue, VarType};
use crate::wire::{WireReader, WireWriter};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// One dimension: first index and number of elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bound {
    pub lower: i32,
    pub count: u32,
}

impl Bound {
    pub const fn new(lower: i32, count: u32) -> Self {
        Self { lower, count }
    }

    pub const fn zero_based(count: u32) -> Self {
        Self { lower: 0, count }
    }
}

/// Number of elements described by `bounds`; zero dimensions hold nothing.
pub(crate) fn element_count(bounds: &[Bound]) -> Option<usize> {
    if bounds.is_empty() {
        return Some(0);
    }
    bounds
        .iter()
        .try_fold(1usize, |acc, b| acc.checked_mul(b.count as usize))
}

/// Borrowed element storage.
#[derive(Debug, Clone, Copy)]
pub enum ArrayElements<'a> {
    /// Tagged values (element payloads for typed kinds, full values for `variant`).
    Values(&'a [TaggedValue]),
    /// Raw little-endian bytes of a fixed-width scalar kind.
    Raw(&'a [u8]),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ArrayData {
    Raw(Vec<u8>),
    Values(Vec<TaggedValue>),
}

impl ArrayData {
    fn empty_for(kind: VarType) -> Self {
        if kind.fixed_size().is_some() {
            Self::Raw(Vec::new())
        } else {
            Self::Values(Vec::new())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArrayStorage {
    pub(crate) bounds: Vec<Bound>,
    pub(crate) data: ArrayData,
}

impl ArrayStorage {
    pub(crate) fn empty(kind: VarType) -> Self {
        Self {
            bounds: Vec::new(),
            data: ArrayData::empty_for(kind),
        }
    }

    fn elements(&self) -> ArrayElements<'_> {
        match &self.data {
            ArrayData::Raw(bytes) => ArrayElements::Raw(bytes),
            ArrayData::Values(values) => ArrayElements::Values(values),
        }
    }

    fn len(&self) -> usize {
        element_count(&self.bounds).unwrap_or(0)
    }

    fn element(&self, kind: VarType, flat: usize) -> CodecResult<TaggedValue> {
        let out_of_range = || CodecError::IndexOutOfBounds {
            index: vec![flat as i64],
        };
        match &self.data {
            ArrayData::Values(values) => values.get(flat).cloned().ok_or_else(out_of_range),
            ArrayData::Raw(bytes) => {
                let size = kind.fixed_size().ok_or_else(out_of_range)?;
                if flat >= self.len() {
                    return Err(out_of_range());
                }
                let mut reader = WireReader::at(bytes, flat * size);
                read_payload(kind, &mut reader, &mut ReferentSlots::none(), 0)
            }
        }
    }

    fn flat_index(&self, indices: &[i32]) -> CodecResult<usize> {
        let out_of_bounds = || CodecError::IndexOutOfBounds {
            index: indices.iter().map(|i| *i as i64).collect(),
        };
        if indices.len() != self.bounds.len() || self.bounds.is_empty() {
            return Err(out_of_bounds());
        }
        let mut flat = 0usize;
        for (index, bound) in indices.iter().zip(&self.bounds) {
            let offset = i64::from(*index) - i64::from(bound.lower);
            if offset < 0 || offset >= i64::from(bound.count) {
                return Err(out_of_bounds());
            }
            flat = flat * bound.count as usize + offset as usize;
        }
        Ok(flat)
    }
}

/// Check that `value` may be stored as an element of `kind`.
///
/// Elements are owned: a byref is refused at the top level and inside
/// record fields, since array elements decode without referent slots.
pub(crate) fn check_element(kind: VarType, value: &TaggedValue) -> CodecResult<()> {
    if kind != VarType::Variant && (value.is_array() || value.var_type() != Some(kind)) {
        return Err(CodecError::mismatch(kind.name(), value.type_name()));
    }
    if holds_reference(value) {
        return Err(CodecError::mismatch("owned array element", "byref"));
    }
    Ok(())
}

fn holds_reference(value: &TaggedValue) -> bool {
    match value {
        TaggedValue::ByRef(_) => true,
        TaggedValue::Record(record) => record.fields.iter().any(|(_, v)| holds_reference(v)),
        _ => false,
    }
}

fn pack_raw(kind: VarType, values: &[TaggedValue]) -> CodecResult<Vec<u8>> {
    let size = kind.fixed_size().unwrap_or(0);
    let mut bytes = Vec::with_capacity(values.len() * size);
    let mut writer = WireWriter::new(&mut bytes);
    for value in values {
        check_element(kind, value)?;
        write_payload(value, &mut writer, 0)?;
    }
    Ok(bytes)
}

fn check_raw(kind: VarType, bytes: &[u8], offset: usize) -> CodecResult<()> {
    if kind == VarType::Bool {
        if let Some(pos) = bytes.iter().position(|b| *b > 1) {
            return Err(CodecError::invalid(
                offset + pos,
                format!("bool byte {}", bytes[pos]),
            ));
        }
    }
    Ok(())
}

/// Multi-dimensional array with lock accounting.
///
/// Element access goes through [`lock`](Self::lock) (shared) or
/// [`lock_exclusive`](Self::lock_exclusive). Neither blocks: a conflicting
/// request fails with [`CodecError::Busy`].
pub struct SafeArray {
    kind: VarType,
    state: RwLock<ArrayStorage>,
    lock_count: AtomicU32,
}

impl SafeArray {
    /// Canonical empty array: no dimensions, no elements.
    pub fn empty(kind: VarType) -> Self {
        Self::from_storage(kind, ArrayStorage::empty(kind))
    }

    /// One-dimensional, zero-based array.
    pub fn vector(kind: VarType, values: Vec<TaggedValue>) -> CodecResult<Self> {
        let count = u32::try_from(values.len()).map_err(|_| CodecError::SizeOverflow { offset: 0 })?;
        Self::new(kind, vec![Bound::zero_based(count)], values)
    }

    /// Array with explicit bounds; `values` are in row-major order.
    pub fn new(kind: VarType, bounds: Vec<Bound>, values: Vec<TaggedValue>) -> CodecResult<Self> {
        if !kind.is_array_element() {
            return Err(CodecError::mismatch("array element kind", kind.name()));
        }
        let expected = element_count(&bounds).ok_or(CodecError::SizeOverflow { offset: 0 })?;
        if values.len() != expected {
            return Err(CodecError::ElementCount {
                expected,
                found: values.len(),
            });
        }
        let data = if kind.fixed_size().is_some() {
            ArrayData::Raw(pack_raw(kind, &values)?)
        } else {
            for value in &values {
                check_element(kind, value)?;
            }
            ArrayData::Values(values)
        };
        Ok(Self::from_storage(kind, ArrayStorage { bounds, data }))
    }

    /// Array over raw little-endian element bytes of a fixed-width kind.
    pub fn from_raw(kind: VarType, bounds: Vec<Bound>, bytes: Vec<u8>) -> CodecResult<Self> {
        let size = kind
            .fixed_size()
            .ok_or_else(|| CodecError::mismatch("fixed-width element kind", kind.name()))?;
        let expected = element_count(&bounds).ok_or(CodecError::SizeOverflow { offset: 0 })?;
        if expected.checked_mul(size) != Some(bytes.len()) {
            return Err(CodecError::ElementCount {
                expected,
                found: bytes.len() / size,
            });
        }
        check_raw(kind, &bytes, 0)?;
        Ok(Self::from_storage(
            kind,
            ArrayStorage {
                bounds,
                data: ArrayData::Raw(bytes),
            },
        ))
    }

    pub(crate) fn from_storage(kind: VarType, storage: ArrayStorage) -> Self {
        Self {
            kind,
            state: RwLock::new(storage),
            lock_count: AtomicU32::new(0),
        }
    }

    pub(crate) fn check_raw_bytes(kind: VarType, bytes: &[u8], offset: usize) -> CodecResult<()> {
        check_raw(kind, bytes, offset)
    }

    pub fn kind(&self) -> VarType {
        self.kind
    }

    /// Number of live guards.
    pub fn lock_count(&self) -> u32 {
        self.lock_count.load(Ordering::Acquire)
    }

    fn busy(&self) -> CodecError {
        CodecError::Busy {
            lock_count: self.lock_count(),
        }
    }

    /// Shared access. Fails with `Busy` while an exclusive guard is alive.
    pub fn lock(&self) -> CodecResult<ArrayReadGuard<'_>> {
        let storage = self.state.try_read().ok_or_else(|| self.busy())?;
        self.lock_count.fetch_add(1, Ordering::AcqRel);
        Ok(ArrayReadGuard {
            kind: self.kind,
            storage,
            lock_count: &self.lock_count,
        })
    }

    /// Exclusive access. Fails with `Busy` while any other guard is alive.
    pub fn lock_exclusive(&self) -> CodecResult<ArrayWriteGuard<'_>> {
        let storage = self.state.try_write().ok_or_else(|| self.busy())?;
        self.lock_count.fetch_add(1, Ordering::AcqRel);
        Ok(ArrayWriteGuard {
            kind: self.kind,
            storage,
            lock_count: &self.lock_count,
        })
    }

    /// Copy of all elements in row-major order.
    pub fn to_values(&self) -> CodecResult<Vec<TaggedValue>> {
        self.lock()?.values()
    }

    /// Copy of the bounds.
    pub fn bounds(&self) -> CodecResult<Vec<Bound>> {
        Ok(self.lock()?.bounds().to_vec())
    }

    /// Change the shape. Elements keep their row-major positions; new slots
    /// hold the kind's zero value.
    pub fn redim(&self, bounds: Vec<Bound>) -> CodecResult<()> {
        let mut guard = self.lock_exclusive()?;
        let total = element_count(&bounds).ok_or(CodecError::SizeOverflow { offset: 0 })?;
        let kind = self.kind;
        let storage = &mut *guard.storage;
        match &mut storage.data {
            ArrayData::Raw(bytes) => {
                let size = kind.fixed_size().unwrap_or(1);
                let len = total
                    .checked_mul(size)
                    .ok_or(CodecError::SizeOverflow { offset: 0 })?;
                bytes.resize(len, 0);
            }
            ArrayData::Values(values) => values.resize(total, kind.zero_value()),
        }
        storage.bounds = bounds;
        Ok(())
    }
}

impl Clone for SafeArray {
    /// Blocks while an exclusive guard on `self` is alive.
    fn clone(&self) -> Self {
        Self::from_storage(self.kind, self.state.read().clone())
    }
}

impl PartialEq for SafeArray {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.kind == other.kind && *self.state.read() == *other.state.read()
    }
}

impl fmt::Debug for SafeArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SafeArray");
        s.field("kind", &self.kind);
        match self.state.try_read() {
            Some(storage) => s.field("bounds", &storage.bounds).field("data", &storage.data),
            None => s.field("data", &"<locked>"),
        };
        s.field("lock_count", &self.lock_count()).finish()
    }
}

impl fmt::Display for SafeArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(storage) = self.state.try_read() else {
            return write!(f, "{}[<locked>]", self.kind);
        };
        write!(f, "{}[", self.kind)?;
        for (i, b) in storage.bounds.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}..{}", b.lower, i64::from(b.lower) + i64::from(b.count))?;
        }
        f.write_str("]{")?;
        for i in 0..storage.len() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match storage.element(self.kind, i) {
                Ok(v) => write!(f, "{}", v)?,
                Err(_) => f.write_str("?")?,
            }
        }
        f.write_str("}")
    }
}

/// Shared access to array storage; decrements `lock_count` on drop.
pub struct ArrayReadGuard<'a> {
    kind: VarType,
    storage: RwLockReadGuard<'a, ArrayStorage>,
    lock_count: &'a AtomicU32,
}

/// Exclusive access to array storage; decrements `lock_count` on drop.
pub struct ArrayWriteGuard<'a> {
    kind: VarType,
    storage: RwLockWriteGuard<'a, ArrayStorage>,
    lock_count: &'a AtomicU32,
}

/// Read methods shared by both guards.
macro_rules! impl_guard_reads {
    ($guard:ident) => {
        impl<'a> $guard<'a> {
            pub fn kind(&self) -> VarType {
                self.kind
            }

            pub fn bounds(&self) -> &[Bound] {
                &self.storage.bounds
            }

            /// Total number of elements.
            pub fn len(&self) -> usize {
                self.storage.len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn elements(&self) -> ArrayElements<'_> {
                self.storage.elements()
            }

            /// Element at a row-major position.
            pub fn element(&self, flat: usize) -> CodecResult<TaggedValue> {
                self.storage.element(self.kind, flat)
            }

            /// Element at per-dimension indices (honouring lower bounds).
            pub fn get(&self, indices: &[i32]) -> CodecResult<TaggedValue> {
                let flat = self.storage.flat_index(indices)?;
                self.element(flat)
            }

            pub fn values(&self) -> CodecResult<Vec<TaggedValue>> {
                (0..self.len()).map(|i| self.element(i)).collect()
            }
        }

        impl Drop for $guard<'_> {
            fn drop(&mut self) {
                self.lock_count.fetch_sub(1, Ordering::AcqRel);
            }
        }
    };
}

impl_guard_reads!(ArrayReadGuard);
impl_guard_reads!(ArrayWriteGuard);

impl ArrayWriteGuard<'_> {
    /// Store `value` at per-dimension indices.
    pub fn put(&mut self, indices: &[i32], value: TaggedValue) -> CodecResult<()> {
        check_element(self.kind, &value)?;
        let flat = self.storage.flat_index(indices)?;
        match &mut self.storage.data {
            ArrayData::Values(values) => {
                let slot = values.get_mut(flat).ok_or(CodecError::IndexOutOfBounds {
                    index: indices.iter().map(|i| *i as i64).collect(),
                })?;
                *slot = value;
            }
            ArrayData::Raw(bytes) => {
                let size = self.kind.fixed_size().unwrap_or(0);
                let mut encoded = Vec::with_capacity(size);
                write_payload(&value, &mut WireWriter::new(&mut encoded), 0)?;
                let start = flat * size;
                bytes[start..start + size].copy_from_slice(&encoded);
            }
        }
        Ok(())
    }

    pub(crate) fn replace(&mut self, storage: ArrayStorage) {
        *self.storage = storage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i32]) -> Vec<TaggedValue> {
        values.iter().copied().map(TaggedValue::I32).collect()
    }

    #[test]
    fn vector_stores_raw_bytes() {
        let array = SafeArray::vector(VarType::I32, ints(&[1, 2])).expect("vector");
        let guard = array.lock().expect("lock");
        match guard.elements() {
            ArrayElements::Raw(bytes) => assert_eq!(bytes, [1, 0, 0, 0, 2, 0, 0, 0]),
            ArrayElements::Values(_) => panic!("expected raw storage"),
        }
    }

    #[test]
    fn element_count_mismatch() {
        let err = SafeArray::new(VarType::I32, vec![Bound::zero_based(3)], ints(&[1])).unwrap_err();
        assert_eq!(
            err,
            CodecError::ElementCount {
                expected: 3,
                found: 1
            }
        );
    }

    #[test]
    fn element_kind_is_enforced() {
        assert!(SafeArray::vector(VarType::I32, vec![TaggedValue::I64(1)]).is_err());
        assert!(SafeArray::vector(VarType::Null, vec![]).is_err());
        assert!(SafeArray::from_raw(VarType::Bool, vec![Bound::zero_based(1)], vec![2]).is_err());
        assert!(SafeArray::from_raw(VarType::String, vec![], vec![]).is_err());
    }

    #[test]
    fn lower_bounds_and_row_major_order() {
        // 2 x 3 array with rows 1..3 and columns -1..2.
        let array = SafeArray::new(
            VarType::I32,
            vec![Bound::new(1, 2), Bound::new(-1, 3)],
            ints(&[10, 11, 12, 20, 21, 22]),
        )
        .expect("new");
        let guard = array.lock().expect("lock");
        assert_eq!(guard.get(&[1, -1]).expect("get"), TaggedValue::I32(10));
        assert_eq!(guard.get(&[2, 1]).expect("get"), TaggedValue::I32(22));
        assert!(matches!(
            guard.get(&[3, 0]),
            Err(CodecError::IndexOutOfBounds { .. })
        ));
        assert!(guard.get(&[1]).is_err());
    }

    #[test]
    fn guards_track_lock_count() {
        let array = SafeArray::vector(VarType::U8, vec![TaggedValue::U8(7)]).expect("vector");
        {
            let _a = array.lock().expect("first reader");
            let _b = array.lock().expect("second reader");
            assert_eq!(array.lock_count(), 2);
            assert_eq!(
                array.lock_exclusive().err(),
                Some(CodecError::Busy { lock_count: 2 })
            );
        }
        assert_eq!(array.lock_count(), 0);

        let mut writer = array.lock_exclusive().expect("writer");
        assert!(matches!(array.lock(), Err(CodecError::Busy { lock_count: 1 })));
        writer.put(&[0], TaggedValue::U8(9)).expect("put");
        drop(writer);
        assert_eq!(array.to_values().expect("values"), vec![TaggedValue::U8(9)]);
    }

    #[test]
    fn redim_pads_and_truncates() {
        let array = SafeArray::vector(VarType::String, vec![TaggedValue::from("a")]).expect("vector");
        array.redim(vec![Bound::zero_based(3)]).expect("grow");
        assert_eq!(
            array.to_values().expect("values"),
            vec![
                TaggedValue::from("a"),
                TaggedValue::from(""),
                TaggedValue::from("")
            ]
        );
        array.redim(vec![]).expect("to canonical empty");
        assert_eq!(array, SafeArray::empty(VarType::String));

        let _reader = array.lock().expect("reader");
        assert!(matches!(
            array.redim(vec![Bound::zero_based(1)]),
            Err(CodecError::Busy { .. })
        ));
    }

    #[test]
    fn variant_arrays_reject_byref() {
        let cell = crate::variant::VariantCell::new(TaggedValue::I32(1));
        assert!(SafeArray::vector(VarType::Variant, vec![TaggedValue::ByRef(cell.reference())]).is_err());
        assert!(SafeArray::vector(VarType::Variant, vec![TaggedValue::I32(1), TaggedValue::from("x")]).is_ok());
    }
}
