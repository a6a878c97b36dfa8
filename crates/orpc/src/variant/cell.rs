// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byref referents.
//!
//! A [`VariantCell`] is the single owner of a referent. A [`VariantRef`]
//! points at it without keeping it alive; once the cell is dropped every
//! reference reports [`CodecError::DanglingReference`].

use super::value::TaggedValue;
use crate::error::{CodecError, CodecResult};
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Owner of a byref referent.
pub struct VariantCell {
    inner: Arc<RwLock<TaggedValue>>,
}

impl VariantCell {
    pub fn new(value: TaggedValue) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Location reference to this cell.
    pub fn reference(&self) -> VariantRef {
        VariantRef {
            target: Arc::downgrade(&self.inner),
        }
    }

    /// Copy of the current value.
    pub fn get(&self) -> TaggedValue {
        self.inner.read().clone()
    }

    /// Replace the value, keeping its discriminant (see [`VariantRef::store`]).
    pub fn set(&self, value: TaggedValue) -> CodecResult<()> {
        store_checked(&self.inner, value)
    }

    /// Release the cell and return its value.
    pub fn into_inner(self) -> TaggedValue {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => lock.into_inner(),
            Err(shared) => shared.read().clone(),
        }
    }
}

impl fmt::Debug for VariantCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VariantCell").field(&*self.inner.read()).finish()
    }
}

/// Non-owning location reference into a [`VariantCell`].
#[derive(Clone)]
pub struct VariantRef {
    target: Weak<RwLock<TaggedValue>>,
}

impl VariantRef {
    /// A reference that never had a referent.
    pub fn dangling() -> Self {
        Self { target: Weak::new() }
    }

    pub fn is_live(&self) -> bool {
        self.target.strong_count() > 0
    }

    fn upgrade(&self) -> CodecResult<Arc<RwLock<TaggedValue>>> {
        self.target.upgrade().ok_or(CodecError::DanglingReference)
    }

    /// Copy of the referent.
    pub fn get(&self) -> CodecResult<TaggedValue> {
        Ok(self.upgrade()?.read().clone())
    }

    /// Run `f` on the referent without copying it.
    pub fn with<R>(&self, f: impl FnOnce(&TaggedValue) -> R) -> CodecResult<R> {
        let target = self.upgrade()?;
        let guard = target.read();
        Ok(f(&guard))
    }

    /// Write through the reference.
    ///
    /// The referent keeps its discriminant: storing a value of another
    /// type fails with `TypeMismatch` unless the referent is `Empty`.
    pub fn store(&self, value: TaggedValue) -> CodecResult<()> {
        store_checked(&*self.upgrade()?, value)
    }

    /// True if both references point at the same cell.
    pub fn ptr_eq(&self, other: &VariantRef) -> bool {
        self.target.ptr_eq(&other.target)
    }
}

impl fmt::Debug for VariantRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target.upgrade() {
            Some(target) => f.debug_tuple("VariantRef").field(&*target.read()).finish(),
            None => f.write_str("VariantRef(<dangling>)"),
        }
    }
}

fn store_checked(slot: &RwLock<TaggedValue>, value: TaggedValue) -> CodecResult<()> {
    if value.is_byref() {
        return Err(CodecError::mismatch("value", "byref"));
    }
    let mut current = slot.write();
    if !current.is_empty() {
        let expected = current.discriminant()?;
        let found = value.discriminant()?;
        if expected != found {
            return Err(CodecError::mismatch(expected.to_string(), found.to_string()));
        }
    }
    *current = value;
    Ok(())
}

/// Where decoded byref values land.
///
/// - [`none`](Self::none): decoding a byref fails with `DanglingReference`.
/// - [`attach`](Self::attach): caller-owned cells are filled in order.
/// - [`allocating`](Self::allocating): the decoder creates cells and hands
///   them back through [`into_cells`](Self::into_cells).
pub struct ReferentSlots<'a> {
    mode: SlotMode<'a>,
}

enum SlotMode<'a> {
    None,
    Attached { refs: &'a [VariantRef], next: usize },
    Allocating { cells: Vec<VariantCell> },
}

/// Rollback point for a failed decode.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SlotMark(usize);

impl<'a> ReferentSlots<'a> {
    pub fn none() -> Self {
        Self {
            mode: SlotMode::None,
        }
    }

    pub fn attach(refs: &'a [VariantRef]) -> Self {
        Self {
            mode: SlotMode::Attached { refs, next: 0 },
        }
    }

    pub fn allocating() -> Self {
        Self {
            mode: SlotMode::Allocating { cells: Vec::new() },
        }
    }

    /// Number of referents bound so far.
    pub fn bound(&self) -> usize {
        match &self.mode {
            SlotMode::None => 0,
            SlotMode::Attached { next, .. } => *next,
            SlotMode::Allocating { cells } => cells.len(),
        }
    }

    /// Cells created while decoding (empty unless allocating).
    pub fn into_cells(self) -> Vec<VariantCell> {
        match self.mode {
            SlotMode::Allocating { cells } => cells,
            _ => Vec::new(),
        }
    }

    /// Bind a decoded referent and return the byref value pointing at it.
    pub(crate) fn bind(&mut self, value: TaggedValue) -> CodecResult<TaggedValue> {
        match &mut self.mode {
            SlotMode::None => Err(CodecError::DanglingReference),
            SlotMode::Attached { refs, next } => {
                let slot = refs.get(*next).ok_or(CodecError::DanglingReference)?;
                slot.store(value)?;
                *next += 1;
                Ok(TaggedValue::ByRef(slot.clone()))
            }
            SlotMode::Allocating { cells } => {
                let cell = VariantCell::new(value);
                let reference = cell.reference();
                cells.push(cell);
                Ok(TaggedValue::ByRef(reference))
            }
        }
    }

    pub(crate) fn mark(&self) -> SlotMark {
        SlotMark(self.bound())
    }

    /// Forget referents bound after `mark`.
    ///
    /// Attached cells keep any value already stored into them.
    pub(crate) fn rollback(&mut self, mark: SlotMark) {
        match &mut self.mode {
            SlotMode::None => {}
            SlotMode::Attached { next, .. } => *next = mark.0,
            SlotMode::Allocating { cells } => cells.truncate(mark.0),
        }
    }
}

impl fmt::Debug for ReferentSlots<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            SlotMode::None => "none",
            SlotMode::Attached { .. } => "attached",
            SlotMode::Allocating { .. } => "allocating",
        };
        f.debug_struct("ReferentSlots")
            .field("mode", &mode)
            .field("bound", &self.bound())
            .finish()
    }
}
