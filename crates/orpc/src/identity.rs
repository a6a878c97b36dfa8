// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interface identity allocation.
//!
//! The store assumes ids are unique and never checks. Allocators are only
//! consulted when an interface is first described without an explicit id.

use crate::types::InterfaceId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Produces 128-bit interface ids.
pub trait IdentityAllocator: Send + Sync {
    /// Allocate an id for the interface called `name`.
    fn allocate(&self, name: &str) -> InterfaceId;
}

/// Random (version 4) UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdAllocator;

impl IdentityAllocator for RandomIdAllocator {
    fn allocate(&self, name: &str) -> InterfaceId {
        let id = InterfaceId::from(uuid::Uuid::new_v4());
        log::debug!("[identity] {} -> {}", name, id);
        id
    }
}

/// Deterministic ids: a fixed 64-bit prefix in the high half, a counter
/// starting at 1 in the low half.
#[derive(Debug)]
pub struct SequentialIdAllocator {
    prefix: u64,
    next: AtomicU64,
}

impl SequentialIdAllocator {
    pub fn new(prefix: u64) -> Self {
        Self {
            prefix,
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl IdentityAllocator for SequentialIdAllocator {
    fn allocate(&self, name: &str) -> InterfaceId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        let id = InterfaceId::from_u128((u128::from(self.prefix) << 64) | u128::from(n));
        log::debug!("[identity] {} -> {}", name, id);
        id
    }
}
