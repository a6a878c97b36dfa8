// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dispatch table generated once from an interface descriptor.

use super::descriptor::MethodDescriptor;
use super::id::InterfaceId;
use super::store::TypeStore;
use crate::error::RegistryError;
use std::collections::HashMap;

/// One slot of a dispatch table.
#[derive(Debug, Clone, PartialEq)]
pub struct VTableEntry {
    pub ordinal: u32,
    /// Interface in the chain that declares the method.
    pub declared_in: InterfaceId,
    pub method: MethodDescriptor,
}

/// Ordinal-indexed method table of an interface, inherited slots first.
#[derive(Debug, Clone)]
pub struct VTable {
    interface: InterfaceId,
    name: String,
    entries: Vec<VTableEntry>,
    by_name: HashMap<String, u32>,
}

impl VTable {
    /// Build the table for `id` from the store.
    pub fn build(store: &TypeStore, id: InterfaceId) -> Result<Self, RegistryError> {
        let iface = store.resolve(id).ok_or(RegistryError::UnknownInterface(id))?;

        let mut chain: Vec<_> = store.chain(id).collect();
        chain.reverse();

        let mut entries = Vec::new();
        for declaring in chain {
            for method in &declaring.methods {
                entries.push(VTableEntry {
                    ordinal: method.ordinal,
                    declared_in: declaring.id,
                    method: method.clone(),
                });
            }
        }
        let by_name = entries
            .iter()
            .map(|e| (e.method.name.clone(), e.ordinal))
            .collect();

        Ok(Self {
            interface: id,
            name: iface.name.clone(),
            entries,
            by_name,
        })
    }

    pub fn interface_id(&self) -> InterfaceId {
        self.interface
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, ordinal: u32) -> Option<&VTableEntry> {
        self.entries.get(ordinal as usize)
    }

    pub fn ordinal_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VTableEntry> {
        self.entries.iter()
    }
}
