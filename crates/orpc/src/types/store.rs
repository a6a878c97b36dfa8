// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type Descriptor Store.
//!
//! Populated once through [`TypeStore::register`], then frozen with
//! [`TypeStore::publish`] and shared as `Arc<TypeStore>`. Lookups on the
//! published store take no locks.

use super::descriptor::{
    Direction, InterfaceDescriptor, MethodDescriptor, RecordDescriptor, TypeDescriptor,
};
use super::element_kind;
use super::id::InterfaceId;
use crate::error::{MarshalError, RegistryError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Interface and record descriptors keyed by identity.
#[derive(Debug, Default)]
pub struct TypeStore {
    interfaces: HashMap<InterfaceId, InterfaceDescriptor>,
    records: HashMap<String, RecordDescriptor>,
    published: bool,
}

impl TypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interface.
    ///
    /// Re-registering a structurally identical descriptor is a no-op. The base
    /// (if any) must already be registered and `first_ordinal` must continue
    /// its table.
    ///
    /// # Panics
    ///
    /// Panics if the store has been published.
    pub fn register(&mut self, desc: InterfaceDescriptor) -> Result<(), RegistryError> {
        assert!(
            !self.published,
            "TypeStore::register({}) after publish",
            desc.name
        );

        if let Some(existing) = self.interfaces.get(&desc.id) {
            if *existing == desc {
                log::debug!("[types] {} ({}) already registered", desc.name, desc.id);
                return Ok(());
            }
            return Err(RegistryError::DuplicateId {
                id: desc.id,
                name: desc.name.clone(),
                existing: existing.fingerprint(),
                offered: desc.fingerprint(),
            });
        }

        self.validate_interface(&desc)?;

        log::debug!(
            "[types] registered {} ({}) ordinals {}..{}",
            desc.name,
            desc.id,
            desc.first_ordinal,
            desc.next_ordinal()
        );
        self.interfaces.insert(desc.id, desc);
        Ok(())
    }

    /// Register a named record layout.
    ///
    /// A record may refer to itself through a pointer or a variable array.
    ///
    /// # Panics
    ///
    /// Panics if the store has been published.
    pub fn register_record(&mut self, record: RecordDescriptor) -> Result<(), RegistryError> {
        assert!(
            !self.published,
            "TypeStore::register_record({}) after publish",
            record.name
        );

        if let Some(existing) = self.records.get(&record.name) {
            if *existing == record {
                return Ok(());
            }
            return Err(RegistryError::DuplicateRecord(record.name));
        }

        let context = format!("record {}", record.name);
        self.check_record(&record, &context, Some(&record))?;

        log::debug!(
            "[types] registered record {} ({} fields)",
            record.name,
            record.fields.len()
        );
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    /// Freeze the store for shared, lock-free lookup.
    pub fn publish(mut self) -> Arc<Self> {
        self.published = true;
        log::debug!(
            "[types] published {} interfaces, {} records",
            self.interfaces.len(),
            self.records.len()
        );
        Arc::new(self)
    }

    pub fn is_published(&self) -> bool {
        self.published
    }

    pub fn resolve(&self, id: InterfaceId) -> Option<&InterfaceDescriptor> {
        self.interfaces.get(&id)
    }

    /// Find an interface by name.
    pub fn resolve_by_name(&self, name: &str) -> Option<&InterfaceDescriptor> {
        self.interfaces.values().find(|d| d.name == name)
    }

    pub fn resolve_record(&self, name: &str) -> Option<&RecordDescriptor> {
        self.records.get(name)
    }

    /// Method at `ordinal`, walking the base chain.
    pub fn resolve_method(&self, id: InterfaceId, ordinal: u32) -> Option<&MethodDescriptor> {
        self.chain(id).find_map(|iface| {
            if ordinal >= iface.first_ordinal {
                iface.method(ordinal)
            } else {
                None
            }
        })
    }

    /// Like [`resolve_method`](Self::resolve_method) with typed failures.
    pub fn lookup_method(
        &self,
        id: InterfaceId,
        ordinal: u32,
    ) -> Result<&MethodDescriptor, MarshalError> {
        if !self.interfaces.contains_key(&id) {
            return Err(MarshalError::UnknownInterface(id));
        }
        self.resolve_method(id, ordinal)
            .ok_or(MarshalError::UnknownOrdinal {
                interface: id,
                ordinal,
            })
    }

    /// Method by name, walking the base chain.
    pub fn method_by_name(
        &self,
        id: InterfaceId,
        name: &str,
    ) -> Result<&MethodDescriptor, MarshalError> {
        if !self.interfaces.contains_key(&id) {
            return Err(MarshalError::UnknownInterface(id));
        }
        self.chain(id)
            .find_map(|iface| iface.method_by_name(name))
            .ok_or_else(|| MarshalError::UnknownMethod {
                interface: id,
                name: name.to_string(),
            })
    }

    /// Full method table (inherited methods first), indexed by ordinal.
    pub fn method_table(&self, id: InterfaceId) -> Option<Vec<&MethodDescriptor>> {
        self.resolve(id)?;
        let mut chain: Vec<&InterfaceDescriptor> = self.chain(id).collect();
        chain.reverse();
        Some(chain.iter().flat_map(|iface| iface.methods.iter()).collect())
    }

    /// The interface followed by each of its ancestors.
    pub fn chain(&self, id: InterfaceId) -> Chain<'_> {
        Chain {
            store: self,
            next: Some(id),
        }
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceDescriptor> {
        self.interfaces.values()
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordDescriptor> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    fn validate_interface(&self, desc: &InterfaceDescriptor) -> Result<(), RegistryError> {
        let context = format!("interface {}", desc.name);

        let expected_first = match desc.base {
            Some(base_id) if base_id == desc.id => {
                return Err(RegistryError::invalid(context, "interface derives from itself"));
            }
            Some(base_id) => self
                .resolve(base_id)
                .ok_or(RegistryError::UnknownInterface(base_id))?
                .next_ordinal(),
            None => 0,
        };
        if desc.first_ordinal != expected_first {
            return Err(RegistryError::invalid(
                context,
                format!(
                    "first ordinal {} does not continue base table (expected {})",
                    desc.first_ordinal, expected_first
                ),
            ));
        }

        let inherited: HashSet<&str> = match desc.base {
            Some(base_id) => self
                .chain(base_id)
                .flat_map(|iface| iface.methods.iter().map(|m| m.name.as_str()))
                .collect(),
            None => HashSet::new(),
        };
        let mut names = HashSet::new();

        for (i, method) in desc.methods.iter().enumerate() {
            let method_ctx = format!("{}::{}", desc.name, method.name);
            if method.ordinal != desc.first_ordinal + i as u32 {
                return Err(RegistryError::invalid(
                    method_ctx,
                    format!(
                        "ordinal {} out of sequence (expected {})",
                        method.ordinal,
                        desc.first_ordinal + i as u32
                    ),
                ));
            }
            if inherited.contains(method.name.as_str()) || !names.insert(method.name.as_str()) {
                return Err(RegistryError::invalid(method_ctx, "duplicate method name"));
            }
            self.validate_method(method, &method_ctx)?;
        }
        Ok(())
    }

    fn validate_method(&self, method: &MethodDescriptor, context: &str) -> Result<(), RegistryError> {
        let mut names = HashSet::new();
        let mut returns = 0;
        for param in &method.parameters {
            if !names.insert(param.name.as_str()) {
                return Err(RegistryError::invalid(
                    context,
                    format!("duplicate parameter '{}'", param.name),
                ));
            }
            if param.direction == Direction::Return {
                returns += 1;
            }
            if param.ty.contains_void() {
                return Err(RegistryError::invalid(
                    context,
                    format!("parameter '{}' has void type", param.name),
                ));
            }
            let param_ctx = format!("{}({})", context, param.name);
            self.check_type(&param.ty, &param_ctx, None)?;
        }
        if returns > 1 {
            return Err(RegistryError::invalid(context, "more than one return value"));
        }
        Ok(())
    }

    /// Validate that `ty` is resolvable and encodable.
    ///
    /// `pending` is a record being registered; references to it resolve to
    /// itself.
    fn check_type(
        &self,
        ty: &TypeDescriptor,
        context: &str,
        pending: Option<&RecordDescriptor>,
    ) -> Result<(), RegistryError> {
        match ty {
            TypeDescriptor::Void => Err(RegistryError::invalid(context, "void is not a value type")),
            TypeDescriptor::Pointer(inner) => self.check_type(inner, context, pending),
            TypeDescriptor::FixedArray { element, dims } => {
                if dims.is_empty() || dims.len() > u16::MAX as usize {
                    return Err(RegistryError::invalid(
                        context,
                        format!("fixed array needs 1..=65535 dimensions, got {}", dims.len()),
                    ));
                }
                self.check_element(element, context, pending)
            }
            TypeDescriptor::VariableArray(element) => self.check_element(element, context, pending),
            TypeDescriptor::Record(record) => self.check_record(record, context, pending),
            TypeDescriptor::Named(name) => {
                if pending.is_some_and(|r| r.name == *name) || self.records.contains_key(name) {
                    Ok(())
                } else {
                    Err(RegistryError::UnknownRecord(name.clone()))
                }
            }
            _ => Ok(()),
        }
    }

    fn check_element(
        &self,
        element: &TypeDescriptor,
        context: &str,
        pending: Option<&RecordDescriptor>,
    ) -> Result<(), RegistryError> {
        if element_kind(element).is_none() {
            return Err(RegistryError::invalid(
                context,
                format!("'{}' cannot be an array element", element),
            ));
        }
        self.check_type(element, context, pending)
    }

    fn check_record(
        &self,
        record: &RecordDescriptor,
        context: &str,
        pending: Option<&RecordDescriptor>,
    ) -> Result<(), RegistryError> {
        let mut names = HashSet::new();
        for field in &record.fields {
            if !names.insert(field.name.as_str()) {
                return Err(RegistryError::invalid(
                    context,
                    format!("duplicate field '{}'", field.name),
                ));
            }
            self.check_type(&field.ty, context, pending)?;
            let mut visiting = Vec::new();
            if self.reaches_directly(&field.ty, &record.name, pending, &mut visiting) {
                return Err(RegistryError::invalid(
                    context,
                    format!(
                        "field '{}' contains '{}' without a pointer or variable array",
                        field.name, record.name
                    ),
                ));
            }
        }
        Ok(())
    }

    /// True if `ty` embeds the record `target` by value (no indirection).
    fn reaches_directly<'s>(
        &'s self,
        ty: &'s TypeDescriptor,
        target: &str,
        pending: Option<&'s RecordDescriptor>,
        visiting: &mut Vec<&'s str>,
    ) -> bool {
        match ty {
            TypeDescriptor::Named(name) if name == target => true,
            TypeDescriptor::Named(name) => {
                if visiting.contains(&name.as_str()) {
                    return false;
                }
                visiting.push(name);
                let record = match pending {
                    Some(r) if r.name == *name => Some(r),
                    _ => self.records.get(name),
                };
                record.is_some_and(|r| {
                    r.fields
                        .iter()
                        .any(|f| self.reaches_directly(&f.ty, target, pending, visiting))
                })
            }
            TypeDescriptor::Record(record) => {
                record.name == target
                    || record
                        .fields
                        .iter()
                        .any(|f| self.reaches_directly(&f.ty, target, pending, visiting))
            }
            TypeDescriptor::FixedArray { element, .. } => {
                self.reaches_directly(element, target, pending, visiting)
            }
            _ => false,
        }
    }
}

/// Iterator over an interface and its ancestors.
pub struct Chain<'a> {
    store: &'a TypeStore,
    next: Option<InterfaceId>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a InterfaceDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        let iface = self.store.resolve(self.next?)?;
        self.next = iface.base;
        Some(iface)
    }
}
