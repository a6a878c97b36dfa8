// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Receiver-side objects: invocations, dispatch tables and activation.

use super::fault::{Fault, FaultCode};
use super::marshal::by_value;
use crate::error::{MarshalError, MarshalResult, RegistryError};
use crate::types::{Direction, InterfaceId, MethodDescriptor, TypeStore, VTable};
use crate::variant::TaggedValue;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;

/// One call being executed on the receiver.
///
/// Handlers read arguments by name and set outputs by name. An `InOut`
/// output left unset is returned with its (possibly updated) input value.
#[derive(Debug)]
pub struct Invocation<'a> {
    method: &'a MethodDescriptor,
    args: &'a [TaggedValue],
    outputs: Vec<Option<TaggedValue>>,
    return_value: Option<TaggedValue>,
}

impl<'a> Invocation<'a> {
    /// `args` holds one value per `In`/`InOut` parameter.
    pub fn new(method: &'a MethodDescriptor, args: &'a [TaggedValue]) -> Self {
        Self {
            method,
            args,
            outputs: vec![None; method.outputs().count()],
            return_value: None,
        }
    }

    pub fn method(&self) -> &MethodDescriptor {
        self.method
    }

    pub fn args(&self) -> &[TaggedValue] {
        self.args
    }

    pub fn arg_at(&self, index: usize) -> Option<&TaggedValue> {
        self.args.get(index)
    }

    /// Argument as received (byref arguments stay byref).
    pub fn arg(&self, name: &str) -> Option<&TaggedValue> {
        let index = self.method.inputs().position(|p| p.name == name)?;
        self.args.get(index)
    }

    /// Argument by value, dereferencing byref arguments.
    pub fn value(&self, name: &str) -> MarshalResult<TaggedValue> {
        let arg = self.arg(name).ok_or_else(|| self.unknown(name))?;
        Ok(by_value(arg)?.into_owned())
    }

    /// Set an `Out`/`InOut` parameter.
    pub fn set_output(&mut self, name: &str, value: impl Into<TaggedValue>) -> MarshalResult<()> {
        let index = self
            .method
            .outputs()
            .position(|p| p.name == name)
            .ok_or_else(|| self.unknown(name))?;
        self.outputs[index] = Some(value.into());
        Ok(())
    }

    pub fn set_return(&mut self, value: impl Into<TaggedValue>) -> MarshalResult<()> {
        if self.method.return_param().is_none() {
            return Err(MarshalError::UnexpectedReturn {
                method: self.method.name.clone(),
            });
        }
        self.return_value = Some(value.into());
        Ok(())
    }

    /// Outputs in declared order plus the return value.
    pub(crate) fn into_reply(self) -> MarshalResult<(Vec<TaggedValue>, Option<TaggedValue>)> {
        let mut outputs = Vec::with_capacity(self.outputs.len());
        for (param, slot) in self.method.outputs().zip(self.outputs) {
            let value = match slot {
                Some(value) => value,
                None if param.direction == Direction::InOut => {
                    let index = self
                        .method
                        .inputs()
                        .position(|p| p.name == param.name)
                        .unwrap_or(usize::MAX);
                    match self.args.get(index) {
                        Some(arg) => by_value(arg)?.into_owned(),
                        None => TaggedValue::Empty,
                    }
                }
                None => TaggedValue::Empty,
            };
            outputs.push(value);
        }
        Ok((outputs, self.return_value))
    }

    fn unknown(&self, name: &str) -> MarshalError {
        MarshalError::UnknownParameter {
            method: self.method.name.clone(),
            name: name.to_string(),
        }
    }
}

/// A local object able to execute dispatched calls.
pub trait Dispatch: Send + Sync {
    /// Interface the object implements (including its bases).
    fn interface_id(&self) -> InterfaceId;

    /// Execute the method at `ordinal`.
    fn invoke(&self, ordinal: u32, call: &mut Invocation<'_>) -> Result<(), Fault>;
}

type Handler = Box<dyn Fn(&mut Invocation<'_>) -> Result<(), Fault> + Send + Sync>;

/// Binds handlers to methods by name, once, against a [`VTable`].
///
/// # Example
///
/// ```rust
/// use orpc::{InterfaceDescriptor, InterfaceId, MethodDescriptor, ObjectBuilder,
///            TypeDescriptor, TypeStore};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let id = InterfaceId::from_u128(7);
/// let mut store = TypeStore::new();
/// store.register(
///     InterfaceDescriptor::builder(id, "IEcho")
///         .method(MethodDescriptor::new("Echo").in_out("text", TypeDescriptor::STRING))
///         .build(),
/// )?;
///
/// let echo = ObjectBuilder::new(&store, id)?
///     .handle("Echo", |_call| Ok(()))?
///     .build();
/// # let _ = echo;
/// # Ok(())
/// # }
/// ```
pub struct ObjectBuilder {
    vtable: VTable,
    handlers: Vec<Option<Handler>>,
}

impl ObjectBuilder {
    pub fn new(store: &TypeStore, interface_id: InterfaceId) -> Result<Self, RegistryError> {
        let vtable = VTable::build(store, interface_id)?;
        let handlers = (0..vtable.len()).map(|_| None).collect();
        Ok(Self { vtable, handlers })
    }

    /// Bind `handler` to the method called `name` (own or inherited).
    pub fn handle<F>(mut self, name: &str, handler: F) -> MarshalResult<Self>
    where
        F: Fn(&mut Invocation<'_>) -> Result<(), Fault> + Send + Sync + 'static,
    {
        let slot = self
            .vtable
            .ordinal_of(name)
            .and_then(|ordinal| self.handlers.get_mut(ordinal as usize))
            .ok_or_else(|| MarshalError::UnknownMethod {
                interface: self.vtable.interface_id(),
                name: name.to_string(),
            })?;
        *slot = Some(Box::new(handler));
        Ok(self)
    }

    pub fn build(self) -> DispatchObject {
        let bound = self.handlers.iter().filter(|h| h.is_some()).count();
        log::debug!(
            "[rpc] dispatch object for {} ({}/{} methods bound)",
            self.vtable.name(),
            bound,
            self.vtable.len()
        );
        DispatchObject {
            vtable: self.vtable,
            handlers: self.handlers,
        }
    }
}

/// Dispatch table with bound handlers, produced by [`ObjectBuilder`].
pub struct DispatchObject {
    vtable: VTable,
    handlers: Vec<Option<Handler>>,
}

impl DispatchObject {
    pub fn vtable(&self) -> &VTable {
        &self.vtable
    }
}

impl Dispatch for DispatchObject {
    fn interface_id(&self) -> InterfaceId {
        self.vtable.interface_id()
    }

    fn invoke(&self, ordinal: u32, call: &mut Invocation<'_>) -> Result<(), Fault> {
        match self.handlers.get(ordinal as usize) {
            Some(Some(handler)) => handler(call),
            Some(None) => Err(Fault::not_implemented(format!(
                "{}::{} has no handler",
                self.vtable.name(),
                call.method().name
            ))),
            None => Err(Fault::new(
                FaultCode::UnsupportedMethod,
                format!("{} has no ordinal {}", self.vtable.name(), ordinal),
            )),
        }
    }
}

impl fmt::Debug for DispatchObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound: Vec<&str> = self
            .vtable
            .iter()
            .zip(&self.handlers)
            .filter(|(_, h)| h.is_some())
            .map(|(e, _)| e.method.name.as_str())
            .collect();
        f.debug_struct("DispatchObject")
            .field("interface", &self.vtable.name())
            .field("bound", &bound)
            .finish()
    }
}

/// Finds the local object for an interface on the receiving side.
pub trait ObjectActivator: Send + Sync {
    fn activate(&self, interface_id: InterfaceId) -> Option<Arc<dyn Dispatch>>;
}

impl<F> ObjectActivator for F
where
    F: Fn(InterfaceId) -> Option<Arc<dyn Dispatch>> + Send + Sync,
{
    fn activate(&self, interface_id: InterfaceId) -> Option<Arc<dyn Dispatch>> {
        self(interface_id)
    }
}

/// Concurrent interface-id to object map.
#[derive(Default)]
pub struct ObjectTable {
    objects: DashMap<InterfaceId, Arc<dyn Dispatch>>,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `object` under its own interface id.
    pub fn insert(&self, object: Arc<dyn Dispatch>) -> Option<Arc<dyn Dispatch>> {
        let id = object.interface_id();
        self.insert_as(id, object)
    }

    /// Register `object` under `interface_id`, e.g. one of its base interfaces.
    pub fn insert_as(
        &self,
        interface_id: InterfaceId,
        object: Arc<dyn Dispatch>,
    ) -> Option<Arc<dyn Dispatch>> {
        log::debug!("[rpc] object registered for {}", interface_id);
        self.objects.insert(interface_id, object)
    }

    pub fn remove(&self, interface_id: InterfaceId) -> Option<Arc<dyn Dispatch>> {
        self.objects.remove(&interface_id).map(|(_, object)| object)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

impl ObjectActivator for ObjectTable {
    fn activate(&self, interface_id: InterfaceId) -> Option<Arc<dyn Dispatch>> {
        self.objects
            .get(&interface_id)
            .map(|entry| Arc::clone(entry.value()))
    }
}

impl fmt::Debug for ObjectTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectTable")
            .field("objects", &self.objects.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InterfaceDescriptor, TypeDescriptor};

    const CALC: InterfaceId = InterfaceId::from_u128(0xCA1C);

    fn store() -> TypeStore {
        let mut store = TypeStore::new();
        store
            .register(
                InterfaceDescriptor::builder(CALC, "ICalc")
                    .method(
                        MethodDescriptor::new("Add")
                            .input("a", TypeDescriptor::I32)
                            .input("b", TypeDescriptor::I32)
                            .returns(TypeDescriptor::I32),
                    )
                    .method(MethodDescriptor::new("Reset").in_out("state", TypeDescriptor::I64))
                    .build(),
            )
            .expect("register");
        store
    }

    #[test]
    fn test_invocation_outputs() {
        let store = store();
        let reset = store.lookup_method(CALC, 1).expect("Reset");
        let args = [TaggedValue::I64(9)];

        let call = Invocation::new(reset, &args);
        assert_eq!(call.value("state").expect("state"), TaggedValue::I64(9));
        let (outputs, ret) = call.into_reply().expect("reply");
        assert_eq!(outputs, vec![TaggedValue::I64(9)], "unset inout echoes input");
        assert_eq!(ret, None);

        let mut call = Invocation::new(reset, &args);
        call.set_output("state", 0i64).expect("set");
        assert!(matches!(
            call.set_output("nope", 1i64),
            Err(MarshalError::UnknownParameter { .. })
        ));
        assert!(matches!(
            call.set_return(1i32),
            Err(MarshalError::UnexpectedReturn { .. })
        ));
        assert_eq!(call.into_reply().expect("reply").0, vec![TaggedValue::I64(0)]);
    }

    #[test]
    fn test_builder_binds_by_name() {
        let store = store();
        assert!(ObjectBuilder::new(&store, CALC)
            .expect("builder")
            .handle("Mul", |_| Ok(()))
            .is_err());

        let calc = ObjectBuilder::new(&store, CALC)
            .expect("builder")
            .handle("Add", |call| {
                let a = call.value("a")?.as_i32().unwrap_or_default();
                let b = call.value("b")?.as_i32().unwrap_or_default();
                call.set_return(a + b)?;
                Ok(())
            })
            .expect("Add")
            .build();

        let add = store.lookup_method(CALC, 0).expect("Add");
        let args = [TaggedValue::I32(2), TaggedValue::I32(3)];
        let mut call = Invocation::new(add, &args);
        calc.invoke(0, &mut call).expect("invoke");
        assert_eq!(call.into_reply().expect("reply").1, Some(TaggedValue::I32(5)));

        let reset = store.lookup_method(CALC, 1).expect("Reset");
        let args = [TaggedValue::I64(1)];
        let mut call = Invocation::new(reset, &args);
        let fault = calc.invoke(1, &mut call).unwrap_err();
        assert_eq!(fault.code, FaultCode::NotImplemented);
        assert_eq!(calc.invoke(5, &mut call).unwrap_err().code, FaultCode::UnsupportedMethod);
    }

    #[test]
    fn test_object_table_activation() {
        let store = store();
        let table = ObjectTable::new();
        assert!(table.activate(CALC).is_none());

        let object: Arc<dyn Dispatch> =
            Arc::new(ObjectBuilder::new(&store, CALC).expect("builder").build());
        assert!(table.insert(object).is_none());
        assert_eq!(table.len(), 1);
        assert_eq!(table.activate(CALC).map(|o| o.interface_id()), Some(CALC));

        assert!(table.remove(CALC).is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn test_closure_activator() {
        let store = store();
        let object: Arc<dyn Dispatch> =
            Arc::new(ObjectBuilder::new(&store, CALC).expect("builder").build());
        let activator = move |id: InterfaceId| (id == CALC).then(|| Arc::clone(&object));
        assert!(activator.activate(CALC).is_some());
        assert!(activator.activate(InterfaceId::NIL).is_none());
    }
}
