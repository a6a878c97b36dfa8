// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Caller side: turns method calls into frames and replies into results.

use super::marshal::Marshaler;
use crate::error::{MarshalError, MarshalResult};
use crate::transport::{Transport, TransportError};
use crate::types::{Direction, InterfaceId, MethodDescriptor};
use crate::variant::TaggedValue;
use std::fmt;
use std::sync::Arc;

/// Lifecycle of one outgoing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientCallState {
    /// Call frame marshaled.
    Built,
    /// Frame handed to the transport.
    Sent,
    /// Waiting on the transport for the reply.
    AwaitingReply,
    /// Reply unmarshaled and out values delivered.
    Completed,
}

impl ClientCallState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Sent => "sent",
            Self::AwaitingReply => "awaiting-reply",
            Self::Completed => "completed",
        }
    }

    const fn follows(self, previous: Option<Self>) -> bool {
        matches!(
            (previous, self),
            (None | Some(Self::Completed), Self::Built)
                | (Some(Self::Built), Self::Sent)
                | (Some(Self::Sent), Self::AwaitingReply)
                | (Some(Self::AwaitingReply), Self::Completed)
        )
    }
}

impl fmt::Display for ClientCallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Results of a completed call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallOutput {
    /// `Out`/`InOut` values by parameter name, in declared order.
    pub outputs: Vec<(String, TaggedValue)>,
    pub return_value: Option<TaggedValue>,
}

impl CallOutput {
    pub fn output(&self, name: &str) -> Option<&TaggedValue> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn into_return(self) -> Option<TaggedValue> {
        self.return_value
    }
}

/// Client endpoint bound to one interface and one transport.
///
/// Calls run one at a time: a proxy is owned by the thread that uses it.
/// Independent proxies may share a [`Marshaler`].
///
/// Frames carry no call id, so a reply that arrives after its call timed
/// out cannot be told apart from the reply to the next call. A proxy whose
/// call was aborted refuses every later call with `InvalidState`.
pub struct Proxy<T: Transport> {
    marshaler: Marshaler,
    transport: T,
    interface_id: InterfaceId,
    state: Option<ClientCallState>,
    aborted: bool,
}

impl<T: Transport> Proxy<T> {
    pub fn new(marshaler: Marshaler, transport: T, interface_id: InterfaceId) -> MarshalResult<Self> {
        if marshaler.store().resolve(interface_id).is_none() {
            return Err(MarshalError::UnknownInterface(interface_id));
        }
        Ok(Self {
            marshaler,
            transport,
            interface_id,
            state: None,
            aborted: false,
        })
    }

    pub fn interface_id(&self) -> InterfaceId {
        self.interface_id
    }

    /// State reached by the most recent call.
    pub fn state(&self) -> Option<ClientCallState> {
        self.state
    }

    /// True once a call has timed out; the proxy accepts no further calls.
    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Call the method at `ordinal` and wait for its reply.
    ///
    /// `args` holds the `In`/`InOut` values in declared order. For an `InOut`
    /// parameter passed as a byref, the returned value is also stored back
    /// through the reference.
    pub fn invoke(&mut self, ordinal: u32, args: &[TaggedValue]) -> MarshalResult<CallOutput> {
        let store = Arc::clone(self.marshaler.store());
        let method = store.lookup_method(self.interface_id, ordinal)?;
        if self.aborted {
            return Err(MarshalError::InvalidState {
                expected: "idle",
                found: "aborted",
            });
        }
        self.state = None;

        let frame = self.marshaler.marshal_call(self.interface_id, ordinal, args)?;
        self.enter(ClientCallState::Built)?;

        if let Err(e) = self.transport.send(frame) {
            return Err(self.abort_on_timeout(e));
        }
        self.enter(ClientCallState::Sent)?;
        self.enter(ClientCallState::AwaitingReply)?;

        let reply = match self.transport.receive() {
            Ok(reply) => reply,
            Err(e) => return Err(self.abort_on_timeout(e)),
        };
        let (outputs, return_value) = self.marshaler.unmarshal_reply(&reply, method)?;
        write_back(method, args, &outputs)?;
        self.enter(ClientCallState::Completed)?;

        let outputs = method
            .outputs()
            .map(|p| p.name.clone())
            .zip(outputs)
            .collect();
        Ok(CallOutput {
            outputs,
            return_value,
        })
    }

    /// Like [`invoke`](Self::invoke), selecting the method by name.
    pub fn invoke_by_name(&mut self, name: &str, args: &[TaggedValue]) -> MarshalResult<CallOutput> {
        let ordinal = self
            .marshaler
            .store()
            .method_by_name(self.interface_id, name)?
            .ordinal;
        self.invoke(ordinal, args)
    }

    fn abort_on_timeout(&mut self, err: TransportError) -> MarshalError {
        match err {
            TransportError::Timeout => {
                log::warn!(
                    "[rpc] proxy {} aborted in state {}; refusing further calls",
                    self.interface_id,
                    self.state.map_or("idle", ClientCallState::as_str)
                );
                self.aborted = true;
                MarshalError::Aborted
            }
            other => MarshalError::Transport(other),
        }
    }

    fn enter(&mut self, next: ClientCallState) -> MarshalResult<()> {
        if !next.follows(self.state) {
            return Err(MarshalError::InvalidState {
                expected: next.as_str(),
                found: self.state.map_or("idle", ClientCallState::as_str),
            });
        }
        log::trace!("[rpc] proxy {} -> {}", self.interface_id, next);
        self.state = Some(next);
        Ok(())
    }
}

impl<T: Transport> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("interface_id", &self.interface_id)
            .field("state", &self.state)
            .field("aborted", &self.aborted)
            .finish()
    }
}

/// Store `InOut` results through the caller's byref arguments.
fn write_back(
    method: &MethodDescriptor,
    args: &[TaggedValue],
    outputs: &[TaggedValue],
) -> MarshalResult<()> {
    for (param, value) in method.outputs().zip(outputs) {
        if param.direction != Direction::InOut || value.is_empty() {
            continue;
        }
        let Some(index) = method.inputs().position(|p| p.name == param.name) else {
            continue;
        };
        if let Some(TaggedValue::ByRef(r)) = args.get(index) {
            r.store(value.clone())?;
        }
    }
    Ok(())
}
