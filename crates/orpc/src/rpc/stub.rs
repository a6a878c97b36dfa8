// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Receiver side: frames in, dispatched calls, replies out.
//!
//! Every received frame gets exactly one reply. Unknown interfaces or
//! ordinals, bad arguments and handler failures become fault replies.

use super::dispatch::{Invocation, ObjectActivator};
use super::fault::{Fault, FaultCode};
use super::marshal::Marshaler;
use crate::transport::{Buffer, Transport, TransportError};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle of one incoming call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerCallState {
    /// Frame taken from the transport.
    Received,
    /// Handed to the activated object.
    Dispatched,
    /// Reply (result or fault) produced.
    ReplySent,
}

impl ServerCallState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Dispatched => "dispatched",
            Self::ReplySent => "reply-sent",
        }
    }
}

impl fmt::Display for ServerCallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-state call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StubStats {
    pub received: u64,
    pub dispatched: u64,
    pub replies: u64,
    /// Replies that carried a fault.
    pub faults: u64,
}

/// Server endpoint: unmarshals calls, activates objects, marshals replies.
///
/// A stub is `Sync`; several threads may serve frames through one stub.
pub struct Stub<A: ObjectActivator> {
    marshaler: Marshaler,
    activator: A,
    received: AtomicU64,
    dispatched: AtomicU64,
    replies: AtomicU64,
    faults: AtomicU64,
}

impl<A: ObjectActivator> Stub<A> {
    pub fn new(marshaler: Marshaler, activator: A) -> Self {
        Self {
            marshaler,
            activator,
            received: AtomicU64::new(0),
            dispatched: AtomicU64::new(0),
            replies: AtomicU64::new(0),
            faults: AtomicU64::new(0),
        }
    }

    pub fn activator(&self) -> &A {
        &self.activator
    }

    /// Process one call frame and return its reply frame.
    pub fn handle_frame(&self, frame: &[u8]) -> Buffer {
        self.enter(ServerCallState::Received);
        let reply = match self.dispatch(frame) {
            Ok(reply) => reply,
            Err(fault) => {
                log::warn!("[rpc] call failed: {}", fault);
                self.faults.fetch_add(1, Ordering::Relaxed);
                self.fault_frame(&fault)
            }
        };
        self.enter(ServerCallState::ReplySent);
        reply
    }

    /// Receive one frame from `transport`, handle it and send the reply.
    pub fn serve_one<T: Transport + ?Sized>(&self, transport: &T) -> Result<(), TransportError> {
        let frame = transport.receive()?;
        let reply = self.handle_frame(&frame);
        transport.send(reply)
    }

    /// Serve until the peer disconnects; returns the number of calls served.
    pub fn serve<T: Transport + ?Sized>(&self, transport: &T) -> Result<u64, TransportError> {
        let mut served = 0;
        loop {
            match self.serve_one(transport) {
                Ok(()) => served += 1,
                Err(TransportError::Disconnected) => {
                    log::debug!("[rpc] stub stopped after {} calls", served);
                    return Ok(served);
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn stats(&self) -> StubStats {
        StubStats {
            received: self.received.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            replies: self.replies.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
        }
    }

    fn dispatch(&self, frame: &[u8]) -> Result<Buffer, Fault> {
        let call = self.marshaler.unmarshal_call(frame)?;
        let method = self
            .marshaler
            .store()
            .lookup_method(call.interface_id, call.ordinal)?;
        let object = self.activator.activate(call.interface_id).ok_or_else(|| {
            Fault::new(
                FaultCode::UnsupportedInterface,
                format!("no object implements {}", call.interface_id),
            )
        })?;

        self.enter(ServerCallState::Dispatched);
        log::debug!(
            "[rpc] dispatching {}#{} ({})",
            call.interface_id,
            call.ordinal,
            method.name
        );
        let mut invocation = Invocation::new(method, &call.args);
        object.invoke(call.ordinal, &mut invocation)?;

        let (outputs, return_value) = invocation.into_reply()?;
        self.marshaler
            .marshal_reply(method, &outputs, return_value.as_ref())
            .map_err(|e| Fault::server(format!("{}: {}", method.name, e)))
    }

    fn fault_frame(&self, fault: &Fault) -> Buffer {
        match self.marshaler.marshal_fault(fault) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("[rpc] fault message not encodable: {}", e);
                // Status word and an empty message.
                let code = match fault.code {
                    FaultCode::Ok => FaultCode::ServerError,
                    code => code,
                };
                let mut frame = code.as_u32().to_le_bytes().to_vec();
                frame.extend_from_slice(&0u32.to_le_bytes());
                frame
            }
        }
    }

    fn enter(&self, state: ServerCallState) {
        let counter = match state {
            ServerCallState::Received => &self.received,
            ServerCallState::Dispatched => &self.dispatched,
            ServerCallState::ReplySent => &self.replies,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        log::trace!("[rpc] stub -> {}", state);
    }
}

impl<A: ObjectActivator> fmt::Debug for Stub<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stub").field("stats", &self.stats()).finish()
    }
}
