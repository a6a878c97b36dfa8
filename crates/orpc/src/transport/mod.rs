// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Byte-buffer exchange between caller and receiver.
//!
//! The marshaling core never opens sockets, pipes or shared memory. It hands
//! complete frames to a [`Transport`] and takes complete frames back; frame
//! boundaries are preserved (datagram semantics).
//!
//! # Implementations
//!
//! - [`LoopbackTransport`] - in-memory duplex pair for tests and in-process use

mod loopback;

pub use loopback::{LoopbackTransport, TransportStats};

use thiserror::Error;

/// A complete call or reply frame.
pub type Buffer = Vec<u8>;

/// Transport failures surfaced to the call layer.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The peer endpoint is gone.
    #[error("transport disconnected")]
    Disconnected,

    /// No frame arrived within the transport's deadline.
    #[error("transport timed out")]
    Timeout,

    /// Underlying I/O failure.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Implementation-specific failure.
    #[error("transport error: {0}")]
    Other(String),
}

/// Frame-based send/receive.
///
/// Implementations must be usable from several threads; a proxy and a stub
/// each hold one endpoint.
pub trait Transport: Send + Sync {
    /// Send one frame.
    fn send(&self, frame: Buffer) -> Result<(), TransportError>;

    /// Receive the next frame, blocking at the implementation's discretion.
    ///
    /// A deadline expiring is reported as [`TransportError::Timeout`].
    fn receive(&self) -> Result<Buffer, TransportError>;

    /// Frame and byte counters. Default implementation returns zeros.
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn send(&self, frame: Buffer) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn receive(&self) -> Result<Buffer, TransportError> {
        (**self).receive()
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, frame: Buffer) -> Result<(), TransportError> {
        (**self).send(frame)
    }

    fn receive(&self) -> Result<Buffer, TransportError> {
        (**self).receive()
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}
