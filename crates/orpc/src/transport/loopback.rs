// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory duplex transport.
//!
//! [`LoopbackTransport::pair`] returns two connected endpoints: frames sent on
//! one are received on the other, in order.

use super::{Buffer, Transport, TransportError};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Frame and byte counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TransportStats {
    /// Frames handed to `send`.
    pub frames_sent: u64,
    /// Bytes handed to `send`.
    pub bytes_sent: u64,
    /// Frames returned by `receive`.
    pub frames_received: u64,
    /// Bytes returned by `receive`.
    pub bytes_received: u64,
}

/// One end of an in-memory duplex link.
pub struct LoopbackTransport {
    tx: Sender<Buffer>,
    rx: Receiver<Buffer>,
    timeout: Option<Duration>,
    frames_sent: AtomicU64,
    bytes_sent: AtomicU64,
    frames_received: AtomicU64,
    bytes_received: AtomicU64,
}

impl LoopbackTransport {
    /// Two connected endpoints; `receive` blocks until a frame arrives.
    pub fn pair() -> (Self, Self) {
        Self::build_pair(None)
    }

    /// Two connected endpoints whose `receive` gives up after `timeout`.
    pub fn pair_with_timeout(timeout: Duration) -> (Self, Self) {
        Self::build_pair(Some(timeout))
    }

    fn build_pair(timeout: Option<Duration>) -> (Self, Self) {
        let (a_tx, b_rx) = channel::unbounded();
        let (b_tx, a_rx) = channel::unbounded();
        (
            Self::endpoint(a_tx, a_rx, timeout),
            Self::endpoint(b_tx, b_rx, timeout),
        )
    }

    fn endpoint(tx: Sender<Buffer>, rx: Receiver<Buffer>, timeout: Option<Duration>) -> Self {
        Self {
            tx,
            rx,
            timeout,
            frames_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    /// Frames waiting to be received on this end.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, frame: Buffer) -> Result<(), TransportError> {
        let len = frame.len() as u64;
        self.tx
            .send(frame)
            .map_err(|_| TransportError::Disconnected)?;
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(len, Ordering::Relaxed);
        Ok(())
    }

    fn receive(&self) -> Result<Buffer, TransportError> {
        let frame = match self.timeout {
            Some(timeout) => self.rx.recv_timeout(timeout).map_err(|e| match e {
                RecvTimeoutError::Timeout => TransportError::Timeout,
                RecvTimeoutError::Disconnected => TransportError::Disconnected,
            })?,
            None => self.rx.recv().map_err(|_| TransportError::Disconnected)?,
        };
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(frame.len() as u64, Ordering::Relaxed);
        Ok(frame)
    }

    fn stats(&self) -> TransportStats {
        TransportStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("timeout", &self.timeout)
            .field("pending", &self.pending())
            .finish()
    }
}
