// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the codec, store and call layers.
//!
//! Every layer reports failures as values. The only panics are the
//! programming errors documented on [`crate::TypeStore::register`].

use crate::rpc::FaultCode;
use crate::transport::TransportError;
use crate::types::{InterfaceId, TypeFingerprint};
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while encoding or decoding tagged values and arrays.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The 2-byte discriminant is not part of the known set.
    #[error("unknown discriminant 0x{code:04x} at offset {offset}")]
    UnknownDiscriminant { code: u16, offset: usize },

    /// A byref value has no live referent to read from or write into.
    #[error("byref value has no live referent")]
    DanglingReference,

    /// A declared element count does not fit in addressable memory.
    #[error("declared size at offset {offset} overflows addressable memory")]
    SizeOverflow { offset: usize },

    /// Array storage is held by a conflicting lock.
    #[error("array storage is locked (lock_count={lock_count})")]
    Busy { lock_count: u32 },

    /// The buffer ends before the declared data.
    #[error("buffer truncated at offset {offset}: need {needed} bytes, have {available}")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A value does not have the discriminant its container requires.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Payload bytes are structurally invalid for their discriminant.
    #[error("invalid payload at offset {offset}: {reason}")]
    InvalidPayload { offset: usize, reason: String },

    /// Element count does not match the product of the dimension bounds.
    #[error("array shape holds {expected} elements, got {found}")]
    ElementCount { expected: usize, found: usize },

    /// Array index outside the declared bounds.
    #[error("array index {index:?} out of bounds")]
    IndexOutOfBounds { index: Vec<i64> },
}

impl CodecError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn invalid(offset: usize, reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            offset,
            reason: reason.into(),
        }
    }
}

/// Errors raised by the Type Descriptor Store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The id is already registered with a structurally different descriptor.
    #[error("interface {id} ({name}) already registered with a different layout (registered {existing}, offered {offered})")]
    DuplicateId {
        id: InterfaceId,
        name: String,
        existing: TypeFingerprint,
        offered: TypeFingerprint,
    },

    /// A record name is already registered with a different layout.
    #[error("record '{0}' already registered with a different layout")]
    DuplicateRecord(String),

    /// The referenced base interface is not registered.
    #[error("unknown interface {0}")]
    UnknownInterface(InterfaceId),

    /// The referenced record is not registered.
    #[error("unknown record '{0}'")]
    UnknownRecord(String),

    /// The descriptor violates a structural rule.
    #[error("invalid descriptor {context}: {reason}")]
    InvalidDescriptor { context: String, reason: String },
}

impl RegistryError {
    pub(crate) fn invalid(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for call marshaling.
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Errors that terminate a single call.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// No interface with this id is registered.
    #[error("unknown interface {0}")]
    UnknownInterface(InterfaceId),

    /// The interface (and its bases) has no method at this ordinal.
    #[error("interface {interface} has no method at ordinal {ordinal}")]
    UnknownOrdinal { interface: InterfaceId, ordinal: u32 },

    /// The interface (and its bases) has no method with this name.
    #[error("interface {interface} has no method '{name}'")]
    UnknownMethod { interface: InterfaceId, name: String },

    /// Wrong number of values for the method's parameter list.
    #[error("{method}: expected {expected} values, got {found}")]
    ArgumentCount {
        method: String,
        expected: usize,
        found: usize,
    },

    /// The method declares no parameter with this name.
    #[error("{method}: no parameter '{name}'")]
    UnknownParameter { method: String, name: String },

    /// The method declares a return value but none was supplied.
    #[error("{method}: return value missing")]
    MissingReturn { method: String },

    /// A return value was supplied for a method that declares none.
    #[error("{method}: return value not declared")]
    UnexpectedReturn { method: String },

    /// A value does not match the declared parameter type.
    #[error("parameter '{parameter}': expected {expected}, found {found}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        found: String,
    },

    /// The frame carries bytes past its last declared value.
    #[error("frame has {remaining} trailing bytes")]
    TrailingBytes { remaining: usize },

    /// Tagged value or array codec failure.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Transport failure (other than a timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The call was abandoned by the layer beneath (timeout).
    #[error("call aborted")]
    Aborted,

    /// The receiver answered with a fault.
    #[error("remote fault {code:?}: {message}")]
    Remote { code: FaultCode, message: String },

    /// A call object was driven out of order.
    #[error("call in state {found}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        found: &'static str,
    },
}

impl MarshalError {
    /// True if the failure came from a buffer that ended early.
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Codec(CodecError::TruncatedBuffer { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_error_display() {
        let err = CodecError::UnknownDiscriminant {
            code: 0x0fff,
            offset: 20,
        };
        assert_eq!(err.to_string(), "unknown discriminant 0x0fff at offset 20");

        let err = CodecError::TruncatedBuffer {
            offset: 4,
            needed: 8,
            available: 3,
        };
        assert_eq!(
            err.to_string(),
            "buffer truncated at offset 4: need 8 bytes, have 3"
        );
    }

    #[test]
    fn marshal_error_wraps_codec() {
        let err: MarshalError = CodecError::DanglingReference.into();
        assert!(matches!(
            err,
            MarshalError::Codec(CodecError::DanglingReference)
        ));
        assert!(!err.is_truncated());

        let err: MarshalError = CodecError::TruncatedBuffer {
            offset: 0,
            needed: 2,
            available: 0,
        }
        .into();
        assert!(err.is_truncated());
    }

    #[test]
    fn return_value_message() {
        let err = MarshalError::MissingReturn {
            method: "Get".into(),
        };
        assert_eq!(err.to_string(), "Get: return value missing");
    }
}
