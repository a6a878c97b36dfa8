// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fault codes carried in the reply status word.

use crate::error::MarshalError;
use thiserror::Error;

/// Reply status. `Ok` marks a successful reply; every other code a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum FaultCode {
    /// Call completed.
    #[default]
    Ok = 0,
    /// No object implements the interface.
    UnsupportedInterface = 1,
    /// The interface has no method at the ordinal.
    UnsupportedMethod = 2,
    /// Arguments did not match the method's parameters.
    InvalidArgument = 3,
    /// The method exists but has no handler bound.
    NotImplemented = 4,
    /// The handler or the receiver failed.
    ServerError = 5,
    /// Status not known to this side.
    Unknown = 0xFFFF_FFFF,
}

impl FaultCode {
    /// Convert from the wire status word.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0 => Self::Ok,
            1 => Self::UnsupportedInterface,
            2 => Self::UnsupportedMethod,
            3 => Self::InvalidArgument,
            4 => Self::NotImplemented,
            5 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// A failed call as seen by the receiver: code plus message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct Fault {
    pub code: FaultCode,
    pub message: String,
}

impl Fault {
    pub fn new(code: FaultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FaultCode::InvalidArgument, message)
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(FaultCode::NotImplemented, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(FaultCode::ServerError, message)
    }
}

impl From<&MarshalError> for Fault {
    fn from(err: &MarshalError) -> Self {
        let code = match err {
            MarshalError::UnknownInterface(_) => FaultCode::UnsupportedInterface,
            MarshalError::UnknownOrdinal { .. } | MarshalError::UnknownMethod { .. } => {
                FaultCode::UnsupportedMethod
            }
            MarshalError::ArgumentCount { .. }
            | MarshalError::UnknownParameter { .. }
            | MarshalError::TypeMismatch { .. }
            | MarshalError::TrailingBytes { .. }
            | MarshalError::Codec(_) => FaultCode::InvalidArgument,
            MarshalError::Remote { code, .. } => *code,
            _ => FaultCode::ServerError,
        };
        let message = match err {
            MarshalError::Remote { message, .. } => message.clone(),
            other => other.to_string(),
        };
        Self { code, message }
    }
}

impl From<MarshalError> for Fault {
    fn from(err: MarshalError) -> Self {
        Self::from(&err)
    }
}
