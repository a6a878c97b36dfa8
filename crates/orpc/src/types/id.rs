// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! 128-bit interface identity.

use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Globally unique interface identity.
///
/// Encoded on the wire as a little-endian `u128`. Displayed in the
/// hyphenated UUID form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct InterfaceId(u128);

impl InterfaceId {
    /// The nil id. As an `iface(..)` parameter type it admits any interface.
    pub const NIL: InterfaceId = InterfaceId(0);

    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub const fn as_u128(&self) -> u128 {
        self.0
    }

    pub const fn is_nil(&self) -> bool {
        self.0 == 0
    }
}

impl From<Uuid> for InterfaceId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid.as_u128())
    }
}

impl From<InterfaceId> for Uuid {
    fn from(id: InterfaceId) -> Self {
        Uuid::from_u128(id.0)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Uuid::from_u128(self.0).hyphenated())
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceId({})", self)
    }
}

/// Error parsing an [`InterfaceId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid interface id '{0}' (expected a UUID, 0x-prefixed hex or decimal)")]
pub struct InterfaceIdParseError(pub String);

impl FromStr for InterfaceId {
    type Err = InterfaceIdParseError;

    /// Accepts `6f1c...-...` UUID text, `0x1F` hex or plain decimal.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || InterfaceIdParseError(s.to_string());

        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return u128::from_str_radix(hex, 16).map(Self).map_err(|_| err());
        }
        if s.contains('-') || s.len() == 32 {
            return Uuid::parse_str(s).map(Self::from).map_err(|_| err());
        }
        s.parse::<u128>().map(Self).map_err(|_| err())
    }
}
