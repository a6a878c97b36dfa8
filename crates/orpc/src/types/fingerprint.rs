// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout fingerprint: MD5 over a descriptor's canonical text.
//!
//! Two peers that agree on a fingerprint agree on ordinals and parameter
//! shapes. The store reports both fingerprints when it rejects a
//! conflicting registration.

use md5::{Digest, Md5};
use std::fmt;

/// 16-byte MD5 digest of a canonical interface layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeFingerprint([u8; 16]);

impl TypeFingerprint {
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Compute the fingerprint of `canonical` bytes.
    pub fn compute(canonical: &[u8]) -> Self {
        let mut hasher = Md5::new();
        hasher.update(canonical);
        let result = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }
}

impl fmt::Debug for TypeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeFingerprint({})", self)
    }
}

impl fmt::Display for TypeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl AsRef<[u8]> for TypeFingerprint {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        // RFC 1321 test vector.
        let fp = TypeFingerprint::compute(b"abc");
        assert_eq!(fp.to_string(), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn debug_wraps_hex() {
        let fp = TypeFingerprint::from_bytes([0xab; 16]);
        assert_eq!(
            format!("{:?}", fp),
            format!("TypeFingerprint({})", "ab".repeat(16))
        );
    }
}
