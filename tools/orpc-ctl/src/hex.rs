// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Hex text for frames on the command line.

use anyhow::{bail, Context};

/// Lowercase hex, bytes separated by spaces.
pub fn encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex text. Whitespace and an optional `0x` prefix are ignored.
pub fn decode(text: &str) -> anyhow::Result<Vec<u8>> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let digits: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits ({})", digits.len());
    }

    digits
        .chunks(2)
        .enumerate()
        .map(|(i, pair)| {
            let byte: String = pair.iter().collect();
            u8::from_str_radix(&byte, 16).with_context(|| format!("bad hex byte {} '{}'", i, byte))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        assert_eq!(encode(&[0x03, 0x00, 0xff]), "03 00 ff");
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_forms() {
        assert_eq!(decode("03 00 ff").unwrap(), vec![0x03, 0x00, 0xff]);
        assert_eq!(decode("0x0300FF").unwrap(), vec![0x03, 0x00, 0xff]);
        assert_eq!(decode("  03\n00\tff ").unwrap(), vec![0x03, 0x00, 0xff]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode("030").is_err());
        assert!(decode("zz").is_err());
    }
}
