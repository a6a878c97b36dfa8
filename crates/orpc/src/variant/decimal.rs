// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-point decimal with an explicit scale.
//!
//! Value = (-1)^negative x mantissa / 10^scale, with a 96-bit mantissa and
//! `scale <= 28`. The scale is part of the value: `1.0` and `1.00` are
//! different decimals and nothing is ever rounded.

use std::fmt;
use std::str::FromStr;

/// Largest mantissa (2^96 - 1).
pub const MAX_MANTISSA: u128 = (1u128 << 96) - 1;
/// Largest scale.
pub const MAX_SCALE: u8 = 28;

/// 96-bit fixed-point decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    mantissa: u128,
    scale: u8,
    negative: bool,
}

/// Error building or parsing a [`Decimal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecimalParseError {
    #[error("mantissa exceeds 96 bits")]
    MantissaOverflow,
    #[error("scale {0} exceeds 28")]
    ScaleOverflow(usize),
    #[error("invalid decimal literal '{0}'")]
    Invalid(String),
}

impl Decimal {
    pub const ZERO: Decimal = Decimal {
        mantissa: 0,
        scale: 0,
        negative: false,
    };

    pub fn new(mantissa: u128, scale: u8, negative: bool) -> Result<Self, DecimalParseError> {
        if mantissa > MAX_MANTISSA {
            return Err(DecimalParseError::MantissaOverflow);
        }
        if scale > MAX_SCALE {
            return Err(DecimalParseError::ScaleOverflow(scale as usize));
        }
        Ok(Self {
            mantissa,
            scale,
            negative,
        })
    }

    pub fn mantissa(&self) -> u128 {
        self.mantissa
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }
}

impl FromStr for Decimal {
    type Err = DecimalParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DecimalParseError::Invalid(s.to_string());
        let text = s.trim();
        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        if !int_part
            .chars()
            .chain(frac_part.chars())
            .all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac_part.len() > MAX_SCALE as usize {
            return Err(DecimalParseError::ScaleOverflow(frac_part.len()));
        }

        let mut mantissa: u128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let digit = u128::from(c as u8 - b'0');
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add(digit))
                .filter(|m| *m <= MAX_MANTISSA)
                .ok_or(DecimalParseError::MantissaOverflow)?;
        }
        Self::new(mantissa, frac_part.len() as u8, negative)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.mantissa.to_string();
        let scale = self.scale as usize;
        if self.negative {
            f.write_str("-")?;
        }
        if scale == 0 {
            return f.write_str(&digits);
        }
        let padded = format!("{:0>width$}", digits, width = scale + 1);
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}.{}", int_part, frac_part)
    }
}
