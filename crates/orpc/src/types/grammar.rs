// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compact textual form of [`TypeDescriptor`].
//!
//! ```text
//! type    := '*' type | postfix
//! postfix := atom ( '[' ']' | '[' u32 (',' u32)* ']' )*
//! atom    := '(' type ')' | keyword | 'iface' [ '(' id ')' ] | ident [ '{' fields '}' ]
//! fields  := ident ':' type (',' ident ':' type)*
//! ```
//!
//! `*i32[]` is a pointer to an array; `(*i32)[]` is an array of pointers.
//! A bare identifier names a record registered in the store. Pointers,
//! parentheses and inline records nest at most [`MAX_NESTING`] deep.

use super::descriptor::{
    FieldDescriptor, FloatWidth, RecordDescriptor, StringEncoding, TypeDescriptor,
};
use super::id::InterfaceId;
use crate::variant::MAX_NESTING;
use std::fmt;
use std::str::FromStr;

/// Error parsing a type expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("type parse error at column {position}: {reason}")]
pub struct TypeParseError {
    pub position: usize,
    pub reason: String,
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Bool => f.write_str("bool"),
            Self::Integer { width, signed } => {
                let prefix = if *signed { 'i' } else { 'u' };
                write!(f, "{}{}", prefix, width.size() * 8)
            }
            Self::Float(FloatWidth::W32) => f.write_str("f32"),
            Self::Float(FloatWidth::W64) => f.write_str("f64"),
            Self::Currency => f.write_str("currency"),
            Self::Decimal => f.write_str("decimal"),
            Self::Date => f.write_str("date"),
            Self::ErrorCode => f.write_str("scode"),
            Self::String(StringEncoding::Utf8) => f.write_str("string"),
            Self::String(StringEncoding::Utf16) => f.write_str("wstring"),
            Self::TaggedValue => f.write_str("variant"),
            Self::InterfaceRef(id) if id.is_nil() => f.write_str("iface"),
            Self::InterfaceRef(id) => write!(f, "iface({})", id),
            Self::Named(name) => f.write_str(name),
            Self::Record(record) => {
                write!(f, "{}{{", record.name)?;
                for (i, field) in record.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}:{}", field.name, field.ty)?;
                }
                f.write_str("}")
            }
            Self::Pointer(inner) => write!(f, "*{}", inner),
            Self::VariableArray(element) => {
                write_element(f, element)?;
                f.write_str("[]")
            }
            Self::FixedArray { element, dims } => {
                write_element(f, element)?;
                let dims: Vec<String> = dims.iter().map(u32::to_string).collect();
                write!(f, "[{}]", dims.join(","))
            }
        }
    }
}

fn write_element(f: &mut fmt::Formatter<'_>, element: &TypeDescriptor) -> fmt::Result {
    match element {
        TypeDescriptor::Pointer(_) => write!(f, "({})", element),
        _ => write!(f, "{}", element),
    }
}

impl FromStr for TypeDescriptor {
    type Err = TypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser {
            src: s,
            pos: 0,
            depth: 0,
        };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if parser.pos < s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> TypeParseError {
        TypeParseError {
            position: self.pos,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Consume `expected` after optional whitespace.
    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), TypeParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    fn ident(&mut self) -> Result<&'a str, TypeParseError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            let ok = if self.pos == start {
                c.is_ascii_alphabetic() || c == '_'
            } else {
                c.is_ascii_alphanumeric() || c == '_'
            };
            if !ok {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a type name"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn number(&mut self) -> Result<u32, TypeParseError> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        self.src[start..self.pos]
            .parse()
            .map_err(|_| TypeParseError {
                position: start,
                reason: "expected an array dimension".into(),
            })
    }

    fn parse_type(&mut self) -> Result<TypeDescriptor, TypeParseError> {
        if self.depth == MAX_NESTING {
            return Err(self.error(format!("nesting deeper than {}", MAX_NESTING)));
        }
        self.depth += 1;
        let ty = self.parse_postfix();
        self.depth -= 1;
        ty
    }

    fn parse_postfix(&mut self) -> Result<TypeDescriptor, TypeParseError> {
        if self.eat('*') {
            return Ok(TypeDescriptor::pointer(self.parse_type()?));
        }
        let mut ty = self.parse_atom()?;
        while self.eat('[') {
            if self.eat(']') {
                ty = TypeDescriptor::variable_array(ty);
                continue;
            }
            let mut dims = vec![self.number()?];
            while self.eat(',') {
                dims.push(self.number()?);
            }
            self.expect(']')?;
            ty = TypeDescriptor::fixed_array(ty, dims);
        }
        Ok(ty)
    }

    fn parse_atom(&mut self) -> Result<TypeDescriptor, TypeParseError> {
        if self.eat('(') {
            let inner = self.parse_type()?;
            self.expect(')')?;
            return Ok(inner);
        }
        let name = self.ident()?;
        let ty = match name {
            "void" => TypeDescriptor::Void,
            "bool" => TypeDescriptor::BOOL,
            "i8" => TypeDescriptor::I8,
            "i16" => TypeDescriptor::I16,
            "i32" => TypeDescriptor::I32,
            "i64" => TypeDescriptor::I64,
            "u8" => TypeDescriptor::U8,
            "u16" => TypeDescriptor::U16,
            "u32" => TypeDescriptor::U32,
            "u64" => TypeDescriptor::U64,
            "f32" => TypeDescriptor::F32,
            "f64" => TypeDescriptor::F64,
            "currency" => TypeDescriptor::CURRENCY,
            "decimal" => TypeDescriptor::DECIMAL,
            "date" => TypeDescriptor::DATE,
            "scode" => TypeDescriptor::ERROR_CODE,
            "string" => TypeDescriptor::STRING,
            "wstring" => TypeDescriptor::WSTRING,
            "variant" => TypeDescriptor::VARIANT,
            "iface" => {
                if !self.eat('(') {
                    return Ok(TypeDescriptor::InterfaceRef(InterfaceId::NIL));
                }
                let close = self.src[self.pos..]
                    .find(')')
                    .ok_or_else(|| self.error("unterminated interface id"))?;
                let text = &self.src[self.pos..self.pos + close];
                let id = text.parse::<InterfaceId>().map_err(|e| TypeParseError {
                    position: self.pos,
                    reason: e.to_string(),
                })?;
                self.pos += close + 1;
                TypeDescriptor::InterfaceRef(id)
            }
            _ => {
                if self.eat('{') {
                    return self.parse_record(name).map(TypeDescriptor::Record);
                }
                TypeDescriptor::named(name)
            }
        };
        Ok(ty)
    }

    fn parse_record(&mut self, name: &str) -> Result<RecordDescriptor, TypeParseError> {
        let mut record = RecordDescriptor::new(name);
        if self.eat('}') {
            return Ok(record);
        }
        loop {
            let field = self.ident()?.to_string();
            self.expect(':')?;
            let ty = self.parse_type()?;
            record.fields.push(FieldDescriptor::new(field, ty));
            if self.eat('}') {
                return Ok(record);
            }
            self.expect(',')?;
        }
    }
}
