// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The tagged value and its discriminant.

use super::cell::VariantRef;
use super::decimal::Decimal;
use crate::array::SafeArray;
use crate::error::{CodecError, CodecResult};
use crate::types::InterfaceId;
use std::fmt;

/// Set on a discriminant whose payload is an array of the base kind.
pub const ARRAY_FLAG: u16 = 0x2000;
/// Set on a discriminant whose value is a location reference.
pub const BYREF_FLAG: u16 = 0x4000;
const BASE_MASK: u16 = 0x0FFF;

/// Base kind of a tagged value (low 12 bits of the discriminant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum VarType {
    Empty = 0x0000,
    Null = 0x0001,
    I16 = 0x0002,
    I32 = 0x0003,
    F32 = 0x0004,
    F64 = 0x0005,
    Currency = 0x0006,
    Date = 0x0007,
    String = 0x0008,
    Error = 0x000A,
    Bool = 0x000B,
    /// Only valid as an array element kind.
    Variant = 0x000C,
    Interface = 0x000D,
    Decimal = 0x000E,
    I8 = 0x0010,
    U8 = 0x0011,
    U16 = 0x0012,
    U32 = 0x0013,
    I64 = 0x0014,
    U64 = 0x0015,
    Record = 0x0024,
}

impl VarType {
    pub fn from_u16(code: u16) -> Option<Self> {
        let kind = match code {
            0x0000 => Self::Empty,
            0x0001 => Self::Null,
            0x0002 => Self::I16,
            0x0003 => Self::I32,
            0x0004 => Self::F32,
            0x0005 => Self::F64,
            0x0006 => Self::Currency,
            0x0007 => Self::Date,
            0x0008 => Self::String,
            0x000A => Self::Error,
            0x000B => Self::Bool,
            0x000C => Self::Variant,
            0x000D => Self::Interface,
            0x000E => Self::Decimal,
            0x0010 => Self::I8,
            0x0011 => Self::U8,
            0x0012 => Self::U16,
            0x0013 => Self::U32,
            0x0014 => Self::I64,
            0x0015 => Self::U64,
            0x0024 => Self::Record,
            _ => return None,
        };
        Some(kind)
    }

    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Payload size for kinds stored as raw little-endian bytes in arrays.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            Self::Bool | Self::I8 | Self::U8 => Some(1),
            Self::I16 | Self::U16 => Some(2),
            Self::I32 | Self::U32 | Self::F32 | Self::Error => Some(4),
            Self::I64 | Self::U64 | Self::F64 | Self::Currency | Self::Date => Some(8),
            _ => None,
        }
    }

    /// Smallest encoded size of one array element of this kind.
    pub(crate) const fn min_element_size(self) -> usize {
        match self.fixed_size() {
            Some(size) => size,
            None => match self {
                Self::Decimal => 14,
                Self::Interface => 24,
                Self::String => 4,
                Self::Record => 8,
                _ => 2,
            },
        }
    }

    /// True if arrays may hold elements of this kind.
    pub const fn is_array_element(self) -> bool {
        !matches!(self, Self::Empty | Self::Null)
    }

    /// Padding value used when an array grows.
    pub(crate) fn zero_value(self) -> TaggedValue {
        match self {
            Self::Empty | Self::Variant => TaggedValue::Empty,
            Self::Null => TaggedValue::Null,
            Self::Bool => TaggedValue::Bool(false),
            Self::I8 => TaggedValue::I8(0),
            Self::I16 => TaggedValue::I16(0),
            Self::I32 => TaggedValue::I32(0),
            Self::I64 => TaggedValue::I64(0),
            Self::U8 => TaggedValue::U8(0),
            Self::U16 => TaggedValue::U16(0),
            Self::U32 => TaggedValue::U32(0),
            Self::U64 => TaggedValue::U64(0),
            Self::F32 => TaggedValue::F32(0.0),
            Self::F64 => TaggedValue::F64(0.0),
            Self::Currency => TaggedValue::Currency(0),
            Self::Date => TaggedValue::Date(0.0),
            Self::Error => TaggedValue::Error(0),
            Self::Decimal => TaggedValue::Decimal(Decimal::ZERO),
            Self::String => TaggedValue::String(String::new()),
            Self::Interface => TaggedValue::Interface(InterfaceRef::default()),
            Self::Record => TaggedValue::Record(Record::default()),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Null => "null",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Currency => "currency",
            Self::Date => "date",
            Self::String => "string",
            Self::Error => "scode",
            Self::Bool => "bool",
            Self::Variant => "variant",
            Self::Interface => "iface",
            Self::Decimal => "decimal",
            Self::I8 => "i8",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::I64 => "i64",
            Self::U64 => "u64",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded form of the 2-byte wire discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Discriminant {
    pub base: VarType,
    pub array: bool,
    pub byref: bool,
}

impl Discriminant {
    pub const fn scalar(base: VarType) -> Self {
        Self {
            base,
            array: false,
            byref: false,
        }
    }

    pub const fn array_of(base: VarType) -> Self {
        Self {
            base,
            array: true,
            byref: false,
        }
    }

    pub const fn with_byref(mut self) -> Self {
        self.byref = true;
        self
    }

    pub const fn without_byref(mut self) -> Self {
        self.byref = false;
        self
    }

    pub const fn code(self) -> u16 {
        let mut code = self.base.code();
        if self.array {
            code |= ARRAY_FLAG;
        }
        if self.byref {
            code |= BYREF_FLAG;
        }
        code
    }

    /// Validate a wire discriminant read at `offset`.
    ///
    /// Rejects unknown bits, unknown base kinds, `variant` outside an array,
    /// and arrays of `empty`/`null`.
    pub fn from_code(code: u16, offset: usize) -> CodecResult<Self> {
        let unknown = CodecError::UnknownDiscriminant { code, offset };
        if code & !(BASE_MASK | ARRAY_FLAG | BYREF_FLAG) != 0 {
            return Err(unknown);
        }
        let base = VarType::from_u16(code & BASE_MASK).ok_or(unknown.clone())?;
        let array = code & ARRAY_FLAG != 0;
        let byref = code & BYREF_FLAG != 0;

        if base == VarType::Variant && !array {
            return Err(unknown);
        }
        if array && !base.is_array_element() {
            return Err(unknown);
        }
        Ok(Self { base, array, byref })
    }
}

impl fmt::Display for Discriminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.byref {
            f.write_str("byref ")?;
        }
        f.write_str(self.base.name())?;
        if self.array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

/// Reference to a remote object: its interface and an object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InterfaceRef {
    pub interface_id: InterfaceId,
    pub object_id: u64,
}

impl InterfaceRef {
    pub fn new(interface_id: InterfaceId, object_id: u64) -> Self {
        Self {
            interface_id,
            object_id,
        }
    }
}

/// Embedded record value: type name and ordered named fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, TaggedValue)>,
}

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TaggedValue>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&TaggedValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum TaggedValue {
    #[default]
    Empty,
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// Fixed-point money scaled by 10 000.
    Currency(i64),
    Decimal(Decimal),
    /// Days since 1899-12-30.
    Date(f64),
    String(String),
    /// 32-bit status code.
    Error(u32),
    Interface(InterfaceRef),
    Array(SafeArray),
    Record(Record),
    /// Location reference; owns no data.
    ByRef(VariantRef),
}

impl TaggedValue {
    /// Base kind; for arrays the element kind, `None` for byref.
    pub fn var_type(&self) -> Option<VarType> {
        let kind = match self {
            Self::Empty => VarType::Empty,
            Self::Null => VarType::Null,
            Self::Bool(_) => VarType::Bool,
            Self::I8(_) => VarType::I8,
            Self::I16(_) => VarType::I16,
            Self::I32(_) => VarType::I32,
            Self::I64(_) => VarType::I64,
            Self::U8(_) => VarType::U8,
            Self::U16(_) => VarType::U16,
            Self::U32(_) => VarType::U32,
            Self::U64(_) => VarType::U64,
            Self::F32(_) => VarType::F32,
            Self::F64(_) => VarType::F64,
            Self::Currency(_) => VarType::Currency,
            Self::Decimal(_) => VarType::Decimal,
            Self::Date(_) => VarType::Date,
            Self::String(_) => VarType::String,
            Self::Error(_) => VarType::Error,
            Self::Interface(_) => VarType::Interface,
            Self::Array(array) => array.kind(),
            Self::Record(_) => VarType::Record,
            Self::ByRef(_) => return None,
        };
        Some(kind)
    }

    /// Wire discriminant. Fails for a byref without a live referent.
    pub fn discriminant(&self) -> CodecResult<Discriminant> {
        match self {
            Self::ByRef(r) => r.with(|target| target.discriminant())?.map(Discriminant::with_byref),
            Self::Array(array) => Ok(Discriminant::array_of(array.kind())),
            other => match other.var_type() {
                Some(kind) => Ok(Discriminant::scalar(kind)),
                None => Err(CodecError::DanglingReference),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    pub fn is_byref(&self) -> bool {
        matches!(self, Self::ByRef(_))
    }

    /// Short type description used in mismatch reports.
    pub fn type_name(&self) -> String {
        match self {
            Self::ByRef(r) => match r.with(|target| target.type_name()) {
                Ok(inner) => format!("byref {}", inner),
                Err(_) => "byref <dangling>".to_string(),
            },
            Self::Array(array) => format!("{}[]", array.kind()),
            Self::Record(record) => format!("record {}", record.type_name),
            Self::Interface(r) => format!("iface({})", r.interface_id),
            other => other
                .var_type()
                .map(|k| k.name().to_string())
                .unwrap_or_default(),
        }
    }

    /// The value itself, or a copy of a byref's referent.
    pub fn deref_value(&self) -> CodecResult<TaggedValue> {
        match self {
            Self::ByRef(r) => r.get(),
            other => Ok(other.clone()),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&SafeArray> {
        match self {
            Self::Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for TaggedValue {
    /// Bit-exact: `NaN == NaN` when the bits agree, `0.0 != -0.0`.
    /// Byref values compare by referent; a dangling one equals nothing.
    fn eq(&self, other: &Self) -> bool {
        use TaggedValue as V;
        match (self, other) {
            (V::Empty, V::Empty) | (V::Null, V::Null) => true,
            (V::Bool(a), V::Bool(b)) => a == b,
            (V::I8(a), V::I8(b)) => a == b,
            (V::I16(a), V::I16(b)) => a == b,
            (V::I32(a), V::I32(b)) => a == b,
            (V::I64(a), V::I64(b)) => a == b,
            (V::U8(a), V::U8(b)) => a == b,
            (V::U16(a), V::U16(b)) => a == b,
            (V::U32(a), V::U32(b)) => a == b,
            (V::U64(a), V::U64(b)) => a == b,
            (V::F32(a), V::F32(b)) => a.to_bits() == b.to_bits(),
            (V::F64(a), V::F64(b)) | (V::Date(a), V::Date(b)) => a.to_bits() == b.to_bits(),
            (V::Currency(a), V::Currency(b)) => a == b,
            (V::Decimal(a), V::Decimal(b)) => a == b,
            (V::String(a), V::String(b)) => a == b,
            (V::Error(a), V::Error(b)) => a == b,
            (V::Interface(a), V::Interface(b)) => a == b,
            (V::Array(a), V::Array(b)) => a == b,
            (V::Record(a), V::Record(b)) => a == b,
            (V::ByRef(a), V::ByRef(b)) => match (a.get(), b.get()) {
                (Ok(x), Ok(y)) => x == y,
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("<empty>"),
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::I8(v) => write!(f, "{}", v),
            Self::I16(v) => write!(f, "{}", v),
            Self::I32(v) => write!(f, "{}", v),
            Self::I64(v) => write!(f, "{}", v),
            Self::U8(v) => write!(f, "{}", v),
            Self::U16(v) => write!(f, "{}", v),
            Self::U32(v) => write!(f, "{}", v),
            Self::U64(v) => write!(f, "{}", v),
            Self::F32(v) => write!(f, "{}", v),
            Self::F64(v) => write!(f, "{}", v),
            Self::Currency(v) => {
                let sign = if *v < 0 { "-" } else { "" };
                let abs = v.unsigned_abs();
                write!(f, "{}{}.{:04}", sign, abs / 10_000, abs % 10_000)
            }
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Date(v) => write!(f, "date({})", v),
            Self::String(v) => write!(f, "{:?}", v),
            Self::Error(v) => write!(f, "0x{:08x}", v),
            Self::Interface(r) => write!(f, "iface({})#{}", r.interface_id, r.object_id),
            Self::Array(array) => write!(f, "{}", array),
            Self::Record(record) => {
                write!(f, "{} {{", record.type_name)?;
                for (i, (name, value)) in record.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {}: {}", name, value)?;
                }
                f.write_str(" }")
            }
            Self::ByRef(r) => match r.get() {
                Ok(target) => write!(f, "&{}", target),
                Err(_) => f.write_str("&<dangling>"),
            },
        }
    }
}

macro_rules! impl_from {
    ($($type:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$type> for TaggedValue {
                fn from(value: $type) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    String => String,
    Decimal => Decimal,
    InterfaceRef => Interface,
    SafeArray => Array,
    Record => Record,
    VariantRef => ByRef,
);

impl From<&str> for TaggedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}
