// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Interface, method, parameter and type descriptors.

use super::fingerprint::TypeFingerprint;
use super::id::InterfaceId;
use std::fmt;

/// Integer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Size in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }
}

/// Floating-point width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    W32,
    W64,
}

/// Declared string encoding.
///
/// Advisory only: strings always travel as UTF-8 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringEncoding {
    Utf8,
    Utf16,
}

/// Recursive parameter type.
///
/// A type may not contain itself without an intervening [`Pointer`](Self::Pointer)
/// or [`VariableArray`](Self::VariableArray); the store enforces this for
/// [`Named`](Self::Named) record references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Void,
    Bool,
    Integer { width: IntWidth, signed: bool },
    Float(FloatWidth),
    /// Fixed-point money, value x 10 000.
    Currency,
    /// 96-bit mantissa with explicit scale.
    Decimal,
    /// Days since 1899-12-30 as `f64`.
    Date,
    /// 32-bit status code.
    ErrorCode,
    String(StringEncoding),
    Pointer(Box<TypeDescriptor>),
    FixedArray {
        element: Box<TypeDescriptor>,
        dims: Vec<u32>,
    },
    VariableArray(Box<TypeDescriptor>),
    /// Any tagged value.
    TaggedValue,
    /// Interface reference; [`InterfaceId::NIL`] admits any interface.
    InterfaceRef(InterfaceId),
    /// Inline record.
    Record(RecordDescriptor),
    /// Record registered in the store under this name.
    Named(String),
}

impl TypeDescriptor {
    pub const BOOL: TypeDescriptor = TypeDescriptor::Bool;
    pub const I8: TypeDescriptor = Self::int(IntWidth::W8, true);
    pub const I16: TypeDescriptor = Self::int(IntWidth::W16, true);
    pub const I32: TypeDescriptor = Self::int(IntWidth::W32, true);
    pub const I64: TypeDescriptor = Self::int(IntWidth::W64, true);
    pub const U8: TypeDescriptor = Self::int(IntWidth::W8, false);
    pub const U16: TypeDescriptor = Self::int(IntWidth::W16, false);
    pub const U32: TypeDescriptor = Self::int(IntWidth::W32, false);
    pub const U64: TypeDescriptor = Self::int(IntWidth::W64, false);
    pub const F32: TypeDescriptor = TypeDescriptor::Float(FloatWidth::W32);
    pub const F64: TypeDescriptor = TypeDescriptor::Float(FloatWidth::W64);
    pub const STRING: TypeDescriptor = TypeDescriptor::String(StringEncoding::Utf8);
    pub const WSTRING: TypeDescriptor = TypeDescriptor::String(StringEncoding::Utf16);
    pub const VARIANT: TypeDescriptor = TypeDescriptor::TaggedValue;
    pub const CURRENCY: TypeDescriptor = TypeDescriptor::Currency;
    pub const DECIMAL: TypeDescriptor = TypeDescriptor::Decimal;
    pub const DATE: TypeDescriptor = TypeDescriptor::Date;
    pub const ERROR_CODE: TypeDescriptor = TypeDescriptor::ErrorCode;

    const fn int(width: IntWidth, signed: bool) -> Self {
        Self::Integer { width, signed }
    }

    pub fn pointer(to: TypeDescriptor) -> Self {
        Self::Pointer(Box::new(to))
    }

    pub fn fixed_array(element: TypeDescriptor, dims: impl Into<Vec<u32>>) -> Self {
        Self::FixedArray {
            element: Box::new(element),
            dims: dims.into(),
        }
    }

    pub fn variable_array(element: TypeDescriptor) -> Self {
        Self::VariableArray(Box::new(element))
    }

    pub fn interface(id: InterfaceId) -> Self {
        Self::InterfaceRef(id)
    }

    pub fn record(record: RecordDescriptor) -> Self {
        Self::Record(record)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Record names referenced by this type, in first-seen order.
    ///
    /// Walks pointers, arrays and inline record fields.
    pub fn named_references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_named(&mut names);
        names
    }

    fn collect_named<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Named(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Self::Pointer(inner) | Self::VariableArray(inner) => inner.collect_named(names),
            Self::FixedArray { element, .. } => element.collect_named(names),
            Self::Record(record) => {
                for field in &record.fields {
                    field.ty.collect_named(names);
                }
            }
            _ => {}
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// True if this type or anything nested in it is `Void`.
    pub fn contains_void(&self) -> bool {
        match self {
            Self::Void => true,
            Self::Pointer(inner) | Self::VariableArray(inner) => inner.contains_void(),
            Self::FixedArray { element, .. } => element.contains_void(),
            Self::Record(record) => record.fields.iter().any(|f| f.ty.contains_void()),
            _ => false,
        }
    }
}

/// Named field of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Embedded record layout: ordered named fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field (builder style).
    pub fn field(mut self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.fields.push(FieldDescriptor::new(name, ty));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Parameter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
    InOut,
    /// The method result; always conceptually `Out`.
    Return,
}

impl Direction {
    /// Supplied by the caller in the call frame.
    pub const fn is_input(self) -> bool {
        matches!(self, Self::In | Self::InOut)
    }

    /// Sent back in the reply frame ahead of the return value.
    pub const fn is_output(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
            Self::InOut => "inout",
            Self::Return => "return",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parameter of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterDescriptor {
    pub name: String,
    pub direction: Direction,
    pub ty: TypeDescriptor,
    /// Optional parameters admit `Empty` in place of a value.
    pub optional: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, direction: Direction, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            direction,
            ty,
            optional: false,
        }
    }

    /// Mark the parameter optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Name of the implicit return parameter.
pub(crate) const RETURN_NAME: &str = "retval";

/// A method: name, dispatch ordinal and ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub name: String,
    /// Dispatch index; assigned by [`InterfaceBuilder::build`].
    pub ordinal: u32,
    pub parameters: Vec<ParameterDescriptor>,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ordinal: 0,
            parameters: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn input(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.param(ParameterDescriptor::new(name, Direction::In, ty))
    }

    pub fn output(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.param(ParameterDescriptor::new(name, Direction::Out, ty))
    }

    pub fn in_out(self, name: impl Into<String>, ty: TypeDescriptor) -> Self {
        self.param(ParameterDescriptor::new(name, Direction::InOut, ty))
    }

    pub fn returns(self, ty: TypeDescriptor) -> Self {
        self.param(ParameterDescriptor::new(RETURN_NAME, Direction::Return, ty))
    }

    /// `In`/`InOut` parameters in declared order.
    pub fn inputs(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(|p| p.direction.is_input())
    }

    /// `Out`/`InOut` parameters in declared order.
    pub fn outputs(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(|p| p.direction.is_output())
    }

    pub fn return_param(&self) -> Option<&ParameterDescriptor> {
        self.parameters
            .iter()
            .find(|p| p.direction == Direction::Return)
    }

    /// Human-readable signature, e.g. `Bump(in by: i32, out total: i32) -> bool`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .filter(|p| p.direction != Direction::Return)
            .map(|p| {
                let opt = if p.optional { "?" } else { "" };
                format!("{} {}{}: {}", p.direction, p.name, opt, p.ty)
            })
            .collect();
        match self.return_param() {
            Some(ret) => format!("{}({}) -> {}", self.name, params.join(", "), ret.ty),
            None => format!("{}({})", self.name, params.join(", ")),
        }
    }
}

/// An interface: identity, optional base, and its own methods.
///
/// `methods` holds only the methods this interface declares; inherited
/// ones are reached through [`crate::TypeStore::resolve_method`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceDescriptor {
    pub id: InterfaceId,
    pub name: String,
    pub base: Option<InterfaceId>,
    /// Ordinal of the first declared method (the base's next free ordinal).
    pub first_ordinal: u32,
    pub methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    pub fn builder(id: InterfaceId, name: impl Into<String>) -> InterfaceBuilder {
        InterfaceBuilder {
            id,
            name: name.into(),
            base: None,
            first_ordinal: 0,
            methods: Vec::new(),
        }
    }

    /// First ordinal a derived interface would use.
    pub fn next_ordinal(&self) -> u32 {
        self.first_ordinal + self.methods.len() as u32
    }

    /// Own method at `ordinal` (inherited ordinals return `None`).
    pub fn method(&self, ordinal: u32) -> Option<&MethodDescriptor> {
        let index = ordinal.checked_sub(self.first_ordinal)?;
        self.methods.get(index as usize)
    }

    /// Own method by name.
    pub fn method_by_name(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Canonical text used for fingerprinting.
    pub fn canonical_text(&self) -> String {
        let mut text = format!("interface {} {}", self.name, self.id);
        if let Some(base) = self.base {
            text.push_str(&format!(" : {}", base));
        }
        text.push_str(&format!(" @{}\n", self.first_ordinal));
        for method in &self.methods {
            text.push_str(&format!("{} {}\n", method.ordinal, method.signature()));
        }
        text
    }

    /// MD5 fingerprint of the canonical layout.
    pub fn fingerprint(&self) -> TypeFingerprint {
        TypeFingerprint::compute(self.canonical_text().as_bytes())
    }
}

/// Builder for [`InterfaceDescriptor`]; assigns ordinals on `build()`.
#[derive(Debug, Clone)]
pub struct InterfaceBuilder {
    id: InterfaceId,
    name: String,
    base: Option<InterfaceId>,
    first_ordinal: u32,
    methods: Vec<MethodDescriptor>,
}

impl InterfaceBuilder {
    /// Derive from `base`: ordinals continue after the base's last one.
    pub fn inherits(mut self, base: &InterfaceDescriptor) -> Self {
        self.base = Some(base.id);
        self.first_ordinal = base.next_ordinal();
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn build(self) -> InterfaceDescriptor {
        let first = self.first_ordinal;
        let methods = self
            .methods
            .into_iter()
            .enumerate()
            .map(|(i, mut m)| {
                m.ordinal = first + i as u32;
                m
            })
            .collect();
        InterfaceDescriptor {
            id: self.id,
            name: self.name,
            base: self.base,
            first_ordinal: first,
            methods,
        }
    }
}
