// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Call Marshaler: call and reply frames driven by method descriptors.
//!
//! ```text
//! call:   +-------------------+--------------+------------------------------+
//!         | interface id u128 | ordinal u32  | in/inout args (tagged values)|
//!         +-------------------+--------------+------------------------------+
//! reply:  +------------+-----------------------------------------------------+
//!         | status u32 | ok:    out/inout values, then return value         |
//!         |            | fault: message string                              |
//!         +------------+-----------------------------------------------------+
//! ```
//!
//! Frames are built in a local buffer and returned only on full success.

use super::fault::{Fault, FaultCode};
use crate::error::{CodecError, MarshalError, MarshalResult};
use crate::transport::Buffer;
use crate::types::{Direction, InterfaceId, MethodDescriptor, ParameterDescriptor, TypeStore};
use crate::variant::{self, read_value, size_of, ReferentSlots, TaggedValue, VariantCell};
use crate::wire::{WireReader, WireWriter};
use std::borrow::Cow;
use std::sync::Arc;

/// Interface id plus ordinal.
pub const CALL_HEADER_SIZE: usize = 16 + 4;
const STATUS_OK: u32 = 0;

/// A decoded call frame.
///
/// Byref arguments point into cells owned by this value; they stay live as
/// long as it does.
#[derive(Debug)]
pub struct UnmarshaledCall {
    pub interface_id: InterfaceId,
    pub ordinal: u32,
    /// `In`/`InOut` arguments in declared order.
    pub args: Vec<TaggedValue>,
    referents: Vec<VariantCell>,
}

impl UnmarshaledCall {
    /// Cells holding the referents of byref arguments.
    pub fn referents(&self) -> &[VariantCell] {
        &self.referents
    }
}

/// Marshals calls and replies against a published [`TypeStore`].
#[derive(Debug, Clone)]
pub struct Marshaler {
    store: Arc<TypeStore>,
}

impl Marshaler {
    pub fn new(store: Arc<TypeStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<TypeStore> {
        &self.store
    }

    /// Encode a call of `ordinal` on `interface_id`.
    ///
    /// `args` holds one value per `In`/`InOut` parameter in declared order;
    /// each is type-checked before anything is encoded.
    pub fn marshal_call(
        &self,
        interface_id: InterfaceId,
        ordinal: u32,
        args: &[TaggedValue],
    ) -> MarshalResult<Buffer> {
        let method = self.store.lookup_method(interface_id, ordinal)?;
        let inputs: Vec<&ParameterDescriptor> = method.inputs().collect();
        if args.len() != inputs.len() {
            return Err(MarshalError::ArgumentCount {
                method: method.name.clone(),
                expected: inputs.len(),
                found: args.len(),
            });
        }
        for (param, arg) in inputs.iter().zip(args) {
            self.check_param(param, arg)?;
        }

        let body: usize = args.iter().map(size_of).sum();
        let mut frame = Vec::with_capacity(CALL_HEADER_SIZE + body);
        let mut w = WireWriter::new(&mut frame);
        w.write_u128(interface_id.as_u128());
        w.write_u32(ordinal);
        for arg in args {
            variant::encode(arg, &mut frame)?;
        }

        log::trace!(
            "[rpc] marshaled {}#{} ({}) in {} bytes",
            interface_id,
            ordinal,
            method.name,
            frame.len()
        );
        Ok(frame)
    }

    /// Decode a call frame and type-check its arguments.
    pub fn unmarshal_call(&self, frame: &[u8]) -> MarshalResult<UnmarshaledCall> {
        let mut r = WireReader::new(frame);
        let interface_id = InterfaceId::from_u128(r.read_u128()?);
        let ordinal = r.read_u32()?;
        let method = self.store.lookup_method(interface_id, ordinal)?;

        let mut slots = ReferentSlots::allocating();
        let mut args = Vec::with_capacity(method.inputs().count());
        for param in method.inputs() {
            let value = read_value(&mut r, &mut slots, 0)?;
            self.check_param(param, &value)?;
            args.push(value);
        }
        if !r.is_eof() {
            return Err(MarshalError::TrailingBytes {
                remaining: r.remaining(),
            });
        }

        Ok(UnmarshaledCall {
            interface_id,
            ordinal,
            args,
            referents: slots.into_cells(),
        })
    }

    /// Encode a successful reply: each `Out`/`InOut` value in declared order,
    /// then the return value if the method declares one.
    ///
    /// Byref outputs are written by value.
    pub fn marshal_reply(
        &self,
        method: &MethodDescriptor,
        outputs: &[TaggedValue],
        return_value: Option<&TaggedValue>,
    ) -> MarshalResult<Buffer> {
        let params: Vec<&ParameterDescriptor> = method.outputs().collect();
        if outputs.len() != params.len() {
            return Err(MarshalError::ArgumentCount {
                method: method.name.clone(),
                expected: params.len(),
                found: outputs.len(),
            });
        }
        let returned = match (method.return_param(), return_value) {
            (Some(param), Some(value)) => Some((param, value)),
            (None, None) => None,
            (Some(_), None) => {
                return Err(MarshalError::MissingReturn {
                    method: method.name.clone(),
                })
            }
            (None, Some(_)) => {
                return Err(MarshalError::UnexpectedReturn {
                    method: method.name.clone(),
                })
            }
        };

        let mut frame = Vec::new();
        WireWriter::new(&mut frame).write_u32(STATUS_OK);
        for (param, value) in params.into_iter().zip(outputs).chain(returned) {
            let value = by_value(value)?;
            self.check_value(param, &value)?;
            variant::encode(&value, &mut frame)?;
        }
        Ok(frame)
    }

    /// Encode a fault reply. A fault carrying `Ok` is sent as `ServerError`.
    pub fn marshal_fault(&self, fault: &Fault) -> MarshalResult<Buffer> {
        let code = match fault.code {
            FaultCode::Ok => FaultCode::ServerError,
            code => code,
        };
        let mut frame = Vec::with_capacity(8 + fault.message.len());
        let mut w = WireWriter::new(&mut frame);
        w.write_u32(code.as_u32());
        w.write_str(&fault.message)?;
        Ok(frame)
    }

    /// Decode a reply to `method` into `(outputs, return value)`.
    ///
    /// A fault reply fails with [`MarshalError::Remote`].
    pub fn unmarshal_reply(
        &self,
        frame: &[u8],
        method: &MethodDescriptor,
    ) -> MarshalResult<(Vec<TaggedValue>, Option<TaggedValue>)> {
        let mut r = WireReader::new(frame);
        let status = r.read_u32()?;
        if status != STATUS_OK {
            let message = r.read_str()?;
            return Err(MarshalError::Remote {
                code: FaultCode::from_u32(status),
                message,
            });
        }

        let mut slots = ReferentSlots::none();
        let mut outputs = Vec::new();
        for param in method.outputs() {
            let value = read_value(&mut r, &mut slots, 0)?;
            self.check_value(param, &value)?;
            outputs.push(value);
        }
        let return_value = match method.return_param() {
            Some(param) => {
                let value = read_value(&mut r, &mut slots, 0)?;
                self.check_value(param, &value)?;
                Some(value)
            }
            None => None,
        };
        if !r.is_eof() {
            return Err(MarshalError::TrailingBytes {
                remaining: r.remaining(),
            });
        }
        Ok((outputs, return_value))
    }

    /// Check an argument supplied for an input parameter.
    ///
    /// An `InOut` parameter also admits a byref to a value of its type.
    fn check_param(&self, param: &ParameterDescriptor, value: &TaggedValue) -> MarshalResult<()> {
        if let TaggedValue::ByRef(r) = value {
            if !r.is_live() {
                return Err(CodecError::DanglingReference.into());
            }
            if param.direction == Direction::InOut
                && !self.store.admits(&param.ty, value)?
                && r.with(|target| self.store.admits(&param.ty, target))??
            {
                return Ok(());
            }
        }
        self.check_value(param, value)
    }

    fn check_value(&self, param: &ParameterDescriptor, value: &TaggedValue) -> MarshalResult<()> {
        if param.optional && value.is_empty() {
            return Ok(());
        }
        if self.store.admits(&param.ty, value)? {
            return Ok(());
        }
        Err(MarshalError::TypeMismatch {
            parameter: param.name.clone(),
            expected: param.ty.to_string(),
            found: value.type_name(),
        })
    }
}

/// The referent of a byref value, or the value itself.
pub(crate) fn by_value(value: &TaggedValue) -> MarshalResult<Cow<'_, TaggedValue>> {
    match value {
        TaggedValue::ByRef(r) => Ok(Cow::Owned(r.get()?)),
        other => Ok(Cow::Borrowed(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InterfaceDescriptor, TypeDescriptor};

    const COUNTER: InterfaceId = InterfaceId::from_u128(1);

    fn marshaler() -> Marshaler {
        let mut store = TypeStore::new();
        store
            .register(
                InterfaceDescriptor::builder(COUNTER, "ICounter")
                    .method(
                        MethodDescriptor::new("Bump")
                            .input("by", TypeDescriptor::I32)
                            .output("total", TypeDescriptor::I32),
                    )
                    .method(
                        MethodDescriptor::new("Swap")
                            .in_out("value", TypeDescriptor::STRING)
                            .returns(TypeDescriptor::BOOL),
                    )
                    .build(),
            )
            .expect("register");
        Marshaler::new(store.publish())
    }

    #[test]
    fn test_call_header_layout() {
        let m = marshaler();
        let frame = m
            .marshal_call(COUNTER, 0, &[TaggedValue::I32(41)])
            .expect("marshal");
        assert_eq!(frame.len(), CALL_HEADER_SIZE + 6);
        assert_eq!(&frame[..16], 1u128.to_le_bytes());
        assert_eq!(&frame[16..20], [0, 0, 0, 0]);
        assert_eq!(&frame[20..], [0x03, 0x00, 41, 0, 0, 0]);
    }

    #[test]
    fn test_reply_return_rules() {
        let m = marshaler();
        let swap = m.store().lookup_method(COUNTER, 1).expect("Swap").clone();
        let out = [TaggedValue::from("x")];

        assert!(matches!(
            m.marshal_reply(&swap, &out, None),
            Err(MarshalError::MissingReturn { .. })
        ));
        let bump = m.store().lookup_method(COUNTER, 0).expect("Bump").clone();
        assert!(matches!(
            m.marshal_reply(&bump, &[TaggedValue::I32(1)], Some(&TaggedValue::Bool(true))),
            Err(MarshalError::UnexpectedReturn { .. })
        ));

        let frame = m
            .marshal_reply(&swap, &out, Some(&TaggedValue::Bool(true)))
            .expect("reply");
        let (outputs, ret) = m.unmarshal_reply(&frame, &swap).expect("decode");
        assert_eq!(outputs, out);
        assert_eq!(ret, Some(TaggedValue::Bool(true)));
    }

    #[test]
    fn test_fault_frame() {
        let m = marshaler();
        let bump = m.store().lookup_method(COUNTER, 0).expect("Bump").clone();
        let frame = m
            .marshal_fault(&Fault::new(FaultCode::Ok, "odd"))
            .expect("fault");
        assert_eq!(&frame[..4], FaultCode::ServerError.as_u32().to_le_bytes());

        match m.unmarshal_reply(&frame, &bump) {
            Err(MarshalError::Remote { code, message }) => {
                assert_eq!(code, FaultCode::ServerError);
                assert_eq!(message, "odd");
            }
            other => panic!("expected remote fault, got {:?}", other),
        }
    }

    #[test]
    fn test_byref_output_is_sent_by_value() {
        let m = marshaler();
        let bump = m.store().lookup_method(COUNTER, 0).expect("Bump").clone();
        let cell = VariantCell::new(TaggedValue::I32(42));
        let frame = m
            .marshal_reply(&bump, &[TaggedValue::ByRef(cell.reference())], None)
            .expect("reply");
        assert_eq!(frame, [0, 0, 0, 0, 0x03, 0x00, 42, 0, 0, 0]);
    }
}
