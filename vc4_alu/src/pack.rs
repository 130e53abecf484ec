//! Register-write pack modifiers.
//!
//! A pack transforms a result on its way into the register file. Bit 4 of
//! the encoding is the pm selector: with pm set, the encoding selects the
//! MUL-ALU color conversion variants instead of the regfile-A truncate /
//! saturate variants.
//!
//! Packing needs the flags of the operation that produced the value,
//! because the full-width saturation mode decides between the clamping
//! bounds based on the overflow and negative flags.

use std::fmt;

use vc4_core::half::float_to_half;
use vc4_core::{
    CompilationError, CompilationResult, ContainerValue, DataType, Literal, Value,
};

use crate::flags::{ElementFlags, FlagStatus, VectorFlags};

// =============================================================================
// Saturation Helpers
// =============================================================================

/// Clamp a signed 32-bit value into the signed 16-bit range.
#[inline]
const fn saturate_i16(value: i32) -> i32 {
    if value > i16::MAX as i32 {
        i16::MAX as i32
    } else if value < i16::MIN as i32 {
        i16::MIN as i32
    } else {
        value
    }
}

/// Clamp an unsigned 32-bit value into the unsigned 8-bit range.
#[inline]
const fn saturate_u8(value: u32) -> u32 {
    if value > 0xFF {
        0xFF
    } else {
        value
    }
}

// =============================================================================
// Pack
// =============================================================================

/// A register-write pack mode, in the hardware encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Pack {
    /// No transformation.
    #[default]
    Nop = 0x00,
    /// Truncate to 16 bits into the low half; floats convert through half.
    Low16 = 0x01,
    /// Truncate to 16 bits into the high half; floats convert through half.
    High16 = 0x02,
    /// Replicate the low byte into all four bytes.
    Replicate8888 = 0x03,
    /// Truncate the low byte into byte 0.
    Byte0 = 0x04,
    /// Truncate the low byte into byte 1.
    Byte1 = 0x05,
    /// Truncate the low byte into byte 2.
    Byte2 = 0x06,
    /// Truncate the low byte into byte 3.
    Byte3 = 0x07,
    /// Saturate the full 32 bits, driven by the overflow/negative flags.
    Saturate32 = 0x08,
    /// Saturate i32 to i16 into the low half.
    ///
    /// The float path performs no saturation and truncates through half;
    /// whether the hardware saturates here is an open question, so the
    /// observed behavior is preserved.
    Low16Saturate = 0x09,
    /// Saturate i32 to i16 into the high half (same float caveat).
    High16Saturate = 0x0A,
    /// Saturate to an unsigned byte, replicated into all four bytes.
    Replicate8888Saturate = 0x0B,
    /// Saturate to an unsigned byte into byte 0.
    Byte0Saturate = 0x0C,
    /// Saturate to an unsigned byte into byte 1.
    Byte1Saturate = 0x0D,
    /// Saturate to an unsigned byte into byte 2.
    Byte2Saturate = 0x0E,
    /// Saturate to an unsigned byte into byte 3.
    Byte3Saturate = 0x0F,
    /// No transformation, pm bit set.
    NopPm = 0x10,
    /// Float in [0, 1] times 255, replicated into all four bytes.
    MulGrayReplicate = 0x11,
    /// Float in [0, 1] times 255 into byte 0.
    MulColor0 = 0x12,
    /// Float in [0, 1] times 255 into byte 1.
    MulColor1 = 0x13,
    /// Float in [0, 1] times 255 into byte 2.
    MulColor2 = 0x14,
    /// Float in [0, 1] times 255 into byte 3.
    MulColor3 = 0x15,
}

impl Pack {
    /// The raw 5-bit encoding.
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode a raw encoding. Unassigned encodings are a fault.
    pub fn from_bits(bits: u8) -> CompilationResult<Self> {
        const MODES: [Pack; 22] = [
            Pack::Nop,
            Pack::Low16,
            Pack::High16,
            Pack::Replicate8888,
            Pack::Byte0,
            Pack::Byte1,
            Pack::Byte2,
            Pack::Byte3,
            Pack::Saturate32,
            Pack::Low16Saturate,
            Pack::High16Saturate,
            Pack::Replicate8888Saturate,
            Pack::Byte0Saturate,
            Pack::Byte1Saturate,
            Pack::Byte2Saturate,
            Pack::Byte3Saturate,
            Pack::NopPm,
            Pack::MulGrayReplicate,
            Pack::MulColor0,
            Pack::MulColor1,
            Pack::MulColor2,
            Pack::MulColor3,
        ];
        MODES.get(bits as usize).copied().ok_or_else(|| {
            CompilationError::new(
                vc4_core::CompilationStep::CodeGeneration,
                "Unsupported pack-mode",
                bits.to_string(),
            )
        })
    }

    /// Check whether the pm bit is set.
    #[inline]
    pub const fn is_pm_bit_set(self) -> bool {
        self.bits() & 0x10 != 0
    }

    /// Check whether this mode transforms the value at all.
    ///
    /// Both NOP encodings are behaviorally no-ops but are preserved
    /// bit-exact for round-trips.
    #[inline]
    pub const fn has_effect(self) -> bool {
        !matches!(self, Pack::Nop | Pack::NopPm)
    }

    /// Apply this mode to a value under the producing operation's flags.
    ///
    /// Returns `Ok(None)` where the transform is not computable at
    /// compile time. Saturating on undefined overflow flags is a fault.
    pub fn apply(self, value: &Value, flags: &VectorFlags) -> CompilationResult<Option<Value>> {
        if !self.has_effect() {
            return Ok(Some(value.clone()));
        }
        // Complex types are never packed, not even pointers.
        if !value.ty.is_simple_type() {
            return Ok(None);
        }
        if let Some(container) = value.check_container() {
            let mut result = ContainerValue::with_capacity(container.elements.len());
            for (lane, elem) in container.elements.iter().enumerate() {
                let lit = match elem.literal_value() {
                    Some(lit) => lit,
                    None => return Ok(None),
                };
                result
                    .elements
                    .push(self.apply_literal(lit, elem.ty, flags.lane(lane))?);
            }
            return Ok(Some(Value::container(result, value.ty)));
        }
        match value.literal_value() {
            Some(lit) => Ok(Some(self.apply_literal(lit, value.ty, flags.lane(0))?)),
            None => Ok(None),
        }
    }

    /// The transform on a single scalar literal.
    fn apply_literal(
        self,
        literal: Literal,
        ty: DataType,
        flags: ElementFlags,
    ) -> CompilationResult<Value> {
        let bits = literal.unsigned_int();
        let value = match self {
            Pack::Nop | Pack::NopPm => Value::literal(literal, ty),
            Pack::Low16 | Pack::Low16Saturate if ty.is_floating_type() => {
                Value::literal(Literal::new(u32::from(float_to_half(literal.real()))), ty)
            }
            Pack::High16 | Pack::High16Saturate if ty.is_floating_type() => Value::literal(
                Literal::new(u32::from(float_to_half(literal.real())) << 16),
                ty,
            ),
            Pack::Low16 => Value::literal(Literal::new(bits & 0xFFFF), ty),
            Pack::Low16Saturate => Value::literal(
                Literal::new((saturate_i16(literal.signed_int()) & 0xFFFF) as u32),
                ty,
            ),
            Pack::High16 => Value::literal(Literal::new((bits & 0xFFFF) << 16), ty),
            Pack::High16Saturate => Value::literal(
                Literal::new((saturate_i16(literal.signed_int()) << 16) as u32),
                ty,
            ),
            Pack::Saturate32 => match flags.overflow {
                FlagStatus::Clear => Value::literal(literal, ty),
                FlagStatus::Set => {
                    // add and sub overflow by at most one bit, so the
                    // negative flag identifies the clamping bound.
                    let clamped = if flags.negative == FlagStatus::Clear {
                        0x8000_0000
                    } else {
                        0x7FFF_FFFF
                    };
                    Value::literal(Literal::new(clamped), ty)
                }
                FlagStatus::Undefined => {
                    return Err(CompilationError::new(
                        vc4_core::CompilationStep::General,
                        "Cannot saturate on unknown overflow flags",
                        Value::literal(literal, ty).to_string(),
                    ));
                }
            },
            Pack::Replicate8888 => {
                let byte = bits & 0xFF;
                Value::literal(Literal::new(byte << 24 | byte << 16 | byte << 8 | byte), ty)
            }
            Pack::Replicate8888Saturate => {
                let byte = saturate_u8(bits);
                Value::literal(Literal::new(byte << 24 | byte << 16 | byte << 8 | byte), ty)
            }
            Pack::Byte0 => Value::literal(Literal::new(bits & 0xFF), ty),
            Pack::Byte1 => Value::literal(Literal::new((bits & 0xFF) << 8), ty),
            Pack::Byte2 => Value::literal(Literal::new((bits & 0xFF) << 16), ty),
            Pack::Byte3 => Value::literal(Literal::new((bits & 0xFF) << 24), ty),
            Pack::Byte0Saturate => Value::literal(Literal::new(saturate_u8(bits)), ty),
            Pack::Byte1Saturate => Value::literal(Literal::new(saturate_u8(bits) << 8), ty),
            Pack::Byte2Saturate => Value::literal(Literal::new(saturate_u8(bits) << 16), ty),
            Pack::Byte3Saturate => Value::literal(Literal::new(saturate_u8(bits) << 24), ty),
            Pack::MulGrayReplicate => {
                let byte = mul_color_byte(literal);
                Value::literal(Literal::new(byte << 24 | byte << 16 | byte << 8 | byte), ty)
            }
            Pack::MulColor0 => Value::literal(Literal::new(mul_color_byte(literal)), ty),
            Pack::MulColor1 => Value::literal(Literal::new(mul_color_byte(literal) << 8), ty),
            Pack::MulColor2 => Value::literal(Literal::new(mul_color_byte(literal) << 16), ty),
            Pack::MulColor3 => Value::literal(Literal::new(mul_color_byte(literal) << 24), ty),
        };
        Ok(value)
    }
}

/// Denormalize a color float in [0, 1] to its byte value.
fn mul_color_byte(literal: Literal) -> u32 {
    (literal.real() * 255.0) as u32 & 0xFF
}

impl fmt::Display for Pack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Pack::Nop | Pack::NopPm => "",
            Pack::Low16 => "trunc32toLow16",
            Pack::Low16Saturate => "sat16ToLow16",
            Pack::High16 => "trunc32ToHigh16",
            Pack::High16Saturate => "sat16ToHigh16",
            Pack::Saturate32 => "sat",
            Pack::Replicate8888 => "replLSB",
            Pack::Replicate8888Saturate => "replLSBSat",
            Pack::Byte0 => "truncLSBToByte0",
            Pack::Byte1 => "truncLSBToByte1",
            Pack::Byte2 => "truncLSBToByte2",
            Pack::Byte3 => "truncLSBToByte3",
            Pack::Byte0Saturate => "satLSBToByte0",
            Pack::Byte1Saturate => "satLSBToByte1",
            Pack::Byte2Saturate => "satLSBToByte2",
            Pack::Byte3Saturate => "satLSBToByte3",
            Pack::MulGrayReplicate => "mulFloatToReplLSB",
            Pack::MulColor0 => "mulFloatToByte0",
            Pack::MulColor1 => "mulFloatToByte1",
            Pack::MulColor2 => "mulFloatToByte2",
            Pack::MulColor3 => "mulFloatToByte3",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Tests
// =============================================================================
