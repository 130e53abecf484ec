//! Register-read unpack modifiers.
//!
//! An unpack transforms a value on its way out of the register file. The
//! low bit of the encoding is the pm selector: with pm set, the transform
//! applies on the post-TMU r4 path and the 16-bit and 8-bit modes convert
//! to float instead of extending integers.
//!
//! Each modifier is a pure function on a literal, parameterized by the
//! operand's declared data type.

use std::fmt;

use vc4_core::half::half_to_float;
use vc4_core::types::{BYTE, HALF_WORD};
use vc4_core::{
    CompilationError, CompilationResult, ContainerValue, DataType, Literal, Value,
};

// =============================================================================
// Unpack
// =============================================================================

/// A register-read unpack mode, in the hardware encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Unpack {
    /// No transformation.
    #[default]
    Nop = 0,
    /// No transformation, pm bit set.
    NopPm = 1,
    /// Sign-extend the low 16 bits to 32; on floats, half to float.
    Low16To32 = 2,
    /// Reinterpret the low 16 bits as half, convert to float (r4 path).
    R4Low16ToFloat = 3,
    /// Sign-extend the high 16 bits to 32; on floats, half to float.
    High16To32 = 4,
    /// Reinterpret the high 16 bits as half, convert to float (r4 path).
    R4High16ToFloat = 5,
    /// Replicate the least significant byte into all four bytes.
    Replicate8888 = 6,
    /// Alias of the byte replication on the r4 path.
    R4AlphaReplicate = 7,
    /// Zero-extend byte 0 to 32; on floats, byte 0 / 255.
    Byte0To32 = 8,
    /// Byte 0 / 255 as float (r4 color path).
    R4Color0 = 9,
    /// Zero-extend byte 1 to 32; on floats, byte 1 / 255.
    Byte1To32 = 10,
    /// Byte 1 / 255 as float (r4 color path).
    R4Color1 = 11,
    /// Zero-extend byte 2 to 32; on floats, byte 2 / 255.
    Byte2To32 = 12,
    /// Byte 2 / 255 as float (r4 color path).
    R4Color2 = 13,
    /// Zero-extend byte 3 to 32; on floats, byte 3 / 255.
    Byte3To32 = 14,
    /// Byte 3 / 255 as float (r4 color path).
    R4Color3 = 15,
}

impl Unpack {
    /// The raw 4-bit encoding.
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// Decode a raw encoding.
    pub fn from_bits(bits: u8) -> CompilationResult<Self> {
        const MODES: [Unpack; 16] = [
            Unpack::Nop,
            Unpack::NopPm,
            Unpack::Low16To32,
            Unpack::R4Low16ToFloat,
            Unpack::High16To32,
            Unpack::R4High16ToFloat,
            Unpack::Replicate8888,
            Unpack::R4AlphaReplicate,
            Unpack::Byte0To32,
            Unpack::R4Color0,
            Unpack::Byte1To32,
            Unpack::R4Color1,
            Unpack::Byte2To32,
            Unpack::R4Color2,
            Unpack::Byte3To32,
            Unpack::R4Color3,
        ];
        MODES.get(bits as usize).copied().ok_or_else(|| {
            CompilationError::new(
                vc4_core::CompilationStep::CodeGeneration,
                "Unsupported unpack-mode",
                bits.to_string(),
            )
        })
    }

    /// Check whether the pm bit is set.
    #[inline]
    pub const fn is_pm_bit_set(self) -> bool {
        self.bits() & 0x1 != 0
    }

    /// Check whether this mode transforms the value at all.
    ///
    /// Both NOP encodings are behaviorally no-ops but are preserved
    /// bit-exact for round-trips.
    #[inline]
    pub const fn has_effect(self) -> bool {
        self.bits() > 1
    }

    /// The canonical mode lifting a narrow integer type to 32 bits.
    pub fn unpack_to_32bit(ty: DataType) -> CompilationResult<Self> {
        let bits = ty.scalar_bit_count();
        if bits >= 32 {
            Ok(Unpack::Nop)
        } else if bits == HALF_WORD {
            Ok(Unpack::Low16To32)
        } else if bits == BYTE {
            Ok(Unpack::Byte0To32)
        } else {
            Err(CompilationError::new(
                vc4_core::CompilationStep::General,
                "Unhandled type-width for unpack-modes",
                ty.to_string(),
            ))
        }
    }

    /// Apply this mode to a value.
    ///
    /// Returns `None` where the transform is not computable at compile
    /// time: non-simple operand types, non-literal scalars, containers
    /// with a non-literal lane.
    pub fn apply(self, value: &Value) -> Option<Value> {
        if !self.has_effect() {
            return Some(value.clone());
        }
        // Complex types are never unpacked, not even pointers.
        if !value.ty.is_simple_type() {
            return None;
        }
        if let Some(container) = value.check_container() {
            let mut result = ContainerValue::with_capacity(container.elements.len());
            for elem in &container.elements {
                let lit = elem.literal_value()?;
                result.elements.push(self.apply_literal(lit, elem.ty));
            }
            return Some(Value::container(result, value.ty));
        }
        let lit = value.literal_value()?;
        Some(self.apply_literal(lit, value.ty))
    }

    /// The transform on a single scalar literal.
    fn apply_literal(self, literal: Literal, ty: DataType) -> Value {
        let bits = literal.unsigned_int();
        match self {
            Unpack::Nop | Unpack::NopPm => Value::literal(literal, ty),
            Unpack::Low16To32 => {
                let low = bits as u16;
                if ty.is_floating_type() {
                    return Value::literal(Literal::from_real(half_to_float(low)), ty);
                }
                Value::literal(Literal::from_signed(i32::from(low as i16)), ty)
            }
            Unpack::High16To32 => {
                let high = (bits >> 16) as u16;
                if ty.is_floating_type() {
                    return Value::literal(Literal::from_real(half_to_float(high)), ty);
                }
                Value::literal(Literal::from_signed(i32::from(high as i16)), ty)
            }
            Unpack::Replicate8888 | Unpack::R4AlphaReplicate => {
                let lsb = bits & 0xFF;
                Value::literal(
                    Literal::new(lsb << 24 | lsb << 16 | lsb << 8 | lsb),
                    ty,
                )
            }
            Unpack::Byte0To32 => self.zext_or_color(bits, 0, ty),
            Unpack::Byte1To32 => self.zext_or_color(bits, 8, ty),
            Unpack::Byte2To32 => self.zext_or_color(bits, 16, ty),
            Unpack::Byte3To32 => self.zext_or_color(bits, 24, ty),
            Unpack::R4Low16ToFloat => {
                Value::literal(Literal::from_real(half_to_float(bits as u16)), ty)
            }
            Unpack::R4High16ToFloat => {
                Value::literal(Literal::from_real(half_to_float((bits >> 16) as u16)), ty)
            }
            Unpack::R4Color0 => color_byte(bits, 0, ty),
            Unpack::R4Color1 => color_byte(bits, 8, ty),
            Unpack::R4Color2 => color_byte(bits, 16, ty),
            Unpack::R4Color3 => color_byte(bits, 24, ty),
        }
    }

    /// The integer 8-bit modes fall through to the color conversion on
    /// floating-point operands.
    fn zext_or_color(self, bits: u32, shift: u32, ty: DataType) -> Value {
        if ty.is_floating_type() {
            return color_byte(bits, shift, ty);
        }
        Value::literal(Literal::new((bits >> shift) & 0xFF), ty)
    }
}

/// Byte `k` of the word, normalized to a float in [0, 1].
fn color_byte(bits: u32, shift: u32, ty: DataType) -> Value {
    let byte = (bits >> shift) & 0xFF;
    Value::literal(Literal::from_real(byte as f32 / 255.0), ty)
}

impl fmt::Display for Unpack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Unpack::Nop | Unpack::NopPm => "",
            Unpack::Low16To32 => "sextLow16to32",
            Unpack::High16To32 => "sextHigh16to32",
            Unpack::Replicate8888 => "replMSB",
            Unpack::Byte0To32 => "zextByte0To32",
            Unpack::Byte1To32 => "zextByte1To32",
            Unpack::Byte2To32 => "zextByte2To32",
            Unpack::Byte3To32 => "zextByte3To32",
            Unpack::R4Low16ToFloat => "r4HalfLowToFloat",
            Unpack::R4High16ToFloat => "r4HalfHighToFloat",
            Unpack::R4AlphaReplicate => "r4ReplAlpha",
            Unpack::R4Color0 => "r4Byte0ToFloat",
            Unpack::R4Color1 => "r4Byte1ToFloat",
            Unpack::R4Color2 => "r4Byte2ToFloat",
            Unpack::R4Color3 => "r4Byte3ToFloat",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vc4_core::{TYPE_FLOAT, TYPE_HALF, TYPE_INT8, TYPE_INT16, TYPE_INT32, TYPE_INT64};

    fn int(bits: u32) -> Value {
        Value::literal(Literal::new(bits), TYPE_INT32)
    }

    // =========================================================================
    // Encoding Tests
    // =========================================================================

    #[test]
    fn test_encoding_round_trip() {
        for bits in 0..16u8 {
            assert_eq!(Unpack::from_bits(bits).unwrap().bits(), bits);
        }
        assert!(Unpack::from_bits(16).is_err());
    }

    #[test]
    fn test_pm_bit() {
        assert!(!Unpack::Nop.is_pm_bit_set());
        assert!(Unpack::NopPm.is_pm_bit_set());
        assert!(!Unpack::Low16To32.is_pm_bit_set());
        assert!(Unpack::R4Low16ToFloat.is_pm_bit_set());
        assert!(Unpack::R4Color3.is_pm_bit_set());
    }

    #[test]
    fn test_nop_encodings_have_no_effect() {
        assert!(!Unpack::Nop.has_effect());
        assert!(!Unpack::NopPm.has_effect());
        assert!(Unpack::Low16To32.has_effect());
        let value = int(0x1234_5678);
        assert_eq!(Unpack::NopPm.apply(&value), Some(value));
    }

    // =========================================================================
    // Integer Transform Tests
    // =========================================================================

    #[test]
    fn test_sign_extend_16() {
        let value = int(0x8000_7FFF);
        let low = Unpack::Low16To32.apply(&value).unwrap();
        assert_eq!(low.literal_value().unwrap().signed_int(), 0x7FFF);
        let high = Unpack::High16To32.apply(&value).unwrap();
        assert_eq!(high.literal_value().unwrap().signed_int(), -32768);
    }

    #[test]
    fn test_zero_extend_bytes() {
        let value = int(0x4433_2211);
        for (mode, expected) in [
            (Unpack::Byte0To32, 0x11),
            (Unpack::Byte1To32, 0x22),
            (Unpack::Byte2To32, 0x33),
            (Unpack::Byte3To32, 0x44),
        ] {
            let result = mode.apply(&value).unwrap();
            assert_eq!(result.literal_value().unwrap().unsigned_int(), expected);
        }
    }

    #[test]
    fn test_replicate_lsb() {
        let result = Unpack::Replicate8888.apply(&int(0x0000_00AB)).unwrap();
        assert_eq!(result.literal_value().unwrap().unsigned_int(), 0xABAB_ABAB);
        // The alpha-replicate alias behaves identically.
        let alias = Unpack::R4AlphaReplicate.apply(&int(0x0000_00AB)).unwrap();
        assert_eq!(alias, result);
    }

    // =========================================================================
    // Float Transform Tests
    // =========================================================================

    #[test]
    fn test_half_to_float_on_float_type() {
        // 0x3C00 is half 1.0.
        let value = Value::literal(Literal::new(0xC000_3C00), TYPE_FLOAT);
        let low = Unpack::Low16To32.apply(&value).unwrap();
        assert_eq!(low.literal_value().unwrap().real(), 1.0);
        // 0xC000 is half -2.0.
        let high = Unpack::High16To32.apply(&value).unwrap();
        assert_eq!(high.literal_value().unwrap().real(), -2.0);
    }

    #[test]
    fn test_r4_half_modes_ignore_type() {
        let value = int(0x0000_3C00);
        let result = Unpack::R4Low16ToFloat.apply(&value).unwrap();
        assert_eq!(result.literal_value().unwrap().real(), 1.0);
    }

    #[test]
    fn test_color_normalization() {
        let value = Value::literal(Literal::new(0xFF00_7F00), TYPE_FLOAT);
        let byte2 = Unpack::R4Color2.apply(&value).unwrap();
        assert_eq!(byte2.literal_value().unwrap().real(), 127.0 / 255.0);
        let byte3 = Unpack::R4Color3.apply(&value).unwrap();
        assert_eq!(byte3.literal_value().unwrap().real(), 1.0);
    }

    #[test]
    fn test_byte_mode_falls_through_to_color_on_float() {
        let value = Value::literal(Literal::new(0x0000_00FF), TYPE_FLOAT);
        let result = Unpack::Byte0To32.apply(&value).unwrap();
        assert_eq!(result.literal_value().unwrap().real(), 1.0);
    }

    // =========================================================================
    // Edge Cases
    // =========================================================================

    #[test]
    fn test_non_simple_types_fail() {
        let value = Value::literal(Literal::new(1), TYPE_INT64);
        assert_eq!(Unpack::Low16To32.apply(&value), None);
    }

    #[test]
    fn test_non_literal_fails() {
        let value = vc4_core::value::UNDEFINED_VALUE;
        assert_eq!(Unpack::Byte0To32.apply(&value), None);
    }

    #[test]
    fn test_container_unpacks_per_lane() {
        use vc4_core::ContainerValue;
        let container = Value::container(
            ContainerValue {
                elements: vec![int(0x0000_0102), int(0x0000_0304)],
            },
            TYPE_INT32.to_vector_type(2),
        );
        let result = Unpack::Byte0To32.apply(&container).unwrap();
        let lanes = &result.check_container().unwrap().elements;
        assert_eq!(lanes[0].literal_value().unwrap().unsigned_int(), 0x02);
        assert_eq!(lanes[1].literal_value().unwrap().unsigned_int(), 0x04);
    }

    #[test]
    fn test_container_with_non_literal_lane_fails() {
        use vc4_core::ContainerValue;
        let container = Value::container(
            ContainerValue {
                elements: vec![int(1), vc4_core::value::UNDEFINED_VALUE],
            },
            TYPE_INT32.to_vector_type(2),
        );
        assert_eq!(Unpack::Byte0To32.apply(&container), None);
    }

    #[test]
    fn test_unpack_to_32bit() {
        assert_eq!(Unpack::unpack_to_32bit(TYPE_INT32).unwrap(), Unpack::Nop);
        assert_eq!(Unpack::unpack_to_32bit(TYPE_FLOAT).unwrap(), Unpack::Nop);
        assert_eq!(
            Unpack::unpack_to_32bit(TYPE_INT16).unwrap(),
            Unpack::Low16To32
        );
        assert_eq!(Unpack::unpack_to_32bit(TYPE_HALF).unwrap(), Unpack::Low16To32);
        assert_eq!(Unpack::unpack_to_32bit(TYPE_INT8).unwrap(), Unpack::Byte0To32);
    }
}
