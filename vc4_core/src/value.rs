//! Operand and result values.
//!
//! A [`Value`] is one of: a scalar literal, a container of per-lane
//! sub-values, a register-encoded small immediate, a reference to a
//! local (virtual register), a reference to a hardware register, or the
//! distinct undefined sentinel. Values are immutable; the algebra and
//! the evaluator always return new ones.

use std::fmt;
use std::sync::Arc;

use crate::literal::Literal;
use crate::types::{DataType, TYPE_FLOAT, TYPE_INT32, TYPE_UNKNOWN};

// =============================================================================
// Registers
// =============================================================================

/// The register file a physical register lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RegisterFile {
    /// Physical register file A.
    PhysicalA = 0,
    /// Physical register file B.
    PhysicalB = 1,
    /// Accumulators r0..r5.
    Accumulator = 2,
}

/// A hardware register reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register {
    /// Register file.
    pub file: RegisterFile,
    /// Register number within the file.
    pub num: u8,
}

/// Reading this register yields element 0 replicated across each quad.
pub const REG_REPLICATE_QUAD: Register = Register {
    file: RegisterFile::PhysicalA,
    num: 53,
};

/// Reading this register yields element 0 replicated across all lanes.
pub const REG_REPLICATE_ALL: Register = Register {
    file: RegisterFile::PhysicalB,
    num: 53,
};

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file {
            RegisterFile::PhysicalA => write!(f, "ra{}", self.num),
            RegisterFile::PhysicalB => write!(f, "rb{}", self.num),
            RegisterFile::Accumulator => write!(f, "r{}", self.num),
        }
    }
}

// =============================================================================
// Small Immediates
// =============================================================================

/// A constant encoded directly in the ALU instruction word.
///
/// The 6-bit space encodes the integers -16..=15, the powers of two
/// 1.0..=128.0, the reciprocal powers 1/256..=1/2, and the vector
/// rotation selectors (by r5, or by a fixed offset of 1..=15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SmallImmediate(u8);

impl SmallImmediate {
    /// Wrap a raw 6-bit encoding.
    #[inline]
    pub const fn new(value: u8) -> Self {
        debug_assert!(value < 64);
        Self(value)
    }

    /// Encode a small integer, if it is in -16..=15.
    pub const fn from_integer(value: i32) -> Option<Self> {
        if value >= 0 && value <= 15 {
            Some(Self(value as u8))
        } else if value >= -16 && value < 0 {
            Some(Self((value + 32) as u8))
        } else {
            None
        }
    }

    /// The raw encoding.
    #[inline]
    pub const fn value(self) -> u8 {
        self.0
    }

    /// The encoded integer, if this is an integer immediate.
    pub const fn integer_value(self) -> Option<i32> {
        match self.0 {
            0..=15 => Some(self.0 as i32),
            16..=31 => Some(self.0 as i32 - 32),
            _ => None,
        }
    }

    /// The encoded float, if this is a float immediate.
    pub fn float_value(self) -> Option<f32> {
        match self.0 {
            // 1.0, 2.0, 4.0, ..., 128.0
            32..=39 => Some((1u32 << (self.0 - 32)) as f32),
            // 1/256, 1/128, ..., 1/2
            40..=47 => Some(1.0 / (1u32 << (48 - self.0)) as f32),
            _ => None,
        }
    }

    /// Check whether this selects a vector rotation.
    #[inline]
    pub const fn is_vector_rotation(self) -> bool {
        self.0 >= 48
    }

    /// The fixed rotation offset, if any. Rotation by r5 has none.
    pub const fn rotation_offset(self) -> Option<u8> {
        match self.0 {
            49..=63 => Some(self.0 - 48),
            _ => None,
        }
    }

    /// The literal this immediate loads, if it is not a rotation.
    pub fn to_literal(self) -> Option<Literal> {
        if let Some(int) = self.integer_value() {
            return Some(Literal::from_signed(int));
        }
        self.float_value().map(Literal::from_real)
    }
}

impl fmt::Display for SmallImmediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(int) = self.integer_value() {
            write!(f, "{}", int)
        } else if let Some(real) = self.float_value() {
            write!(f, "{}", real)
        } else if self.0 == 48 {
            write!(f, "<<r5")
        } else {
            write!(f, "<<{}", self.0 - 48)
        }
    }
}

// =============================================================================
// Locals
// =============================================================================

/// Identifier of a local, the key of expression substitution maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(pub u32);

/// A virtual register produced by the upstream lowering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Local {
    /// Stable identifier.
    pub id: LocalId,
    /// Human-readable name.
    pub name: Arc<str>,
}

impl Local {
    /// Create a local with the given id and name.
    pub fn new(id: u32, name: impl Into<Arc<str>>) -> Self {
        Self {
            id: LocalId(id),
            name: name.into(),
        }
    }
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.name)
    }
}

// =============================================================================
// Containers
// =============================================================================

/// An ordered sequence of per-lane sub-values.
///
/// Invariant: the lane count matches the container type's vector width
/// and all lanes share the scalar element type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ContainerValue {
    /// Per-lane values.
    pub elements: Vec<Value>,
}

impl ContainerValue {
    /// Create a container with capacity for `lanes` elements.
    pub fn with_capacity(lanes: usize) -> Self {
        Self {
            elements: Vec::with_capacity(lanes),
        }
    }

    /// Check whether every lane equals lane 0.
    pub fn is_all_same(&self) -> bool {
        match self.elements.first() {
            Some(first) => self.elements.iter().all(|elem| elem == first),
            None => true,
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// The payload of a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A scalar literal.
    Literal(Literal),
    /// A vector of per-lane sub-values.
    Container(ContainerValue),
    /// A register-encoded small immediate.
    Immediate(SmallImmediate),
    /// A reference to a local.
    Local(Arc<Local>),
    /// A reference to a hardware register.
    Register(Register),
    /// The undefined sentinel. Distinct from any literal.
    Undefined,
}

/// A typed operand or result value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Value {
    /// The payload.
    pub kind: ValueKind,
    /// The declared data type.
    pub ty: DataType,
}

/// Integer zero.
pub const INT_ZERO: Value = Value::literal(Literal::new(0), TYPE_INT32);
/// Integer one.
pub const INT_ONE: Value = Value::literal(Literal::new(1), TYPE_INT32);
/// Float positive zero.
pub const FLOAT_ZERO: Value = Value::literal(Literal::new(0), TYPE_FLOAT);
/// Float one.
pub const FLOAT_ONE: Value = Value::literal(Literal::new(0x3F80_0000), TYPE_FLOAT);
/// A quiet NaN.
pub const FLOAT_NAN: Value = Value::literal(Literal::new(0x7FC0_0000), TYPE_FLOAT);
/// Float positive infinity.
pub const FLOAT_INF: Value = Value::literal(Literal::new(0x7F80_0000), TYPE_FLOAT);
/// Float negative infinity.
pub const FLOAT_NEG_INF: Value = Value::literal(Literal::new(0xFF80_0000), TYPE_FLOAT);
/// All 32 bits set, as an integer.
pub const VALUE_ALL_BITS_SET: Value = Value::literal(Literal::new(u32::MAX), TYPE_INT32);
/// The untyped undefined value.
pub const UNDEFINED_VALUE: Value = Value {
    kind: ValueKind::Undefined,
    ty: TYPE_UNKNOWN,
};

impl Value {
    /// Create a literal value.
    #[inline]
    pub const fn literal(literal: Literal, ty: DataType) -> Self {
        Self {
            kind: ValueKind::Literal(literal),
            ty,
        }
    }

    /// Create a container value.
    #[inline]
    pub fn container(container: ContainerValue, ty: DataType) -> Self {
        Self {
            kind: ValueKind::Container(container),
            ty,
        }
    }

    /// Create a small-immediate value.
    #[inline]
    pub const fn immediate(imm: SmallImmediate, ty: DataType) -> Self {
        Self {
            kind: ValueKind::Immediate(imm),
            ty,
        }
    }

    /// Create a local reference.
    #[inline]
    pub fn local(local: Arc<Local>, ty: DataType) -> Self {
        Self {
            kind: ValueKind::Local(local),
            ty,
        }
    }

    /// Create a register reference.
    #[inline]
    pub const fn register(reg: Register, ty: DataType) -> Self {
        Self {
            kind: ValueKind::Register(reg),
            ty,
        }
    }

    /// Create an undefined value of the given type.
    #[inline]
    pub const fn undefined(ty: DataType) -> Self {
        Self {
            kind: ValueKind::Undefined,
            ty,
        }
    }

    /// The literal behind this value, if it is a scalar constant.
    ///
    /// Small immediates resolve to their loaded literal; rotation
    /// immediates carry no literal.
    pub fn literal_value(&self) -> Option<Literal> {
        match &self.kind {
            ValueKind::Literal(lit) => Some(*lit),
            ValueKind::Immediate(imm) => imm.to_literal(),
            _ => None,
        }
    }

    /// The container payload, if any.
    #[inline]
    pub fn check_container(&self) -> Option<&ContainerValue> {
        match &self.kind {
            ValueKind::Container(container) => Some(container),
            _ => None,
        }
    }

    /// The small-immediate payload, if any.
    #[inline]
    pub fn check_immediate(&self) -> Option<SmallImmediate> {
        match &self.kind {
            ValueKind::Immediate(imm) => Some(*imm),
            _ => None,
        }
    }

    /// The referenced local, if any.
    #[inline]
    pub fn check_local(&self) -> Option<&Arc<Local>> {
        match &self.kind {
            ValueKind::Local(local) => Some(local),
            _ => None,
        }
    }

    /// The referenced register, if any.
    #[inline]
    pub fn check_register(&self) -> Option<Register> {
        match &self.kind {
            ValueKind::Register(reg) => Some(*reg),
            _ => None,
        }
    }

    /// Check whether this is the undefined sentinel.
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, ValueKind::Undefined)
    }

    /// Check whether this holds a foldable constant (literal, constant
    /// immediate, or container).
    pub fn is_constant(&self) -> bool {
        self.literal_value().is_some() || self.check_container().is_some()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Literal(lit) => write!(f, "{} {}", self.ty, lit),
            ValueKind::Container(container) => {
                write!(f, "{} <", self.ty)?;
                for (i, elem) in container.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", elem)?;
                }
                write!(f, ">")
            }
            ValueKind::Immediate(imm) => write!(f, "{} {}", self.ty, imm),
            ValueKind::Local(local) => write!(f, "{} {}", self.ty, local),
            ValueKind::Register(reg) => write!(f, "{} {}", self.ty, reg),
            ValueKind::Undefined => write!(f, "{} undefined", self.ty),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Small Immediate Tests
    // =========================================================================

    #[test]
    fn test_immediate_integers() {
        assert_eq!(SmallImmediate::new(0).integer_value(), Some(0));
        assert_eq!(SmallImmediate::new(15).integer_value(), Some(15));
        assert_eq!(SmallImmediate::new(16).integer_value(), Some(-16));
        assert_eq!(SmallImmediate::new(31).integer_value(), Some(-1));
        assert_eq!(SmallImmediate::new(32).integer_value(), None);
    }

    #[test]
    fn test_immediate_floats() {
        assert_eq!(SmallImmediate::new(32).float_value(), Some(1.0));
        assert_eq!(SmallImmediate::new(39).float_value(), Some(128.0));
        assert_eq!(SmallImmediate::new(40).float_value(), Some(1.0 / 256.0));
        assert_eq!(SmallImmediate::new(47).float_value(), Some(0.5));
        assert_eq!(SmallImmediate::new(0).float_value(), None);
    }

    #[test]
    fn test_immediate_rotations() {
        assert!(SmallImmediate::new(48).is_vector_rotation());
        assert_eq!(SmallImmediate::new(48).rotation_offset(), None);
        assert_eq!(SmallImmediate::new(49).rotation_offset(), Some(1));
        assert_eq!(SmallImmediate::new(63).rotation_offset(), Some(15));
        assert_eq!(SmallImmediate::new(48).to_literal(), None);
    }

    #[test]
    fn test_immediate_from_integer() {
        assert_eq!(SmallImmediate::from_integer(7), Some(SmallImmediate::new(7)));
        assert_eq!(
            SmallImmediate::from_integer(-3),
            Some(SmallImmediate::new(29))
        );
        assert_eq!(SmallImmediate::from_integer(16), None);
        assert_eq!(SmallImmediate::from_integer(-17), None);
    }

    // =========================================================================
    // Value Tests
    // =========================================================================

    #[test]
    fn test_literal_value_accessor() {
        assert_eq!(
            INT_ONE.literal_value(),
            Some(Literal::from_signed(1))
        );
        let imm = Value::immediate(SmallImmediate::new(33), TYPE_FLOAT);
        assert_eq!(imm.literal_value(), Some(Literal::from_real(2.0)));
        let rot = Value::immediate(SmallImmediate::new(50), TYPE_INT32);
        assert_eq!(rot.literal_value(), None);
        assert!(UNDEFINED_VALUE.literal_value().is_none());
    }

    #[test]
    fn test_undefined_is_distinct() {
        assert!(UNDEFINED_VALUE.is_undefined());
        assert!(!UNDEFINED_VALUE.is_constant());
        assert_ne!(UNDEFINED_VALUE, INT_ZERO);
        // Typed undefined values keep their type but stay undefined.
        let typed = Value::undefined(TYPE_FLOAT);
        assert!(typed.is_undefined());
        assert_ne!(typed, UNDEFINED_VALUE);
    }

    #[test]
    fn test_container_all_same() {
        let mut container = ContainerValue::with_capacity(4);
        for _ in 0..4 {
            container.elements.push(INT_ONE);
        }
        assert!(container.is_all_same());
        container.elements[2] = INT_ZERO;
        assert!(!container.is_all_same());
        assert!(ContainerValue::default().is_all_same());
    }

    #[test]
    fn test_container_equality_is_lane_wise() {
        let a = Value::container(
            ContainerValue {
                elements: vec![INT_ZERO, INT_ONE],
            },
            TYPE_INT32.to_vector_type(2),
        );
        let b = Value::container(
            ContainerValue {
                elements: vec![INT_ZERO, INT_ONE],
            },
            TYPE_INT32.to_vector_type(2),
        );
        let c = Value::container(
            ContainerValue {
                elements: vec![INT_ONE, INT_ZERO],
            },
            TYPE_INT32.to_vector_type(2),
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_float_constants() {
        assert_eq!(FLOAT_ONE.literal_value().unwrap().real(), 1.0);
        assert!(FLOAT_NAN.literal_value().unwrap().real().is_nan());
        assert_eq!(FLOAT_NEG_INF.literal_value().unwrap().real(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_replicate_registers() {
        assert_ne!(REG_REPLICATE_ALL, REG_REPLICATE_QUAD);
        assert_eq!(REG_REPLICATE_ALL.to_string(), "rb53");
        assert_eq!(REG_REPLICATE_QUAD.to_string(), "ra53");
    }
}
