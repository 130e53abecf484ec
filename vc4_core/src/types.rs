//! Operand data types: scalar kind plus SIMD vector width.

use std::fmt;

// =============================================================================
// Scalar Kind
// =============================================================================

/// The scalar element kind of a data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalarKind {
    /// 8-bit integer.
    Int8 = 0,
    /// 16-bit integer.
    Int16 = 1,
    /// 32-bit integer.
    Int32 = 2,
    /// 64-bit integer (not representable in a single register).
    Int64 = 3,
    /// 16-bit IEEE 754 binary16.
    Half = 4,
    /// 32-bit IEEE 754 binary32.
    Float = 5,
    /// Pointer (32 bits wide, but never packed/unpacked).
    Pointer = 6,
    /// Unknown type, used for the untyped undefined sentinel.
    Unknown = 7,
}

// =============================================================================
// Data Type
// =============================================================================

/// A scalar kind with a vector width of 1..=16 lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    scalar: ScalarKind,
    vector_width: u8,
}

/// Bit count of a byte element.
pub const BYTE: u8 = 8;
/// Bit count of a half-word element.
pub const HALF_WORD: u8 = 16;
/// Bit count of a full word element.
pub const WORD: u8 = 32;

/// Scalar 8-bit integer.
pub const TYPE_INT8: DataType = DataType::scalar(ScalarKind::Int8);
/// Scalar 16-bit integer.
pub const TYPE_INT16: DataType = DataType::scalar(ScalarKind::Int16);
/// Scalar 32-bit integer.
pub const TYPE_INT32: DataType = DataType::scalar(ScalarKind::Int32);
/// Scalar 64-bit integer.
pub const TYPE_INT64: DataType = DataType::scalar(ScalarKind::Int64);
/// Scalar half float.
pub const TYPE_HALF: DataType = DataType::scalar(ScalarKind::Half);
/// Scalar single-precision float.
pub const TYPE_FLOAT: DataType = DataType::scalar(ScalarKind::Float);
/// The unknown type.
pub const TYPE_UNKNOWN: DataType = DataType::scalar(ScalarKind::Unknown);

impl DataType {
    /// Create a scalar (single-lane) type.
    #[inline]
    pub const fn scalar(kind: ScalarKind) -> Self {
        Self {
            scalar: kind,
            vector_width: 1,
        }
    }

    /// Create a vector type with the given lane count.
    ///
    /// The hardware supports widths 1, 2, 3, 4, 8 and 16.
    #[inline]
    pub const fn vector(kind: ScalarKind, width: u8) -> Self {
        debug_assert!(width >= 1 && width <= 16);
        Self {
            scalar: kind,
            vector_width: width,
        }
    }

    /// The scalar element kind.
    #[inline]
    pub const fn scalar_kind(self) -> ScalarKind {
        self.scalar
    }

    /// The number of SIMD lanes.
    #[inline]
    pub const fn vector_width(self) -> u8 {
        self.vector_width
    }

    /// This type with a different lane count.
    #[inline]
    pub const fn to_vector_type(self, width: u8) -> Self {
        Self::vector(self.scalar, width)
    }

    /// Check whether the element kind is a float (half or single).
    #[inline]
    pub const fn is_floating_type(self) -> bool {
        matches!(self.scalar, ScalarKind::Half | ScalarKind::Float)
    }

    /// Check whether this is a simple scalar element of at most 32 bits.
    ///
    /// Pointers, 64-bit integers and the unknown type are not simple;
    /// pack and unpack modifiers are undefined on them.
    #[inline]
    pub const fn is_simple_type(self) -> bool {
        matches!(
            self.scalar,
            ScalarKind::Int8
                | ScalarKind::Int16
                | ScalarKind::Int32
                | ScalarKind::Half
                | ScalarKind::Float
        )
    }

    /// Bit count of one scalar element.
    #[inline]
    pub const fn scalar_bit_count(self) -> u8 {
        match self.scalar {
            ScalarKind::Int8 => BYTE,
            ScalarKind::Int16 | ScalarKind::Half => HALF_WORD,
            ScalarKind::Int32 | ScalarKind::Float | ScalarKind::Pointer => WORD,
            ScalarKind::Int64 => 64,
            ScalarKind::Unknown => 0,
        }
    }

    /// Check whether values of `other` fit into this type.
    ///
    /// Holds when the float/integer families match, the element is at
    /// least as wide, and no lanes would be dropped. Used by the
    /// evaluator to pick the wider result type.
    #[inline]
    pub const fn contains_type(self, other: DataType) -> bool {
        self.is_floating_type() == other.is_floating_type()
            && self.scalar_bit_count() >= other.scalar_bit_count()
            && self.vector_width >= other.vector_width
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.scalar {
            ScalarKind::Int8 => "i8",
            ScalarKind::Int16 => "i16",
            ScalarKind::Int32 => "i32",
            ScalarKind::Int64 => "i64",
            ScalarKind::Half => "half",
            ScalarKind::Float => "float",
            ScalarKind::Pointer => "ptr",
            ScalarKind::Unknown => "?",
        };
        if self.vector_width > 1 {
            write!(f, "<{} x {}>", self.vector_width, name)
        } else {
            write!(f, "{}", name)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
