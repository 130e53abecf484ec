//! The VideoCore IV opcode catalog.
//!
//! Every ALU operation carries its mnemonic, its selector byte on each of
//! the two ALUs (at most one is non-zero, except for the byte-wise ops
//! available on both), its arity, and its operand/result type families.
//!
//! Opcode equality is *selector aliasing*, not structural equality: two
//! opcodes are the same operation when they share a non-zero ADD selector
//! or a non-zero MUL selector, or both encode NOP. The total order is
//! lexicographic on the selector pair and exists only so opcodes can key
//! ordered maps; it does not coincide with the aliasing equivalence.

use std::cmp::Ordering;
use std::fmt;

use vc4_core::value::{
    FLOAT_NAN, FLOAT_NEG_INF, FLOAT_ONE, FLOAT_ZERO, INT_ONE, INT_ZERO, VALUE_ALL_BITS_SET,
};
use vc4_core::{CompilationError, CompilationResult, CompilationStep, Value};

// =============================================================================
// OpCode
// =============================================================================

/// A machine operation of the ADD or MUL ALU.
#[derive(Debug, Clone, Copy)]
pub struct OpCode {
    /// Stable mnemonic, the key used in textual output.
    pub name: &'static str,
    /// Selector byte on the ADD ALU, zero if not available there.
    pub op_add: u8,
    /// Selector byte on the MUL ALU, zero if not available there.
    pub op_mul: u8,
    /// Number of operands, 1 or 2 (0 for NOP).
    pub num_operands: u8,
    /// Whether the operands are floating-point.
    pub accepts_float: bool,
    /// Whether the result is floating-point.
    pub returns_float: bool,
}

/// No operation.
pub const OP_NOP: OpCode = OpCode::new("nop", 0, 0, 0, false, false);
/// Floating-point addition.
pub const OP_FADD: OpCode = OpCode::new("fadd", 1, 0, 2, true, true);
/// Floating-point subtraction.
pub const OP_FSUB: OpCode = OpCode::new("fsub", 2, 0, 2, true, true);
/// Floating-point minimum (NaN ordered above +Inf).
pub const OP_FMIN: OpCode = OpCode::new("fmin", 3, 0, 2, true, true);
/// Floating-point maximum (NaN ordered above +Inf).
pub const OP_FMAX: OpCode = OpCode::new("fmax", 4, 0, 2, true, true);
/// Minimum of the absolute values.
pub const OP_FMINABS: OpCode = OpCode::new("fminabs", 5, 0, 2, true, true);
/// Maximum of the absolute values.
pub const OP_FMAXABS: OpCode = OpCode::new("fmaxabs", 6, 0, 2, true, true);
/// Float to signed integer (truncating, zero on NaN/Inf/overflow).
pub const OP_FTOI: OpCode = OpCode::new("ftoi", 7, 0, 1, true, false);
/// Signed integer to float.
pub const OP_ITOF: OpCode = OpCode::new("itof", 8, 0, 1, false, true);
/// 32-bit wrapping addition.
pub const OP_ADD: OpCode = OpCode::new("add", 12, 0, 2, false, false);
/// 32-bit wrapping subtraction.
pub const OP_SUB: OpCode = OpCode::new("sub", 13, 0, 2, false, false);
/// Logical shift right.
pub const OP_SHR: OpCode = OpCode::new("shr", 14, 0, 2, false, false);
/// Arithmetic shift right.
pub const OP_ASR: OpCode = OpCode::new("asr", 15, 0, 2, false, false);
/// Rotate right.
pub const OP_ROR: OpCode = OpCode::new("ror", 16, 0, 2, false, false);
/// Logical shift left.
pub const OP_SHL: OpCode = OpCode::new("shl", 17, 0, 2, false, false);
/// Signed minimum.
pub const OP_MIN: OpCode = OpCode::new("min", 18, 0, 2, false, false);
/// Signed maximum.
pub const OP_MAX: OpCode = OpCode::new("max", 19, 0, 2, false, false);
/// Bitwise and.
pub const OP_AND: OpCode = OpCode::new("and", 20, 0, 2, false, false);
/// Bitwise or.
pub const OP_OR: OpCode = OpCode::new("or", 21, 0, 2, false, false);
/// Bitwise exclusive or.
pub const OP_XOR: OpCode = OpCode::new("xor", 22, 0, 2, false, false);
/// Bitwise complement.
pub const OP_NOT: OpCode = OpCode::new("not", 23, 0, 1, false, false);
/// Count leading zeros.
pub const OP_CLZ: OpCode = OpCode::new("clz", 24, 0, 1, false, false);
/// Per-byte saturating addition, on both ALUs.
pub const OP_V8ADDS: OpCode = OpCode::new("v8adds", 30, 6, 2, false, false);
/// Per-byte saturating subtraction, on both ALUs.
pub const OP_V8SUBS: OpCode = OpCode::new("v8subs", 31, 7, 2, false, false);
/// Floating-point multiplication.
pub const OP_FMUL: OpCode = OpCode::new("fmul", 0, 1, 2, true, true);
/// 24-bit multiplication.
pub const OP_MUL24: OpCode = OpCode::new("mul24", 0, 2, 2, false, false);
/// Per-byte `(a*b + 127) / 255` multiplication.
pub const OP_V8MULD: OpCode = OpCode::new("v8muld", 0, 3, 2, false, false);
/// Per-byte unsigned minimum.
pub const OP_V8MIN: OpCode = OpCode::new("v8min", 0, 4, 2, false, false);
/// Per-byte unsigned maximum.
pub const OP_V8MAX: OpCode = OpCode::new("v8max", 0, 5, 2, false, false);

/// Every distinct operation, for name lookup.
const CATALOG: [OpCode; 29] = [
    OP_NOP, OP_FADD, OP_FSUB, OP_FMIN, OP_FMAX, OP_FMINABS, OP_FMAXABS, OP_FTOI, OP_ITOF, OP_ADD,
    OP_SUB, OP_SHR, OP_ASR, OP_ROR, OP_SHL, OP_MIN, OP_MAX, OP_AND, OP_OR, OP_XOR, OP_NOT, OP_CLZ,
    OP_V8ADDS, OP_V8SUBS, OP_FMUL, OP_MUL24, OP_V8MULD, OP_V8MIN, OP_V8MAX,
];

/// ADD-ALU selector table. The indices are the hardware selector bytes;
/// unassigned slots execute NOP.
const ADD_CODES: [OpCode; 32] = [
    OP_NOP, OP_FADD, OP_FSUB, OP_FMIN, OP_FMAX, OP_FMINABS, OP_FMAXABS, OP_FTOI, OP_ITOF, OP_NOP,
    OP_NOP, OP_NOP, OP_ADD, OP_SUB, OP_SHR, OP_ASR, OP_ROR, OP_SHL, OP_MIN, OP_MAX, OP_AND, OP_OR,
    OP_XOR, OP_NOT, OP_CLZ, OP_NOP, OP_NOP, OP_NOP, OP_NOP, OP_NOP, OP_V8ADDS, OP_V8SUBS,
];

/// MUL-ALU selector table.
const MUL_CODES: [OpCode; 8] = [
    OP_NOP, OP_FMUL, OP_MUL24, OP_V8MULD, OP_V8MIN, OP_V8MAX, OP_V8ADDS, OP_V8SUBS,
];

impl OpCode {
    const fn new(
        name: &'static str,
        op_add: u8,
        op_mul: u8,
        num_operands: u8,
        accepts_float: bool,
        returns_float: bool,
    ) -> Self {
        Self {
            name,
            op_add,
            op_mul,
            num_operands,
            accepts_float,
            returns_float,
        }
    }

    /// Look up an opcode by mnemonic, falling back to NOP.
    pub fn find(name: &str) -> OpCode {
        CATALOG
            .iter()
            .find(|code| code.name == name)
            .copied()
            .unwrap_or(OP_NOP)
    }

    /// Look up an opcode by mnemonic; an unknown name is a fault.
    pub fn from_name(name: &str) -> CompilationResult<OpCode> {
        let code = Self::find(name);
        if code == OP_NOP && name != "nop" {
            return Err(CompilationError::new(
                CompilationStep::General,
                "No machine code operation for this op-code",
                name,
            ));
        }
        Ok(code)
    }

    /// Look up an opcode by selector byte.
    ///
    /// Unassigned in-range slots are NOP; a selector beyond the table is
    /// a fault.
    pub fn from_selector(selector: u8, is_mul_alu: bool) -> CompilationResult<OpCode> {
        let table: &[OpCode] = if is_mul_alu { &MUL_CODES } else { &ADD_CODES };
        table.get(selector as usize).copied().ok_or_else(|| {
            CompilationError::new(
                CompilationStep::CodeGeneration,
                "Op-code selector out of range",
                selector.to_string(),
            )
        })
    }

    /// Check whether this takes a single operand.
    #[inline]
    pub const fn is_unary(self) -> bool {
        self.num_operands == 1
    }

    /// `f(a, a) == a` for all operands.
    pub fn is_idempotent(self) -> bool {
        self == OP_AND
            || self == OP_FMAX
            || self == OP_FMIN
            || self == OP_MAX
            || self == OP_MIN
            || self == OP_OR
            || self == OP_V8MAX
            || self == OP_V8MIN
    }

    /// `f(f(a, b), c) == f(a, f(b, c))`.
    pub fn is_associative(self) -> bool {
        self == OP_ADD
            || self == OP_AND
            || self == OP_FADD
            || self == OP_FMAX
            || self == OP_FMAXABS
            || self == OP_FMIN
            || self == OP_FMINABS
            || self == OP_FMUL
            || self == OP_MAX
            || self == OP_MIN
            || self == OP_OR
            || self == OP_V8MAX
            || self == OP_V8MIN
            || self == OP_XOR
    }

    /// `f(a, b) == f(b, a)`.
    pub fn is_commutative(self) -> bool {
        self == OP_ADD
            || self == OP_AND
            || self == OP_FADD
            || self == OP_FMAX
            || self == OP_FMAXABS
            || self == OP_FMIN
            || self == OP_FMINABS
            || self == OP_FMUL
            || self == OP_MAX
            || self == OP_MIN
            || self == OP_MUL24
            || self == OP_OR
            || self == OP_V8ADDS
            || self == OP_V8MAX
            || self == OP_V8MIN
            || self == OP_V8MULD
            || self == OP_XOR
    }

    /// `f(a, g(b, c)) == g(f(a, b), f(a, c))`.
    pub fn is_left_distributive_over(self, other: OpCode) -> bool {
        if self == OP_FMUL {
            return other == OP_FADD || other == OP_FSUB;
        }
        if self == OP_FADD {
            return other == OP_FMIN || other == OP_FMAX;
        }
        if self == OP_ADD {
            return other == OP_MIN || other == OP_MAX;
        }
        if self == OP_AND {
            return other == OP_OR || other == OP_XOR;
        }
        false
    }

    /// `f(g(a, b), c) == g(f(a, c), f(b, c))`.
    pub fn is_right_distributive_over(self, other: OpCode) -> bool {
        // The candidates are all commutative, so the sets coincide.
        self.is_left_distributive_over(other)
    }

    /// The value `id` with `f(id, a) == a`, if one exists.
    pub fn left_identity(self) -> Option<Value> {
        if self == OP_ADD || self == OP_OR || self == OP_XOR {
            Some(INT_ZERO)
        } else if self == OP_AND {
            Some(VALUE_ALL_BITS_SET)
        } else if self == OP_FADD {
            Some(FLOAT_ZERO)
        } else if self == OP_FMIN {
            Some(FLOAT_NAN)
        } else if self == OP_FMAX {
            Some(FLOAT_NEG_INF)
        } else if self == OP_FMUL {
            Some(FLOAT_ONE)
        } else if self == OP_MUL24 {
            Some(INT_ONE)
        } else {
            None
        }
    }

    /// The value `id` with `f(a, id) == a`, if one exists.
    pub fn right_identity(self) -> Option<Value> {
        if self == OP_ADD
            || self == OP_ASR
            || self == OP_OR
            || self == OP_ROR
            || self == OP_SHL
            || self == OP_SHR
            || self == OP_SUB
            || self == OP_XOR
        {
            Some(INT_ZERO)
        } else if self == OP_AND {
            Some(VALUE_ALL_BITS_SET)
        } else if self == OP_FADD || self == OP_FSUB {
            Some(FLOAT_ZERO)
        } else if self == OP_FMIN {
            Some(FLOAT_NAN)
        } else if self == OP_FMUL {
            Some(FLOAT_ONE)
        } else if self == OP_MUL24 {
            Some(INT_ONE)
        } else {
            None
        }
    }

    /// The value `z` with `f(z, a) == z`, if one exists.
    pub fn left_absorbing_element(self) -> Option<Value> {
        if self == OP_AND
            || self == OP_ASR
            || self == OP_MUL24
            || self == OP_ROR
            || self == OP_SHL
            || self == OP_SHR
            || self == OP_V8MIN
            || self == OP_V8MULD
        {
            Some(INT_ZERO)
        } else if self == OP_FMAX || self == OP_FMAXABS {
            Some(FLOAT_NAN)
        } else if self == OP_FMINABS || self == OP_FMUL {
            Some(FLOAT_ZERO)
        } else if self == OP_OR || self == OP_V8MAX {
            Some(VALUE_ALL_BITS_SET)
        } else {
            None
        }
    }

    /// The value `z` with `f(a, z) == z`, if one exists.
    pub fn right_absorbing_element(self) -> Option<Value> {
        if self == OP_AND || self == OP_MUL24 || self == OP_V8MIN || self == OP_V8MULD {
            Some(INT_ZERO)
        } else if self == OP_FMAX || self == OP_FMAXABS {
            Some(FLOAT_NAN)
        } else if self == OP_FMINABS || self == OP_FMUL {
            Some(FLOAT_ZERO)
        } else if self == OP_OR || self == OP_V8MAX {
            Some(VALUE_ALL_BITS_SET)
        } else {
            None
        }
    }
}

impl PartialEq for OpCode {
    /// Selector-aliased equality: the same operation encoded for either
    /// ALU compares equal; the two all-zero encodings are both NOP.
    fn eq(&self, other: &Self) -> bool {
        if self.op_add > 0 && self.op_add == other.op_add {
            return true;
        }
        if self.op_mul > 0 && self.op_mul == other.op_mul {
            return true;
        }
        self.op_add == 0 && self.op_mul == 0 && other.op_add == 0 && other.op_mul == 0
    }
}

impl Eq for OpCode {}

impl PartialOrd for OpCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpCode {
    /// Lexicographic on the selector pair; an ordering for map keys only.
    fn cmp(&self, other: &Self) -> Ordering {
        (self.op_add, self.op_mul).cmp(&(other.op_add, other.op_mul))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// ALU Assignment
// =============================================================================

/// Check whether the flags of an instruction pair come from the MUL ALU.
///
/// Despite what the Broadcom specification states, the MUL ALU only sets
/// flags while the ADD ALU executes nop.
pub const fn is_flag_set_by_mul_alu(op_add: u8, op_mul: u8) -> bool {
    op_add == 0 && op_mul != 0
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Equality and Ordering Tests
    // =========================================================================

    #[test]
    fn test_selector_aliased_equality() {
        // Same non-zero ADD selector.
        assert_eq!(OP_ADD, OpCode::new("alias", 12, 0, 2, false, false));
        // Same non-zero MUL selector, even with a differing ADD selector.
        assert_eq!(OP_V8ADDS, OpCode::new("alias", 0, 6, 2, false, false));
        // Both all-zero.
        assert_eq!(OP_NOP, OpCode::new("alias", 0, 0, 0, false, false));
        // Different operations.
        assert_ne!(OP_ADD, OP_SUB);
        assert_ne!(OP_FMUL, OP_MUL24);
        assert_ne!(OP_NOP, OP_ADD);
    }

    #[test]
    fn test_ordering_is_lexicographic_on_selectors() {
        assert!(OP_NOP < OP_FADD);
        assert!(OP_FADD < OP_ADD);
        assert!(OP_FMUL < OP_FADD);
        assert!(OP_FMUL < OP_MUL24);
    }

    // =========================================================================
    // Lookup Tests
    // =========================================================================

    #[test]
    fn test_name_lookup() {
        assert_eq!(OpCode::from_name("add").unwrap(), OP_ADD);
        assert_eq!(OpCode::from_name("v8muld").unwrap(), OP_V8MULD);
        assert_eq!(OpCode::from_name("nop").unwrap(), OP_NOP);
        assert!(OpCode::from_name("bogus").is_err());
        assert_eq!(OpCode::find("bogus"), OP_NOP);
    }

    #[test]
    fn test_selector_lookup() {
        assert_eq!(OpCode::from_selector(12, false).unwrap(), OP_ADD);
        assert_eq!(OpCode::from_selector(1, false).unwrap(), OP_FADD);
        assert_eq!(OpCode::from_selector(1, true).unwrap(), OP_FMUL);
        assert_eq!(OpCode::from_selector(7, true).unwrap(), OP_V8SUBS);
        // Unassigned slots execute NOP.
        assert_eq!(OpCode::from_selector(9, false).unwrap(), OP_NOP);
        assert_eq!(OpCode::from_selector(27, false).unwrap(), OP_NOP);
        // Out of table range is a fault.
        assert!(OpCode::from_selector(32, false).is_err());
        assert!(OpCode::from_selector(8, true).is_err());
    }

    #[test]
    fn test_selector_tables_round_trip() {
        for code in CATALOG {
            if code.op_add != 0 {
                assert_eq!(OpCode::from_selector(code.op_add, false).unwrap(), code);
            }
            if code.op_mul != 0 {
                assert_eq!(OpCode::from_selector(code.op_mul, true).unwrap(), code);
            }
        }
    }

    // =========================================================================
    // Algebraic Property Tests
    // =========================================================================

    #[test]
    fn test_idempotent_ops() {
        for code in [OP_AND, OP_OR, OP_MIN, OP_MAX, OP_FMIN, OP_FMAX, OP_V8MIN, OP_V8MAX] {
            assert!(code.is_idempotent(), "{}", code);
        }
        for code in [OP_ADD, OP_XOR, OP_FADD, OP_FMUL, OP_V8ADDS] {
            assert!(!code.is_idempotent(), "{}", code);
        }
    }

    #[test]
    fn test_commutative_includes_associative() {
        // Every associative opcode in the catalog is also commutative.
        for code in CATALOG {
            if code.is_associative() {
                assert!(code.is_commutative(), "{}", code);
            }
        }
        assert!(OP_MUL24.is_commutative());
        assert!(!OP_MUL24.is_associative());
        assert!(!OP_SUB.is_commutative());
        assert!(!OP_SHL.is_commutative());
    }

    #[test]
    fn test_distributivity() {
        assert!(OP_FMUL.is_left_distributive_over(OP_FADD));
        assert!(OP_FMUL.is_right_distributive_over(OP_FSUB));
        assert!(OP_ADD.is_left_distributive_over(OP_MIN));
        assert!(OP_AND.is_left_distributive_over(OP_OR));
        assert!(!OP_FADD.is_left_distributive_over(OP_FMUL));
        assert!(!OP_SUB.is_left_distributive_over(OP_ADD));
    }

    // =========================================================================
    // Identity and Absorbing Element Tests
    // =========================================================================

    #[test]
    fn test_left_identities() {
        assert_eq!(OP_ADD.left_identity(), Some(INT_ZERO));
        assert_eq!(OP_AND.left_identity(), Some(VALUE_ALL_BITS_SET));
        assert_eq!(OP_FADD.left_identity(), Some(FLOAT_ZERO));
        assert_eq!(OP_FMIN.left_identity(), Some(FLOAT_NAN));
        assert_eq!(OP_FMAX.left_identity(), Some(FLOAT_NEG_INF));
        assert_eq!(OP_FMUL.left_identity(), Some(FLOAT_ONE));
        assert_eq!(OP_MUL24.left_identity(), Some(INT_ONE));
        // Shifts have no left identity.
        assert_eq!(OP_SHL.left_identity(), None);
        assert_eq!(OP_SUB.left_identity(), None);
    }

    #[test]
    fn test_right_identities() {
        assert_eq!(OP_SUB.right_identity(), Some(INT_ZERO));
        assert_eq!(OP_FSUB.right_identity(), Some(FLOAT_ZERO));
        for code in [OP_ASR, OP_SHR, OP_SHL, OP_ROR] {
            assert_eq!(code.right_identity(), Some(INT_ZERO), "{}", code);
        }
        // fmax has a left identity but no right identity table entry.
        assert_eq!(OP_FMAX.right_identity(), None);
    }

    #[test]
    fn test_absorbing_elements() {
        assert_eq!(OP_AND.left_absorbing_element(), Some(INT_ZERO));
        assert_eq!(OP_AND.right_absorbing_element(), Some(INT_ZERO));
        assert_eq!(OP_OR.left_absorbing_element(), Some(VALUE_ALL_BITS_SET));
        assert_eq!(OP_FMUL.left_absorbing_element(), Some(FLOAT_ZERO));
        assert_eq!(OP_FMAX.left_absorbing_element(), Some(FLOAT_NAN));
        assert_eq!(OP_FMAXABS.right_absorbing_element(), Some(FLOAT_NAN));
        assert_eq!(OP_FMINABS.left_absorbing_element(), Some(FLOAT_ZERO));
        assert_eq!(OP_V8MULD.right_absorbing_element(), Some(INT_ZERO));
        // Shifts absorb zero on the left only.
        assert_eq!(OP_SHL.left_absorbing_element(), Some(INT_ZERO));
        assert_eq!(OP_SHL.right_absorbing_element(), None);
        assert_eq!(OP_ADD.left_absorbing_element(), None);
    }

    // =========================================================================
    // ALU Assignment Tests
    // =========================================================================

    #[test]
    fn test_flag_set_by_mul_alu() {
        assert!(is_flag_set_by_mul_alu(OP_NOP.op_add, OP_FMUL.op_mul));
        assert!(!is_flag_set_by_mul_alu(OP_ADD.op_add, OP_FMUL.op_mul));
        assert!(!is_flag_set_by_mul_alu(OP_NOP.op_add, OP_NOP.op_mul));
    }
}
