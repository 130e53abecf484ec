//! Compile-time evaluation of ALU operations.
//!
//! Given an opcode and constant operands, [`OpCode::evaluate`] produces
//! the bit-exact hardware result together with the flags the operation
//! would set. An absent result is not an error: it signals that the
//! operation cannot be folded and must be emitted for runtime execution.
//!
//! Shift distances are taken modulo 32 throughout, as the hardware does.

use vc4_core::value::UNDEFINED_VALUE;
use vc4_core::{ContainerValue, DataType, Literal, Value, TYPE_FLOAT, TYPE_INT32};

use crate::flags::{FlagStatus, VectorFlags};
use crate::opcodes::{
    OpCode, OP_ADD, OP_AND, OP_ASR, OP_CLZ, OP_FADD, OP_FMAX, OP_FMAXABS, OP_FMIN, OP_FMINABS,
    OP_FMUL, OP_FSUB, OP_FTOI, OP_ITOF, OP_MAX, OP_MIN, OP_MUL24, OP_NOT, OP_OR, OP_ROR, OP_SHL,
    OP_SHR, OP_SUB, OP_V8ADDS, OP_V8MAX, OP_V8MIN, OP_V8MULD, OP_V8SUBS, OP_XOR,
};

// =============================================================================
// Evaluation Result
// =============================================================================

/// The outcome of folding one ALU operation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PrecalculatedValue {
    /// The folded result, absent when the operation cannot be folded.
    pub value: Option<Value>,
    /// The flags the operation would set, per lane.
    pub flags: VectorFlags,
}

impl PrecalculatedValue {
    /// An operation that cannot be folded at compile time.
    fn none() -> Self {
        Self::default()
    }

    fn undefined(value: Value) -> Self {
        Self {
            value: Some(value),
            flags: VectorFlags::default(),
        }
    }
}

// =============================================================================
// Flag Derivation
// =============================================================================

/// Zero and negative from the result bits; carry and overflow undefined.
fn set_flags(value: Value) -> PrecalculatedValue {
    let flags = VectorFlags::from_value(&value);
    PrecalculatedValue {
        value: Some(value),
        flags,
    }
}

/// Result flags with a defined carry.
fn set_flags_carry(value: Value, carry: bool) -> PrecalculatedValue {
    let mut result = set_flags(value);
    let mut lane = result.flags.lane(0);
    lane.carry = FlagStatus::from_bool(carry);
    result.flags = VectorFlags::scalar(lane);
    result
}

/// Result flags with a defined carry and overflow.
fn set_flags_full(value: Value, carry: bool, overflow: bool) -> PrecalculatedValue {
    let mut result = set_flags_carry(value, carry);
    let mut lane = result.flags.lane(0);
    lane.overflow = FlagStatus::from_bool(overflow);
    result.flags = VectorFlags::scalar(lane);
    result
}

// =============================================================================
// Float Min/Max Ordering
// =============================================================================

/// Carry of fmin/fmax/fminabs/fmaxabs: set iff `a > b`.
///
/// The VideoCore IV orders NaN above +Inf for these operations; two NaNs
/// order by their bit patterns, which sort the same way as integers.
fn min_max_carry(a: Literal, b: Literal, use_abs: bool) -> bool {
    if a.real().is_nan() && b.real().is_nan() {
        return a.signed_int() > b.signed_int();
    }
    if a.real().is_nan() {
        return true;
    }
    if b.real().is_nan() {
        return false;
    }
    if use_abs {
        a.real().abs() > b.real().abs()
    } else {
        a.real() > b.real()
    }
}

/// `std::max` semantics: the first operand wins ties and unordered pairs.
#[inline]
fn float_max(a: f32, b: f32) -> f32 {
    if a < b {
        b
    } else {
        a
    }
}

/// `std::min` semantics: the first operand wins ties and unordered pairs.
#[inline]
fn float_min(a: f32, b: f32) -> f32 {
    if b < a {
        b
    } else {
        a
    }
}

// =============================================================================
// Per-Lane Arithmetic
// =============================================================================

/// Fold one opcode over scalar literals.
fn calc_literal(
    code: OpCode,
    first: Literal,
    second: Literal,
    result_type: DataType,
    first_type: DataType,
) -> PrecalculatedValue {
    if code == OP_ADD {
        let extended = u64::from(first.unsigned_int()) + u64::from(second.unsigned_int());
        let signed = i64::from(first.signed_int()) + i64::from(second.signed_int());
        return set_flags_full(
            Value::literal(
                Literal::from_signed(first.signed_int().wrapping_add(second.signed_int())),
                result_type,
            ),
            extended > 0xFFFF_FFFF,
            signed > i64::from(i32::MAX) || signed < i64::from(i32::MIN),
        );
    }
    if code == OP_SUB {
        let extended = i64::from(first.signed_int()) - i64::from(second.signed_int());
        return set_flags_full(
            Value::literal(
                Literal::from_signed(first.signed_int().wrapping_sub(second.signed_int())),
                result_type,
            ),
            extended < 0,
            extended > i64::from(i32::MAX) || extended < i64::from(i32::MIN),
        );
    }
    if code == OP_AND {
        return set_flags_full(
            Value::literal(
                Literal::new(first.unsigned_int() & second.unsigned_int()),
                result_type,
            ),
            false,
            false,
        );
    }
    if code == OP_OR {
        return set_flags_full(
            Value::literal(
                Literal::new(first.unsigned_int() | second.unsigned_int()),
                result_type,
            ),
            false,
            false,
        );
    }
    if code == OP_XOR {
        return set_flags_full(
            Value::literal(
                Literal::new(first.unsigned_int() ^ second.unsigned_int()),
                result_type,
            ),
            false,
            false,
        );
    }
    if code == OP_NOT {
        return set_flags_carry(
            Value::literal(Literal::new(!first.unsigned_int()), result_type),
            false,
        );
    }
    if code == OP_ASR {
        let shift = second.unsigned_int() & 31;
        let shifted_out = first.unsigned_int() & ((1u32 << shift) - 1);
        return set_flags_full(
            Value::literal(
                Literal::from_signed(first.signed_int() >> shift),
                result_type,
            ),
            shifted_out != 0,
            false,
        );
    }
    if code == OP_SHR {
        let shift = second.unsigned_int() & 31;
        let shifted_out = first.unsigned_int() & ((1u32 << shift) - 1);
        return set_flags_carry(
            Value::literal(Literal::new(first.unsigned_int() >> shift), result_type),
            shifted_out != 0,
        );
    }
    if code == OP_SHL {
        let shift = second.unsigned_int() & 31;
        let extended = u64::from(first.unsigned_int()) << shift;
        return set_flags_carry(
            Value::literal(Literal::new(first.unsigned_int() << shift), result_type),
            extended > 0xFFFF_FFFF,
        );
    }
    if code == OP_ROR {
        return set_flags_carry(
            Value::literal(
                Literal::new(first.unsigned_int().rotate_right(second.unsigned_int() & 31)),
                result_type,
            ),
            false,
        );
    }
    if code == OP_CLZ {
        return set_flags_full(
            Value::literal(
                Literal::from_signed(first.unsigned_int().leading_zeros() as i32),
                result_type,
            ),
            false,
            false,
        );
    }
    if code == OP_MIN {
        return set_flags_full(
            Value::literal(
                Literal::from_signed(first.signed_int().min(second.signed_int())),
                result_type,
            ),
            first.signed_int() > second.signed_int(),
            false,
        );
    }
    if code == OP_MAX {
        return set_flags_full(
            Value::literal(
                Literal::from_signed(first.signed_int().max(second.signed_int())),
                result_type,
            ),
            first.signed_int() > second.signed_int(),
            false,
        );
    }
    if code == OP_MUL24 {
        let masked_a = first.unsigned_int() & 0xFF_FFFF;
        let masked_b = second.unsigned_int() & 0xFF_FFFF;
        let extended = u64::from(masked_a) * u64::from(masked_b);
        return set_flags_carry(
            Value::literal(Literal::new(masked_a.wrapping_mul(masked_b)), result_type),
            extended > 0xFFFF_FFFF,
        );
    }
    if code == OP_FADD {
        let sum = first.real() + second.real();
        return set_flags_carry(
            Value::literal(Literal::from_real(sum), result_type),
            sum > 0.0,
        );
    }
    if code == OP_FSUB {
        let diff = first.real() - second.real();
        return set_flags_carry(
            Value::literal(Literal::from_real(diff), result_type),
            diff > 0.0,
        );
    }
    if code == OP_FMUL {
        // The hardware does not document a carry for fmul; it stays
        // undefined and callers must not depend on it.
        return set_flags(Value::literal(
            Literal::from_real(first.real() * second.real()),
            result_type,
        ));
    }
    if code == OP_FMIN {
        if first.real().is_nan() {
            return set_flags_carry(
                Value::literal(second, result_type),
                min_max_carry(first, second, false),
            );
        }
        if second.real().is_nan() {
            return set_flags_carry(
                Value::literal(first, result_type),
                min_max_carry(first, second, false),
            );
        }
        return set_flags_full(
            Value::literal(
                Literal::from_real(float_min(first.real(), second.real())),
                result_type,
            ),
            first.real() > second.real(),
            false,
        );
    }
    if code == OP_FMAX {
        if first.real().is_nan() {
            return set_flags_carry(
                Value::literal(first, result_type),
                min_max_carry(first, second, false),
            );
        }
        if second.real().is_nan() {
            return set_flags_carry(
                Value::literal(second, result_type),
                min_max_carry(first, second, false),
            );
        }
        return set_flags_full(
            Value::literal(
                Literal::from_real(float_max(first.real(), second.real())),
                result_type,
            ),
            first.real() > second.real(),
            false,
        );
    }
    if code == OP_FMINABS {
        if first.real().is_nan() {
            return set_flags_carry(
                Value::literal(second, result_type),
                min_max_carry(first, second, true),
            );
        }
        if second.real().is_nan() {
            return set_flags_carry(
                Value::literal(first, result_type),
                min_max_carry(first, second, true),
            );
        }
        return set_flags_carry(
            Value::literal(
                Literal::from_real(float_min(first.real().abs(), second.real().abs())),
                result_type,
            ),
            first.real().abs() > second.real().abs(),
        );
    }
    if code == OP_FMAXABS {
        // NaN wins over infinity, so both NaN checks come first.
        if first.real().is_nan() {
            return set_flags_carry(
                Value::literal(first, result_type),
                min_max_carry(first, second, true),
            );
        }
        if second.real().is_nan() {
            return set_flags_carry(
                Value::literal(second, result_type),
                min_max_carry(first, second, true),
            );
        }
        if first.real().is_infinite() {
            return set_flags_carry(
                Value::literal(first, result_type),
                min_max_carry(first, second, true),
            );
        }
        if second.real().is_infinite() {
            return set_flags_carry(
                Value::literal(second, result_type),
                min_max_carry(first, second, true),
            );
        }
        return set_flags_carry(
            Value::literal(
                Literal::from_real(float_max(first.real().abs(), second.real().abs())),
                result_type,
            ),
            first.real().abs() > second.real().abs(),
        );
    }
    if code == OP_FTOI {
        let int_type = TYPE_INT32.to_vector_type(first_type.vector_width());
        let real = first.real();
        if real.is_nan() || real.is_infinite() || (real as i64).abs() > i64::from(i32::MAX) {
            return set_flags(Value::literal(Literal::new(0), int_type));
        }
        return set_flags_carry(
            Value::literal(Literal::from_signed(real as i32), int_type),
            false,
        );
    }
    if code == OP_ITOF {
        let float_type = TYPE_FLOAT.to_vector_type(first_type.vector_width());
        return set_flags_carry(
            Value::literal(Literal::from_real(first.signed_int() as f32), float_type),
            false,
        );
    }
    if code == OP_V8ADDS
        || code == OP_V8SUBS
        || code == OP_V8MIN
        || code == OP_V8MAX
        || code == OP_V8MULD
    {
        let mut result = 0u32;
        for byte in 0..4 {
            let a = (first.unsigned_int() >> (byte * 8)) & 0xFF;
            let b = (second.unsigned_int() >> (byte * 8)) & 0xFF;
            let out = if code == OP_V8ADDS {
                (a + b).min(255)
            } else if code == OP_V8SUBS {
                a.saturating_sub(b)
            } else if code == OP_V8MIN {
                a.min(b)
            } else if code == OP_V8MAX {
                a.max(b)
            } else {
                (a * b + 127) / 255
            };
            result |= (out & 0xFF) << (byte * 8);
        }
        return set_flags(Value::literal(Literal::new(result), result_type));
    }

    PrecalculatedValue::none()
}

// =============================================================================
// Evaluator
// =============================================================================

impl OpCode {
    /// Fold this operation over one or two operand values.
    ///
    /// Handles scalar literals, small immediates and containers; fans out
    /// per lane over non-uniform containers; propagates the undefined
    /// sentinel. Anything else (registers, locals, vector rotations,
    /// complex types) yields no value.
    pub fn evaluate(self, first: &Value, second: Option<&Value>) -> PrecalculatedValue {
        if self.num_operands > 1 && second.is_none() {
            return PrecalculatedValue::none();
        }
        let second = if self.num_operands > 1 { second } else { None };

        // Undefined operands stay undefined; the type is preserved when
        // the operation keeps the operands' type family.
        if self.num_operands == 1 && first.is_undefined() {
            return PrecalculatedValue::undefined(if self.accepts_float == self.returns_float {
                Value::undefined(first.ty)
            } else {
                UNDEFINED_VALUE
            });
        }
        if let Some(second) = second {
            if first.is_undefined() || second.is_undefined() {
                let preserves_type =
                    self.accepts_float == self.returns_float && first.ty == second.ty;
                return PrecalculatedValue::undefined(if preserves_type {
                    Value::undefined(first.ty)
                } else {
                    UNDEFINED_VALUE
                });
            }
        }

        // Vector rotations are not algebraically foldable.
        if first.check_immediate().is_some_and(|imm| imm.is_vector_rotation()) {
            return PrecalculatedValue::none();
        }
        if second
            .and_then(|value| value.check_immediate())
            .is_some_and(|imm| imm.is_vector_rotation())
        {
            return PrecalculatedValue::none();
        }

        // Only literals, constant immediates and containers fold.
        if !first.is_constant() {
            return PrecalculatedValue::none();
        }
        if second.is_some_and(|value| !value.is_constant()) {
            return PrecalculatedValue::none();
        }

        let first_container = first.check_container();
        let second_container = second.and_then(|value| value.check_container());

        // Result element type is the wider of the operand types.
        let mut result_type = first.ty;
        if let Some(second) = second {
            if second.ty.vector_width() > result_type.vector_width()
                || second.ty.contains_type(first.ty)
            {
                result_type = second.ty;
            }
        }

        // Non-uniform containers fan out per lane.
        let per_component = first_container
            .map(|container| container.elements.len() > 1 && !container.is_all_same())
            .unwrap_or(false)
            || second_container
                .map(|container| container.elements.len() > 1 && !container.is_all_same())
                .unwrap_or(false);
        if per_component {
            let lanes = first_container
                .map(|container| container.elements.len())
                .unwrap_or(1)
                .max(
                    second
                        .map(|_| {
                            second_container
                                .map(|container| container.elements.len())
                                .unwrap_or(1)
                        })
                        .unwrap_or(0),
                );
            let mut result = ContainerValue::with_capacity(lanes);
            let mut flags = VectorFlags::default();
            for lane in 0..lanes {
                let first_elem = match first_container {
                    Some(container) => match container.elements.get(lane) {
                        Some(elem) => elem.clone(),
                        None => return PrecalculatedValue::none(),
                    },
                    None => first.clone(),
                };
                let second_elem = match second {
                    Some(value) => Some(match second_container {
                        Some(container) => match container.elements.get(lane) {
                            Some(elem) => elem.clone(),
                            None => return PrecalculatedValue::none(),
                        },
                        None => value.clone(),
                    }),
                    None => None,
                };
                let lane_result = self.evaluate(&first_elem, second_elem.as_ref());
                let Some(lane_value) = lane_result.value else {
                    // One lane failed to fold, abort the whole vector.
                    return PrecalculatedValue::none();
                };
                result.elements.push(lane_value);
                flags.push(lane_result.flags.lane(0));
            }
            return PrecalculatedValue {
                value: Some(Value::container(result, result_type)),
                flags,
            };
        }

        // Scalar (or uniform-container) fold.
        let first_lit = match first.literal_value().or_else(|| {
            first_container.and_then(|container| container.elements.first()?.literal_value())
        }) {
            Some(lit) => lit,
            None => return PrecalculatedValue::none(),
        };
        let second_lit = match second {
            None => Literal::new(0),
            Some(value) => {
                match value.literal_value().or_else(|| {
                    second_container
                        .and_then(|container| container.elements.first()?.literal_value())
                }) {
                    Some(lit) => lit,
                    None => return PrecalculatedValue::none(),
                }
            }
        };
        calc_literal(self, first_lit, second_lit, result_type, first.ty)
    }
}

// =============================================================================
// Tests
// =============================================================================
