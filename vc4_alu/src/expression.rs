//! Normalized ALU expressions and their composition algebra.
//!
//! An [`Expression`] is the side-effect-free view of one ALU instruction:
//! `(code, arg0, arg1?, unpack, pack, decorations)`. Expressions compose
//! across instruction boundaries through a substitution map from locals
//! to the expressions that produced them; [`Expression::combine_with`]
//! applies the safe algebraic rewrites (identity elimination, absorbing
//! elements, idempotence collapsing, fused multiply-add folding).
//!
//! A pure copy is canonicalized as `v8min(x, x)`, the cheapest idempotent
//! form both ALUs can execute.

use std::fmt;
use std::hash::{Hash, Hasher};

use vc4_core::value::{REG_REPLICATE_ALL, REG_REPLICATE_QUAD};
use vc4_core::{FastMap, Literal, LocalId, Value, TYPE_FLOAT};

use crate::instruction::{Decorations, Instruction, InstructionKind, LoadType};
use crate::opcodes::{OpCode, OP_FADD, OP_FMUL, OP_NOT, OP_OR, OP_V8MAX, OP_V8MIN};
use crate::pack::Pack;
use crate::unpack::Unpack;

/// Substitution map: which expression produced each local.
pub type ExpressionInputs = FastMap<LocalId, Expression>;

// =============================================================================
// Expression
// =============================================================================

/// The algebraic view of one side-effect-free ALU instruction.
#[derive(Debug, Clone)]
pub struct Expression {
    /// The operation.
    pub code: OpCode,
    /// First argument.
    pub arg0: Value,
    /// Second argument, for binary opcodes.
    pub arg1: Option<Value>,
    /// Captured unpack mode, preserved bit-exact.
    pub unpack: Unpack,
    /// Captured pack mode, preserved bit-exact.
    pub pack: Pack,
    /// Captured semantic hints.
    pub deco: Decorations,
}

impl Expression {
    /// The canonical copy expression `v8min(x, x)`.
    pub fn move_of(value: Value, deco: Decorations) -> Self {
        Self {
            code: OP_V8MIN,
            arg0: value.clone(),
            arg1: Some(value),
            unpack: Unpack::Nop,
            pack: Pack::Nop,
            deco,
        }
    }

    /// Extract the expression an instruction computes, if it is eligible.
    ///
    /// Eligible instructions have no side effects, are unconditional, do
    /// not read the replicate registers, are not vector rotations, and
    /// are either ALU operations, moves, or 32-bit-replicated immediate
    /// loads. Pack, unpack and decorations are captured verbatim.
    pub fn from_instruction(instr: &Instruction) -> Option<Self> {
        if instr.has_side_effects() {
            return None;
        }
        if instr.has_conditional_execution() {
            return None;
        }
        // Not a side effect, but a replicate read cannot be recombined
        // with any other expression.
        if instr.reads_register(REG_REPLICATE_ALL) || instr.reads_register(REG_REPLICATE_QUAD) {
            return None;
        }
        let (code, arg0, arg1) = match &instr.kind {
            InstructionKind::VectorRotation { .. } => return None,
            InstructionKind::Operation { op, first, second } => {
                let arg1 = match second {
                    Some(second) => Some(second.clone()),
                    None if *op == OP_V8MIN => Some(first.clone()),
                    None => None,
                };
                (*op, first.clone(), arg1)
            }
            InstructionKind::Move { source } => (OP_V8MIN, source.clone(), Some(source.clone())),
            InstructionKind::LoadImmediate { load_type, value } => {
                if *load_type != LoadType::ReplicateInt32 {
                    // Masked per-element loads have no scalar expression.
                    return None;
                }
                let loaded = Value::literal(*value, vc4_core::TYPE_INT32);
                (OP_V8MIN, loaded.clone(), Some(loaded))
            }
        };
        Some(Self {
            code,
            arg0,
            arg1,
            unpack: instr.unpack,
            pack: instr.pack,
            deco: instr.decoration,
        })
    }

    /// Check whether this expression is a pure copy.
    pub fn is_move_expression(&self) -> bool {
        (self.code == OP_OR || self.code == OP_V8MAX || self.code == OP_V8MIN)
            && self.arg1.as_ref() == Some(&self.arg0)
    }

    /// Fold this expression to a constant, if the operands allow it.
    pub fn constant_expression(&self) -> Option<Value> {
        self.code.evaluate(&self.arg0, self.arg1.as_ref()).value
    }

    /// Check whether at least one argument is a foldable constant.
    pub fn has_constant_operand(&self) -> bool {
        self.arg0.is_constant() || self.arg1.as_ref().is_some_and(Value::is_constant)
    }

    /// Compose this expression with the expressions producing its inputs.
    ///
    /// Applies the safe rewrites and returns the simplified expression,
    /// or a clone of `self` when nothing applies. Expressions carrying an
    /// effective pack or unpack mode never compose: the modifiers do not
    /// commute across instruction boundaries.
    pub fn combine_with(&self, inputs: &ExpressionInputs) -> Expression {
        let expr0 = self
            .arg0
            .check_local()
            .and_then(|local| inputs.get(&local.id));
        let expr1 = self
            .arg1
            .as_ref()
            .and_then(|arg| arg.check_local())
            .and_then(|local| inputs.get(&local.id));
        if expr0.is_none() && expr1.is_none() {
            // No input is known, nothing to combine.
            return self.clone();
        }

        let has_modifier =
            |expr: &Expression| expr.unpack.has_effect() || expr.pack.has_effect();
        if has_modifier(self)
            || expr0.is_some_and(has_modifier)
            || expr1.is_some_and(has_modifier)
        {
            return self.clone();
        }

        if self.code.num_operands == 1 {
            if let Some(expr0) = expr0 {
                if self.code.is_idempotent() && expr0.code == self.code {
                    // f(f(a)) = f(a)
                    return Expression {
                        code: self.code,
                        arg0: expr0.arg0.clone(),
                        arg1: None,
                        unpack: Unpack::Nop,
                        pack: Pack::Nop,
                        deco: self.deco | expr0.deco,
                    };
                }
                // ftoi(itof(i)) != i and itof(ftoi(f)) != f, the rounding
                // would get lost; only complement cancels.
                if self.code == OP_NOT && expr0.code == OP_NOT {
                    // not(not(a)) = a
                    return Expression::move_of(expr0.arg0.clone(), self.deco | expr0.deco);
                }
            }
        }

        if self.code.num_operands == 2 {
            let arg1 = self.arg1.as_ref();

            // The identity checks accept either the operand itself or the
            // constant its substituted expression folds to.
            let first_const = if self.arg0.is_constant() {
                Some(self.arg0.clone())
            } else {
                expr0.and_then(Expression::constant_expression)
            };
            let second_const = match arg1 {
                Some(arg) if arg.is_constant() => Some(arg.clone()),
                _ => expr1.and_then(Expression::constant_expression),
            };
            let matches = |element: Option<Value>, operand: Option<&Value>, folded: &Option<Value>| {
                element.is_some() && (operand == element.as_ref() || *folded == element)
            };

            if self.code.is_idempotent() && arg1 == Some(&self.arg0) {
                // f(a, a) = a
                return Expression::move_of(self.arg0.clone(), self.deco);
            }
            if matches(self.code.left_identity(), Some(&self.arg0), &first_const) {
                // f(id, a) = a
                if let Some(arg1) = arg1 {
                    return Expression::move_of(arg1.clone(), self.deco);
                }
            }
            if matches(self.code.right_identity(), arg1, &second_const) {
                // f(a, id) = a
                return Expression::move_of(self.arg0.clone(), self.deco);
            }
            if matches(
                self.code.left_absorbing_element(),
                Some(&self.arg0),
                &first_const,
            ) {
                // f(absorb, a) = absorb
                return Expression::move_of(self.arg0.clone(), self.deco);
            }
            if matches(self.code.right_absorbing_element(), arg1, &second_const) {
                // f(a, absorb) = absorb
                if let Some(arg1) = arg1 {
                    return Expression::move_of(arg1.clone(), self.deco);
                }
            }

            if self.code == OP_FADD && arg1 == Some(&self.arg0) {
                // fadd(a, a) = fmul(a, 2): no instruction saved, but the
                // mul ALU frees the add slot.
                return Expression {
                    code: OP_FMUL,
                    arg0: self.arg0.clone(),
                    arg1: Some(Value::literal(Literal::from_real(2.0), TYPE_FLOAT)),
                    unpack: Unpack::Nop,
                    pack: Pack::Nop,
                    deco: self.deco,
                };
            }

            if self.code == OP_FADD {
                if let Some(folded) = expr0
                    .filter(|expr| expr.code == OP_FMUL)
                    .and_then(|expr| fuse_fadd_fmul(self, expr, arg1))
                {
                    return folded;
                }
                if let Some(folded) = expr1
                    .filter(|expr| expr.code == OP_FMUL)
                    .and_then(|expr| fuse_fadd_fmul(self, expr, Some(&self.arg0)))
                {
                    return folded;
                }
            }
        }

        self.clone()
    }
}

/// Fold `fadd(fmul(a, k), a)` into `fmul(a, k + 1)`.
///
/// `shared` is the fadd operand that must recur inside the fmul; the
/// constant factor may sit on either side of the multiplication.
fn fuse_fadd_fmul(
    outer: &Expression,
    fmul: &Expression,
    shared: Option<&Value>,
) -> Option<Expression> {
    let shared = shared?;
    let factor = if &fmul.arg0 == shared {
        fmul.arg1.as_ref()?.literal_value()?
    } else if fmul.arg1.as_ref() == Some(shared) {
        fmul.arg0.literal_value()?
    } else {
        return None;
    };
    Some(Expression {
        code: OP_FMUL,
        arg0: shared.clone(),
        arg1: Some(Value::literal(
            Literal::from_real(factor.real() + 1.0),
            TYPE_FLOAT,
        )),
        unpack: Unpack::Nop,
        pack: Pack::Nop,
        deco: outer.deco | fmul.deco,
    })
}

// =============================================================================
// Equality and Hashing
// =============================================================================

impl PartialEq for Expression {
    /// Structural equality, with `(arg0, arg1)` treated as an unordered
    /// pair for commutative opcodes.
    fn eq(&self, other: &Self) -> bool {
        if self.code != other.code
            || self.unpack != other.unpack
            || self.pack != other.pack
            || self.deco != other.deco
        {
            return false;
        }
        if self.arg0 == other.arg0 && self.arg1 == other.arg1 {
            return true;
        }
        self.code.is_commutative()
            && Some(&self.arg0) == other.arg1.as_ref()
            && self.arg1.as_ref() == Some(&other.arg0)
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    /// Hashes the arguments in their stored order: two equal commutative
    /// expressions may hash differently, so lookups must probe both
    /// argument orderings.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.name.hash(state);
        self.arg0.hash(state);
        self.arg1.hash(state);
        self.unpack.bits().hash(state);
        self.pack.bits().hash(state);
        self.deco.bits().hash(state);
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.arg0)?;
        if let Some(arg1) = &self.arg1 {
            write!(f, ", {}", arg1)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
