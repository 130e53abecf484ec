//! The instruction interface consumed from the IR layer.
//!
//! The algebra never walks the instruction stream itself; it only needs
//! the observable surface defined here: an explicit kind discriminant,
//! the side-effect and conditionality predicates, the operand accessor,
//! and the pack/unpack/decoration fields captured into expressions.

use std::fmt;

use vc4_core::{Literal, Register, SmallImmediate, Value, TYPE_INT32};

use crate::conditions::{ConditionCode, SetFlag, Signaling};
use crate::opcodes::OpCode;
use crate::pack::Pack;
use crate::unpack::Unpack;

// =============================================================================
// Decorations
// =============================================================================

bitflags::bitflags! {
    /// Semantic hints attached to an instruction.
    ///
    /// Decorations survive algebraic simplification by union: a derived
    /// expression carries the hints of everything it was folded from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Decorations: u32 {
        /// The result may be computed via a reciprocal approximation.
        const ALLOW_RECIP = 1 << 0;
        /// Relaxed float semantics are acceptable.
        const FAST_MATH = 1 << 1;
        /// The operation is known not to overflow.
        const NO_CALC_OVERFLOW = 1 << 2;
        /// The result is known to be non-negative.
        const UNSIGNED_RESULT = 1 << 3;
        /// The result of a saturating conversion.
        const SATURATED_CONVERSION = 1 << 4;
        /// The instruction implements an SSA phi.
        const PHI_NODE = 1 << 5;
        /// All lanes are known to hold the same value.
        const IDENTICAL_ELEMENTS = 1 << 6;
        /// The value is uniform across the work-group.
        const WORK_GROUP_UNIFORM = 1 << 7;
        /// Generated by the auto-vectorizer.
        const AUTO_VECTORIZED = 1 << 8;
    }
}

// =============================================================================
// Load Types
// =============================================================================

/// The payload interpretation of a load-immediate instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LoadType {
    /// One 32-bit value replicated across all lanes.
    ReplicateInt32 = 0,
    /// Two signed bits per lane.
    PerElementSigned = 1,
    /// Two unsigned bits per lane.
    PerElementUnsigned = 2,
}

// =============================================================================
// Instruction Kind
// =============================================================================

/// The discriminated kind of an IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    /// An ALU operation with one or two arguments.
    Operation {
        /// The opcode executed.
        op: OpCode,
        /// First argument.
        first: Value,
        /// Second argument, for binary opcodes.
        second: Option<Value>,
    },
    /// A pure copy.
    Move {
        /// The copied value.
        source: Value,
    },
    /// A full-vector rotation of the source by an immediate offset.
    VectorRotation {
        /// The rotated value.
        source: Value,
        /// The rotation selector (by r5 or a fixed offset).
        offset: SmallImmediate,
    },
    /// A load of an immediate constant.
    LoadImmediate {
        /// How the 32-bit payload maps onto the lanes.
        load_type: LoadType,
        /// The raw payload.
        value: Literal,
    },
}

// =============================================================================
// Instruction
// =============================================================================

/// One IR instruction, as observed by the algebra.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The kind discriminant with the kind-specific payload.
    pub kind: InstructionKind,
    /// Where the result goes: a local or a hardware register.
    pub output: Option<Value>,
    /// Per-lane write condition.
    pub condition: ConditionCode,
    /// Whether the flags are updated.
    pub set_flags: SetFlag,
    /// The signal issued alongside the operation.
    pub signal: Signaling,
    /// Register-read unpack mode.
    pub unpack: Unpack,
    /// Register-write pack mode.
    pub pack: Pack,
    /// Semantic hints.
    pub decoration: Decorations,
}

impl Instruction {
    /// Create an unconditional, unsignalled instruction of the given kind.
    pub fn new(kind: InstructionKind) -> Self {
        Self {
            kind,
            output: None,
            condition: ConditionCode::Always,
            set_flags: SetFlag::DontSet,
            signal: Signaling::None,
            unpack: Unpack::Nop,
            pack: Pack::Nop,
            decoration: Decorations::empty(),
        }
    }

    /// Create a binary ALU operation.
    pub fn operation(op: OpCode, first: Value, second: Value) -> Self {
        Self::new(InstructionKind::Operation {
            op,
            first,
            second: Some(second),
        })
    }

    /// Create a unary ALU operation.
    pub fn unary_operation(op: OpCode, first: Value) -> Self {
        Self::new(InstructionKind::Operation {
            op,
            first,
            second: None,
        })
    }

    /// Create a pure copy.
    pub fn move_of(source: Value) -> Self {
        Self::new(InstructionKind::Move { source })
    }

    /// Create a replicated 32-bit load-immediate.
    pub fn load_replicated(value: Literal) -> Self {
        Self::new(InstructionKind::LoadImmediate {
            load_type: LoadType::ReplicateInt32,
            value,
        })
    }

    /// Check whether executing this instruction does anything beyond
    /// writing its result: signals, flag updates, or a hardware register
    /// write (registers at this level are the special I/O ones).
    pub fn has_side_effects(&self) -> bool {
        if self.signal.has_side_effects() {
            return true;
        }
        if self.set_flags == SetFlag::SetFlags {
            return true;
        }
        self.output
            .as_ref()
            .is_some_and(|value| value.check_register().is_some())
    }

    /// Check whether the write is predicated on a condition code.
    pub fn has_conditional_execution(&self) -> bool {
        self.condition != ConditionCode::Always
    }

    /// Check whether any argument reads the given hardware register.
    pub fn reads_register(&self, register: Register) -> bool {
        let reads = |value: &Value| value.check_register() == Some(register);
        match &self.kind {
            InstructionKind::Operation { first, second, .. } => {
                reads(first) || second.as_ref().is_some_and(reads)
            }
            InstructionKind::Move { source } | InstructionKind::VectorRotation { source, .. } => {
                reads(source)
            }
            InstructionKind::LoadImmediate { .. } => false,
        }
    }

    /// The `index`-th argument, if the kind has one.
    pub fn argument(&self, index: usize) -> Option<Value> {
        match &self.kind {
            InstructionKind::Operation { first, second, .. } => match index {
                0 => Some(first.clone()),
                1 => second.clone(),
                _ => None,
            },
            InstructionKind::Move { source } => (index == 0).then(|| source.clone()),
            InstructionKind::VectorRotation { source, offset } => match index {
                0 => Some(source.clone()),
                1 => Some(Value::immediate(*offset, TYPE_INT32)),
                _ => None,
            },
            InstructionKind::LoadImmediate { value, .. } => {
                (index == 0).then(|| Value::literal(*value, TYPE_INT32))
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            InstructionKind::Operation { op, first, second } => {
                write!(f, "{} {}", op, first)?;
                if let Some(second) = second {
                    write!(f, ", {}", second)?;
                }
                Ok(())
            }
            InstructionKind::Move { source } => write!(f, "mov {}", source),
            InstructionKind::VectorRotation { source, offset } => {
                write!(f, "rot {}, {}", source, offset)
            }
            InstructionKind::LoadImmediate { value, .. } => write!(f, "ldi {}", value),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
