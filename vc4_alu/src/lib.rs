//! ALU semantics and expression algebra for the VideoCore IV backend.
//!
//! The crate answers three questions bit-exactly:
//! - Given an opcode and constant operands, what is the result and what
//!   flags does it set? ([`opcodes`], [`eval`], [`flags`])
//! - How do the pack/unpack hardware modifiers transform a value?
//!   ([`pack`], [`unpack`])
//! - Which algebraic simplifications are safe across instruction
//!   boundaries? ([`expression`])
//!
//! Everything here is a pure, stateless value transformation: no I/O,
//! no shared mutable state, callable concurrently from any thread.

pub mod conditions;
pub mod eval;
pub mod expression;
pub mod flags;
pub mod instruction;
pub mod opcodes;
pub mod pack;
pub mod unpack;

pub use conditions::{BranchCond, ConditionCode, SetFlag, Signaling};
pub use eval::PrecalculatedValue;
pub use expression::{Expression, ExpressionInputs};
pub use flags::{ElementFlags, FlagStatus, VectorFlags};
pub use instruction::{Decorations, Instruction, InstructionKind, LoadType};
pub use opcodes::OpCode;
pub use pack::Pack;
pub use unpack::Unpack;
