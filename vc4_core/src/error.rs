//! Structured compilation faults.
//!
//! Faults are deterministic and surfaced synchronously: unknown opcode
//! names, out-of-range selectors, unsupported pack/unpack encodings,
//! condition evaluation against undefined flags. Anything that merely
//! cannot be folded at compile time is *not* an error; the evaluator
//! signals that with an absent value instead.

use std::fmt;

// =============================================================================
// Compilation Stage
// =============================================================================

/// The backend stage a fault is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CompilationStep {
    /// No more specific stage applies.
    General = 0,
    /// Machine-code generation (opcode/condition/modifier encoding).
    CodeGeneration = 1,
}

impl fmt::Display for CompilationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompilationStep::General => write!(f, "general"),
            CompilationStep::CodeGeneration => write!(f, "code generation"),
        }
    }
}

// =============================================================================
// Compilation Error
// =============================================================================

/// A deterministic compilation fault.
///
/// Carries the stage it occurred in, a human-readable message, and the
/// offending token (an opcode name, an encoding value, a rendered value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationError {
    /// Stage the fault is attributed to.
    pub step: CompilationStep,
    /// Human-readable description.
    pub message: &'static str,
    /// The offending token, rendered.
    pub token: String,
}

impl CompilationError {
    /// Create a fault for the given stage.
    pub fn new(step: CompilationStep, message: &'static str, token: impl Into<String>) -> Self {
        Self {
            step,
            message,
            token: token.into(),
        }
    }
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.step, self.message, self.token)
    }
}

impl std::error::Error for CompilationError {}

/// Result type for fallible backend operations.
pub type CompilationResult<T> = Result<T, CompilationError>;

// =============================================================================
// Tests
// =============================================================================
