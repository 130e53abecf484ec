//! Condition codes, branch conditions, flag-setting and signals.
//!
//! The VideoCore IV predicates every ALU write on one of eight condition
//! codes evaluated against the per-lane flags. Branches instead quantify
//! a flag over all sixteen lanes (any / all).

use std::fmt;

use vc4_core::{CompilationError, CompilationResult, CompilationStep};

// =============================================================================
// Condition Codes
// =============================================================================

/// Per-lane write condition, in the hardware encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConditionCode {
    /// Never write.
    Never = 0,
    /// Always write.
    Always = 1,
    /// Write if the zero flag is set.
    ZeroSet = 2,
    /// Write if the zero flag is clear.
    ZeroClear = 3,
    /// Write if the negative flag is set.
    NegativeSet = 4,
    /// Write if the negative flag is clear.
    NegativeClear = 5,
    /// Write if the carry flag is set.
    CarrySet = 6,
    /// Write if the carry flag is clear.
    CarryClear = 7,
}

impl ConditionCode {
    /// The condition accepting exactly the complementary lane states.
    pub const fn invert(self) -> Self {
        match self {
            ConditionCode::Never => ConditionCode::Always,
            ConditionCode::Always => ConditionCode::Never,
            ConditionCode::ZeroSet => ConditionCode::ZeroClear,
            ConditionCode::ZeroClear => ConditionCode::ZeroSet,
            ConditionCode::NegativeSet => ConditionCode::NegativeClear,
            ConditionCode::NegativeClear => ConditionCode::NegativeSet,
            ConditionCode::CarrySet => ConditionCode::CarryClear,
            ConditionCode::CarryClear => ConditionCode::CarrySet,
        }
    }

    /// Check whether `other` is this condition's inversion.
    pub const fn is_inversion_of(self, other: ConditionCode) -> bool {
        other as u8 == self.invert() as u8
    }

    /// The branch condition quantifying this code over the vector.
    ///
    /// Set conditions quantify existentially (any lane), clear conditions
    /// universally (all lanes). NEVER has no branch form.
    pub fn to_branch_condition(self) -> CompilationResult<BranchCond> {
        match self {
            ConditionCode::Always => Ok(BranchCond::Always),
            ConditionCode::ZeroSet => Ok(BranchCond::AnyZSet),
            ConditionCode::ZeroClear => Ok(BranchCond::AllZClear),
            ConditionCode::NegativeSet => Ok(BranchCond::AnyNSet),
            ConditionCode::NegativeClear => Ok(BranchCond::AllNClear),
            ConditionCode::CarrySet => Ok(BranchCond::AnyCSet),
            ConditionCode::CarryClear => Ok(BranchCond::AllCClear),
            ConditionCode::Never => Err(CompilationError::new(
                CompilationStep::CodeGeneration,
                "Invalid condition for branch",
                self.to_string(),
            )),
        }
    }
}

impl fmt::Display for ConditionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConditionCode::Always => "",
            ConditionCode::Never => "never",
            ConditionCode::ZeroSet => "ifz",
            ConditionCode::ZeroClear => "ifzc",
            ConditionCode::NegativeSet => "ifn",
            ConditionCode::NegativeClear => "ifnc",
            ConditionCode::CarrySet => "ifc",
            ConditionCode::CarryClear => "ifcc",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Branch Conditions
// =============================================================================

/// Condition of a branch instruction, quantified over all lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BranchCond {
    /// All lanes have the zero flag set.
    AllZSet = 0,
    /// All lanes have the zero flag clear.
    AllZClear = 1,
    /// Some lane has the zero flag set.
    AnyZSet = 2,
    /// Some lane has the zero flag clear.
    AnyZClear = 3,
    /// All lanes have the negative flag set.
    AllNSet = 4,
    /// All lanes have the negative flag clear.
    AllNClear = 5,
    /// Some lane has the negative flag set.
    AnyNSet = 6,
    /// Some lane has the negative flag clear.
    AnyNClear = 7,
    /// All lanes have the carry flag set.
    AllCSet = 8,
    /// All lanes have the carry flag clear.
    AllCClear = 9,
    /// Some lane has the carry flag set.
    AnyCSet = 10,
    /// Some lane has the carry flag clear.
    AnyCClear = 11,
    /// Branch unconditionally.
    Always = 15,
}

impl fmt::Display for BranchCond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BranchCond::AllZSet => "ifallz",
            BranchCond::AllZClear => "ifallzc",
            BranchCond::AnyZSet => "ifanyz",
            BranchCond::AnyZClear => "ifanyzc",
            BranchCond::AllNSet => "ifalln",
            BranchCond::AllNClear => "ifallnc",
            BranchCond::AnyNSet => "ifanyn",
            BranchCond::AnyNClear => "ifanync",
            BranchCond::AllCSet => "ifallc",
            BranchCond::AllCClear => "ifallcc",
            BranchCond::AnyCSet => "ifanyc",
            BranchCond::AnyCClear => "ifanycc",
            BranchCond::Always => "",
        };
        write!(f, "{}", name)
    }
}

// =============================================================================
// Flag Setting
// =============================================================================

/// Whether an instruction updates the flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SetFlag {
    /// Leave the flags untouched.
    #[default]
    DontSet = 0,
    /// Update the flags from this instruction's result.
    SetFlags = 1,
}

impl fmt::Display for SetFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetFlag::DontSet => write!(f, ""),
            SetFlag::SetFlags => write!(f, "setf"),
        }
    }
}

// =============================================================================
// Signals
// =============================================================================

/// The signal field of an ALU instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Signaling {
    /// Software breakpoint.
    SoftBreak = 0,
    /// No signal.
    #[default]
    None = 1,
    /// Last thread switch.
    ThreadSwitchLast = 2,
    /// End of program.
    EndProgram = 3,
    /// Wait for scoreboard.
    WaitForScore = 4,
    /// Unlock scoreboard.
    UnlockScore = 5,
    /// Switch threads.
    SwitchThread = 6,
    /// Coverage load into r4.
    LoadCoverage = 7,
    /// Color load into r4.
    LoadColor = 8,
    /// Color load into r4 and end program.
    LoadColorEnd = 9,
    /// Alpha-mask load into r4.
    LoadAlpha = 10,
    /// TMU0 read into r4.
    LoadTmu0 = 11,
    /// TMU1 read into r4.
    LoadTmu1 = 12,
    /// The instruction is a branch.
    Branch = 13,
    /// The instruction word carries an immediate.
    AluImmediate = 14,
    /// The instruction word is a load-immediate.
    LoadImmediate = 15,
}

impl Signaling {
    /// Check whether this signal has effects beyond the plain ALU write.
    pub const fn has_side_effects(self) -> bool {
        !matches!(
            self,
            Signaling::None | Signaling::AluImmediate | Signaling::LoadImmediate
        )
    }

    /// Check whether this signal initiates a read of r4.
    pub const fn triggers_read_of_r4(self) -> bool {
        matches!(
            self,
            Signaling::LoadAlpha
                | Signaling::LoadColor
                | Signaling::LoadColorEnd
                | Signaling::LoadCoverage
                | Signaling::LoadTmu0
                | Signaling::LoadTmu1
        )
    }
}

impl fmt::Display for Signaling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signaling::SoftBreak => "bkpt",
            Signaling::None => "",
            Signaling::ThreadSwitchLast => "lthrsw",
            Signaling::EndProgram => "thrend",
            Signaling::WaitForScore => "scorew",
            Signaling::UnlockScore => "scoreu",
            Signaling::SwitchThread => "thrsw",
            Signaling::LoadCoverage => "loadcov",
            Signaling::LoadColor => "loadc",
            Signaling::LoadColorEnd => "loadc_end",
            Signaling::LoadAlpha => "loada",
            Signaling::LoadTmu0 => "load_tmu0",
            Signaling::LoadTmu1 => "load_tmu1",
            Signaling::Branch => "br",
            Signaling::AluImmediate => "imm",
            Signaling::LoadImmediate => "load_imm",
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

    const ALL_CONDITIONS: [ConditionCode; 8] = [
        ConditionCode::Never,
        ConditionCode::Always,
        ConditionCode::ZeroSet,
        ConditionCode::ZeroClear,
        ConditionCode::NegativeSet,
        ConditionCode::NegativeClear,
        ConditionCode::CarrySet,
        ConditionCode::CarryClear,
    ];

    #[test]
    fn test_invert_is_involution() {
        for cond in ALL_CONDITIONS {
            assert_eq!(cond.invert().invert(), cond);
            assert_ne!(cond.invert(), cond);
        }
    }

    #[test]
    fn test_is_inversion_of_is_symmetric() {
        for a in ALL_CONDITIONS {
            for b in ALL_CONDITIONS {
                assert_eq!(a.is_inversion_of(b), b.is_inversion_of(a));
            }
            assert!(a.is_inversion_of(a.invert()));
            assert!(!a.is_inversion_of(a));
        }
    }

    #[test]
    fn test_condition_rendering() {
        assert_eq!(ConditionCode::Always.to_string(), "");
        assert_eq!(ConditionCode::Never.to_string(), "never");
        assert_eq!(ConditionCode::ZeroSet.to_string(), "ifz");
        assert_eq!(ConditionCode::ZeroClear.to_string(), "ifzc");
        assert_eq!(ConditionCode::NegativeSet.to_string(), "ifn");
        assert_eq!(ConditionCode::CarryClear.to_string(), "ifcc");
    }

    #[test]
    fn test_branch_condition_mapping() {
        assert_eq!(
            ConditionCode::Always.to_branch_condition().unwrap(),
            BranchCond::Always
        );
        assert_eq!(
            ConditionCode::ZeroSet.to_branch_condition().unwrap(),
            BranchCond::AnyZSet
        );
        assert_eq!(
            ConditionCode::CarryClear.to_branch_condition().unwrap(),
            BranchCond::AllCClear
        );
        assert!(ConditionCode::Never.to_branch_condition().is_err());
    }

    #[test]
    fn test_branch_condition_rendering() {
        assert_eq!(BranchCond::Always.to_string(), "");
        assert_eq!(BranchCond::AnyCSet.to_string(), "ifanyc");
        assert_eq!(BranchCond::AllNClear.to_string(), "ifallnc");
    }

    #[test]
    fn test_set_flag_rendering() {
        assert_eq!(SetFlag::DontSet.to_string(), "");
        assert_eq!(SetFlag::SetFlags.to_string(), "setf");
    }

    #[test]
    fn test_signal_side_effects() {
        assert!(!Signaling::None.has_side_effects());
        assert!(!Signaling::AluImmediate.has_side_effects());
        assert!(!Signaling::LoadImmediate.has_side_effects());
        assert!(Signaling::EndProgram.has_side_effects());
        assert!(Signaling::LoadTmu0.has_side_effects());
    }

    #[test]
    fn test_signal_r4_reads() {
        assert!(Signaling::LoadTmu0.triggers_read_of_r4());
        assert!(Signaling::LoadAlpha.triggers_read_of_r4());
        assert!(!Signaling::EndProgram.triggers_read_of_r4());
        assert!(!Signaling::None.triggers_read_of_r4());
    }
}
