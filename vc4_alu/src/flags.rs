//! The per-lane flag model.
//!
//! Every ALU operation produces zero / negative / carry / overflow per
//! lane. A flag the operation does not define stays [`FlagStatus::Undefined`],
//! which is a first-class state: conditions evaluated against an undefined
//! flag are a compilation fault, not `false`.

use std::fmt;

use smallvec::SmallVec;
use vc4_core::{CompilationError, CompilationResult, CompilationStep, Value};

use crate::conditions::ConditionCode;

// =============================================================================
// Flag Status
// =============================================================================

/// Tri-state of a single hardware flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FlagStatus {
    /// The flag is known to be clear.
    Clear = 0,
    /// The flag is known to be set.
    Set = 1,
    /// The operation leaves the flag undefined.
    #[default]
    Undefined = 2,
}

impl FlagStatus {
    /// Convert a known boolean state.
    #[inline]
    pub const fn from_bool(set: bool) -> Self {
        if set {
            FlagStatus::Set
        } else {
            FlagStatus::Clear
        }
    }
}

// =============================================================================
// Element Flags
// =============================================================================

/// The four flags of a single SIMD lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ElementFlags {
    /// All result bits are zero.
    pub zero: FlagStatus,
    /// The result's most significant bit is set.
    pub negative: FlagStatus,
    /// The operation exceeded the unsigned range.
    pub carry: FlagStatus,
    /// The operation exceeded the signed range.
    pub overflow: FlagStatus,
}

impl ElementFlags {
    /// Derive zero and negative from a result value.
    ///
    /// For signed, unsigned and float alike, zero is all-bits-clear and
    /// negative is the most significant bit. Carry and overflow stay
    /// undefined unless the operation defines them.
    pub fn from_value(value: &Value) -> Self {
        let mut flags = ElementFlags::default();
        if let Some(lit) = value.literal_value() {
            flags.zero = FlagStatus::from_bool(lit.unsigned_int() == 0);
            flags.negative = FlagStatus::from_bool(lit.signed_int() < 0);
        }
        flags
    }

    /// Evaluate a condition code against this lane's flags.
    ///
    /// Reading an undefined flag is a compilation fault.
    pub fn matches_condition(&self, cond: ConditionCode) -> CompilationResult<bool> {
        let check = |flag: FlagStatus, wanted: FlagStatus, message| match flag {
            FlagStatus::Undefined => Err(CompilationError::new(
                CompilationStep::General,
                message,
                cond.to_string(),
            )),
            known => Ok(known == wanted),
        };
        match cond {
            ConditionCode::Always => Ok(true),
            ConditionCode::Never => Ok(false),
            ConditionCode::ZeroSet => check(self.zero, FlagStatus::Set, "Reading undefined zero flags"),
            ConditionCode::ZeroClear => {
                check(self.zero, FlagStatus::Clear, "Reading undefined zero flags")
            }
            ConditionCode::NegativeSet => check(
                self.negative,
                FlagStatus::Set,
                "Reading undefined negative flags",
            ),
            ConditionCode::NegativeClear => check(
                self.negative,
                FlagStatus::Clear,
                "Reading undefined negative flags",
            ),
            ConditionCode::CarrySet => {
                check(self.carry, FlagStatus::Set, "Reading undefined carry flags")
            }
            ConditionCode::CarryClear => {
                check(self.carry, FlagStatus::Clear, "Reading undefined carry flags")
            }
        }
    }
}

impl fmt::Display for ElementFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |flag: FlagStatus, letter: char| match flag {
            FlagStatus::Clear => '-',
            FlagStatus::Set => letter,
            FlagStatus::Undefined => '?',
        };
        write!(
            f,
            "{}{}{}",
            render(self.zero, 'z'),
            render(self.negative, 'n'),
            render(self.carry, 'c')
        )
    }
}

// =============================================================================
// Vector Flags
// =============================================================================

/// The flags of 1..=16 SIMD lanes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VectorFlags {
    lanes: SmallVec<[ElementFlags; 16]>,
}

impl VectorFlags {
    /// Flags for a single scalar lane.
    pub fn scalar(flags: ElementFlags) -> Self {
        let mut lanes = SmallVec::new();
        lanes.push(flags);
        Self { lanes }
    }

    /// Flags with the given lane count, all undefined.
    pub fn undefined(lane_count: usize) -> Self {
        Self {
            lanes: SmallVec::from_elem(ElementFlags::default(), lane_count.max(1)),
        }
    }

    /// Derive flags from a result value.
    pub fn from_value(value: &Value) -> Self {
        if value.literal_value().is_some() {
            return Self::scalar(ElementFlags::from_value(value));
        }
        if let Some(container) = value.check_container() {
            let lanes = container.elements.iter().map(ElementFlags::from_value).collect();
            return Self { lanes };
        }
        Self::default()
    }

    /// Number of lanes with recorded flags.
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// The flags of the given lane.
    ///
    /// Scalars track a single lane; lanes beyond the recorded count
    /// report all-undefined, matching reads of flags never written.
    pub fn lane(&self, index: usize) -> ElementFlags {
        self.lanes.get(index).copied().unwrap_or_default()
    }

    /// Append one lane's flags.
    pub fn push(&mut self, flags: ElementFlags) {
        self.lanes.push(flags);
    }

    /// Iterate over the recorded lanes.
    pub fn iter(&self) -> impl Iterator<Item = &ElementFlags> {
        self.lanes.iter()
    }
}

impl From<ElementFlags> for VectorFlags {
    fn from(flags: ElementFlags) -> Self {
        Self::scalar(flags)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vc4_core::value::{INT_ZERO, UNDEFINED_VALUE};
    use vc4_core::{Literal, Value, TYPE_INT32};

    // =========================================================================
    // Element Flags Tests
    // =========================================================================

    #[test]
    fn test_flags_from_zero() {
        let flags = ElementFlags::from_value(&INT_ZERO);
        assert_eq!(flags.zero, FlagStatus::Set);
        assert_eq!(flags.negative, FlagStatus::Clear);
        assert_eq!(flags.carry, FlagStatus::Undefined);
        assert_eq!(flags.overflow, FlagStatus::Undefined);
    }

    #[test]
    fn test_flags_from_negative() {
        let value = Value::literal(Literal::from_signed(-5), TYPE_INT32);
        let flags = ElementFlags::from_value(&value);
        assert_eq!(flags.zero, FlagStatus::Clear);
        assert_eq!(flags.negative, FlagStatus::Set);
    }

    #[test]
    fn test_flags_from_non_literal_stay_undefined() {
        let flags = ElementFlags::from_value(&UNDEFINED_VALUE);
        assert_eq!(flags.zero, FlagStatus::Undefined);
        assert_eq!(flags.negative, FlagStatus::Undefined);
    }

    #[test]
    fn test_matches_condition() {
        let flags = ElementFlags {
            zero: FlagStatus::Set,
            negative: FlagStatus::Clear,
            carry: FlagStatus::Set,
            overflow: FlagStatus::Undefined,
        };
        assert!(flags.matches_condition(ConditionCode::Always).unwrap());
        assert!(!flags.matches_condition(ConditionCode::Never).unwrap());
        assert!(flags.matches_condition(ConditionCode::ZeroSet).unwrap());
        assert!(!flags.matches_condition(ConditionCode::ZeroClear).unwrap());
        assert!(flags.matches_condition(ConditionCode::NegativeClear).unwrap());
        assert!(flags.matches_condition(ConditionCode::CarrySet).unwrap());
    }

    #[test]
    fn test_matches_condition_undefined_is_fault() {
        let flags = ElementFlags::default();
        assert!(flags.matches_condition(ConditionCode::ZeroSet).is_err());
        assert!(flags.matches_condition(ConditionCode::CarryClear).is_err());
        // ALWAYS and NEVER never read a flag.
        assert!(flags.matches_condition(ConditionCode::Always).is_ok());
        assert!(flags.matches_condition(ConditionCode::Never).is_ok());
    }

    #[test]
    fn test_flag_rendering() {
        let flags = ElementFlags {
            zero: FlagStatus::Set,
            negative: FlagStatus::Clear,
            carry: FlagStatus::Undefined,
            overflow: FlagStatus::Undefined,
        };
        assert_eq!(flags.to_string(), "z-?");
    }

    // =========================================================================
    // Vector Flags Tests
    // =========================================================================

    #[test]
    fn test_vector_flags_scalar_lane() {
        let flags = VectorFlags::from_value(&INT_ZERO);
        assert_eq!(flags.lane_count(), 1);
        assert_eq!(flags.lane(0).zero, FlagStatus::Set);
        // Lanes never written read as undefined.
        assert_eq!(flags.lane(7).zero, FlagStatus::Undefined);
    }

    #[test]
    fn test_vector_flags_per_lane() {
        use vc4_core::ContainerValue;
        let container = Value::container(
            ContainerValue {
                elements: vec![
                    INT_ZERO,
                    Value::literal(Literal::from_signed(-1), TYPE_INT32),
                ],
            },
            TYPE_INT32.to_vector_type(2),
        );
        let flags = VectorFlags::from_value(&container);
        assert_eq!(flags.lane_count(), 2);
        assert_eq!(flags.lane(0).zero, FlagStatus::Set);
        assert_eq!(flags.lane(1).negative, FlagStatus::Set);
    }
}
