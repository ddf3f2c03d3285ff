//! Accreditation status state machine.
//!
//! ```text
//! PENDING   → CONFIRMED | EXPIRED | FAILED
//! CONFIRMED → EXPIRED | FAILED
//! EXPIRED   → CONFIRMED | FAILED
//! FAILED    → (none)
//! ```
//!
//! Any non-FAILED status may move to a different final status. FAILED is
//! absorbing and nothing ever moves back to PENDING. Requesting the status a
//! record already has is an idempotent no-op and is decided by the aggregate,
//! not by this table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Status of an accreditation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccreditationStatus {
    /// Submitted, awaiting an administrative decision.
    Pending,

    /// Approved. Auto-expires after the retention window.
    Confirmed,

    /// No longer valid; may be re-confirmed by an administrator.
    Expired,

    /// Rejected. Absorbing.
    Failed,
}

impl AccreditationStatus {
    pub const ALL: [AccreditationStatus; 4] = [
        AccreditationStatus::Pending,
        AccreditationStatus::Confirmed,
        AccreditationStatus::Expired,
        AccreditationStatus::Failed,
    ];

    /// Returns the stable storage / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccreditationStatus::Pending => "PENDING",
            AccreditationStatus::Confirmed => "CONFIRMED",
            AccreditationStatus::Expired => "EXPIRED",
            AccreditationStatus::Failed => "FAILED",
        }
    }
}

impl StateMachine for AccreditationStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use AccreditationStatus::*;
        *self != Failed && *target != Pending && self != target
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use AccreditationStatus::*;
        match self {
            Pending => vec![Confirmed, Expired, Failed],
            Confirmed => vec![Expired, Failed],
            Expired => vec![Confirmed, Failed],
            Failed => vec![],
        }
    }
}

impl fmt::Display for AccreditationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccreditationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AccreditationStatus::Pending),
            "CONFIRMED" => Ok(AccreditationStatus::Confirmed),
            "EXPIRED" => Ok(AccreditationStatus::Expired),
            "FAILED" => Ok(AccreditationStatus::Failed),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown accreditation status '{}'", other),
            )),
        }
    }
}

/// Outcome an administrator may request when finalizing.
///
/// PENDING is deliberately unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalStatus {
    Confirmed,
    Expired,
    Failed,
}

impl From<FinalStatus> for AccreditationStatus {
    fn from(status: FinalStatus) -> Self {
        match status {
            FinalStatus::Confirmed => AccreditationStatus::Confirmed,
            FinalStatus::Expired => AccreditationStatus::Expired,
            FinalStatus::Failed => AccreditationStatus::Failed,
        }
    }
}

impl TryFrom<AccreditationStatus> for FinalStatus {
    type Error = ValidationError;

    fn try_from(status: AccreditationStatus) -> Result<Self, Self::Error> {
        match status {
            AccreditationStatus::Confirmed => Ok(FinalStatus::Confirmed),
            AccreditationStatus::Expired => Ok(FinalStatus::Expired),
            AccreditationStatus::Failed => Ok(FinalStatus::Failed),
            AccreditationStatus::Pending => Err(ValidationError::invalid_format(
                "outcome",
                "PENDING is not a final status",
            )),
        }
    }
}

impl fmt::Display for FinalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        AccreditationStatus::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = AccreditationStatus> {
        prop::sample::select(AccreditationStatus::ALL.to_vec())
    }

    #[test]
    fn pending_can_be_finalized_to_any_final_status() {
        let status = AccreditationStatus::Pending;
        assert!(status.can_transition_to(&AccreditationStatus::Confirmed));
        assert!(status.can_transition_to(&AccreditationStatus::Expired));
        assert!(status.can_transition_to(&AccreditationStatus::Failed));
    }

    #[test]
    fn expired_can_be_reconfirmed() {
        let result = AccreditationStatus::Expired.transition_to(AccreditationStatus::Confirmed);
        assert_eq!(result, Ok(AccreditationStatus::Confirmed));
    }

    #[test]
    fn confirmed_can_fail() {
        assert!(AccreditationStatus::Confirmed.can_transition_to(&AccreditationStatus::Failed));
    }

    #[test]
    fn failed_is_the_only_terminal_status() {
        assert!(AccreditationStatus::Failed.is_terminal());
        assert!(!AccreditationStatus::Pending.is_terminal());
        assert!(!AccreditationStatus::Confirmed.is_terminal());
        assert!(!AccreditationStatus::Expired.is_terminal());
    }

    #[test]
    fn status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&AccreditationStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CONFIRMED\"");
    }

    #[test]
    fn status_parses_from_storage_string() {
        for status in AccreditationStatus::ALL {
            assert_eq!(status.as_str().parse::<AccreditationStatus>(), Ok(status));
        }
        assert!("confirmed".parse::<AccreditationStatus>().is_err());
    }

    #[test]
    fn pending_is_not_a_final_status() {
        let err = FinalStatus::try_from(AccreditationStatus::Pending).unwrap_err();
        assert_eq!(err.field(), "outcome");
    }

    #[test]
    fn final_status_rejects_pending_on_deserialize() {
        let result: Result<FinalStatus, _> = serde_json::from_str("\"PENDING\"");
        assert!(result.is_err());
    }

    proptest! {
        #[test]
        fn nothing_transitions_to_pending(from in any_status()) {
            prop_assert!(!from.can_transition_to(&AccreditationStatus::Pending));
        }

        #[test]
        fn failed_never_leaves(to in any_status()) {
            prop_assert!(!AccreditationStatus::Failed.can_transition_to(&to));
        }

        #[test]
        fn table_and_predicate_agree(from in any_status(), to in any_status()) {
            prop_assert_eq!(
                from.can_transition_to(&to),
                from.valid_transitions().contains(&to)
            );
        }

        #[test]
        fn self_transitions_are_never_table_moves(status in any_status()) {
            prop_assert!(!status.can_transition_to(&status));
        }
    }
}
