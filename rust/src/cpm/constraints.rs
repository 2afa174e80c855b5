//! Date constraint evaluation.
//!
//! Constraint dates are resolved once per run into working-day offsets; start-side
//! constraints use the offset of the date itself, finish-side constraints the
//! exclusive offset just after it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::models::{Constraint, ConstraintType};

/// A constraint that could not be honoured without overriding logic, or that left
/// the activity with negative float. The schedule is still computed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub activity_id: String,
    pub constraint: Constraint,
    pub kind: ViolationKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A must-start or must-finish date placed the activity before its logic allows.
    LogicOverridden { driven_start: i64, forced_start: i64 },
    /// Late dates precede early dates.
    NegativeFloat { total_float: i64 },
}

/// A constraint with its date converted to a working-day offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedConstraint {
    pub constraint: Constraint,
    pub offset: i64,
}

impl ResolvedConstraint {
    pub fn resolve(constraint: Constraint, calendar: &WorkCalendar, origin: NaiveDate) -> Self {
        let offset = if constraint.kind.is_finish() {
            calendar.finish_offset(origin, constraint.date)
        } else {
            calendar.working_duration_between(origin, constraint.date)
        };
        Self { constraint, offset }
    }

    pub fn kind(&self) -> ConstraintType {
        self.constraint.kind
    }

    /// Early start after the forward rules, given the logic-driven start.
    ///
    /// Returns the new start and, for MSO/MFO, the violation if the forced start
    /// is earlier than logic allows.
    pub fn apply_forward(&self, driven_start: i64, duration: i64) -> (i64, Option<ViolationKind>) {
        let c = self.offset;
        let forced = match self.kind() {
            ConstraintType::Snet => return (driven_start.max(c), None),
            ConstraintType::Fnet => return (driven_start.max(c - duration), None),
            ConstraintType::Snlt | ConstraintType::Fnlt => return (driven_start, None),
            ConstraintType::Mso => c,
            ConstraintType::Mfo => c - duration,
        };

        let violation = (forced < driven_start).then_some(ViolationKind::LogicOverridden {
            driven_start,
            forced_start: forced,
        });
        (forced, violation)
    }

    /// Late finish after the backward rules, given the successor-driven late finish
    /// and the activity's span.
    pub fn apply_backward(&self, late_finish: i64, span: i64) -> i64 {
        let c = self.offset;
        match self.kind() {
            ConstraintType::Snlt => late_finish.min(c + span),
            ConstraintType::Fnlt => late_finish.min(c),
            ConstraintType::Mso => c + span,
            ConstraintType::Mfo => c,
            ConstraintType::Snet | ConstraintType::Fnet => late_finish,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // Monday 2025-01-06 is offset 0
    fn make_constraint(kind: ConstraintType, d: NaiveDate) -> ResolvedConstraint {
        ResolvedConstraint::resolve(
            Constraint { kind, date: d },
            &WorkCalendar::standard(),
            date(2025, 1, 6),
        )
    }

    #[test]
    fn test_resolve_offsets() {
        // Start-side: Wednesday is the third working day
        assert_eq!(make_constraint(ConstraintType::Snet, date(2025, 1, 8)).offset, 2);
        // Start-side on a Saturday snaps to the following Monday
        assert_eq!(make_constraint(ConstraintType::Mso, date(2025, 1, 11)).offset, 5);
        // Finish-side: finishing on Wednesday ends the third working day
        assert_eq!(make_constraint(ConstraintType::Fnlt, date(2025, 1, 8)).offset, 3);
        // Finish-side on a Saturday means finishing on the Friday before
        assert_eq!(make_constraint(ConstraintType::Mfo, date(2025, 1, 11)).offset, 5);
    }

    #[test]
    fn test_forward_rules() {
        let snet = make_constraint(ConstraintType::Snet, date(2025, 1, 13));
        assert_eq!(snet.apply_forward(2, 3), (5, None));
        assert_eq!(snet.apply_forward(7, 3), (7, None));

        let fnet = make_constraint(ConstraintType::Fnet, date(2025, 1, 10));
        assert_eq!(fnet.apply_forward(0, 3), (2, None));

        let snlt = make_constraint(ConstraintType::Snlt, date(2025, 1, 6));
        assert_eq!(snlt.apply_forward(4, 3), (4, None));
    }

    #[test]
    fn test_mandatory_start_overrides_logic() {
        let mso = make_constraint(ConstraintType::Mso, date(2025, 1, 8));
        assert_eq!(mso.apply_forward(1, 3), (2, None));
        assert_eq!(
            mso.apply_forward(5, 3),
            (
                2,
                Some(ViolationKind::LogicOverridden {
                    driven_start: 5,
                    forced_start: 2
                })
            )
        );

        let mfo = make_constraint(ConstraintType::Mfo, date(2025, 1, 10));
        assert_eq!(mfo.apply_forward(0, 3).0, 2);
    }

    #[test]
    fn test_backward_rules() {
        let fnlt = make_constraint(ConstraintType::Fnlt, date(2025, 1, 8));
        assert_eq!(fnlt.apply_backward(10, 2), 3);
        assert_eq!(fnlt.apply_backward(1, 2), 1);

        let snlt = make_constraint(ConstraintType::Snlt, date(2025, 1, 7));
        assert_eq!(snlt.apply_backward(10, 2), 3);

        let mso = make_constraint(ConstraintType::Mso, date(2025, 1, 7));
        assert_eq!(mso.apply_backward(10, 2), 3);

        let mfo = make_constraint(ConstraintType::Mfo, date(2025, 1, 7));
        assert_eq!(mfo.apply_backward(10, 2), 2);

        let snet = make_constraint(ConstraintType::Snet, date(2025, 1, 7));
        assert_eq!(snet.apply_backward(10, 2), 10);
    }
}
