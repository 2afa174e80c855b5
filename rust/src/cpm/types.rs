//! Types produced by a scheduling run.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::constraints::ConstraintViolation;
use crate::models::ProgressPolicy;
use crate::snapshot::ScheduleSnapshot;

/// Per-activity timing in working days relative to the data date.
///
/// Starts are the offset of the first working day; finishes are exclusive, so
/// `early_finish - early_start` is the number of working days the activity spans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTiming {
    /// Earliest possible start (from forward pass).
    pub early_start: i64,
    /// Earliest possible finish (from forward pass).
    pub early_finish: i64,
    /// Latest allowable start (from backward pass).
    pub late_start: i64,
    /// Latest allowable finish (from backward pass).
    pub late_finish: i64,
    /// late_finish - early_finish.
    pub total_float: i64,
    /// Delay possible without moving any successor.
    pub free_float: i64,
}

impl TaskTiming {
    pub fn span(&self) -> i64 {
        self.early_finish - self.early_start
    }
}

/// A relationship whose predecessor had not reached the point the relationship
/// requires when its successor reported progress.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfSequence {
    pub activity_id: String,
    pub predecessor_id: String,
    pub policy: ProgressPolicy,
}

/// Summary figures of a scheduling run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleStats {
    pub calc_time_ms: f64,
    pub activity_count: usize,
    pub critical_count: usize,
    pub project_start: Option<NaiveDate>,
    pub project_finish: Option<NaiveDate>,
    /// Working days from project start to project finish.
    pub duration_days: i64,
    pub duration_hours: i64,
}

/// Everything a scheduling run reports besides the computed activity fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub violations: Vec<ConstraintViolation>,
    pub out_of_sequence: Vec<OutOfSequence>,
    pub timings: FxHashMap<String, TaskTiming>,
    pub stats: ScheduleStats,
}

impl ScheduleReport {
    pub fn timing(&self, activity_id: &str) -> Option<&TaskTiming> {
        self.timings.get(activity_id)
    }
}

/// A freshly scheduled snapshot and its report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutcome {
    pub snapshot: ScheduleSnapshot,
    pub report: ScheduleReport,
}
