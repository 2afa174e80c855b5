//! Core data types for the scheduling engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors rejected at the mutation boundary, before any scheduling pass runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Activity {activity_id}: constraint {kind} requires a constraint date")]
    MissingConstraintDate {
        activity_id: String,
        kind: ConstraintType,
    },
    #[error("Activity {activity_id}: constraint date given without a constraint type")]
    OrphanConstraintDate { activity_id: String },
}

/// Precedence relationship type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    #[serde(rename = "FS")]
    FinishToStart,
    #[serde(rename = "SS")]
    StartToStart,
    #[serde(rename = "FF")]
    FinishToFinish,
    #[serde(rename = "SF")]
    StartToFinish,
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        };
        f.write_str(code)
    }
}

/// A precedence link between two activities, by external id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub predecessor: String,
    pub successor: String,
    #[serde(rename = "type")]
    pub kind: RelationType,
    /// Lag in working days; negative values are leads.
    #[serde(default)]
    pub lag: i64,
}

impl Relationship {
    pub fn new(
        predecessor: impl Into<String>,
        successor: impl Into<String>,
        kind: RelationType,
        lag: i64,
    ) -> Self {
        Self {
            predecessor: predecessor.into(),
            successor: successor.into(),
            kind,
            lag,
        }
    }

    /// Finish-to-start with no lag, the most common link.
    pub fn fs(predecessor: impl Into<String>, successor: impl Into<String>) -> Self {
        Self::new(predecessor, successor, RelationType::FinishToStart, 0)
    }

    pub fn with_lag(mut self, lag: i64) -> Self {
        self.lag = lag;
        self
    }
}

/// Date constraint types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConstraintType {
    /// Start No Earlier Than
    Snet,
    /// Start No Later Than
    Snlt,
    /// Finish No Earlier Than
    Fnet,
    /// Finish No Later Than
    Fnlt,
    /// Must Start On
    Mso,
    /// Must Finish On
    Mfo,
}

impl ConstraintType {
    /// Whether the constraint date refers to the activity's finish.
    pub fn is_finish(self) -> bool {
        matches!(self, Self::Fnet | Self::Fnlt | Self::Mfo)
    }
}

impl std::fmt::Display for ConstraintType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            Self::Snet => "SNET",
            Self::Snlt => "SNLT",
            Self::Fnet => "FNET",
            Self::Fnlt => "FNLT",
            Self::Mso => "MSO",
            Self::Mfo => "MFO",
        };
        f.write_str(code)
    }
}

/// A constraint type together with its (required) date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "type")]
    pub kind: ConstraintType,
    pub date: NaiveDate,
}

/// Activity type with its type-specific scheduling inputs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ActivityKind {
    Task,
    Milestone,
    /// Spans from the earliest start to the latest finish of the referenced activities.
    LevelOfEffort { references: Vec<String> },
    /// Spans from the earliest start among `start_refs` to the latest finish among `finish_refs`.
    Hammock {
        start_refs: Vec<String>,
        finish_refs: Vec<String>,
    },
    /// Rolls up every activity under the WBS node the summary itself is assigned to.
    WbsSummary,
}

impl ActivityKind {
    /// Derived activities take their dates from other activities rather than from
    /// relationship propagation.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            Self::LevelOfEffort { .. } | Self::Hammock { .. } | Self::WbsSummary
        )
    }

    /// Ids of activities this one derives its span from.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        let (first, second): (&[String], &[String]) = match self {
            Self::LevelOfEffort { references } => (references.as_slice(), Default::default()),
            Self::Hammock {
                start_refs,
                finish_refs,
            } => (start_refs.as_slice(), finish_refs.as_slice()),
            _ => Default::default(),
        };
        first.iter().chain(second.iter()).map(|s| s.as_str())
    }
}

/// Fields computed by a scheduling pass. Overwritten wholesale on every pass.
///
/// Finish dates are the last working day of the activity (inclusive); a
/// zero-duration activity finishes on its start date. Floats are working days.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedFields {
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub total_float: i64,
    pub free_float: i64,
    pub is_critical: bool,
}

/// An activity in a schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Stable external code, unique within a schedule.
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: ActivityKind,
    /// Planned duration in working days. Ignored (treated as zero) for milestones.
    #[serde(default)]
    pub original_duration: i64,
    /// Remaining working days; `None` means the full original duration remains.
    #[serde(default)]
    pub remaining_duration: Option<i64>,
    #[serde(default)]
    pub percent_complete: f64,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_finish: Option<NaiveDate>,
    /// Calendar name; `None` uses the schedule's calendar.
    #[serde(default)]
    pub calendar: Option<String>,
    #[serde(default)]
    pub constraint: Option<Constraint>,
    /// WBS node code this activity belongs to.
    #[serde(default)]
    pub wbs: Option<String>,
    #[serde(default)]
    computed: Option<ComputedFields>,
}

impl Activity {
    fn with_kind(id: impl Into<String>, name: impl Into<String>, kind: ActivityKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            original_duration: 0,
            remaining_duration: None,
            percent_complete: 0.0,
            actual_start: None,
            actual_finish: None,
            calendar: None,
            constraint: None,
            wbs: None,
            computed: None,
        }
    }

    pub fn task(id: impl Into<String>, name: impl Into<String>, duration: i64) -> Self {
        let mut activity = Self::with_kind(id, name, ActivityKind::Task);
        activity.original_duration = duration;
        activity
    }

    pub fn milestone(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_kind(id, name, ActivityKind::Milestone)
    }

    pub fn level_of_effort<S: Into<String>>(
        id: impl Into<String>,
        name: impl Into<String>,
        references: impl IntoIterator<Item = S>,
    ) -> Self {
        let references = references.into_iter().map(Into::into).collect();
        Self::with_kind(id, name, ActivityKind::LevelOfEffort { references })
    }

    pub fn hammock<S: Into<String>, T: Into<String>>(
        id: impl Into<String>,
        name: impl Into<String>,
        start_refs: impl IntoIterator<Item = S>,
        finish_refs: impl IntoIterator<Item = T>,
    ) -> Self {
        Self::with_kind(
            id,
            name,
            ActivityKind::Hammock {
                start_refs: start_refs.into_iter().map(Into::into).collect(),
                finish_refs: finish_refs.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn wbs_summary(
        id: impl Into<String>,
        name: impl Into<String>,
        wbs: impl Into<String>,
    ) -> Self {
        let mut activity = Self::with_kind(id, name, ActivityKind::WbsSummary);
        activity.wbs = Some(wbs.into());
        activity
    }

    pub fn with_constraint(mut self, kind: ConstraintType, date: NaiveDate) -> Self {
        self.constraint = Some(Constraint { kind, date });
        self
    }

    pub fn in_wbs(mut self, code: impl Into<String>) -> Self {
        self.wbs = Some(code.into());
        self
    }

    /// Set or clear the constraint from separately supplied type and date fields.
    pub fn set_constraint(
        &mut self,
        kind: Option<ConstraintType>,
        date: Option<NaiveDate>,
    ) -> Result<(), DataError> {
        self.constraint = match (kind, date) {
            (Some(kind), Some(date)) => Some(Constraint { kind, date }),
            (Some(kind), None) => {
                return Err(DataError::MissingConstraintDate {
                    activity_id: self.id.clone(),
                    kind,
                })
            }
            (None, Some(_)) => {
                return Err(DataError::OrphanConstraintDate {
                    activity_id: self.id.clone(),
                })
            }
            (None, None) => None,
        };
        Ok(())
    }

    /// Duration used for scheduling: zero for milestones.
    pub fn planned_duration(&self) -> i64 {
        match self.kind {
            ActivityKind::Milestone => 0,
            _ => self.original_duration,
        }
    }

    /// Working days of work left.
    pub fn remaining(&self) -> i64 {
        if self.is_complete() {
            return 0;
        }
        match self.kind {
            ActivityKind::Milestone => 0,
            _ => self.remaining_duration.unwrap_or(self.original_duration),
        }
    }

    pub fn is_started(&self) -> bool {
        self.actual_start.is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.actual_finish.is_some()
    }

    /// Results of the most recent scheduling pass, if any.
    pub fn computed(&self) -> Option<&ComputedFields> {
        self.computed.as_ref()
    }

    pub(crate) fn set_computed(&mut self, computed: ComputedFields) {
        self.computed = Some(computed);
    }
}

/// Project-level policy for out-of-sequence progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPolicy {
    /// Out-of-sequence work keeps waiting on its logic-driven dates.
    #[default]
    RetainedLogic,
    /// Out-of-sequence work ignores unsatisfied predecessors and resumes at the data date.
    ProgressOverride,
}
