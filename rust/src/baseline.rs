//! Baselines and variance reporting.
//!
//! A [`Baseline`] is an immutable copy of a scheduled snapshot's activities and
//! relationships. Variance is measured in working days of the current calendar;
//! positive values mean the current schedule is later than the baseline.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::VarianceConfig;
use crate::models::{Activity, Relationship};
use crate::snapshot::ScheduleSnapshot;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BaselineError {
    #[error("Baseline name must not be empty")]
    EmptyName,
    #[error("Baseline '{0}' already exists")]
    DuplicateName(String),
    #[error("Baseline not found: {0}")]
    NotFound(String),
    #[error("Snapshot of project {0} has not been scheduled")]
    NotScheduled(String),
    #[error("Baseline registry belongs to project {expected}, snapshot to {found}")]
    ProjectMismatch { expected: String, found: String },
}

/// Immutable, timestamped copy of a scheduled snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    name: String,
    project_id: String,
    captured_at: DateTime<Utc>,
    data_date: NaiveDate,
    project_finish: Option<NaiveDate>,
    activities: Arc<[Activity]>,
    relationships: Arc<[Relationship]>,
}

impl Baseline {
    /// Copy a scheduled snapshot.
    pub fn capture(
        snapshot: &ScheduleSnapshot,
        name: impl Into<String>,
    ) -> Result<Self, BaselineError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BaselineError::EmptyName);
        }
        if !snapshot.is_scheduled() {
            return Err(BaselineError::NotScheduled(snapshot.project_id.clone()));
        }

        let network = snapshot.network();
        Ok(Self {
            name,
            project_id: snapshot.project_id.clone(),
            captured_at: Utc::now(),
            data_date: snapshot.data_date,
            project_finish: snapshot.project_finish(),
            activities: network.activities().into(),
            relationships: network.relationships().into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn data_date(&self) -> NaiveDate {
        self.data_date
    }

    pub fn project_finish(&self) -> Option<NaiveDate> {
        self.project_finish
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }
}

/// The baselines of one project, unique by name.
#[derive(Clone, Debug, Default)]
pub struct BaselineRegistry {
    project_id: String,
    baselines: Vec<Arc<Baseline>>,
}

impl BaselineRegistry {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            baselines: Vec::new(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Capture and register a baseline of `snapshot`.
    pub fn capture(
        &mut self,
        snapshot: &ScheduleSnapshot,
        name: impl Into<String>,
    ) -> Result<Arc<Baseline>, BaselineError> {
        if snapshot.project_id != self.project_id {
            return Err(BaselineError::ProjectMismatch {
                expected: self.project_id.clone(),
                found: snapshot.project_id.clone(),
            });
        }
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(BaselineError::DuplicateName(name));
        }

        let baseline = Arc::new(Baseline::capture(snapshot, name)?);
        self.baselines.push(Arc::clone(&baseline));
        Ok(baseline)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Baseline>> {
        self.baselines.iter().find(|b| b.name == name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> Result<Arc<Baseline>, BaselineError> {
        let position = self
            .baselines
            .iter()
            .position(|b| b.name == name)
            .ok_or_else(|| BaselineError::NotFound(name.to_string()))?;
        Ok(self.baselines.remove(position))
    }

    /// Baselines in capture order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Baseline>> {
        self.baselines.iter()
    }

    pub fn len(&self) -> usize {
        self.baselines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    Ahead,
    OnTrack,
    Slipped,
}

impl VarianceStatus {
    /// Classify a finish variance against the slip threshold.
    pub fn classify(finish_variance: i64, config: &VarianceConfig) -> Self {
        let threshold = config.slip_threshold_days.max(0);
        if finish_variance > threshold {
            Self::Slipped
        } else if finish_variance < -threshold {
            Self::Ahead
        } else {
            Self::OnTrack
        }
    }
}

/// Per-activity deltas, current minus baseline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityVariance {
    pub activity_id: String,
    pub baseline_start: NaiveDate,
    pub baseline_finish: NaiveDate,
    pub current_start: NaiveDate,
    pub current_finish: NaiveDate,
    pub start_variance: i64,
    pub finish_variance: i64,
    pub total_float_variance: i64,
    pub status: VarianceStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectVariance {
    pub baseline_finish: Option<NaiveDate>,
    pub current_finish: Option<NaiveDate>,
    pub finish_variance_days: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub baseline_name: String,
    pub activities: Vec<ActivityVariance>,
    /// Activities in the current schedule that the baseline does not have.
    pub added: Vec<String>,
    /// Baseline activities no longer in the current schedule.
    pub removed: Vec<String>,
    pub project: ProjectVariance,
}

impl VarianceReport {
    pub fn count(&self, status: VarianceStatus) -> usize {
        self.activities.iter().filter(|v| v.status == status).count()
    }

    pub fn activity(&self, id: &str) -> Option<&ActivityVariance> {
        self.activities.iter().find(|v| v.activity_id == id)
    }
}

/// Compare a scheduled snapshot against a baseline.
pub fn compare(
    baseline: &Baseline,
    current: &ScheduleSnapshot,
    config: &VarianceConfig,
) -> Result<VarianceReport, BaselineError> {
    if !current.is_scheduled() {
        return Err(BaselineError::NotScheduled(current.project_id.clone()));
    }
    let calendar = current.calendar();
    let delta = |from: NaiveDate, to: NaiveDate| calendar.working_duration_between(from, to);

    let mut activities = Vec::new();
    let mut added = Vec::new();
    for activity in current.network().activities() {
        let (Some(now), Some(then)) = (
            activity.computed(),
            baseline.activity(&activity.id).and_then(|a| a.computed()),
        ) else {
            added.push(activity.id.clone());
            continue;
        };

        let finish_variance = delta(then.early_finish, now.early_finish);
        activities.push(ActivityVariance {
            activity_id: activity.id.clone(),
            baseline_start: then.early_start,
            baseline_finish: then.early_finish,
            current_start: now.early_start,
            current_finish: now.early_finish,
            start_variance: delta(then.early_start, now.early_start),
            finish_variance,
            total_float_variance: now.total_float - then.total_float,
            status: VarianceStatus::classify(finish_variance, config),
        });
    }

    let current_ids: BTreeSet<&str> = current
        .network()
        .activities()
        .iter()
        .map(|a| a.id.as_str())
        .collect();
    let removed = baseline
        .activities()
        .iter()
        .filter(|a| !current_ids.contains(a.id.as_str()))
        .map(|a| a.id.clone())
        .collect();

    let baseline_finish = baseline.project_finish();
    let current_finish = current.project_finish();
    let finish_variance_days = match (baseline_finish, current_finish) {
        (Some(then), Some(now)) => delta(then, now),
        _ => 0,
    };

    Ok(VarianceReport {
        baseline_name: baseline.name().to_string(),
        activities,
        added,
        removed,
        project: ProjectVariance {
            baseline_finish,
            current_finish,
            finish_variance_days,
        },
    })
}
