//! Progress updates and data-date advances.
//!
//! Updates are validated and applied to a copy of the snapshot, which is then
//! rescheduled in full. Any rejected update or failed run discards the copy, so a
//! batch either applies completely or not at all.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SchedulerConfig;
use crate::cpm::{ScheduleError, ScheduleOutcome, Scheduler};
use crate::log_checks;
use crate::snapshot::ScheduleSnapshot;

/// Progress reported for one activity. Omitted fields keep or derive their values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub activity_id: String,
    #[serde(default)]
    pub percent_complete: Option<f64>,
    /// Explicit remaining duration; otherwise derived from percent complete.
    #[serde(default)]
    pub remaining_duration: Option<i64>,
    #[serde(default)]
    pub actual_start: Option<NaiveDate>,
    #[serde(default)]
    pub actual_finish: Option<NaiveDate>,
}

impl ProgressUpdate {
    pub fn new(activity_id: impl Into<String>) -> Self {
        Self {
            activity_id: activity_id.into(),
            ..Self::default()
        }
    }

    pub fn percent(mut self, percent_complete: f64) -> Self {
        self.percent_complete = Some(percent_complete);
        self
    }

    pub fn remaining(mut self, days: i64) -> Self {
        self.remaining_duration = Some(days);
        self
    }

    pub fn started(mut self, date: NaiveDate) -> Self {
        self.actual_start = Some(date);
        self
    }

    pub fn finished(mut self, date: NaiveDate) -> Self {
        self.actual_finish = Some(date);
        self
    }
}

/// Why a progress update was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgressRejection {
    #[error("percent complete {0} is outside 0..=100")]
    PercentOutOfRange(f64),
    #[error("remaining duration {0} is negative")]
    NegativeRemaining(i64),
    #[error("actual finish {finish} precedes actual start {start}")]
    FinishBeforeStart { start: NaiveDate, finish: NaiveDate },
    #[error("actual {field} {date} is after the data date {data_date}")]
    AfterDataDate {
        field: &'static str,
        date: NaiveDate,
        data_date: NaiveDate,
    },
    #[error("an actual finish needs 100 percent complete, got {0}")]
    FinishBeforeComplete(f64),
    #[error("activity derives its dates from other activities and takes no progress")]
    DerivedActivity,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProgressError {
    #[error("Invalid progress update for activity {activity_id}: {reason}")]
    InvalidProgressUpdate {
        activity_id: String,
        reason: ProgressRejection,
    },
    #[error("Activity not found: {0}")]
    UnknownActivity(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Applies progress and reschedules under the snapshot's progress policy.
#[derive(Clone, Debug, Default)]
pub struct ProgressEngine {
    scheduler: Scheduler,
}

impl ProgressEngine {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            scheduler: Scheduler::new(config),
        }
    }

    /// Apply a batch of updates and reschedule.
    pub fn apply(
        &self,
        snapshot: &ScheduleSnapshot,
        updates: &[ProgressUpdate],
    ) -> Result<ScheduleOutcome, ProgressError> {
        let mut next = snapshot.clone();
        for update in updates {
            self.apply_one(&mut next, update)?;
        }
        let report = self.scheduler.schedule_in_place(&mut next)?;
        Ok(ScheduleOutcome {
            snapshot: next,
            report,
        })
    }

    /// Move the data date and reschedule remaining work from it. Actuals are kept,
    /// so the new data date may not precede any recorded actual date.
    pub fn advance_data_date(
        &self,
        snapshot: &ScheduleSnapshot,
        data_date: NaiveDate,
    ) -> Result<ScheduleOutcome, ProgressError> {
        for activity in snapshot.network().activities() {
            for (field, date) in [
                ("start", activity.actual_start),
                ("finish", activity.actual_finish),
            ] {
                if let Some(date) = date.filter(|d| *d > data_date) {
                    return Err(ProgressError::InvalidProgressUpdate {
                        activity_id: activity.id.clone(),
                        reason: ProgressRejection::AfterDataDate {
                            field,
                            date,
                            data_date,
                        },
                    });
                }
            }
        }

        let mut next = snapshot.clone();
        next.data_date = data_date;
        log_checks!(
            self.scheduler.config().verbosity,
            "Advancing data date {} -> {}",
            snapshot.data_date,
            data_date
        );
        let report = self.scheduler.schedule_in_place(&mut next)?;
        Ok(ScheduleOutcome {
            snapshot: next,
            report,
        })
    }

    fn apply_one(
        &self,
        snapshot: &mut ScheduleSnapshot,
        update: &ProgressUpdate,
    ) -> Result<(), ProgressError> {
        let data_date = snapshot.data_date;
        let calendar = snapshot.shared_calendar();
        let idx = snapshot
            .network()
            .index_of(&update.activity_id)
            .ok_or_else(|| ProgressError::UnknownActivity(update.activity_id.clone()))?;
        let activity = &mut snapshot.activities_mut()[idx];

        let reject = |reason| ProgressError::InvalidProgressUpdate {
            activity_id: update.activity_id.clone(),
            reason,
        };

        if activity.kind.is_derived() {
            return Err(reject(ProgressRejection::DerivedActivity));
        }
        if let Some(pct) = update.percent_complete {
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                return Err(reject(ProgressRejection::PercentOutOfRange(pct)));
            }
            if update.actual_finish.is_some() && pct < 100.0 {
                return Err(reject(ProgressRejection::FinishBeforeComplete(pct)));
            }
        }
        if let Some(days) = update.remaining_duration.filter(|d| *d < 0) {
            return Err(reject(ProgressRejection::NegativeRemaining(days)));
        }
        for (field, date) in [("start", update.actual_start), ("finish", update.actual_finish)] {
            if let Some(date) = date.filter(|d| *d > data_date) {
                return Err(reject(ProgressRejection::AfterDataDate {
                    field,
                    date,
                    data_date,
                }));
            }
        }

        let pct = match (update.percent_complete, update.actual_finish) {
            (Some(pct), _) => pct,
            (None, Some(_)) => 100.0,
            (None, None) => activity.percent_complete,
        };

        let actual_start = match update.actual_start {
            Some(date) => Some(date),
            None if pct == 0.0 && update.percent_complete.is_some() => None,
            None => activity
                .actual_start
                .or_else(|| (pct > 0.0).then_some(data_date)),
        };

        let actual_finish = if pct >= 100.0 {
            match update.actual_finish.or(activity.actual_finish) {
                Some(date) => Some(date),
                None => {
                    let last_worked = calendar
                        .last_working_day_before(data_date)
                        .map_err(ScheduleError::from)?;
                    Some(actual_start.map_or(last_worked, |s| s.max(last_worked)))
                }
            }
        } else {
            None
        };

        if let (Some(start), Some(finish)) = (actual_start, actual_finish) {
            if finish < start {
                return Err(reject(ProgressRejection::FinishBeforeStart { start, finish }));
            }
        }

        let remaining_duration = if pct >= 100.0 {
            Some(0)
        } else if let Some(days) = update.remaining_duration {
            Some(days)
        } else if update.percent_complete.is_some() {
            let original = activity.original_duration as f64;
            Some((original * (100.0 - pct) / 100.0).ceil() as i64)
        } else {
            activity.remaining_duration
        };

        log_checks!(
            self.scheduler.config().verbosity,
            "  {}: {}% complete, start {:?}, finish {:?}, remaining {:?}",
            activity.id,
            pct,
            actual_start,
            actual_finish,
            remaining_duration
        );

        activity.percent_complete = pct;
        activity.actual_start = actual_start;
        activity.actual_finish = actual_finish;
        activity.remaining_duration = remaining_duration;
        Ok(())
    }
}
