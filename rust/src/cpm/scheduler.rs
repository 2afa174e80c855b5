//! Scheduling entry point.

use std::time::Instant;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::derived;
use super::passes::{
    backward_pass, forward_pass, free_float_pass, negative_float_violations, PassContext,
};
use super::types::{ScheduleOutcome, ScheduleReport, ScheduleStats, TaskTiming};
use crate::calendar::{CalendarError, WorkCalendar};
use crate::config::SchedulerConfig;
use crate::models::ComputedFields;
use crate::network::NetworkError;
use crate::snapshot::ScheduleSnapshot;
use crate::wbs::WbsError;
use crate::{log_changes, log_checks};

/// Fatal errors; no computed state is published when one occurs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error(transparent)]
    Wbs(#[from] WbsError),
    #[error("Activity {activity_id} uses calendar '{calendar}', not defined for this schedule")]
    UnknownCalendar {
        activity_id: String,
        calendar: String,
    },
}

/// Critical path scheduler.
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Schedule a snapshot, returning a new scheduled snapshot and the run's report.
    ///
    /// The input snapshot is never modified.
    pub fn schedule(&self, snapshot: &ScheduleSnapshot) -> Result<ScheduleOutcome, ScheduleError> {
        let mut next = snapshot.clone();
        let report = self.schedule_in_place(&mut next)?;
        Ok(ScheduleOutcome {
            snapshot: next,
            report,
        })
    }

    /// Schedule a snapshot in place.
    ///
    /// Computed fields are replaced wholesale on success; on error the snapshot is
    /// left exactly as it was.
    pub fn schedule_in_place(
        &self,
        snapshot: &mut ScheduleSnapshot,
    ) -> Result<ScheduleReport, ScheduleError> {
        let start_time = Instant::now();
        let verbosity = self.config.verbosity;
        let threshold = self.config.critical_float_threshold;

        snapshot.validate()?;

        let calendar = snapshot.calendar();
        let network = snapshot.network();
        let origin = calendar.next_working_day(snapshot.data_date)?;

        log_changes!(
            verbosity,
            "Scheduling {} activities for project {} from {} ({:?})",
            network.len(),
            snapshot.project_id,
            origin,
            snapshot.policy
        );

        let (ctx, out_of_sequence) =
            PassContext::new(network, calendar, origin, snapshot.policy, verbosity);

        let mut timings = vec![TaskTiming::default(); network.len()];
        let mut violations = Vec::new();

        forward_pass(&ctx, &mut timings, &mut violations);
        let project_finish = ctx.project_finish(&timings);
        log_checks!(verbosity, "Forward pass done, project finish offset {}", project_finish);

        backward_pass(&ctx, &mut timings, project_finish);
        free_float_pass(&ctx, &mut timings, project_finish);
        violations.extend(negative_float_violations(&ctx, &timings));

        let mut critical: Vec<bool> = timings
            .iter()
            .enumerate()
            .map(|(idx, t)| ctx.is_critical(idx, t, threshold))
            .collect();
        derived::roll_up(network, &mut timings, &mut critical, threshold);

        let computed = timings
            .iter()
            .zip(&critical)
            .map(|(timing, &is_critical)| to_computed(calendar, origin, timing, is_critical))
            .collect::<Result<Vec<_>, _>>()?;

        let scheduled: Vec<usize> = (0..network.len())
            .filter(|&idx| !ctx.states[idx].derived)
            .collect();
        let start_offset = scheduled.iter().map(|&i| timings[i].early_start).min();
        let finish_offset = scheduled.iter().map(|&i| timings[i].early_finish).max();
        let duration_days = match (start_offset, finish_offset) {
            (Some(start), Some(finish)) => finish - start,
            _ => 0,
        };

        let stats = ScheduleStats {
            calc_time_ms: 0.0,
            activity_count: network.len(),
            critical_count: scheduled.iter().filter(|&&i| critical[i]).count(),
            project_start: scheduled.iter().map(|&i| computed[i].early_start).min(),
            project_finish: scheduled.iter().map(|&i| computed[i].early_finish).max(),
            duration_days,
            duration_hours: duration_days * i64::from(calendar.hours_per_day()),
        };

        let timing_map: FxHashMap<String, TaskTiming> = network
            .activities()
            .iter()
            .zip(&timings)
            .map(|(activity, timing)| (activity.id.clone(), *timing))
            .collect();

        // Publish
        for (activity, fields) in snapshot.activities_mut().iter_mut().zip(computed) {
            activity.set_computed(fields);
        }

        let stats = ScheduleStats {
            calc_time_ms: start_time.elapsed().as_secs_f64() * 1000.0,
            ..stats
        };
        log_changes!(
            verbosity,
            "Scheduled {} activities: {} critical, {} violations, {} out of sequence, finish {:?}",
            stats.activity_count,
            stats.critical_count,
            violations.len(),
            out_of_sequence.len(),
            stats.project_finish
        );

        Ok(ScheduleReport {
            violations,
            out_of_sequence,
            timings: timing_map,
            stats,
        })
    }
}

/// Convert offsets to dates. Finishes are reported as the last working day of the span.
fn to_computed(
    calendar: &WorkCalendar,
    origin: NaiveDate,
    timing: &TaskTiming,
    is_critical: bool,
) -> Result<ComputedFields, CalendarError> {
    let at = |offset: i64| calendar.add_working_duration(origin, offset);
    let finish = |start: i64, finish: i64| {
        if finish > start {
            at(finish - 1)
        } else {
            at(start)
        }
    };

    Ok(ComputedFields {
        early_start: at(timing.early_start)?,
        early_finish: finish(timing.early_start, timing.early_finish)?,
        late_start: at(timing.late_start)?,
        late_finish: finish(timing.late_start, timing.late_finish)?,
        total_float: timing.total_float,
        free_float: timing.free_float,
        is_critical,
    })
}
