//! Forward, backward and free-float passes over the activity network.
//!
//! All arithmetic is in working-day offsets from the data date. Derived activities
//! (level of effort, hammock, WBS summary) are skipped here and rolled up afterwards.

use chrono::NaiveDate;

use super::constraints::{ConstraintViolation, ResolvedConstraint, ViolationKind};
use super::types::{OutOfSequence, TaskTiming};
use crate::calendar::WorkCalendar;
use crate::interner::ActivityIdx;
use crate::models::{ProgressPolicy, RelationType};
use crate::network::{ActivityNetwork, Link};
use crate::{log_checks, log_debug};

/// Progress state of an activity, with actual dates as offsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Progress {
    NotStarted,
    InProgress { start: i64 },
    Complete { start: i64, finish: i64 },
}

#[derive(Clone, Debug)]
pub(crate) struct ActivityState {
    pub progress: Progress,
    /// Planned duration before the activity starts, remaining duration after.
    pub duration: i64,
    pub constraint: Option<ResolvedConstraint>,
    pub out_of_sequence: bool,
    pub derived: bool,
}

impl ActivityState {
    pub fn is_complete(&self) -> bool {
        matches!(self.progress, Progress::Complete { .. })
    }

    fn is_started(&self) -> bool {
        self.progress != Progress::NotStarted
    }
}

/// Per-run scheduling state shared by the passes.
pub(crate) struct PassContext<'a> {
    pub network: &'a ActivityNetwork,
    pub states: Vec<ActivityState>,
    /// Per link; relationships ignored under progress override are inactive.
    pub active: Vec<bool>,
    pub policy: ProgressPolicy,
    pub verbosity: u8,
}

impl<'a> PassContext<'a> {
    /// Resolve progress and constraints, and detect out-of-sequence relationships.
    pub fn new(
        network: &'a ActivityNetwork,
        calendar: &WorkCalendar,
        origin: NaiveDate,
        policy: ProgressPolicy,
        verbosity: u8,
    ) -> (Self, Vec<OutOfSequence>) {
        let mut states: Vec<ActivityState> = network
            .activities()
            .iter()
            .map(|activity| {
                let start = activity
                    .actual_start
                    .map(|d| calendar.working_duration_between(origin, d));
                let finish = activity
                    .actual_finish
                    .map(|d| calendar.finish_offset(origin, d));
                let progress = match (start, finish) {
                    (Some(start), Some(finish)) => Progress::Complete {
                        start,
                        finish: finish.max(start),
                    },
                    (None, Some(finish)) => Progress::Complete {
                        start: finish - activity.planned_duration(),
                        finish,
                    },
                    (Some(start), None) => Progress::InProgress { start },
                    (None, None) => Progress::NotStarted,
                };
                let duration = match progress {
                    Progress::NotStarted => activity.planned_duration(),
                    _ => activity.remaining(),
                };

                ActivityState {
                    progress,
                    duration,
                    constraint: activity
                        .constraint
                        .map(|c| ResolvedConstraint::resolve(c, calendar, origin)),
                    out_of_sequence: false,
                    derived: activity.kind.is_derived(),
                }
            })
            .collect();

        let mut active = vec![true; network.links().len()];
        let mut out_of_sequence = Vec::new();

        for (l, link) in network.links().iter().enumerate() {
            if !states[link.successor].is_started() {
                continue;
            }
            let predecessor = &states[link.predecessor];
            let satisfied = match link.kind {
                RelationType::FinishToStart | RelationType::FinishToFinish => {
                    predecessor.is_complete()
                }
                RelationType::StartToStart | RelationType::StartToFinish => {
                    predecessor.is_started()
                }
            };
            if satisfied {
                continue;
            }

            states[link.successor].out_of_sequence = true;
            if policy == ProgressPolicy::ProgressOverride {
                active[l] = false;
            }

            let activity_id = network.activity_at(link.successor).id.clone();
            let predecessor_id = network.activity_at(link.predecessor).id.clone();
            log_checks!(
                verbosity,
                "  {} out of sequence with predecessor {} ({}, {:?})",
                activity_id,
                predecessor_id,
                link.kind,
                policy
            );
            out_of_sequence.push(OutOfSequence {
                activity_id,
                predecessor_id,
                policy,
            });
        }

        let ctx = Self {
            network,
            states,
            active,
            policy,
            verbosity,
        };
        (ctx, out_of_sequence)
    }

    fn active_predecessors(&self, idx: ActivityIdx) -> impl Iterator<Item = &'a Link> + '_ {
        self.network
            .predecessors(idx)
            .filter(|(l, _)| self.active[*l])
            .map(|(_, link)| link)
    }

    /// Active successor links whose successor's late dates bind this activity.
    fn driving_successors(&self, idx: ActivityIdx) -> impl Iterator<Item = &'a Link> + '_ {
        self.network
            .successors(idx)
            .filter(|(l, link)| self.active[*l] && self.binds_predecessors(link.successor))
            .map(|(_, link)| link)
    }

    /// Retained logic keeps out-of-sequence work behind its predecessors.
    fn held_by_logic(&self, state: &ActivityState) -> bool {
        state.out_of_sequence && self.policy == ProgressPolicy::RetainedLogic
    }

    /// Completed work is fixed in the past, except when retained logic still holds it
    /// behind its predecessors; then it passes its successors' late dates through.
    fn binds_predecessors(&self, idx: ActivityIdx) -> bool {
        let state = &self.states[idx];
        !state.is_complete() || self.held_by_logic(state)
    }

    /// Latest early finish among scheduled activities without driving successors.
    pub fn project_finish(&self, timings: &[TaskTiming]) -> i64 {
        (0..self.states.len())
            .filter(|&idx| !self.states[idx].derived)
            .filter(|&idx| self.driving_successors(idx).next().is_none())
            .map(|idx| timings[idx].early_finish)
            .max()
            .unwrap_or(0)
    }

    pub fn is_critical(&self, idx: ActivityIdx, timing: &TaskTiming, threshold: i64) -> bool {
        let state = &self.states[idx];
        !state.derived && !state.is_complete() && timing.total_float <= threshold
    }
}

/// Earliest start of the remaining work allowed by the active predecessor links.
fn logic_start(
    ctx: &PassContext,
    idx: ActivityIdx,
    duration: i64,
    timings: &[TaskTiming],
) -> Option<i64> {
    ctx.active_predecessors(idx)
        .map(|link| {
            let p = &timings[link.predecessor];
            match link.kind {
                RelationType::FinishToStart => p.early_finish + link.lag,
                RelationType::StartToStart => p.early_start + link.lag,
                RelationType::FinishToFinish => p.early_finish + link.lag - duration,
                RelationType::StartToFinish => p.early_start + link.lag - duration,
            }
        })
        .max()
}

/// Compute early dates in topological order.
pub(crate) fn forward_pass(
    ctx: &PassContext,
    timings: &mut [TaskTiming],
    violations: &mut Vec<ConstraintViolation>,
) {
    for &idx in ctx.network.topological_order() {
        let state = &ctx.states[idx];
        if state.derived {
            continue;
        }

        let duration = state.duration;
        let driven = logic_start(ctx, idx, duration, timings).unwrap_or(0).max(0);

        let (early_start, early_finish) = match state.progress {
            _ if ctx.held_by_logic(state) => (driven, driven + duration),
            Progress::Complete { start, finish } => (start, finish),
            Progress::InProgress { start } => (start, driven.max(start) + duration),
            Progress::NotStarted => {
                let early_start = match &state.constraint {
                    Some(constraint) => {
                        let (start, violation) = constraint.apply_forward(driven, duration);
                        log_checks!(
                            ctx.verbosity,
                            "  {}: {} moves early start {} -> {}",
                            ctx.network.activity_at(idx).id,
                            constraint.kind(),
                            driven,
                            start
                        );
                        if let Some(kind) = violation {
                            violations.push(ConstraintViolation {
                                activity_id: ctx.network.activity_at(idx).id.clone(),
                                constraint: constraint.constraint,
                                kind,
                            });
                        }
                        start
                    }
                    None => driven,
                };
                (early_start, early_start + duration)
            }
        };

        timings[idx].early_start = early_start;
        timings[idx].early_finish = early_finish;
    }
}

/// Compute late dates and total float in reverse topological order.
///
/// Successors constrain a predecessor through the start of their remaining work
/// (`late_finish - duration`), which is the late start for unstarted activities.
/// Completed activities held by retained logic have no remaining work and take their
/// late dates from their own successors.
pub(crate) fn backward_pass(ctx: &PassContext, timings: &mut [TaskTiming], project_finish: i64) {
    for &idx in ctx.network.topological_order().iter().rev() {
        let state = &ctx.states[idx];
        if state.derived {
            continue;
        }

        let timing = timings[idx];
        if !ctx.binds_predecessors(idx) {
            timings[idx].late_start = timing.early_start;
            timings[idx].late_finish = timing.early_finish;
            timings[idx].total_float = 0;
            continue;
        }

        let span = timing.span();
        let mut late_finish = ctx
            .driving_successors(idx)
            .map(|link| {
                let s = &timings[link.successor];
                let s_resume = s.late_finish - ctx.states[link.successor].duration;
                match link.kind {
                    RelationType::FinishToStart => s_resume - link.lag,
                    RelationType::StartToStart => s_resume - link.lag + span,
                    RelationType::FinishToFinish => s.late_finish - link.lag,
                    RelationType::StartToFinish => s.late_finish - link.lag + span,
                }
            })
            .min()
            .unwrap_or(project_finish);

        if let Some(constraint) = state.constraint.filter(|_| !state.is_complete()) {
            late_finish = constraint.apply_backward(late_finish, span);
        }

        timings[idx].late_finish = late_finish;
        timings[idx].late_start = late_finish - span;
        timings[idx].total_float = late_finish - timing.early_finish;
    }
}

/// Free float: slack before the earliest driving successor would move.
/// Never negative and never more than total float.
pub(crate) fn free_float_pass(ctx: &PassContext, timings: &mut [TaskTiming], project_finish: i64) {
    for idx in 0..timings.len() {
        let state = &ctx.states[idx];
        if state.derived {
            continue;
        }
        if state.is_complete() {
            timings[idx].free_float = 0;
            continue;
        }

        let timing = timings[idx];
        let free_float = ctx
            .driving_successors(idx)
            .map(|link| {
                let s = &timings[link.successor];
                let s_resume = s.early_finish - ctx.states[link.successor].duration;
                match link.kind {
                    RelationType::FinishToStart => s_resume - timing.early_finish - link.lag,
                    RelationType::StartToStart => s_resume - timing.early_start - link.lag,
                    RelationType::FinishToFinish => {
                        s.early_finish - timing.early_finish - link.lag
                    }
                    RelationType::StartToFinish => {
                        s.early_finish - timing.early_start - link.lag
                    }
                }
            })
            .min()
            .unwrap_or(project_finish - timing.early_finish);

        timings[idx].free_float = free_float.min(timing.total_float).max(0);
        log_debug!(
            ctx.verbosity,
            "  {}: ES={} EF={} LS={} LF={} TF={} FF={}",
            ctx.network.activity_at(idx).id,
            timing.early_start,
            timing.early_finish,
            timing.late_start,
            timing.late_finish,
            timing.total_float,
            timings[idx].free_float
        );
    }
}

/// Constrained activities left with negative float.
pub(crate) fn negative_float_violations(
    ctx: &PassContext,
    timings: &[TaskTiming],
) -> Vec<ConstraintViolation> {
    ctx.states
        .iter()
        .enumerate()
        .filter(|(idx, state)| {
            !state.derived && !state.is_complete() && timings[*idx].total_float < 0
        })
        .filter_map(|(idx, state)| {
            state.constraint.map(|c| ConstraintViolation {
                activity_id: ctx.network.activity_at(idx).id.clone(),
                constraint: c.constraint,
                kind: ViolationKind::NegativeFloat {
                    total_float: timings[idx].total_float,
                },
            })
        })
        .collect()
}
