//! Critical path scheduling engine for construction projects.
//!
//! Computes early/late dates, total and free float and the critical path of an
//! activity network on a working-day calendar, applies progress under a retained
//! logic or progress override policy, and compares schedules against baselines.
//!
//! Every operation takes a [`ScheduleSnapshot`] and returns a new one; nothing is
//! shared between snapshots except their read-only calendar.

// Allow clippy warning triggered by PyO3 macro expansion
#![cfg_attr(feature = "python", allow(clippy::useless_conversion))]

pub mod baseline;
pub mod calendar;
mod config;
pub mod cpm;
mod interner;
pub mod logging;
mod models;
pub mod network;
pub mod progress;
mod snapshot;
pub mod wbs;

#[cfg(feature = "python")]
mod python;

pub use baseline::{
    compare, ActivityVariance, Baseline, BaselineError, BaselineRegistry, ProjectVariance,
    VarianceReport, VarianceStatus,
};
pub use calendar::{CalendarError, CalendarException, WorkCalendar};
pub use config::{EngineConfig, SchedulerConfig, VarianceConfig};
pub use cpm::{
    ConstraintViolation, OutOfSequence, ScheduleError, ScheduleOutcome, ScheduleReport,
    ScheduleStats, Scheduler, TaskTiming, ViolationKind,
};
pub use interner::ActivityIdx;
pub use models::{
    Activity, ActivityKind, ComputedFields, Constraint, ConstraintType, DataError,
    ProgressPolicy, RelationType, Relationship,
};
pub use network::{ActivityNetwork, Link, NetworkError};
pub use progress::{ProgressEngine, ProgressError, ProgressRejection, ProgressUpdate};
pub use snapshot::ScheduleSnapshot;
pub use wbs::{WbsError, WbsNode};
