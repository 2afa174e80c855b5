//! Critical path scheduling.
//!
//! A run validates the snapshot, then makes a forward pass (early dates), a backward
//! pass (late dates and total float), a free-float pass and the derived-activity
//! roll-ups, all in working-day offsets from the data date. Results are converted
//! to calendar dates and written to the activities only once every step succeeded.

mod constraints;
mod derived;
mod passes;
mod scheduler;
mod types;

pub use constraints::{ConstraintViolation, ResolvedConstraint, ViolationKind};
pub use scheduler::{ScheduleError, Scheduler};
pub use types::{OutOfSequence, ScheduleOutcome, ScheduleReport, ScheduleStats, TaskTiming};
