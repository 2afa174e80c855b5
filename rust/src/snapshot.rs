//! The live schedule state handed to every engine operation.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::WorkCalendar;
use crate::cpm::ScheduleError;
use crate::models::{Activity, ProgressPolicy};
use crate::network::ActivityNetwork;
use crate::wbs::{self, WbsNode};

/// Activities, relationships and WBS of one project, together with its calendar,
/// data date and out-of-sequence policy.
///
/// Operations take a snapshot by reference and return a new one; the calendar is
/// shared read-only between snapshots derived from each other.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub project_id: String,
    /// As-of date for progress; remaining work is scheduled from here.
    pub data_date: NaiveDate,
    #[serde(default)]
    pub policy: ProgressPolicy,
    calendar: Arc<WorkCalendar>,
    network: ActivityNetwork,
    #[serde(default)]
    wbs: Vec<WbsNode>,
}

impl ScheduleSnapshot {
    pub fn new(
        project_id: impl Into<String>,
        data_date: NaiveDate,
        calendar: impl Into<Arc<WorkCalendar>>,
        network: ActivityNetwork,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            data_date,
            policy: ProgressPolicy::default(),
            calendar: calendar.into(),
            network,
            wbs: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: ProgressPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_wbs(mut self, nodes: Vec<WbsNode>) -> Self {
        self.wbs = nodes;
        self
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    /// Shared handle to the calendar.
    pub fn shared_calendar(&self) -> Arc<WorkCalendar> {
        Arc::clone(&self.calendar)
    }

    pub fn network(&self) -> &ActivityNetwork {
        &self.network
    }

    /// Structural edits go through the network's own validated mutation API.
    pub fn network_mut(&mut self) -> &mut ActivityNetwork {
        &mut self.network
    }

    pub fn wbs(&self) -> &[WbsNode] {
        &self.wbs
    }

    pub fn wbs_mut(&mut self) -> &mut Vec<WbsNode> {
        &mut self.wbs
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.network.activity(id)
    }

    pub(crate) fn activities_mut(&mut self) -> &mut [Activity] {
        self.network.activities_mut()
    }

    /// Whether every activity carries results of a scheduling pass.
    pub fn is_scheduled(&self) -> bool {
        self.network
            .activities()
            .iter()
            .all(|a| a.computed().is_some())
    }

    /// Latest early finish among scheduled, non-derived activities.
    pub fn project_finish(&self) -> Option<NaiveDate> {
        self.network
            .activities()
            .iter()
            .filter(|a| !a.kind.is_derived())
            .filter_map(|a| a.computed().map(|c| c.early_finish))
            .max()
    }

    /// Structural validation run at the start of every scheduling pass.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        self.network.validate()?;
        wbs::validate(&self.wbs, self.network.activities())?;

        for activity in self.network.activities() {
            if let Some(name) = &activity.calendar {
                if name != self.calendar.name() {
                    return Err(ScheduleError::UnknownCalendar {
                        activity_id: activity.id.clone(),
                        calendar: name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}
