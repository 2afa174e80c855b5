//! Roll-ups for activities whose dates derive from other activities.

use super::types::TaskTiming;
use crate::models::ActivityKind;
use crate::network::ActivityNetwork;
use crate::wbs;

/// Span from the earliest start among `starts` to the latest finish among `finishes`.
fn span_of(
    network: &ActivityNetwork,
    timings: &[TaskTiming],
    starts: &[String],
    finishes: &[String],
) -> Option<TaskTiming> {
    let starts: Vec<usize> = starts.iter().filter_map(|id| network.index_of(id)).collect();
    let finishes: Vec<usize> = finishes
        .iter()
        .filter_map(|id| network.index_of(id))
        .collect();

    let early_start = starts.iter().map(|&i| timings[i].early_start).min()?;
    let early_finish = finishes
        .iter()
        .map(|&i| timings[i].early_finish)
        .max()?
        .max(early_start);
    let late_finish = finishes.iter().map(|&i| timings[i].late_finish).max()?;
    let total_float = late_finish - early_finish;

    Some(TaskTiming {
        early_start,
        early_finish,
        late_start: early_start + total_float,
        late_finish,
        total_float,
        free_float: total_float.max(0),
    })
}

/// Fill in level-of-effort, hammock and WBS summary timings.
///
/// Level-of-effort and hammock spans come first so WBS summaries can include them.
/// Only WBS summaries may be flagged critical.
pub(crate) fn roll_up(
    network: &ActivityNetwork,
    timings: &mut [TaskTiming],
    critical: &mut [bool],
    threshold: i64,
) {
    for (idx, activity) in network.activities().iter().enumerate() {
        let span = match &activity.kind {
            ActivityKind::LevelOfEffort { references } => {
                span_of(network, timings, references, references)
            }
            ActivityKind::Hammock {
                start_refs,
                finish_refs,
            } => span_of(network, timings, start_refs, finish_refs),
            _ => continue,
        };
        timings[idx] = span.unwrap_or_default();
        critical[idx] = false;
    }

    for (idx, activity) in network.activities().iter().enumerate() {
        if activity.kind != ActivityKind::WbsSummary {
            continue;
        }
        let Some(code) = activity.wbs.as_deref() else {
            continue;
        };

        let members: Vec<&TaskTiming> = network
            .activities()
            .iter()
            .enumerate()
            .filter(|(_, a)| a.kind != ActivityKind::WbsSummary)
            .filter(|(_, a)| a.wbs.as_deref().is_some_and(|w| wbs::is_within(w, code)))
            .map(|(i, _)| &timings[i])
            .collect();

        let rollup = match (
            members.iter().map(|t| t.early_start).min(),
            members.iter().map(|t| t.early_finish).max(),
            members.iter().map(|t| t.total_float).min(),
        ) {
            (Some(early_start), Some(early_finish), Some(total_float)) => Some(TaskTiming {
                early_start,
                early_finish,
                late_start: early_start + total_float,
                late_finish: early_finish + total_float,
                total_float,
                free_float: 0,
            }),
            _ => None,
        };

        critical[idx] = rollup.is_some_and(|t| t.total_float <= threshold);
        timings[idx] = rollup.unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Activity;

    fn make_timing(early_start: i64, early_finish: i64, total_float: i64) -> TaskTiming {
        TaskTiming {
            early_start,
            early_finish,
            late_start: early_start + total_float,
            late_finish: early_finish + total_float,
            total_float,
            free_float: 0,
        }
    }

    #[test]
    fn test_level_of_effort_span() {
        let network = ActivityNetwork::new(
            vec![
                Activity::task("A", "Piling", 4),
                Activity::task("B", "Caps", 3),
                Activity::level_of_effort("L", "Site management", ["A", "B"]),
            ],
            vec![],
        )
        .unwrap();
        let mut timings = vec![make_timing(0, 4, 2), make_timing(1, 6, 0), TaskTiming::default()];
        let mut critical = vec![false, true, false];
        roll_up(&network, &mut timings, &mut critical, 0);

        assert_eq!(timings[2].early_start, 0);
        assert_eq!(timings[2].early_finish, 6);
        assert_eq!(timings[2].late_finish, 6);
        assert_eq!(timings[2].total_float, 0);
        assert!(!critical[2]);
    }

    #[test]
    fn test_hammock_uses_separate_reference_sets() {
        let network = ActivityNetwork::new(
            vec![
                Activity::task("A", "Mobilise", 2),
                Activity::task("B", "Erect", 5),
                Activity::task("C", "Dismantle", 2),
                Activity::hammock("H", "Crane hire", ["B"], ["C"]),
            ],
            vec![],
        )
        .unwrap();
        let mut timings = vec![
            make_timing(0, 2, 0),
            make_timing(2, 7, 0),
            make_timing(7, 9, 1),
            TaskTiming::default(),
        ];
        let mut critical = vec![true, true, false, false];
        roll_up(&network, &mut timings, &mut critical, 0);

        assert_eq!(timings[3].early_start, 2);
        assert_eq!(timings[3].early_finish, 9);
        assert_eq!(timings[3].total_float, 1);
        assert_eq!(timings[3].late_start - timings[3].early_start, 1);
    }

    #[test]
    fn test_wbs_summary_rollup() {
        let network = ActivityNetwork::new(
            vec![
                Activity::task("A", "Footings", 3).in_wbs("1.1"),
                Activity::task("B", "Columns", 4).in_wbs("1.2"),
                Activity::task("C", "Fit-out", 6).in_wbs("2"),
                Activity::wbs_summary("S", "Structure", "1"),
                Activity::wbs_summary("E", "Empty", "3"),
            ],
            vec![],
        )
        .unwrap();
        let mut timings = vec![
            make_timing(0, 3, 0),
            make_timing(3, 7, 2),
            make_timing(0, 6, 5),
            TaskTiming::default(),
            TaskTiming::default(),
        ];
        let mut critical = vec![true, false, false, false, false];
        roll_up(&network, &mut timings, &mut critical, 0);

        assert_eq!(timings[3].early_start, 0);
        assert_eq!(timings[3].early_finish, 7);
        assert_eq!(timings[3].total_float, 0);
        assert!(critical[3]);
        assert_eq!(timings[4], TaskTiming::default());
        assert!(!critical[4]);
    }
}
