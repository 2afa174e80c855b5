//! Work breakdown structure nodes.
//!
//! Codes are dotted paths (`"1"`, `"1.2"`, `"1.2.3"`); a node's parent is the code
//! with its last segment removed.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Activity, ActivityKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WbsError {
    #[error("WBS code must not be empty")]
    EmptyCode,
    #[error("Duplicate WBS code: {0}")]
    DuplicateCode(String),
    #[error("WBS node {code} has no parent node {parent}")]
    MissingParent { code: String, parent: String },
    #[error("Activity {activity_id} references unknown WBS node {code}")]
    UnknownNode { activity_id: String, code: String },
    #[error("WBS summary activity {0} is not assigned to a WBS node")]
    UnassignedSummary(String),
}

/// A node of the work breakdown structure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WbsNode {
    pub code: String,
    pub name: String,
}

impl WbsNode {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }

    pub fn parent(&self) -> Option<&str> {
        parent_code(&self.code)
    }

    /// Number of segments in the code; top-level nodes have depth 1.
    pub fn depth(&self) -> usize {
        self.code.split('.').count()
    }
}

pub fn parent_code(code: &str) -> Option<&str> {
    code.rfind('.').map(|pos| &code[..pos])
}

/// Whether `code` is `ancestor` itself or lies anywhere beneath it.
pub fn is_within(code: &str, ancestor: &str) -> bool {
    match code.strip_prefix(ancestor) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

/// Check the node set and every activity's WBS assignment.
pub fn validate(nodes: &[WbsNode], activities: &[Activity]) -> Result<(), WbsError> {
    let mut codes: FxHashSet<&str> = FxHashSet::default();
    for node in nodes {
        if node.code.is_empty() {
            return Err(WbsError::EmptyCode);
        }
        if !codes.insert(node.code.as_str()) {
            return Err(WbsError::DuplicateCode(node.code.clone()));
        }
    }

    for node in nodes {
        if let Some(parent) = node.parent() {
            if !codes.contains(parent) {
                return Err(WbsError::MissingParent {
                    code: node.code.clone(),
                    parent: parent.to_string(),
                });
            }
        }
    }

    for activity in activities {
        match &activity.wbs {
            Some(code) if !codes.contains(code.as_str()) => {
                return Err(WbsError::UnknownNode {
                    activity_id: activity.id.clone(),
                    code: code.clone(),
                });
            }
            None if activity.kind == ActivityKind::WbsSummary => {
                return Err(WbsError::UnassignedSummary(activity.id.clone()));
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_nodes(codes: &[&str]) -> Vec<WbsNode> {
        codes
            .iter()
            .map(|c| WbsNode::new(*c, format!("Node {}", c)))
            .collect()
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("1.2", "1.2"));
        assert!(is_within("1.2.3", "1.2"));
        assert!(is_within("1.2.3", "1"));
        assert!(!is_within("1.20", "1.2"));
        assert!(!is_within("1", "1.2"));
        assert!(!is_within("2.1", "1"));
    }

    #[test]
    fn test_parent_and_depth() {
        let node = WbsNode::new("3.1.4", "Level 4 slab");
        assert_eq!(node.parent(), Some("3.1"));
        assert_eq!(node.depth(), 3);
        assert_eq!(WbsNode::new("3", "Structure").parent(), None);
    }

    #[test]
    fn test_validate_hierarchy() {
        assert!(validate(&make_nodes(&["1", "1.1", "1.2", "2"]), &[]).is_ok());
        assert_eq!(
            validate(&make_nodes(&["1", "1"]), &[]),
            Err(WbsError::DuplicateCode("1".to_string()))
        );
        assert_eq!(
            validate(&make_nodes(&["1", "1.2.1"]), &[]),
            Err(WbsError::MissingParent {
                code: "1.2.1".to_string(),
                parent: "1.2".to_string()
            })
        );
    }

    #[test]
    fn test_validate_activity_assignment() {
        let nodes = make_nodes(&["1", "1.1"]);
        let ok = vec![
            Activity::task("A", "Formwork", 3).in_wbs("1.1"),
            Activity::wbs_summary("S", "Structure", "1"),
        ];
        assert!(validate(&nodes, &ok).is_ok());

        let unknown = vec![Activity::task("A", "Formwork", 3).in_wbs("9")];
        assert!(matches!(
            validate(&nodes, &unknown),
            Err(WbsError::UnknownNode { .. })
        ));

        let mut summary = Activity::wbs_summary("S", "Structure", "1");
        summary.wbs = None;
        assert_eq!(
            validate(&nodes, &[summary]),
            Err(WbsError::UnassignedSummary("S".to_string()))
        );
    }
}
