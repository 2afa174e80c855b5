//! Activity network: the activity/relationship graph and its structural validation.
//!
//! Activities live in an index-addressable vector; relationships are resolved into
//! [`Link`]s holding plain index pairs. Every constructor and mutation validates the
//! whole structure and leaves the network untouched on failure.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interner::{ActivityIdx, ActivityIndex};
use crate::models::{Activity, ActivityKind, RelationType, Relationship};

/// Largest lag or lead accepted on a relationship, in working days.
pub const MAX_LAG_DAYS: i64 = 36_500;

/// Structural errors. All of them are schedule-fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Duplicate activity id: {0}")]
    DuplicateActivity(String),
    #[error("Relationship {predecessor} -> {successor} references missing activity {missing}")]
    DanglingRelationship {
        predecessor: String,
        successor: String,
        missing: String,
    },
    #[error("Activity {activity_id} references missing activity {missing}")]
    DanglingReference { activity_id: String, missing: String },
    #[error("Activity {0} cannot be its own predecessor")]
    SelfLoop(String),
    #[error("Circular dependency detected: {}", .cycle.join(" -> "))]
    Cyclic { cycle: Vec<String> },
    #[error("Activity {0} derives its dates from other activities and cannot be linked")]
    DerivedActivityLinked(String),
    #[error("Activity {activity_id}: {reason}")]
    InvalidReference { activity_id: String, reason: String },
    #[error("Activity {activity_id} has negative duration {duration}")]
    NegativeDuration { activity_id: String, duration: i64 },
    #[error(
        "Relationship {predecessor} -> {successor} has lag {lag}, limit is +/-{} days",
        MAX_LAG_DAYS
    )]
    LagOutOfRange {
        predecessor: String,
        successor: String,
        lag: i64,
    },
    #[error("Activity not found: {0}")]
    ActivityNotFound(String),
    #[error("Relationship not found: {predecessor} -> {successor} ({kind})")]
    RelationshipNotFound {
        predecessor: String,
        successor: String,
        kind: RelationType,
    },
}

/// A resolved relationship between two activity indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Link {
    pub predecessor: ActivityIdx,
    pub successor: ActivityIdx,
    pub kind: RelationType,
    pub lag: i64,
}

/// Serialized form of an [`ActivityNetwork`]; validated on conversion.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NetworkData {
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// A validated, acyclic activity network.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NetworkData", into = "NetworkData")]
pub struct ActivityNetwork {
    activities: Vec<Activity>,
    relationships: Vec<Relationship>,
    index: ActivityIndex,
    /// Parallel to `relationships`.
    links: Vec<Link>,
    /// Link indices per activity.
    predecessors: Vec<Vec<usize>>,
    successors: Vec<Vec<usize>>,
    order: Vec<ActivityIdx>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

impl ActivityNetwork {
    /// Build and validate a network.
    ///
    /// # Errors
    /// * `DuplicateActivity` if two activities share an id
    /// * `DanglingRelationship` / `DanglingReference` for references to missing activities
    /// * `SelfLoop`, `DerivedActivityLinked`, `InvalidReference`, `NegativeDuration`
    /// * `Cyclic` with the offending activity sequence if the relationships form a cycle
    pub fn new(
        activities: Vec<Activity>,
        relationships: Vec<Relationship>,
    ) -> Result<Self, NetworkError> {
        let index = build_index(&activities)?;
        check_activities(&activities, &index)?;
        let links = resolve_links(&activities, &relationships, &index)?;
        let (predecessors, successors) = adjacency(activities.len(), &links);
        let order = sort_topologically(&activities, &links, &successors)?;

        Ok(Self {
            activities,
            relationships,
            index,
            links,
            predecessors,
            successors,
            order,
        })
    }

    /// Re-run every structural check against the current contents.
    pub fn validate(&self) -> Result<(), NetworkError> {
        let index = build_index(&self.activities)?;
        check_activities(&self.activities, &index)?;
        let links = resolve_links(&self.activities, &self.relationships, &index)?;
        let (_, successors) = adjacency(self.activities.len(), &links);
        sort_topologically(&self.activities, &links, &successors)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn index_of(&self, id: &str) -> Option<ActivityIdx> {
        self.index.get(id)
    }

    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.index.get(id).map(|idx| &self.activities[idx])
    }

    pub fn activity_at(&self, idx: ActivityIdx) -> &Activity {
        &self.activities[idx]
    }

    /// Mutable access for non-structural fields (progress, computed results).
    pub(crate) fn activities_mut(&mut self) -> &mut [Activity] {
        &mut self.activities
    }

    /// Links where `idx` is the successor, with their positions in [`links`](Self::links).
    pub fn predecessors(&self, idx: ActivityIdx) -> impl Iterator<Item = (usize, &Link)> {
        self.predecessors[idx].iter().map(|&l| (l, &self.links[l]))
    }

    /// Links where `idx` is the predecessor, with their positions in [`links`](Self::links).
    pub fn successors(&self, idx: ActivityIdx) -> impl Iterator<Item = (usize, &Link)> {
        self.successors[idx].iter().map(|&l| (l, &self.links[l]))
    }

    /// Activity indices ordered so every predecessor precedes its successors.
    ///
    /// Deterministic for a given network; iterate in reverse for the backward pass.
    pub fn topological_order(&self) -> &[ActivityIdx] {
        &self.order
    }

    /// Activity ids in topological order.
    pub fn topological_ids(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .map(|&idx| self.activities[idx].id.as_str())
    }

    /// Add an activity. Relationships to it are added separately.
    pub fn add_activity(&mut self, activity: Activity) -> Result<ActivityIdx, NetworkError> {
        let mut activities = self.activities.clone();
        activities.push(activity);
        *self = Self::new(activities, self.relationships.clone())?;
        Ok(self.activities.len() - 1)
    }

    /// Add a relationship, rejecting it (and keeping the network unchanged) if it
    /// dangles or closes a cycle.
    pub fn add_relationship(&mut self, relationship: Relationship) -> Result<(), NetworkError> {
        let mut relationships = self.relationships.clone();
        relationships.push(relationship);
        *self = Self::new(self.activities.clone(), relationships)?;
        Ok(())
    }

    /// Remove the first relationship matching predecessor, successor and type.
    pub fn remove_relationship(
        &mut self,
        predecessor: &str,
        successor: &str,
        kind: RelationType,
    ) -> Result<Relationship, NetworkError> {
        let position = self
            .relationships
            .iter()
            .position(|r| {
                r.predecessor == predecessor && r.successor == successor && r.kind == kind
            })
            .ok_or_else(|| NetworkError::RelationshipNotFound {
                predecessor: predecessor.to_string(),
                successor: successor.to_string(),
                kind,
            })?;

        let mut relationships = self.relationships.clone();
        let removed = relationships.remove(position);
        *self = Self::new(self.activities.clone(), relationships)?;
        Ok(removed)
    }

    /// Remove an activity together with every relationship touching it.
    ///
    /// Fails if a level-of-effort or hammock activity still references it.
    pub fn remove_activity(&mut self, id: &str) -> Result<Activity, NetworkError> {
        let idx = self
            .index
            .get(id)
            .ok_or_else(|| NetworkError::ActivityNotFound(id.to_string()))?;

        let mut activities = self.activities.clone();
        let removed = activities.remove(idx);
        let relationships = self
            .relationships
            .iter()
            .filter(|r| r.predecessor != id && r.successor != id)
            .cloned()
            .collect();
        *self = Self::new(activities, relationships)?;
        Ok(removed)
    }

    /// Replace one activity's fields, revalidating the structure.
    pub fn update_activity(
        &mut self,
        id: &str,
        update: impl FnOnce(&mut Activity),
    ) -> Result<(), NetworkError> {
        let idx = self
            .index
            .get(id)
            .ok_or_else(|| NetworkError::ActivityNotFound(id.to_string()))?;

        let mut activities = self.activities.clone();
        update(&mut activities[idx]);
        *self = Self::new(activities, self.relationships.clone())?;
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<Activity>, Vec<Relationship>) {
        (self.activities, self.relationships)
    }
}

impl TryFrom<NetworkData> for ActivityNetwork {
    type Error = NetworkError;

    fn try_from(data: NetworkData) -> Result<Self, Self::Error> {
        ActivityNetwork::new(data.activities, data.relationships)
    }
}

impl From<ActivityNetwork> for NetworkData {
    fn from(network: ActivityNetwork) -> Self {
        let (activities, relationships) = network.into_parts();
        NetworkData {
            activities,
            relationships,
        }
    }
}

fn build_index(activities: &[Activity]) -> Result<ActivityIndex, NetworkError> {
    let mut index = ActivityIndex::with_capacity(activities.len());
    for activity in activities {
        if index.insert(&activity.id).is_none() {
            return Err(NetworkError::DuplicateActivity(activity.id.clone()));
        }
    }
    Ok(index)
}

/// Per-activity checks: durations and the reference sets of derived activities.
fn check_activities(activities: &[Activity], index: &ActivityIndex) -> Result<(), NetworkError> {
    for activity in activities {
        let duration = activity.original_duration.min(activity.remaining_duration.unwrap_or(0));
        if duration < 0 {
            return Err(NetworkError::NegativeDuration {
                activity_id: activity.id.clone(),
                duration,
            });
        }

        let empty_set = match &activity.kind {
            ActivityKind::LevelOfEffort { references } if references.is_empty() => {
                Some("level of effort needs at least one referenced activity")
            }
            ActivityKind::Hammock { start_refs, .. } if start_refs.is_empty() => {
                Some("hammock needs at least one start reference")
            }
            ActivityKind::Hammock { finish_refs, .. } if finish_refs.is_empty() => {
                Some("hammock needs at least one finish reference")
            }
            _ => None,
        };
        if let Some(reason) = empty_set {
            return Err(NetworkError::InvalidReference {
                activity_id: activity.id.clone(),
                reason: reason.to_string(),
            });
        }

        for reference in activity.kind.references() {
            let Some(idx) = index.get(reference) else {
                return Err(NetworkError::DanglingReference {
                    activity_id: activity.id.clone(),
                    missing: reference.to_string(),
                });
            };
            if activities[idx].kind.is_derived() {
                return Err(NetworkError::InvalidReference {
                    activity_id: activity.id.clone(),
                    reason: format!("referenced activity {} is itself derived", reference),
                });
            }
        }
    }
    Ok(())
}

fn resolve_links(
    activities: &[Activity],
    relationships: &[Relationship],
    index: &ActivityIndex,
) -> Result<Vec<Link>, NetworkError> {
    let mut links = Vec::with_capacity(relationships.len());
    for rel in relationships {
        let lookup = |id: &str| {
            index
                .get(id)
                .ok_or_else(|| NetworkError::DanglingRelationship {
                    predecessor: rel.predecessor.clone(),
                    successor: rel.successor.clone(),
                    missing: id.to_string(),
                })
        };
        let predecessor = lookup(&rel.predecessor)?;
        let successor = lookup(&rel.successor)?;

        if predecessor == successor {
            return Err(NetworkError::SelfLoop(rel.predecessor.clone()));
        }
        for idx in [predecessor, successor] {
            if activities[idx].kind.is_derived() {
                return Err(NetworkError::DerivedActivityLinked(activities[idx].id.clone()));
            }
        }
        if !(-MAX_LAG_DAYS..=MAX_LAG_DAYS).contains(&rel.lag) {
            return Err(NetworkError::LagOutOfRange {
                predecessor: rel.predecessor.clone(),
                successor: rel.successor.clone(),
                lag: rel.lag,
            });
        }

        links.push(Link {
            predecessor,
            successor,
            kind: rel.kind,
            lag: rel.lag,
        });
    }
    Ok(links)
}

fn adjacency(n: usize, links: &[Link]) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
    let mut predecessors = vec![Vec::new(); n];
    let mut successors = vec![Vec::new(); n];
    for (l, link) in links.iter().enumerate() {
        predecessors[link.successor].push(l);
        successors[link.predecessor].push(l);
    }
    (predecessors, successors)
}

/// Depth-first topological sort with white/gray/black marking.
///
/// Reaching a gray activity means the current DFS path loops back on itself; the
/// path from that activity to the current one is reported as the cycle.
fn sort_topologically(
    activities: &[Activity],
    links: &[Link],
    successors: &[Vec<usize>],
) -> Result<Vec<ActivityIdx>, NetworkError> {
    let n = successors.len();
    let mut color = vec![Color::White; n];
    let mut post_order: Vec<ActivityIdx> = Vec::with_capacity(n);

    for root in 0..n {
        if color[root] != Color::White {
            continue;
        }

        // (activity, next successor link position)
        let mut stack: Vec<(ActivityIdx, usize)> = vec![(root, 0)];
        color[root] = Color::Gray;

        while let Some(frame) = stack.last_mut() {
            let node = frame.0;
            match successors[node].get(frame.1) {
                Some(&l) => {
                    frame.1 += 1;
                    let next = links[l].successor;
                    match color[next] {
                        Color::White => {
                            color[next] = Color::Gray;
                            stack.push((next, 0));
                        }
                        Color::Gray => {
                            let start = stack.iter().position(|&(a, _)| a == next).unwrap_or(0);
                            let cycle = stack[start..]
                                .iter()
                                .map(|&(a, _)| activities[a].id.clone())
                                .collect();
                            return Err(NetworkError::Cyclic { cycle });
                        }
                        Color::Black => {}
                    }
                }
                None => {
                    color[node] = Color::Black;
                    post_order.push(node);
                    stack.pop();
                }
            }
        }
    }

    post_order.reverse();
    Ok(post_order)
}
