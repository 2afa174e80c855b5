//! String interning for activity ids.
//!
//! Maps external activity codes to dense indices so the network can store
//! relationships as plain index pairs. The reverse direction is the network's
//! activity vector itself.

use rustc_hash::FxHashMap;

/// Dense activity index (position in the network's activity vector).
pub type ActivityIdx = usize;

/// Mapping from activity id strings to dense indices, assigned in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityIndex {
    to_idx: FxHashMap<String, ActivityIdx>,
}

impl ActivityIndex {
    /// Create a new index with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_idx: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Register a new id. Returns `None` if the id is already present.
    pub fn insert(&mut self, id: &str) -> Option<ActivityIdx> {
        if self.to_idx.contains_key(id) {
            return None;
        }
        let idx = self.to_idx.len();
        self.to_idx.insert(id.to_string(), idx);
        Some(idx)
    }

    /// Get the index for an id, if it exists.
    #[inline]
    pub fn get(&self, id: &str) -> Option<ActivityIdx> {
        self.to_idx.get(id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_assigns_dense_indices() {
        let mut index = ActivityIndex::with_capacity(4);

        let a = index.insert("A100").unwrap();
        let b = index.insert("A200").unwrap();
        assert!(index.insert("A100").is_none()); // duplicate

        assert_eq!((a, b), (0, 1));
        assert_eq!(index.get("A100"), Some(a));
        assert_eq!(index.get("A200"), Some(b));
        assert_eq!(index.get("missing"), None);
    }
}
