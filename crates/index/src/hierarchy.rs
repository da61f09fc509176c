//! Ancestor path → descendant records

use crate::arena::RecordId;
use ahash::AHashMap;
use std::collections::BTreeSet;

/// Maps every ancestor key of a record (and its own key) to the records
/// beneath it. Empty buckets are removed.
#[derive(Default)]
pub(crate) struct HierarchyIndex {
    buckets: AHashMap<String, BTreeSet<RecordId>>,
}

impl HierarchyIndex {
    pub fn insert<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>, id: RecordId) {
        for key in keys {
            self.buckets.entry(key.clone()).or_default().insert(id);
        }
    }

    pub fn remove<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>, id: RecordId) {
        for key in keys {
            if let Some(bucket) = self.buckets.get_mut(key) {
                bucket.remove(&id);
                if bucket.is_empty() {
                    self.buckets.remove(key);
                }
            }
        }
    }

    /// Records at or beneath `key`, in insertion order
    pub fn ids(&self, key: &str) -> impl Iterator<Item = RecordId> + '_ {
        self.buckets.get(key).into_iter().flatten().copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.buckets.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    #[cfg(test)]
    pub fn buckets(&self) -> impl Iterator<Item = (&String, &BTreeSet<RecordId>)> {
        self.buckets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, RecordKeys};
    use pendmap_core::{ChangeKind, LocalPathStyle, PendingChange};
    use std::sync::Arc;

    fn ids(count: usize) -> Vec<RecordId> {
        let mut arena = Arena::default();
        let change = Arc::new(PendingChange::new("$/x", ChangeKind::Add));
        let keys = RecordKeys::for_change(&change, LocalPathStyle::Unix).unwrap();
        (0..count)
            .map(|_| arena.insert(Arc::clone(&change), keys.clone()))
            .collect()
    }

    #[test]
    fn test_empty_buckets_are_dropped() {
        let ids = ids(2);
        let mut index = HierarchyIndex::default();
        let a: Vec<String> = ["$/", "$/p", "$/p/a"].map(String::from).to_vec();
        let b: Vec<String> = ["$/", "$/p", "$/p/b"].map(String::from).to_vec();

        index.insert(&a, ids[0]);
        index.insert(&b, ids[1]);
        assert_eq!(index.ids("$/p").count(), 2);

        index.remove(&a, ids[0]);
        assert!(!index.contains("$/p/a"));
        assert_eq!(index.ids("$/p").collect::<Vec<_>>(), vec![ids[1]]);

        index.remove(&b, ids[1]);
        assert_eq!(index.buckets().count(), 0);
        assert_eq!(index.ids("$/").count(), 0);
    }
}
