//! Record storage addressed by generated ids

use pendmap_core::local_path::{self, LocalPathStyle};
use pendmap_core::server_path::{self, Hierarchy};
use pendmap_core::{PathResult, PendingChange};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Identifier of a stored record
///
/// Ids are never reused within a collection, so a stale id simply misses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(u64);

impl RecordId {
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Index keys a record was stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordKeys {
    pub server: String,
    pub local: Option<String>,
}

impl RecordKeys {
    /// Compute keys for a record, failing on any malformed path
    pub fn for_change(change: &PendingChange, style: LocalPathStyle) -> PathResult<Self> {
        let server = server_path::index_key(&change.server_item)?;
        let local = change
            .local_item
            .as_deref()
            .map(|local| local_path::index_key(style, local))
            .transpose()?;
        Ok(Self { server, local })
    }

    pub fn server_hierarchy(&self) -> Hierarchy {
        server_path::hierarchy(&self.server)
    }

    pub fn local_hierarchy(&self, style: LocalPathStyle) -> Option<Hierarchy> {
        self.local
            .as_deref()
            .map(|local| local_path::hierarchy(style, local))
    }
}

pub(crate) struct Slot {
    pub change: Arc<PendingChange>,
    pub keys: RecordKeys,
}

/// Id → record map, iterated in insertion order
#[derive(Default)]
pub(crate) struct Arena {
    slots: BTreeMap<RecordId, Slot>,
    next_id: u64,
}

impl Arena {
    pub fn insert(&mut self, change: Arc<PendingChange>, keys: RecordKeys) -> RecordId {
        self.next_id += 1;
        let id = RecordId(self.next_id);
        self.slots.insert(id, Slot { change, keys });
        id
    }

    pub fn get(&self, id: RecordId) -> Option<&Slot> {
        self.slots.get(&id)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut Slot> {
        self.slots.get_mut(&id)
    }

    pub fn remove(&mut self, id: RecordId) -> Option<Slot> {
        self.slots.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Slot)> {
        self.slots.iter().map(|(id, slot)| (*id, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pendmap_core::ChangeKind;

    #[test]
    fn test_ids_are_not_reused() {
        let mut arena = Arena::default();
        let change = Arc::new(PendingChange::new("$/a", ChangeKind::Add));
        let keys = RecordKeys::for_change(&change, LocalPathStyle::Unix).unwrap();

        let first = arena.insert(Arc::clone(&change), keys.clone());
        arena.remove(first);
        let second = arena.insert(change, keys);

        assert_ne!(first, second);
        assert!(arena.get(first).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_keys_fold_case() {
        let change = PendingChange::new("$/Proj/A.txt", ChangeKind::Edit)
            .with_local_item("C:\\Work\\A.txt");
        let keys = RecordKeys::for_change(&change, LocalPathStyle::Windows).unwrap();

        assert_eq!(keys.server, "$/proj/a.txt");
        assert_eq!(keys.local.as_deref(), Some("c:\\work\\a.txt"));
        assert_eq!(keys.server_hierarchy().len(), 3);
    }

    #[test]
    fn test_bad_local_path_rejected() {
        let change = PendingChange::new("$/a", ChangeKind::Add).with_local_item("relative/a");
        assert!(RecordKeys::for_change(&change, LocalPathStyle::Unix).is_err());
    }
}
