//! Multi-index collection of pending changes

use crate::arena::{Arena, RecordId, RecordKeys};
use crate::hierarchy::HierarchyIndex;
use ahash::AHashMap;
use parking_lot::Mutex;
use pendmap_core::{
    local_path, server_path, LocalPathStyle, PathResult, PathTranslator, PendingChange,
};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Records pushed out of the collection as a side effect of a mutation
pub type Evicted = SmallVec<[Arc<PendingChange>; 2]>;

/// What a mutation took out of the collection
#[derive(Debug, Default)]
pub struct Applied {
    /// The record replaced by an add, or the record dropped by a remove
    pub record: Option<Arc<PendingChange>>,
    /// Other records that lost their server or local key to the change or
    /// to a retargeted descendant
    pub evicted: Evicted,
}

/// Pending changes indexed by server path, local path and both hierarchies
///
/// Every operation holds the collection lock for its whole duration, so the
/// snapshots returned by queries reflect a single point in time. Stored
/// records are shared and never mutated; a path change stores a new record.
pub struct PendingChangeCollection {
    translator: Arc<dyn PathTranslator>,
    state: Mutex<State>,
}

struct State {
    style: LocalPathStyle,
    arena: Arena,
    by_server: AHashMap<String, RecordId>,
    by_local: AHashMap<String, RecordId>,
    server_tree: HierarchyIndex,
    local_tree: HierarchyIndex,
}

impl State {
    fn new(style: LocalPathStyle) -> Self {
        Self {
            style,
            arena: Arena::default(),
            by_server: AHashMap::new(),
            by_local: AHashMap::new(),
            server_tree: HierarchyIndex::default(),
            local_tree: HierarchyIndex::default(),
        }
    }

    fn get(&self, id: RecordId) -> Option<Arc<PendingChange>> {
        self.arena.get(id).map(|slot| Arc::clone(&slot.change))
    }

    fn snapshot(&self, ids: impl Iterator<Item = RecordId>) -> Vec<Arc<PendingChange>> {
        ids.filter_map(|id| self.get(id)).collect()
    }

    /// Store a record, evicting whatever held its server or local key
    fn insert(&mut self, change: Arc<PendingChange>, keys: RecordKeys) -> Evicted {
        let mut evicted = Evicted::new();
        if let Some(occupant) = self.by_server.get(&keys.server).copied() {
            evicted.extend(self.remove_id(occupant));
        }
        if let Some(occupant) = keys.local.as_ref().and_then(|local| self.by_local.get(local)).copied() {
            evicted.extend(self.remove_id(occupant));
        }

        let server_hierarchy = keys.server_hierarchy();
        let local_hierarchy = keys.local_hierarchy(self.style);
        let server_key = keys.server.clone();
        let local_key = keys.local.clone();

        let id = self.arena.insert(change, keys);
        self.by_server.insert(server_key, id);
        self.server_tree.insert(&server_hierarchy, id);
        if let (Some(local), Some(hierarchy)) = (local_key, local_hierarchy) {
            self.by_local.insert(local, id);
            self.local_tree.insert(&hierarchy, id);
        }
        evicted
    }

    /// Drop a record from the arena and all four indices
    fn remove_id(&mut self, id: RecordId) -> Option<Arc<PendingChange>> {
        let slot = self.arena.remove(id)?;

        if self.by_server.get(&slot.keys.server) == Some(&id) {
            self.by_server.remove(&slot.keys.server);
        }
        self.server_tree.remove(&slot.keys.server_hierarchy(), id);

        if let Some(local) = &slot.keys.local {
            if self.by_local.get(local) == Some(&id) {
                self.by_local.remove(local);
            }
        }
        if let Some(hierarchy) = slot.keys.local_hierarchy(self.style) {
            self.local_tree.remove(&hierarchy, id);
        }

        Some(slot.change)
    }

    fn clear(&mut self) -> usize {
        let count = self.arena.len();
        self.arena.clear();
        self.by_server.clear();
        self.by_local.clear();
        self.server_tree.clear();
        self.local_tree.clear();
        count
    }
}

impl PendingChangeCollection {
    pub fn new(translator: Arc<dyn PathTranslator>) -> Self {
        let style = translator.local_style();
        Self {
            translator,
            state: Mutex::new(State::new(style)),
        }
    }

    pub fn local_style(&self) -> LocalPathStyle {
        self.state.lock().style
    }

    pub fn translator(&self) -> &Arc<dyn PathTranslator> {
        &self.translator
    }

    /// Store a change, returning the record it replaced
    ///
    /// Unless `for_refill` is set the change first goes through [`remove`],
    /// so a record found by server path or rename source is replaced (and a
    /// renamed folder's children are retargeted). A record that still holds
    /// the new change's local path is evicted as well; it is returned when
    /// nothing was replaced by server path.
    ///
    /// Paths are validated before anything changes.
    ///
    /// [`remove`]: PendingChangeCollection::remove
    pub fn add(
        &self,
        change: impl Into<Arc<PendingChange>>,
        for_refill: bool,
    ) -> PathResult<Option<Arc<PendingChange>>> {
        Ok(self.add_with_evictions(change, for_refill)?.record)
    }

    /// Like [`add`](PendingChangeCollection::add), also reporting every other
    /// record the add pushed out
    pub fn add_with_evictions(
        &self,
        change: impl Into<Arc<PendingChange>>,
        for_refill: bool,
    ) -> PathResult<Applied> {
        let change = change.into();
        let mut state = self.state.lock();
        let keys = RecordKeys::for_change(&change, state.style)?;

        let mut applied = Applied::default();
        if !for_refill {
            if let Some(id) = self.find_for_removal(&state, &change)? {
                applied.record = self.remove_and_retarget(&mut state, id, &mut applied.evicted);
            }
        }

        trace!(server_item = %change.server_item, for_refill, "Adding pending change");
        let mut evicted = state.insert(change, keys).into_iter();
        if applied.record.is_none() {
            applied.record = evicted.next();
        }
        applied.evicted.extend(evicted);
        Ok(applied)
    }

    /// Remove the stored record matching `change`
    ///
    /// The record is looked up by server path, then by the change's source
    /// server path, then by its source local path translated to the server.
    /// Removing a renamed folder moves its cached descendants back under
    /// the rename source.
    pub fn remove(&self, change: &PendingChange) -> PathResult<Option<Arc<PendingChange>>> {
        Ok(self.remove_with_evictions(change)?.record)
    }

    /// Like [`remove`](PendingChangeCollection::remove), also reporting
    /// records evicted by retargeted descendants
    pub fn remove_with_evictions(&self, change: &PendingChange) -> PathResult<Applied> {
        let mut state = self.state.lock();
        let mut applied = Applied::default();
        if let Some(id) = self.find_for_removal(&state, change)? {
            applied.record = self.remove_and_retarget(&mut state, id, &mut applied.evicted);
        }
        Ok(applied)
    }

    /// Empty every index, returning how many records were dropped
    pub fn clear(&self) -> usize {
        let count = self.state.lock().clear();
        debug!(count, "Cleared pending changes");
        count
    }

    /// Swap a stored record for a replacement with the same paths
    ///
    /// Returns false without changing anything when `current` is no longer
    /// the stored record or the replacement would move it.
    pub fn replace(
        &self,
        current: &Arc<PendingChange>,
        replacement: PendingChange,
    ) -> PathResult<bool> {
        let mut state = self.state.lock();
        let keys = RecordKeys::for_change(&replacement, state.style)?;

        let Some(id) = state.by_server.get(&keys.server).copied() else {
            return Ok(false);
        };
        let Some(slot) = state.arena.get_mut(id) else {
            return Ok(false);
        };
        if !Arc::ptr_eq(&slot.change, current) || slot.keys != keys {
            return Ok(false);
        }

        slot.change = Arc::new(replacement);
        Ok(true)
    }

    pub fn by_server_path(&self, path: &str) -> PathResult<Option<Arc<PendingChange>>> {
        let key = server_path::index_key(path)?;
        let state = self.state.lock();
        Ok(state.by_server.get(&key).and_then(|id| state.get(*id)))
    }

    pub fn by_local_path(&self, path: &str) -> PathResult<Option<Arc<PendingChange>>> {
        let state = self.state.lock();
        let key = local_path::index_key(state.style, path)?;
        Ok(state.by_local.get(&key).and_then(|id| state.get(*id)))
    }

    /// Records at or beneath a server path
    pub fn by_server_path_recursive(&self, path: &str) -> PathResult<Vec<Arc<PendingChange>>> {
        let key = server_path::index_key(path)?;
        let state = self.state.lock();
        Ok(state.snapshot(state.server_tree.ids(&key)))
    }

    /// Records at or beneath a local path
    pub fn by_local_path_recursive(&self, path: &str) -> PathResult<Vec<Arc<PendingChange>>> {
        let state = self.state.lock();
        let key = local_path::index_key(state.style, path)?;
        Ok(state.snapshot(state.local_tree.ids(&key)))
    }

    /// Whether anything is cached at or beneath a local path, without
    /// building a snapshot
    pub fn has_by_local_path_recursive(&self, path: &str) -> PathResult<bool> {
        let state = self.state.lock();
        let key = local_path::index_key(state.style, path)?;
        Ok(state.local_tree.contains(&key))
    }

    /// The rename whose source is `path`
    pub fn rename_by_source_server_path(
        &self,
        path: &str,
    ) -> PathResult<Option<Arc<PendingChange>>> {
        let key = server_path::index_key(path)?;
        let state = self.state.lock();
        let found = state.arena.iter().find_map(|(_, slot)| {
            let source = slot.change.source_server_item.as_deref()?;
            let source_key = server_path::index_key(source).ok()?;
            (source_key == key).then(|| Arc::clone(&slot.change))
        });
        Ok(found)
    }

    pub fn len(&self) -> usize {
        self.state.lock().arena.len()
    }

    /// Same as [`len`](PendingChangeCollection::len)
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored record, oldest first
    pub fn values(&self) -> Vec<Arc<PendingChange>> {
        let state = self.state.lock();
        state.arena.iter().map(|(_, slot)| Arc::clone(&slot.change)).collect()
    }

    fn find_for_removal(&self, state: &State, change: &PendingChange) -> PathResult<Option<RecordId>> {
        let key = server_path::index_key(&change.server_item)?;
        if let Some(id) = state.by_server.get(&key) {
            return Ok(Some(*id));
        }

        if let Some(source) = change.source_server_item.as_deref() {
            let key = server_path::index_key(source)?;
            if let Some(id) = state.by_server.get(&key) {
                return Ok(Some(*id));
            }
        }

        if let Some(source_local) = change.source_local_item.as_deref() {
            if let Some(server) = self.translator.server_path_for(source_local) {
                let key = server_path::index_key(&server)?;
                if let Some(id) = state.by_server.get(&key) {
                    return Ok(Some(*id));
                }
            }
        }

        Ok(None)
    }

    fn remove_and_retarget(
        &self,
        state: &mut State,
        id: RecordId,
        evicted: &mut Evicted,
    ) -> Option<Arc<PendingChange>> {
        let removed = state.remove_id(id)?;
        trace!(server_item = %removed.server_item, "Removed pending change");
        if removed.is_folder_rename() {
            self.retarget(state, &removed, evicted);
        }
        Some(removed)
    }

    /// Move the cached descendants of a removed folder rename from the
    /// rename target back under its source
    fn retarget(&self, state: &mut State, renamed: &PendingChange, evicted: &mut Evicted) {
        let style = state.style;
        let paths = match self.resolve_retarget(renamed, style) {
            Some(Ok(paths)) => paths,
            Some(Err(e)) => {
                warn!(server_item = %renamed.server_item, error = %e, "Cannot retarget children");
                return;
            }
            None => {
                warn!(
                    server_item = %renamed.server_item,
                    "Cannot resolve rename source paths, leaving children in place"
                );
                return;
            }
        };

        let children: Vec<RecordId> = state
            .server_tree
            .ids(&paths.old_server.to_lowercase())
            .collect();
        let mut moved = 0usize;

        for child_id in children {
            // An earlier move may have evicted this child
            let Some(child) = state.get(child_id) else {
                continue;
            };

            let (record, keys) = match paths.apply(&child, style) {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(server_item = %child.server_item, error = %e, "Skipping child during retarget");
                    continue;
                }
            };

            state.remove_id(child_id);
            let displaced = state.insert(Arc::new(record), keys);
            if !displaced.is_empty() {
                debug!(
                    server_item = %child.server_item,
                    evicted = displaced.len(),
                    "Retargeted child displaced cached records"
                );
            }
            evicted.extend(displaced);
            moved += 1;
        }

        debug!(
            from = %paths.old_server,
            to = %paths.new_server,
            moved,
            "Retargeted children of renamed folder"
        );
    }

    /// Old and new parent paths of a folder rename, filling gaps through
    /// the translator. `None` when a path cannot be determined.
    fn resolve_retarget(
        &self,
        renamed: &PendingChange,
        style: LocalPathStyle,
    ) -> Option<PathResult<RetargetPaths>> {
        let new_server = renamed.source_server_item.clone().or_else(|| {
            renamed
                .source_local_item
                .as_deref()
                .and_then(|local| self.translator.server_path_for(local))
        })?;
        let old_local = renamed
            .local_item
            .clone()
            .or_else(|| self.translator.local_path_for(&renamed.server_item))?;
        let new_local = renamed
            .source_local_item
            .clone()
            .or_else(|| self.translator.local_path_for(&new_server))?;

        Some(RetargetPaths::canonical(
            &renamed.server_item,
            &new_server,
            &old_local,
            &new_local,
            style,
        ))
    }
}

struct RetargetPaths {
    old_server: String,
    new_server: String,
    old_local: String,
    new_local: String,
}

impl RetargetPaths {
    fn canonical(
        old_server: &str,
        new_server: &str,
        old_local: &str,
        new_local: &str,
        style: LocalPathStyle,
    ) -> PathResult<Self> {
        Ok(Self {
            old_server: server_path::canonicalize(old_server)?,
            new_server: server_path::canonicalize(new_server)?,
            old_local: local_path::canonicalize(style, old_local)?,
            new_local: local_path::canonicalize(style, new_local)?,
        })
    }

    /// A copy of `child` moved from the old parent to the new one
    fn apply(
        &self,
        child: &PendingChange,
        style: LocalPathStyle,
    ) -> PathResult<(PendingChange, RecordKeys)> {
        let mut record = child.clone();

        let server = server_path::canonicalize(&child.server_item)?;
        let relative = server_path::make_relative(&server, &self.old_server);
        record.server_item = server_path::combine(&self.new_server, relative)?;

        if let Some(local) = child.local_item.as_deref() {
            let local = local_path::canonicalize(style, local)?;
            let relative = local_path::make_relative(style, &local, &self.old_local);
            record.local_item = Some(local_path::combine(style, &self.new_local, relative)?);
        }

        let keys = RecordKeys::for_change(&record, style)?;
        Ok((record, keys))
    }
}

#[cfg(test)]
impl PendingChangeCollection {
    /// Panic unless the four indices and the arena agree
    pub(crate) fn assert_consistent(&self) {
        let state = self.state.lock();
        assert_eq!(state.by_server.len(), state.arena.len());

        let mut with_local = 0;
        for (id, slot) in state.arena.iter() {
            assert_eq!(state.by_server.get(&slot.keys.server), Some(&id));
            for ancestor in slot.keys.server_hierarchy().iter() {
                assert!(state.server_tree.ids(ancestor).any(|member| member == id));
            }
            if let Some(local) = &slot.keys.local {
                with_local += 1;
                assert_eq!(state.by_local.get(local), Some(&id));
                for ancestor in slot.keys.local_hierarchy(state.style).unwrap_or_default().iter() {
                    assert!(state.local_tree.ids(ancestor).any(|member| member == id));
                }
            }
        }
        assert_eq!(state.by_local.len(), with_local);

        for tree in [&state.server_tree, &state.local_tree] {
            for (_, members) in tree.buckets() {
                assert!(!members.is_empty());
                for member in members {
                    assert!(state.arena.get(*member).is_some());
                }
            }
        }
    }
}
