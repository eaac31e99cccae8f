// Versioned catalog set
//
// One namespace of catalog objects under MVCC. Names resolve to entry indices
// through a versioned mapping, entry indices resolve to version chains, and
// the transaction asking decides which versions it may see. A single lock
// guards every mutation and every multi-entry scan.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, warn};
use parking_lot::{Mutex, MutexGuard, RwLock};

use crate::catalog::alter::AlterInfo;
use crate::catalog::default_generator::DefaultGenerator;
use crate::catalog::dependency::{DependencyGraph, DependencyManager};
use crate::catalog::entry::{CatalogEntry, CatalogObject, EntryPayload, VersionedEntry};
use crate::catalog::entry_index::EntryIndexTable;
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::lock_set::{LockPlan, LockSet};
use crate::catalog::mapping::NameMapping;
use crate::catalog::similarity::most_similar;
use crate::catalog::undo::{CatalogChange, ChangeKind, UndoRecord};
use crate::common::types::{EntryIndex, ObjectId, SetId, Timestamp, BOOTSTRAP_TIMESTAMP};
use crate::transaction::TransactionContext;

/// Registry of live catalog sets.
///
/// A cascading drop reaches the sets of dependent objects through here.
#[derive(Debug, Default)]
pub struct SetRegistry {
    next_id: AtomicU32,
    sets: RwLock<HashMap<SetId, Weak<SetShared>>>,
}

impl SetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&self) -> SetId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn register(&self, shared: &Arc<SetShared>) {
        self.sets.write().insert(shared.id, Arc::downgrade(shared));
    }

    fn unregister(&self, set_id: SetId) {
        self.sets.write().remove(&set_id);
    }

    /// Look up a live set by id
    pub fn get(&self, set_id: SetId) -> Option<CatalogSet> {
        self.sets
            .read()
            .get(&set_id)
            .and_then(Weak::upgrade)
            .map(|shared| CatalogSet { shared })
    }

    /// Live sets named by the plan, in lock order
    pub fn resolve(&self, plan: &LockPlan) -> Vec<CatalogSet> {
        let sets = self.sets.read();
        plan.set_ids()
            .filter_map(|id| sets.get(&id).and_then(Weak::upgrade))
            .map(|shared| CatalogSet { shared })
            .collect()
    }

    /// All live sets
    pub fn sets(&self) -> Vec<CatalogSet> {
        let mut sets: Vec<CatalogSet> = self
            .sets
            .read()
            .values()
            .filter_map(Weak::upgrade)
            .map(|shared| CatalogSet { shared })
            .collect();
        sets.sort_by_key(CatalogSet::id);
        sets
    }

    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct SetShared {
    id: SetId,
    name: String,
    state: Mutex<SetState>,
    registry: Arc<SetRegistry>,
    dependencies: Arc<dyn DependencyManager>,
    defaults: Option<Box<dyn DefaultGenerator>>,
}

impl fmt::Debug for SetShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetShared").field("id", &self.id).field("name", &self.name).finish()
    }
}

impl Drop for SetShared {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

/// Everything guarded by the set lock
#[derive(Debug)]
pub(crate) struct SetState {
    set_id: SetId,
    mapping: NameMapping,
    entries: EntryIndexTable,
    defaults_loaded: bool,
}

impl SetState {
    fn new(set_id: SetId) -> Self {
        Self {
            set_id,
            mapping: NameMapping::new(),
            entries: EntryIndexTable::new(),
            defaults_loaded: false,
        }
    }

    /// Visible, live version of an entry about to be written.
    ///
    /// Fails if the newest version collides with this transaction.
    fn entry_for_write(&self, ctx: &dyn TransactionContext, entry_index: EntryIndex) -> CatalogResult<Option<&VersionedEntry>> {
        if let Some(head) = self.entries.head(entry_index) {
            if ctx.has_conflict(head.timestamp) {
                return Err(CatalogError::WriteConflict(head.value.name.clone()));
            }
        }
        Ok(self.entries.visible(ctx, entry_index).filter(|version| !version.deleted))
    }

    /// Resolve a name for writing: mapping first, then the entry chain
    fn resolve(&self, ctx: &dyn TransactionContext, name: &str) -> CatalogResult<Option<(EntryIndex, &VersionedEntry)>> {
        let entry_index = match self.mapping.bound_index(ctx, name) {
            Some(entry_index) => entry_index,
            None => return Ok(None),
        };
        Ok(self.entry_for_write(ctx, entry_index)?.map(|version| (entry_index, version)))
    }

    fn visible_entry(&self, ctx: &dyn TransactionContext, entry_index: EntryIndex) -> Option<CatalogEntry> {
        self.entries
            .visible(ctx, entry_index)
            .and_then(|version| CatalogEntry::from_version(self.set_id, version))
    }

    /// Fail unless the object a new entry depends on is live for the
    /// transaction and not being written by anybody else
    fn check_dependency(&self, ctx: &dyn TransactionContext, dependency: ObjectId) -> CatalogResult<()> {
        if dependency.entry_index >= self.entries.len() {
            return Err(CatalogError::NotFound(dependency.to_string()));
        }
        match self.entry_for_write(ctx, dependency.entry_index)? {
            Some(_) => Ok(()),
            None => {
                let name = self
                    .entries
                    .head(dependency.entry_index)
                    .map(|head| head.value.name.clone())
                    .unwrap_or_else(|| dependency.to_string());
                Err(CatalogError::NotFound(name))
            }
        }
    }

    /// Name of an entry that may be dropped, or `None` if it is already gone
    /// for this transaction
    fn droppable(&self, ctx: &dyn TransactionContext, entry_index: EntryIndex) -> CatalogResult<Option<String>> {
        let version = match self.entry_for_write(ctx, entry_index)? {
            Some(version) => version,
            None => return Ok(None),
        };
        let name = version.value.name.clone();
        if version.value.object.as_ref().is_some_and(|object| object.is_internal()) {
            return Err(CatalogError::Unsupported(format!(
                "cannot drop \"{}\" because it is an internal system entry",
                name
            )));
        }
        self.mapping.check_conflict(ctx, &name)?;
        Ok(Some(name))
    }

    /// Push tombstones for an entry and its name. Every check must already have passed.
    fn drop_internal(&mut self, ctx: &dyn TransactionContext, set: &CatalogSet, entry_index: EntryIndex) {
        let name = match self.entries.head(entry_index) {
            Some(head) => head.value.name.clone(),
            None => panic!("dropping empty catalog entry {} in set {}", entry_index, self.set_id),
        };
        let timestamp = ctx.transaction_id();
        let entry_version = self.entries.push_version(EntryPayload::tombstone(&name, entry_index), timestamp, true);
        let mapping_version = self.mapping.delete(&name, timestamp);
        ctx.push_undo(UndoRecord::new(
            set.clone(),
            CatalogChange::new(ChangeKind::Drop, entry_index, entry_version).with_mapping(&name, mapping_version),
        ));
        debug!("Dropped catalog entry \"{}\" ({}:{})", name, self.set_id, entry_index);
    }

    /// Materialize a default entry as if it had always existed
    fn create_default(&mut self, name: &str, object: Arc<dyn CatalogObject>) -> Option<CatalogEntry> {
        let entry_index = self.entries.allocate();
        let version = self.entries.push_version(
            EntryPayload::live(name, entry_index, object),
            BOOTSTRAP_TIMESTAMP,
            false,
        );
        self.mapping.put(name, entry_index, BOOTSTRAP_TIMESTAMP);
        debug!("Materialized default entry \"{}\" ({}:{})", name, self.set_id, entry_index);
        CatalogEntry::from_version(self.set_id, self.entries.version(version))
    }

    fn load_defaults(&mut self, defaults: &dyn DefaultGenerator) {
        if self.defaults_loaded {
            return;
        }
        for name in defaults.default_entries() {
            if self.mapping.contains(&name) {
                continue;
            }
            if let Some(object) = defaults.create_default_entry(&name) {
                self.create_default(&name, object);
            }
        }
        self.defaults_loaded = true;
    }
}

fn ensure_active(ctx: &dyn TransactionContext) -> CatalogResult<()> {
    if !ctx.is_active() {
        return Err(CatalogError::TransactionNotActive(ctx.transaction_id()));
    }
    Ok(())
}

fn validate_name(name: &str) -> CatalogResult<()> {
    if name.is_empty() {
        return Err(CatalogError::Unsupported("catalog entry name cannot be empty".to_string()));
    }
    Ok(())
}

/// Handle to a catalog set. Clones share the same set.
#[derive(Clone)]
pub struct CatalogSet {
    shared: Arc<SetShared>,
}

impl fmt::Debug for CatalogSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogSet")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .finish()
    }
}

impl CatalogSet {
    /// Create a set and register it so cascading drops can reach it
    pub fn new(
        registry: &Arc<SetRegistry>,
        name: &str,
        dependencies: Arc<dyn DependencyManager>,
        defaults: Option<Box<dyn DefaultGenerator>>,
    ) -> Self {
        let id = registry.allocate_id();
        let shared = Arc::new(SetShared {
            id,
            name: name.to_string(),
            state: Mutex::new(SetState::new(id)),
            registry: registry.clone(),
            dependencies,
            defaults,
        });
        registry.register(&shared);
        debug!("Created catalog set {} ({})", name, id);
        Self { shared }
    }

    /// A set with a private registry and dependency graph
    pub fn standalone(name: &str) -> Self {
        Self::new(&Arc::new(SetRegistry::new()), name, Arc::new(DependencyGraph::new()), None)
    }

    pub fn id(&self) -> SetId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub(crate) fn lock_state(&self) -> MutexGuard<'_, SetState> {
        self.shared.state.lock()
    }

    /// Create `object` under `name`, registering its dependencies atomically
    /// with the creation
    pub fn create_entry(
        &self,
        ctx: &dyn TransactionContext,
        name: &str,
        object: Arc<dyn CatalogObject>,
        dependencies: &[ObjectId],
    ) -> CatalogResult<()> {
        ensure_active(ctx)?;
        validate_name(name)?;
        if object.name() != name {
            return Err(CatalogError::Unsupported(format!(
                "cannot create \"{}\" from an object named \"{}\"",
                name,
                object.name()
            )));
        }

        // dependencies are checked under their own set locks, taken in set id order
        let mut plan = LockPlan::new();
        plan.include(self.id());
        for dependency in dependencies {
            plan.include(dependency.set_id);
        }
        let sets = self.shared.registry.resolve(&plan);
        let mut locks = LockSet::acquire(&sets);
        for &dependency in dependencies {
            match locks.state(dependency.set_id) {
                Some(state) => state.check_dependency(ctx, dependency)?,
                None => return Err(CatalogError::NotFound(dependency.to_string())),
            }
        }
        let state = match locks.get_mut(self.id()) {
            Some((_, state)) => state,
            None => panic!("catalog set {} missing from its own lock set", self.id()),
        };

        if !state.mapping.contains(name) {
            // a default entry of this name counts as existing
            if let Some(default) = self.shared.defaults.as_ref().and_then(|d| d.create_default_entry(name)) {
                state.create_default(name, default);
            }
        }
        if state.mapping.bound_index(ctx, name).is_some() {
            return Err(CatalogError::DuplicateName(name.to_string()));
        }
        state.mapping.check_conflict(ctx, name)?;

        let timestamp = ctx.transaction_id();
        let entry_index = state.entries.allocate();
        let entry_version = state.entries.push_version(EntryPayload::live(name, entry_index, object), timestamp, false);
        let mapping_version = state.mapping.put(name, entry_index, timestamp);
        self.shared
            .dependencies
            .register_dependencies(ObjectId::new(self.id(), entry_index), dependencies);
        ctx.push_undo(UndoRecord::new(
            self.clone(),
            CatalogChange::new(ChangeKind::Create, entry_index, entry_version).with_mapping(name, mapping_version),
        ));
        debug!("Created catalog entry \"{}\" ({}:{})", name, self.id(), entry_index);
        Ok(())
    }

    /// Apply `info` to the visible version of `name`, keeping its identity
    pub fn alter_entry(&self, ctx: &dyn TransactionContext, name: &str, info: &AlterInfo) -> CatalogResult<()> {
        ensure_active(ctx)?;
        validate_name(name)?;
        let mut state = self.lock_state();
        let (entry_index, current) = state
            .resolve(ctx, name)?
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        let current_object = match &current.value.object {
            Some(object) => object.clone(),
            None => panic!("live catalog version of \"{}\" carries no object", name),
        };

        let new_name = match info.new_name() {
            Some(new_name) => {
                validate_name(new_name)?;
                if state.mapping.bound_index(ctx, new_name).is_some() {
                    return Err(CatalogError::DuplicateName(new_name.to_string()));
                }
                state.mapping.check_conflict(ctx, name)?;
                state.mapping.check_conflict(ctx, new_name)?;
                Some(new_name)
            }
            None => None,
        };
        let altered = current_object.alter(info)?;

        let timestamp = ctx.transaction_id();
        let entry_name = new_name.unwrap_or(name);
        let entry_version = state
            .entries
            .push_version(EntryPayload::live(entry_name, entry_index, altered), timestamp, false);
        let change = match new_name {
            Some(new_name) => {
                let tombstone = state.mapping.delete(name, timestamp);
                let binding = state.mapping.put(new_name, entry_index, timestamp);
                CatalogChange::new(ChangeKind::Rename, entry_index, entry_version)
                    .with_mapping(name, tombstone)
                    .with_mapping(new_name, binding)
            }
            None => CatalogChange::new(ChangeKind::Alter, entry_index, entry_version),
        };
        ctx.push_undo(UndoRecord::new(self.clone(), change));
        debug!("Altered catalog entry \"{}\" ({}) with {}", name, entry_index, info.describe());
        Ok(())
    }

    /// Drop `name`, and with `cascade` everything that depends on it.
    ///
    /// The sets of all objects the drop may reach are locked together in
    /// ascending set id before anything is checked or mutated.
    pub fn drop_entry(&self, ctx: &dyn TransactionContext, name: &str, cascade: bool) -> CatalogResult<()> {
        ensure_active(ctx)?;
        validate_name(name)?;
        loop {
            let entry_index = {
                let state = self.lock_state();
                match state.resolve(ctx, name)? {
                    Some((entry_index, _)) => entry_index,
                    None => return Err(CatalogError::NotFound(name.to_string())),
                }
            };
            let root = ObjectId::new(self.id(), entry_index);

            let mut plan = LockPlan::new();
            plan.include(self.id());
            self.shared.dependencies.cascade_drop(root, &mut plan);
            let sets = self.shared.registry.resolve(&plan);
            let mut locks = LockSet::acquire(&sets);

            // the name may have been rebound, or dependents added, while unlocked
            let still_bound = match locks.state(self.id()) {
                Some(state) => state.resolve(ctx, name)?.map(|(index, _)| index),
                None => panic!("catalog set {} missing from its own lock set", self.id()),
            };
            match still_bound {
                None => return Err(CatalogError::NotFound(name.to_string())),
                Some(index) if index != entry_index => {
                    warn!("Catalog entry \"{}\" was rebound while planning its drop, retrying", name);
                    continue;
                }
                Some(_) => {}
            }
            let mut replan = LockPlan::new();
            replan.include(self.id());
            self.shared.dependencies.cascade_drop(root, &mut replan);
            if !locks.covers(&replan) {
                warn!("Dependents of \"{}\" moved into new catalog sets while planning its drop, retrying", name);
                continue;
            }

            let targets = collect_drop_targets(&locks, ctx, self.shared.dependencies.as_ref(), root, cascade)?;
            for target in &targets {
                match locks.get_mut(target.set_id) {
                    Some((set, state)) => state.drop_internal(ctx, set, target.entry_index),
                    None => panic!("catalog set {} not locked for drop of {}", target.set_id, target),
                }
            }
            debug!("Dropped \"{}\" and {} dependent entries", name, targets.len() - 1);
            return Ok(());
        }
    }

    /// The version of `name` visible to the transaction
    pub fn get_entry(&self, ctx: &dyn TransactionContext, name: &str) -> Option<CatalogEntry> {
        let mut state = self.lock_state();
        match state.mapping.get(ctx, name).map(|mapping| (mapping.deleted, mapping.value)) {
            Some((false, entry_index)) => return state.visible_entry(ctx, entry_index),
            Some((true, _)) => return None,
            None => {}
        }
        // defaults only fill names that were never bound
        if state.mapping.contains(name) {
            return None;
        }
        let object = self.shared.defaults.as_ref()?.create_default_entry(name)?;
        state.create_default(name, object)
    }

    /// The version of the object at `entry_index` visible to the transaction
    pub fn get_entry_by_index(&self, ctx: &dyn TransactionContext, entry_index: EntryIndex) -> Option<CatalogEntry> {
        let state = self.lock_state();
        if entry_index >= state.entries.len() {
            return None;
        }
        state.visible_entry(ctx, entry_index)
    }

    /// Newest version of the object at `entry_index`, regardless of transaction
    pub fn entry_from_index(&self, entry_index: EntryIndex) -> Option<CatalogEntry> {
        let state = self.lock_state();
        if entry_index >= state.entries.len() {
            return None;
        }
        state
            .entries
            .head(entry_index)
            .and_then(|head| CatalogEntry::from_version(self.id(), head))
    }

    /// Newest version bound to the newest mapping of `name`, regardless of transaction
    pub fn get_root_entry(&self, name: &str) -> Option<CatalogEntry> {
        let state = self.lock_state();
        let latest = state.mapping.latest(name)?;
        if latest.deleted {
            return None;
        }
        state
            .entries
            .head(latest.value)
            .and_then(|head| CatalogEntry::from_version(self.id(), head))
    }

    /// Call `callback` for every entry visible to the transaction, in entry
    /// index order. The set lock is held throughout, so the callback must not
    /// call back into this set.
    pub fn scan<F>(&self, ctx: &dyn TransactionContext, mut callback: F)
    where
        F: FnMut(&CatalogEntry),
    {
        let mut state = self.lock_state();
        if let Some(defaults) = &self.shared.defaults {
            state.load_defaults(defaults.as_ref());
        }
        for entry_index in state.entries.occupied() {
            if let Some(entry) = state.visible_entry(ctx, entry_index) {
                callback(&entry);
            }
        }
    }

    /// Every entry visible to the transaction
    pub fn entries(&self, ctx: &dyn TransactionContext) -> Vec<CatalogEntry> {
        let mut entries = Vec::new();
        self.scan(ctx, |entry| entries.push(entry.clone()));
        entries
    }

    /// Visible name closest to `name`, for error messages
    pub fn similar_entry(&self, ctx: &dyn TransactionContext, name: &str) -> Option<String> {
        let state = self.lock_state();
        let candidates = state
            .mapping
            .names()
            .filter(|candidate| state.mapping.bound_index(ctx, candidate).is_some());
        most_similar(name, candidates).map(str::to_string)
    }

    /// Stamp the versions a change created with its commit timestamp
    pub fn update_timestamp(&self, change: &CatalogChange, timestamp: Timestamp) {
        let mut state = self.lock_state();
        state.entries.set_timestamp(change.entry_version(), timestamp);
        for (_, version) in change.mappings() {
            state.mapping.set_timestamp(*version, timestamp);
        }
        debug!(
            "Stamped {:?} of entry {}:{} with commit timestamp {}",
            change.kind(),
            self.id(),
            change.entry_index(),
            timestamp
        );
    }

    /// Roll back an uncommitted change, restoring the versions it superseded
    pub fn undo(&self, change: &CatalogChange) {
        let mut state = self.lock_state();
        for (name, version) in change.mappings().iter().rev() {
            state.mapping.remove_version(name, *version);
        }
        state.entries.remove_version(change.entry_index(), change.entry_version());
        if change.kind() == ChangeKind::Create {
            self.shared
                .dependencies
                .erase_object(ObjectId::new(self.id(), change.entry_index()));
        }
        debug!("Rolled back {:?} of entry {}:{}", change.kind(), self.id(), change.entry_index());
    }

    /// Free versions that no transaction starting at or after `horizon` can see.
    ///
    /// Objects whose drop every such transaction sees also lose their
    /// dependency edges.
    pub fn vacuum(&self, horizon: Timestamp) -> usize {
        let mut state = self.lock_state();
        let freed = state.entries.vacuum(horizon) + state.mapping.vacuum(horizon);
        for entry_index in state.entries.dropped_before(horizon) {
            self.shared.dependencies.erase_object(ObjectId::new(self.id(), entry_index));
        }
        if freed > 0 {
            debug!("Vacuumed {} versions from catalog set {}", freed, self.name());
        }
        freed
    }

    /// Number of entry indices handed out so far
    pub fn entry_index_count(&self) -> usize {
        self.lock_state().entries.len()
    }

    /// Retained entry and mapping versions
    pub fn version_count(&self) -> usize {
        let state = self.lock_state();
        state.entries.version_count() + state.mapping.version_count()
    }
}

/// Validate a drop of `root` and every dependent it reaches.
///
/// Returns the objects to drop, `root` first. Dependents already deleted for
/// this transaction are skipped, and so is everything only they lead to.
fn collect_drop_targets(
    locks: &LockSet<'_>,
    ctx: &dyn TransactionContext,
    dependencies: &dyn DependencyManager,
    root: ObjectId,
    cascade: bool,
) -> CatalogResult<Vec<ObjectId>> {
    let root_state = locks
        .state(root.set_id)
        .unwrap_or_else(|| panic!("catalog set {} not locked", root.set_id));
    let root_name = match root_state.droppable(ctx, root.entry_index)? {
        Some(name) => name,
        None => panic!("catalog entry {} vanished while locked", root),
    };

    let mut targets = vec![root];
    let mut visited = HashSet::from([root]);
    let mut queue = VecDeque::from([root]);
    while let Some(object) = queue.pop_front() {
        for dependent in dependencies.get_dependents(object) {
            if !visited.insert(dependent) {
                continue;
            }
            // the dependent's set no longer exists
            let Some(state) = locks.state(dependent.set_id) else {
                continue;
            };
            let Some(dependent_name) = state.droppable(ctx, dependent.entry_index)? else {
                continue;
            };
            if !cascade {
                return Err(CatalogError::DependencyConflict {
                    name: root_name,
                    dependent: dependent_name,
                });
            }
            targets.push(dependent);
            queue.push_back(dependent);
        }
    }
    Ok(targets)
}
