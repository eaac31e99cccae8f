// Multi-set locking for cascading drops
//
// A cascading drop may have to mutate several catalog sets. The sets are
// collected first into a `LockPlan`, then locked in ascending set id and
// released in reverse, so two cascades touching overlapping sets can never
// wait on each other in a cycle.

use std::collections::BTreeSet;

use parking_lot::MutexGuard;

use crate::catalog::catalog_set::{CatalogSet, SetState};
use crate::common::types::SetId;

/// Accumulates the catalog sets a cascading drop will need
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockPlan {
    sets: BTreeSet<SetId>,
}

impl LockPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(&mut self, set_id: SetId) {
        self.sets.insert(set_id);
    }

    pub fn contains(&self, set_id: SetId) -> bool {
        self.sets.contains(&set_id)
    }

    /// Set ids in lock order
    pub fn set_ids(&self) -> impl Iterator<Item = SetId> + '_ {
        self.sets.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Locks held on several catalog sets at once
pub(crate) struct LockSet<'a> {
    guards: Vec<(&'a CatalogSet, MutexGuard<'a, SetState>)>,
}

impl<'a> LockSet<'a> {
    /// Lock every set in ascending id order
    pub fn acquire(sets: &'a [CatalogSet]) -> Self {
        let mut ordered: Vec<&'a CatalogSet> = sets.iter().collect();
        ordered.sort_by_key(|set| set.id());
        ordered.dedup_by_key(|set| set.id());

        let guards = ordered.into_iter().map(|set| (set, set.lock_state())).collect();
        Self { guards }
    }

    fn position(&self, set_id: SetId) -> Option<usize> {
        self.guards.binary_search_by_key(&set_id, |(set, _)| set.id()).ok()
    }

    /// Whether every set in the plan is held
    pub fn covers(&self, plan: &LockPlan) -> bool {
        plan.set_ids().all(|id| self.position(id).is_some())
    }

    pub fn state(&self, set_id: SetId) -> Option<&SetState> {
        self.position(set_id).map(|pos| &*self.guards[pos].1)
    }

    pub fn get_mut(&mut self, set_id: SetId) -> Option<(&'a CatalogSet, &mut SetState)> {
        let pos = self.position(set_id)?;
        let (set, guard) = &mut self.guards[pos];
        Some((*set, &mut **guard))
    }
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        while let Some((_, guard)) = self.guards.pop() {
            drop(guard);
        }
    }
}
