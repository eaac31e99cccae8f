// Entry index table
//
// Dense table from entry index to the head of that object's version chain.
// Indices are handed out once per logical object and never reused.

use crate::catalog::chain::{oldest_needed, VersionArena, VersionId};
use crate::catalog::entry::{EntryPayload, VersionedEntry};
use crate::common::types::{is_committed, EntryIndex, Timestamp};
use crate::transaction::TransactionContext;

#[derive(Debug, Default)]
pub struct EntryIndexTable {
    heads: Vec<Option<VersionId>>,
    versions: VersionArena<EntryPayload>,
}

impl EntryIndexTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next entry index
    pub fn allocate(&mut self) -> EntryIndex {
        self.heads.push(None);
        self.heads.len() - 1
    }

    /// Number of indices handed out so far
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    fn head_id(&self, entry_index: EntryIndex) -> Option<VersionId> {
        match self.heads.get(entry_index) {
            Some(head) => *head,
            None => panic!("catalog entry index {} was never allocated", entry_index),
        }
    }

    /// Newest version of the object, regardless of transaction
    pub fn head(&self, entry_index: EntryIndex) -> Option<&VersionedEntry> {
        self.head_id(entry_index).map(|id| self.versions.get(id))
    }

    /// Version of the object visible to the transaction, tombstones included
    pub fn visible(&self, ctx: &dyn TransactionContext, entry_index: EntryIndex) -> Option<&VersionedEntry> {
        self.versions
            .visible(ctx, self.head_id(entry_index))
            .map(|id| self.versions.get(id))
    }

    pub fn version(&self, version: VersionId) -> &VersionedEntry {
        self.versions.get(version)
    }

    /// Prepend a version to the object's chain
    pub fn push_version(&mut self, payload: EntryPayload, timestamp: Timestamp, deleted: bool) -> VersionId {
        let entry_index = payload.entry_index;
        let head = self.head_id(entry_index);
        let id = self.versions.push(head, payload, timestamp, deleted);
        self.heads[entry_index] = Some(id);
        id
    }

    /// Roll back one version, restoring its predecessor as head if needed
    pub fn remove_version(&mut self, entry_index: EntryIndex, version: VersionId) {
        let node = self.versions.unlink(version);
        if node.value.entry_index != entry_index {
            panic!(
                "catalog version {} belongs to entry {}, not {}",
                version, node.value.entry_index, entry_index
            );
        }
        if self.heads[entry_index] == Some(version) {
            self.heads[entry_index] = node.older;
        }
    }

    pub fn set_timestamp(&mut self, version: VersionId, timestamp: Timestamp) {
        self.versions.get_mut(version).timestamp = timestamp;
    }

    /// Iterate `(entry_index, head)` in storage order, skipping empty slots
    pub fn iter(&self) -> impl Iterator<Item = (EntryIndex, &VersionedEntry)> + '_ {
        self.heads
            .iter()
            .enumerate()
            .filter_map(|(index, head)| head.map(|id| (index, self.versions.get(id))))
    }

    /// Indices whose chain is non-empty
    pub fn occupied(&self) -> impl Iterator<Item = EntryIndex> + '_ {
        self.heads
            .iter()
            .enumerate()
            .filter(|(_, head)| head.is_some())
            .map(|(index, _)| index)
    }

    /// Indices whose head is a tombstone committed before `horizon`
    pub fn dropped_before(&self, horizon: Timestamp) -> Vec<EntryIndex> {
        self.iter()
            .filter(|(_, head)| head.deleted && is_committed(head.timestamp) && head.timestamp < horizon)
            .map(|(index, _)| index)
            .collect()
    }

    /// Number of retained versions across all chains
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Free versions no transaction at or after `horizon` can reach
    pub fn vacuum(&mut self, horizon: Timestamp) -> usize {
        let mut freed = 0;
        for index in 0..self.heads.len() {
            if let Some(keep) = oldest_needed(&self.versions, self.heads[index], horizon) {
                freed += self.versions.prune_older_than(keep);
            }
        }
        freed
    }
}
