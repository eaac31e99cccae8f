// Name mapping
//
// A name's binding to an entry index is itself versioned: one transaction can
// drop or rename a name while another still reads the old binding.

use std::collections::HashMap;

use crate::catalog::chain::{oldest_needed, VersionArena, VersionId, VersionNode};
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::common::types::{EntryIndex, Timestamp};
use crate::transaction::TransactionContext;

/// One version of a name binding
pub type MappingValue = VersionNode<EntryIndex>;

/// Versioned name -> entry index table of one catalog set
#[derive(Debug, Default)]
pub struct NameMapping {
    heads: HashMap<String, VersionId>,
    versions: VersionArena<EntryIndex>,
}

impl NameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the name has ever been bound (in any retained version)
    pub fn contains(&self, name: &str) -> bool {
        self.heads.contains_key(name)
    }

    /// Binding of `name` visible to the transaction, tombstones included
    pub fn get(&self, ctx: &dyn TransactionContext, name: &str) -> Option<&MappingValue> {
        let head = self.heads.get(name).copied();
        self.versions.visible(ctx, head).map(|id| self.versions.get(id))
    }

    /// Index bound to `name` for the transaction, if the binding is live
    pub fn bound_index(&self, ctx: &dyn TransactionContext, name: &str) -> Option<EntryIndex> {
        self.get(ctx, name).filter(|m| !m.deleted).map(|m| m.value)
    }

    /// Newest binding of `name`, regardless of visibility
    pub fn latest(&self, name: &str) -> Option<&MappingValue> {
        self.heads.get(name).map(|&id| self.versions.get(id))
    }

    /// Fail if another transaction is writing, or has written past our
    /// snapshot, the binding of `name`
    pub fn check_conflict(&self, ctx: &dyn TransactionContext, name: &str) -> CatalogResult<()> {
        match self.latest(name) {
            Some(latest) if ctx.has_conflict(latest.timestamp) => Err(CatalogError::WriteConflict(name.to_string())),
            _ => Ok(()),
        }
    }

    /// Bind `name` to `entry_index` at `timestamp`. Conflicts must already be checked.
    pub fn put(&mut self, name: &str, entry_index: EntryIndex, timestamp: Timestamp) -> VersionId {
        self.push(name, entry_index, timestamp, false)
    }

    /// Push a tombstone for `name`. The name must currently be bound.
    pub fn delete(&mut self, name: &str, timestamp: Timestamp) -> VersionId {
        let entry_index = match self.latest(name) {
            Some(latest) => latest.value,
            None => panic!("deleting mapping of unbound name \"{}\"", name),
        };
        self.push(name, entry_index, timestamp, true)
    }

    fn push(&mut self, name: &str, entry_index: EntryIndex, timestamp: Timestamp, deleted: bool) -> VersionId {
        let head = self.heads.get(name).copied();
        let id = self.versions.push(head, entry_index, timestamp, deleted);
        self.heads.insert(name.to_string(), id);
        id
    }

    /// Roll back one mapping version of `name`
    pub fn remove_version(&mut self, name: &str, version: VersionId) {
        let node = self.versions.unlink(version);
        if self.heads.get(name) == Some(&version) {
            match node.older {
                Some(older) => {
                    self.heads.insert(name.to_string(), older);
                }
                None => {
                    self.heads.remove(name);
                }
            }
        }
    }

    pub fn set_timestamp(&mut self, version: VersionId, timestamp: Timestamp) {
        self.versions.get_mut(version).timestamp = timestamp;
    }

    /// Names with at least one retained binding
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.heads.keys().map(String::as_str)
    }

    /// Number of retained mapping versions
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Free mapping versions no transaction at or after `horizon` can reach
    pub fn vacuum(&mut self, horizon: Timestamp) -> usize {
        let heads: Vec<VersionId> = self.heads.values().copied().collect();
        let mut freed = 0;
        for head in heads {
            if let Some(keep) = oldest_needed(&self.versions, Some(head), horizon) {
                freed += self.versions.prune_older_than(keep);
            }
        }
        freed
    }
}
