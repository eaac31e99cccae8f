// Undo records
//
// Every catalog mutation leaves one record in the writing transaction. On
// commit the record stamps the versions it created with the commit timestamp;
// on abort it unlinks them again.

use crate::catalog::catalog_set::CatalogSet;
use crate::catalog::chain::VersionId;
use crate::common::types::{EntryIndex, ObjectId, SetId, Timestamp};

/// What a catalog mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Alter,
    Rename,
    Drop,
}

/// Versions created by one catalog mutation
#[derive(Debug, Clone)]
pub struct CatalogChange {
    kind: ChangeKind,
    entry_index: EntryIndex,
    entry_version: VersionId,
    /// Mapping versions pushed, in the order they were pushed
    mappings: Vec<(String, VersionId)>,
}

impl CatalogChange {
    pub(crate) fn new(kind: ChangeKind, entry_index: EntryIndex, entry_version: VersionId) -> Self {
        Self {
            kind,
            entry_index,
            entry_version,
            mappings: Vec::new(),
        }
    }

    pub(crate) fn with_mapping(mut self, name: &str, version: VersionId) -> Self {
        self.mappings.push((name.to_string(), version));
        self
    }

    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    pub fn entry_index(&self) -> EntryIndex {
        self.entry_index
    }

    pub(crate) fn entry_version(&self) -> VersionId {
        self.entry_version
    }

    pub(crate) fn mappings(&self) -> &[(String, VersionId)] {
        &self.mappings
    }
}

/// A catalog change remembered by the transaction that made it
#[derive(Debug, Clone)]
pub struct UndoRecord {
    set: CatalogSet,
    change: CatalogChange,
}

impl UndoRecord {
    pub(crate) fn new(set: CatalogSet, change: CatalogChange) -> Self {
        Self { set, change }
    }

    pub fn kind(&self) -> ChangeKind {
        self.change.kind
    }

    pub fn set_id(&self) -> SetId {
        self.set.id()
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(self.set.id(), self.change.entry_index)
    }

    pub fn change(&self) -> &CatalogChange {
        &self.change
    }

    /// Stamp the change's versions with the commit timestamp
    pub fn commit(&self, commit_timestamp: Timestamp) {
        self.set.update_timestamp(&self.change, commit_timestamp);
    }

    /// Roll the change back
    pub fn undo(self) {
        self.set.undo(&self.change);
    }
}
