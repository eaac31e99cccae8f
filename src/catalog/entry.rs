// Catalog entries
//
// The versioning engine knows nothing about tables or views. It stores
// objects through the `CatalogObject` capability trait and hands callers
// owned `CatalogEntry` snapshots.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::alter::AlterInfo;
use crate::catalog::chain::VersionNode;
use crate::catalog::error::{CatalogError, CatalogResult};
use crate::common::types::{EntryIndex, ObjectId, SetId, Timestamp};

/// Kinds of objects stored in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CatalogType {
    Table,
    View,
    ScalarFunction,
}

impl CatalogType {
    /// Parse the keyword used by the shell
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_lowercase().as_str() {
            "table" | "tables" => Some(CatalogType::Table),
            "view" | "views" => Some(CatalogType::View),
            "function" | "functions" => Some(CatalogType::ScalarFunction),
            _ => None,
        }
    }
}

impl fmt::Display for CatalogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogType::Table => write!(f, "Table"),
            CatalogType::View => write!(f, "View"),
            CatalogType::ScalarFunction => write!(f, "Scalar Function"),
        }
    }
}

/// Capabilities the catalog needs from a stored object
pub trait CatalogObject: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn catalog_type(&self) -> CatalogType;

    /// Internal system entries cannot be dropped
    fn is_internal(&self) -> bool {
        false
    }

    /// Produce the next version of this object with `info` applied
    fn alter(&self, info: &AlterInfo) -> CatalogResult<Arc<dyn CatalogObject>> {
        Err(CatalogError::Unsupported(format!(
            "cannot {} on {} \"{}\"",
            info.describe(),
            self.catalog_type(),
            self.name()
        )))
    }

    fn as_any(&self) -> &dyn Any;
}

/// Data carried by one version of a catalog object
#[derive(Debug, Clone)]
pub struct EntryPayload {
    /// Name the object had in this version
    pub name: String,
    /// Identity shared by all versions of the object
    pub entry_index: EntryIndex,
    /// `None` for tombstones
    pub object: Option<Arc<dyn CatalogObject>>,
}

impl EntryPayload {
    pub fn live(name: &str, entry_index: EntryIndex, object: Arc<dyn CatalogObject>) -> Self {
        Self {
            name: name.to_string(),
            entry_index,
            object: Some(object),
        }
    }

    pub fn tombstone(name: &str, entry_index: EntryIndex) -> Self {
        Self {
            name: name.to_string(),
            entry_index,
            object: None,
        }
    }
}

/// One version of a catalog object in its chain
pub type VersionedEntry = VersionNode<EntryPayload>;

/// A visible catalog object as seen by one transaction.
///
/// This is a snapshot: it stays valid after the catalog changes, but it does
/// not follow those changes. Re-resolve it after any mutating call.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    set_id: SetId,
    entry_index: EntryIndex,
    name: String,
    timestamp: Timestamp,
    object: Arc<dyn CatalogObject>,
}

impl CatalogEntry {
    /// Snapshot a version, or `None` if it is a tombstone
    pub(crate) fn from_version(set_id: SetId, version: &VersionedEntry) -> Option<Self> {
        if version.deleted {
            return None;
        }
        let object = version.value.object.clone()?;
        Some(Self {
            set_id,
            entry_index: version.value.entry_index,
            name: version.value.name.clone(),
            timestamp: version.timestamp,
            object,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry_index(&self) -> EntryIndex {
        self.entry_index
    }

    pub fn set_id(&self) -> SetId {
        self.set_id
    }

    pub fn object_id(&self) -> ObjectId {
        ObjectId::new(self.set_id, self.entry_index)
    }

    /// Timestamp of the version this snapshot was taken from
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn catalog_type(&self) -> CatalogType {
        self.object.catalog_type()
    }

    pub fn object(&self) -> &Arc<dyn CatalogObject> {
        &self.object
    }

    /// Borrow the stored object as a concrete kind
    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        self.object.as_any().downcast_ref::<T>()
    }
}
