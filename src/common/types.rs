/// Commit or start timestamp handed out by the transaction manager
pub type Timestamp = u64;

/// Provisional timestamp stamped on versions written by an uncommitted transaction
pub type TransactionId = u64;

/// Stable identity of a logical catalog object within its catalog set
pub type EntryIndex = usize;

/// Identity of a catalog set, also the global lock order for cascading drops
pub type SetId = u32;

/// First transaction id. Everything below this value is a commit timestamp.
pub const TRANSACTION_ID_START: TransactionId = 4_611_686_018_427_388_000;

/// Timestamp of entries that exist from the start, visible to every transaction
pub const BOOTSTRAP_TIMESTAMP: Timestamp = 0;

/// Check whether a timestamp belongs to a committed version
pub fn is_committed(timestamp: Timestamp) -> bool {
    timestamp < TRANSACTION_ID_START
}

/// Identity of a catalog object across all catalog sets.
///
/// The pair survives renames, so collaborators that must refer to an object
/// without caring about its current name (the dependency manager) use this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub set_id: SetId,
    pub entry_index: EntryIndex,
}

impl ObjectId {
    pub fn new(set_id: SetId, entry_index: EntryIndex) -> Self {
        Self { set_id, entry_index }
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.set_id, self.entry_index)
    }
}
