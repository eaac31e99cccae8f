// Transaction context consumed by the catalog
//
// The catalog never decides isolation semantics itself. Every visibility and
// conflict question is answered by the transaction that is asking.

use std::sync::Arc;

use crate::catalog::undo::UndoRecord;
use crate::common::types::{Timestamp, TransactionId};

/// Read and write context of the transaction driving a catalog operation
pub trait TransactionContext {
    /// Provisional timestamp written on versions this transaction creates
    fn transaction_id(&self) -> TransactionId;

    /// Snapshot boundary of this transaction
    fn start_time(&self) -> Timestamp;

    /// Whether a version written at `timestamp` is visible to this transaction
    fn use_timestamp(&self, timestamp: Timestamp) -> bool;

    /// Whether a version written at `timestamp` collides with a write by this transaction
    fn has_conflict(&self, timestamp: Timestamp) -> bool;

    /// Whether the transaction may still write. Checked before any catalog
    /// mutation, never under a set lock.
    fn is_active(&self) -> bool;

    /// Remember a catalog change so it can be stamped on commit or undone on abort
    fn push_undo(&self, record: UndoRecord);
}

impl<T: TransactionContext + ?Sized> TransactionContext for Arc<T> {
    fn transaction_id(&self) -> TransactionId {
        (**self).transaction_id()
    }

    fn start_time(&self) -> Timestamp {
        (**self).start_time()
    }

    fn use_timestamp(&self, timestamp: Timestamp) -> bool {
        (**self).use_timestamp(timestamp)
    }

    fn has_conflict(&self, timestamp: Timestamp) -> bool {
        (**self).has_conflict(timestamp)
    }

    fn is_active(&self) -> bool {
        (**self).is_active()
    }

    fn push_undo(&self, record: UndoRecord) {
        (**self).push_undo(record)
    }
}
