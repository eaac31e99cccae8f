// Helpers for unit tests

use std::cell::RefCell;

use crate::catalog::undo::UndoRecord;
use crate::common::types::{is_committed, Timestamp, TransactionId, TRANSACTION_ID_START};
use crate::transaction::TransactionContext;

/// Snapshot transaction with a fixed start time and no manager behind it
pub struct FixedContext {
    transaction_id: TransactionId,
    start_time: Timestamp,
    undo: RefCell<Vec<UndoRecord>>,
}

impl FixedContext {
    /// Transaction `TRANSACTION_ID_START + offset` seeing commits before `start_time`
    pub fn snapshot(offset: u64, start_time: Timestamp) -> Self {
        Self {
            transaction_id: TRANSACTION_ID_START + offset,
            start_time,
            undo: RefCell::new(Vec::new()),
        }
    }

    pub fn take_undo(&self) -> Vec<UndoRecord> {
        self.undo.take()
    }

    pub fn commit(&self, commit_timestamp: Timestamp) {
        for record in self.take_undo() {
            record.commit(commit_timestamp);
        }
    }

    pub fn rollback(&self) {
        for record in self.take_undo().into_iter().rev() {
            record.undo();
        }
    }

    fn sees_committed(&self, timestamp: Timestamp) -> bool {
        is_committed(timestamp) && timestamp < self.start_time
    }
}

impl TransactionContext for FixedContext {
    fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    fn start_time(&self) -> Timestamp {
        self.start_time
    }

    fn use_timestamp(&self, timestamp: Timestamp) -> bool {
        timestamp == self.transaction_id || self.sees_committed(timestamp)
    }

    fn has_conflict(&self, timestamp: Timestamp) -> bool {
        timestamp != self.transaction_id && !self.sees_committed(timestamp)
    }

    fn is_active(&self) -> bool {
        true
    }

    fn push_undo(&self, record: UndoRecord) {
        self.undo.borrow_mut().push(record);
    }
}
