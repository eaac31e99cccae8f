// BayunDB Transaction implementation
// Represents an active transaction and answers the catalog's visibility questions

use parking_lot::Mutex;
use thiserror::Error;

use crate::catalog::undo::UndoRecord;
use crate::common::types::{is_committed, Timestamp, TransactionId};
use crate::transaction::context::TransactionContext;

/// Transaction isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Committed versions are seen as of the start time
    #[default]
    Snapshot,
    /// The newest committed version is always seen
    ReadCommitted,
}

/// How a commit timestamp compares against a snapshot start time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampBoundary {
    /// Visible if committed strictly before the start time
    #[default]
    Exclusive,
    /// Visible if committed at or before the start time
    Inclusive,
}

impl TimestampBoundary {
    pub fn admits(self, commit_timestamp: Timestamp, start_time: Timestamp) -> bool {
        match self {
            TimestampBoundary::Exclusive => commit_timestamp < start_time,
            TimestampBoundary::Inclusive => commit_timestamp <= start_time,
        }
    }
}

/// Transaction states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// Errors that can occur during transaction processing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Transaction {0} is already committed or aborted")]
    InvalidState(TransactionId),

    #[error("Transaction {0} not found")]
    NotFound(TransactionId),
}

/// Result type for transaction operations
pub type Result<T> = std::result::Result<T, TransactionError>;

/// Transaction - represents a database transaction
#[derive(Debug)]
pub struct Transaction {
    /// Transaction ID, also the timestamp of its uncommitted writes
    id: TransactionId,

    /// Snapshot start time
    start_time: Timestamp,

    isolation_level: IsolationLevel,

    boundary: TimestampBoundary,

    state: Mutex<TransactionState>,

    commit_id: Mutex<Option<Timestamp>>,

    /// Catalog changes, oldest first
    undo_buffer: Mutex<Vec<UndoRecord>>,
}

impl Transaction {
    /// Create a new active transaction
    pub fn new(
        id: TransactionId,
        start_time: Timestamp,
        isolation_level: IsolationLevel,
        boundary: TimestampBoundary,
    ) -> Self {
        Self {
            id,
            start_time,
            isolation_level,
            boundary,
            state: Mutex::new(TransactionState::Active),
            commit_id: Mutex::new(None),
            undo_buffer: Mutex::new(Vec::new()),
        }
    }

    /// Get transaction ID
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Get transaction state
    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    /// Get transaction isolation level
    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }

    pub fn boundary(&self) -> TimestampBoundary {
        self.boundary
    }

    /// Commit timestamp, once committed
    pub fn commit_id(&self) -> Option<Timestamp> {
        *self.commit_id.lock()
    }

    /// Number of catalog changes waiting for commit or abort
    pub fn undo_count(&self) -> usize {
        self.undo_buffer.lock().len()
    }

    /// Stamp every change with `commit_id` and mark the transaction committed
    pub(crate) fn commit(&self, commit_id: Timestamp) -> Result<()> {
        let mut state = self.state.lock();
        if *state != TransactionState::Active {
            return Err(TransactionError::InvalidState(self.id));
        }

        let records = std::mem::take(&mut *self.undo_buffer.lock());
        for record in &records {
            record.commit(commit_id);
        }

        *self.commit_id.lock() = Some(commit_id);
        *state = TransactionState::Committed;
        Ok(())
    }

    /// Undo every change, newest first, and mark the transaction aborted
    pub(crate) fn abort(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state != TransactionState::Active {
            return Err(TransactionError::InvalidState(self.id));
        }

        let records = std::mem::take(&mut *self.undo_buffer.lock());
        for record in records.into_iter().rev() {
            record.undo();
        }

        *state = TransactionState::Aborted;
        Ok(())
    }
}

impl TransactionContext for Transaction {
    fn transaction_id(&self) -> TransactionId {
        self.id
    }

    fn start_time(&self) -> Timestamp {
        self.start_time
    }

    fn use_timestamp(&self, timestamp: Timestamp) -> bool {
        if timestamp == self.id {
            return true;
        }
        if !is_committed(timestamp) {
            return false;
        }
        match self.isolation_level {
            IsolationLevel::Snapshot => self.boundary.admits(timestamp, self.start_time),
            IsolationLevel::ReadCommitted => true,
        }
    }

    fn has_conflict(&self, timestamp: Timestamp) -> bool {
        if timestamp == self.id {
            return false;
        }
        if !is_committed(timestamp) {
            return true;
        }
        match self.isolation_level {
            IsolationLevel::Snapshot => !self.boundary.admits(timestamp, self.start_time),
            IsolationLevel::ReadCommitted => false,
        }
    }

    fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    // runs under a set lock, so only the undo buffer lock may be taken here
    fn push_undo(&self, record: UndoRecord) {
        self.undo_buffer.lock().push(record);
    }
}
