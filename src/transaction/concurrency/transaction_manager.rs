use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;
use parking_lot::Mutex;

use crate::common::types::{Timestamp, TransactionId, TRANSACTION_ID_START};
use crate::transaction::{
    IsolationLevel, Result, TimestampBoundary, Transaction, TransactionContext, TransactionError,
};

/// Transaction manager configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionManagerConfig {
    /// Isolation level of transactions started with `begin_transaction`
    pub isolation_level: IsolationLevel,
    /// Snapshot boundary of transactions started with `begin_transaction`
    pub timestamp_boundary: TimestampBoundary,
}

/// Transaction manager - responsible for creating and tracking transactions
pub struct TransactionManager {
    config: TransactionManagerConfig,

    /// Start and commit timestamps share this counter
    next_timestamp: AtomicU64,

    /// Next transaction ID to assign
    next_transaction_id: AtomicU64,

    /// Active transactions map (transaction id -> Transaction)
    active_transactions: Mutex<HashMap<TransactionId, Arc<Transaction>>>,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new(TransactionManagerConfig::default())
    }
}

impl TransactionManager {
    /// Create a new transaction manager
    pub fn new(config: TransactionManagerConfig) -> Self {
        Self {
            config,
            next_timestamp: AtomicU64::new(1),
            next_transaction_id: AtomicU64::new(TRANSACTION_ID_START),
            active_transactions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &TransactionManagerConfig {
        &self.config
    }

    /// Begin a new transaction with the configured isolation
    pub fn begin_transaction(&self) -> Arc<Transaction> {
        self.begin_transaction_with(self.config.isolation_level, self.config.timestamp_boundary)
    }

    /// Begin a new transaction with explicit isolation
    pub fn begin_transaction_with(&self, isolation_level: IsolationLevel, boundary: TimestampBoundary) -> Arc<Transaction> {
        // allocating under the lock keeps begins out of a commit in progress
        let mut txns = self.active_transactions.lock();
        let start_time = self.next_timestamp.fetch_add(1, Ordering::SeqCst);
        let txn_id = self.next_transaction_id.fetch_add(1, Ordering::SeqCst);

        let txn = Arc::new(Transaction::new(txn_id, start_time, isolation_level, boundary));
        txns.insert(txn_id, txn.clone());

        info!("Began transaction {} at {} ({:?})", txn_id, start_time, isolation_level);
        txn
    }

    /// Commit a transaction, returning its commit timestamp
    pub fn commit_transaction(&self, txn_id: TransactionId) -> Result<Timestamp> {
        let mut txns = self.active_transactions.lock();

        let txn = txns.get(&txn_id).cloned().ok_or(TransactionError::NotFound(txn_id))?;
        let commit_id = self.next_timestamp.fetch_add(1, Ordering::SeqCst);
        txn.commit(commit_id)?;
        txns.remove(&txn_id);

        info!("Committed transaction {} at {}", txn_id, commit_id);
        Ok(commit_id)
    }

    /// Abort a transaction, rolling back its catalog changes
    pub fn abort_transaction(&self, txn_id: TransactionId) -> Result<()> {
        let txn = {
            let mut txns = self.active_transactions.lock();
            txns.remove(&txn_id).ok_or(TransactionError::NotFound(txn_id))?
        };

        txn.abort()?;

        info!("Aborted transaction {}", txn_id);
        Ok(())
    }

    /// Get an active transaction
    pub fn get_transaction(&self, txn_id: TransactionId) -> Option<Arc<Transaction>> {
        self.active_transactions.lock().get(&txn_id).cloned()
    }

    /// Check if a transaction is active
    pub fn transaction_exists(&self, txn_id: TransactionId) -> bool {
        self.active_transactions.lock().contains_key(&txn_id)
    }

    /// Get the IDs of all active transactions, oldest first
    pub fn get_active_transaction_ids(&self) -> Vec<TransactionId> {
        let mut ids: Vec<TransactionId> = self.active_transactions.lock().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Start time of the oldest active transaction, or the next timestamp if
    /// none is active. Versions superseded before this are invisible to all.
    pub fn lowest_active_start(&self) -> Timestamp {
        let txns = self.active_transactions.lock();
        txns.values()
            .map(|txn| txn.start_time())
            .min()
            .unwrap_or_else(|| self.next_timestamp.load(Ordering::SeqCst))
    }
}
