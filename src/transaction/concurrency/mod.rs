// Transaction concurrency module exports

pub mod transaction_manager;
pub mod transaction;

// Public exports
pub use transaction_manager::{TransactionManager, TransactionManagerConfig};
pub use transaction::{
    IsolationLevel, Result, TimestampBoundary, Transaction, TransactionError, TransactionState,
};
