// BayunDB Transaction Management Module

pub mod concurrency;
pub mod context;

// Public exports
pub use concurrency::{
    IsolationLevel, Result, TimestampBoundary, Transaction, TransactionError, TransactionManager,
    TransactionManagerConfig, TransactionState,
};
pub use context::TransactionContext;
