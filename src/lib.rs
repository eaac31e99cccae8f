// BayunDB versioned catalog

pub mod common;
pub mod catalog;
pub mod transaction;

#[cfg(test)]
mod test_util;

// Re-export key items for convenient access
pub use catalog::{Catalog, CatalogConfig, CatalogEntry, CatalogError, CatalogSet, CatalogType};
pub use transaction::{Transaction, TransactionContext, TransactionManager};
