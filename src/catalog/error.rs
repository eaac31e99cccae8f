use thiserror::Error;

use crate::catalog::entry::CatalogType;
use crate::common::types::TransactionId;

/// Errors reported by catalog operations.
///
/// Every one of these is detected before the catalog is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog entry \"{0}\" already exists")]
    DuplicateName(String),

    #[error("Catalog write-write conflict on \"{0}\"")]
    WriteConflict(String),

    #[error("Catalog entry \"{0}\" does not exist")]
    NotFound(String),

    #[error("Catalog entry \"{name}\" does not exist, did you mean \"{suggestion}\"?")]
    NotFoundSimilar { name: String, suggestion: String },

    #[error("Cannot drop \"{name}\" because \"{dependent}\" depends on it, use CASCADE to drop dependents too")]
    DependencyConflict { name: String, dependent: String },

    #[error("Unsupported catalog operation: {0}")]
    Unsupported(String),

    #[error("Existing object \"{name}\" is of type {actual}, not {expected}")]
    WrongType {
        name: String,
        expected: CatalogType,
        actual: CatalogType,
    },

    #[error("Transaction {0} is no longer active and cannot modify the catalog")]
    TransactionNotActive(TransactionId),

    #[error("Schema {0} does not exist")]
    SchemaNotFound(String),

    #[error("Schema {0} already exists")]
    SchemaAlreadyExists(String),

    #[error("Column {column} does not exist in table {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("Column {column} already exists in table {table}")]
    DuplicateColumn { table: String, column: String },
}

impl CatalogError {
    /// Whether the caller has to abort its transaction
    pub fn is_conflict(&self) -> bool {
        matches!(self, CatalogError::WriteConflict(_))
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
