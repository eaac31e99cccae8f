// Schema Management Module
//
// This module defines column data types and the Schema namespace, which owns
// one catalog set per object namespace.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use super::catalog_set::{CatalogSet, SetRegistry};
use super::default_generator::{BuiltinFunctionGenerator, DefaultGenerator};
use super::dependency::DependencyManager;
use super::entry::CatalogType;

/// Data types supported by the database
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Boolean,
    Date,
    Timestamp,
    Blob,
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INT" | "INTEGER" => Ok(DataType::Integer),
            "FLOAT" | "REAL" | "DOUBLE" => Ok(DataType::Float),
            "TEXT" | "VARCHAR" | "CHAR" | "STRING" => Ok(DataType::Text),
            "BOOL" | "BOOLEAN" => Ok(DataType::Boolean),
            "DATE" => Ok(DataType::Date),
            "TIMESTAMP" | "DATETIME" => Ok(DataType::Timestamp),
            "BLOB" | "BINARY" => Ok(DataType::Blob),
            _ => Err(format!("Unknown data type: {}", s)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::Text => "TEXT",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Timestamp => "TIMESTAMP",
            DataType::Blob => "BLOB",
        };
        write!(f, "{}", name)
    }
}

/// A named namespace of catalog objects.
///
/// Tables and views share one catalog set, so a view cannot take the name of
/// a table. Functions live in their own set.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Schema name
    name: String,
    /// Tables and views
    tables: CatalogSet,
    /// Scalar functions
    functions: CatalogSet,
}

impl Schema {
    /// Create a new, empty schema whose sets are reachable through `registry`
    pub(crate) fn new(
        name: &str,
        registry: &Arc<SetRegistry>,
        dependencies: Arc<dyn DependencyManager>,
        builtin_functions: bool,
    ) -> Self {
        let defaults: Option<Box<dyn DefaultGenerator>> = if builtin_functions {
            Some(Box::new(BuiltinFunctionGenerator))
        } else {
            None
        };
        Schema {
            name: name.to_string(),
            tables: CatalogSet::new(registry, &format!("{}.tables", name), dependencies.clone(), None),
            functions: CatalogSet::new(registry, &format!("{}.functions", name), dependencies, defaults),
        }
    }

    /// Get the schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &CatalogSet {
        &self.tables
    }

    pub fn functions(&self) -> &CatalogSet {
        &self.functions
    }

    /// Catalog set holding objects of the given type
    pub fn set_for(&self, catalog_type: CatalogType) -> &CatalogSet {
        match catalog_type {
            CatalogType::Table | CatalogType::View => &self.tables,
            CatalogType::ScalarFunction => &self.functions,
        }
    }
}
