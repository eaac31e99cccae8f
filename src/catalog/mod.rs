//! Catalog Management Module
//!
//! This module manages database metadata under multi-version concurrency
//! control. Each namespace of objects is a [`CatalogSet`]; transactions see
//! the catalog as of their snapshot and detect write-write conflicts on it.

pub mod alter;
pub mod catalog;
pub mod catalog_set;
pub mod chain;
pub mod column;
pub mod default_generator;
pub mod dependency;
pub mod entry;
pub mod entry_index;
pub mod error;
pub mod function;
pub mod lock_set;
pub mod mapping;
pub mod schema;
pub mod similarity;
pub mod table;
pub mod undo;
pub mod view;

// Re-export key types
pub use self::alter::AlterInfo;
pub use self::catalog::{Catalog, CatalogConfig};
pub use self::catalog_set::{CatalogSet, SetRegistry};
pub use self::column::Column;
pub use self::default_generator::{BuiltinFunctionGenerator, DefaultGenerator};
pub use self::dependency::{DependencyGraph, DependencyManager};
pub use self::entry::{CatalogEntry, CatalogObject, CatalogType};
pub use self::error::{CatalogError, CatalogResult};
pub use self::function::ScalarFunction;
pub use self::lock_set::LockPlan;
pub use self::schema::{DataType, Schema};
pub use self::table::Table;
pub use self::undo::{CatalogChange, ChangeKind, UndoRecord};
pub use self::view::View;
