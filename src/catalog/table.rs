//! Table Management Module
//!
//! This module defines the Table catalog object. Every alteration produces a
//! new `Table` value; the catalog keeps the old one for older snapshots.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use super::alter::AlterInfo;
use super::column::Column;
use super::entry::{CatalogObject, CatalogType};
use super::error::{CatalogError, CatalogResult};
use super::schema::DataType;

/// Represents a table definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    /// Table name
    name: String,
    /// Columns in the table
    columns: Vec<Column>,
    /// Column name to index lookup
    column_map: HashMap<String, usize>,
    /// Primary key column indices
    primary_key_columns: Vec<usize>,
}

impl Table {
    /// Create a new table with the given name and columns
    pub fn new(name: String, columns: Vec<Column>) -> Self {
        let mut table = Table {
            name,
            columns,
            column_map: HashMap::new(),
            primary_key_columns: Vec::new(),
        };
        table.rebuild_lookup();
        table
    }

    fn rebuild_lookup(&mut self) {
        self.column_map.clear();
        self.primary_key_columns.clear();
        for (i, col) in self.columns.iter().enumerate() {
            self.column_map.insert(col.name().to_string(), i);
            if col.is_primary_key() {
                self.primary_key_columns.push(i);
            }
        }
    }

    /// Get the table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Get a column by name
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.column_map.get(name).map(|&idx| &self.columns[idx])
    }

    /// Check if the table has a column with the given name
    pub fn has_column(&self, name: &str) -> bool {
        self.column_map.contains_key(name)
    }

    /// Get the column index for a column name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.column_map.get(name).copied()
    }

    /// Get primary key columns
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.primary_key_columns.iter()
            .map(|&idx| &self.columns[idx])
            .collect()
    }

    /// Get a string representation of the table schema
    pub fn schema_string(&self) -> String {
        let mut schema = format!("CREATE TABLE {} (\n", self.name);

        for (i, col) in self.columns.iter().enumerate() {
            schema.push_str(&format!("  {} {}", col.name(), col.data_type()));

            if !col.is_nullable() {
                schema.push_str(" NOT NULL");
            }

            if col.is_primary_key() {
                schema.push_str(" PRIMARY KEY");
            }

            if i < self.columns.len() - 1 {
                schema.push_str(",\n");
            }
        }

        schema.push_str("\n);");
        schema
    }

    fn column_not_found(&self, column: &str) -> CatalogError {
        CatalogError::ColumnNotFound {
            table: self.name.clone(),
            column: column.to_string(),
        }
    }

    fn add_column(&mut self, column: Column) -> CatalogResult<()> {
        if self.has_column(column.name()) {
            return Err(CatalogError::DuplicateColumn {
                table: self.name.clone(),
                column: column.name().to_string(),
            });
        }
        self.columns.push(column);
        self.rebuild_lookup();
        Ok(())
    }

    fn drop_column(&mut self, column_name: &str) -> CatalogResult<()> {
        let idx = self.column_index(column_name).ok_or_else(|| self.column_not_found(column_name))?;
        if self.columns.len() == 1 {
            return Err(CatalogError::Unsupported(format!(
                "cannot drop the last column '{}' from table '{}', use DROP TABLE instead",
                column_name, self.name
            )));
        }
        self.columns.remove(idx);
        self.rebuild_lookup();
        Ok(())
    }

    fn rename_column(&mut self, old_name: &str, new_name: &str) -> CatalogResult<()> {
        let idx = self.column_index(old_name).ok_or_else(|| self.column_not_found(old_name))?;
        if self.has_column(new_name) {
            return Err(CatalogError::DuplicateColumn {
                table: self.name.clone(),
                column: new_name.to_string(),
            });
        }
        self.columns[idx].rename(new_name);
        self.column_map.remove(old_name);
        self.column_map.insert(new_name.to_string(), idx);
        Ok(())
    }

    fn alter_column_type(&mut self, column_name: &str, new_type: DataType) -> CatalogResult<()> {
        let idx = self.column_index(column_name).ok_or_else(|| self.column_not_found(column_name))?;
        self.columns[idx].set_data_type(new_type);
        Ok(())
    }
}

impl CatalogObject for Table {
    fn name(&self) -> &str {
        &self.name
    }

    fn catalog_type(&self) -> CatalogType {
        CatalogType::Table
    }

    fn alter(&self, info: &AlterInfo) -> CatalogResult<Arc<dyn CatalogObject>> {
        let mut altered = self.clone();
        match info {
            AlterInfo::RenameEntry { new_name } => altered.name = new_name.clone(),
            AlterInfo::AddColumn { column } => altered.add_column(column.clone())?,
            AlterInfo::DropColumn { name } => altered.drop_column(name)?,
            AlterInfo::RenameColumn { old_name, new_name } => altered.rename_column(old_name, new_name)?,
            AlterInfo::AlterColumnType { column, data_type } => {
                altered.alter_column_type(column, data_type.clone())?
            }
            AlterInfo::SetViewQuery { .. } => {
                return Err(CatalogError::Unsupported(format!(
                    "cannot {} on table \"{}\"",
                    info.describe(),
                    self.name
                )));
            }
        }
        Ok(Arc::new(altered))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
