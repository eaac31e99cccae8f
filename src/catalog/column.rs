// Column Management Module
//
// This module defines the Column type that represents a table column.

use super::schema::DataType;
use serde::{Serialize, Deserialize};

/// Represents a column in a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    name: String,
    /// Column data type
    data_type: DataType,
    /// Whether this column can contain NULL values
    nullable: bool,
    /// Whether this column is part of the primary key
    primary_key: bool,
    /// Default value (if any), kept as SQL text
    default_value: Option<String>,
}

impl Column {
    /// Create a new column
    pub fn new(
        name: String,
        data_type: DataType,
        nullable: bool,
        primary_key: bool,
        default_value: Option<String>,
    ) -> Self {
        Column {
            name,
            data_type,
            nullable,
            primary_key,
            default_value,
        }
    }

    /// Nullable, non-key column without a default
    pub fn simple(name: &str, data_type: DataType) -> Self {
        Self::new(name.to_string(), data_type, true, false, None)
    }

    /// Parse a `name:TYPE` column spec, as used by the shell
    pub fn parse_spec(spec: &str) -> Result<Self, String> {
        let (name, type_name) = spec
            .split_once(':')
            .ok_or_else(|| format!("Column spec '{}' must look like name:TYPE", spec))?;
        if name.is_empty() {
            return Err(format!("Column spec '{}' has an empty name", spec));
        }
        let data_type = type_name.parse::<DataType>()?;
        Ok(Self::simple(name, data_type))
    }

    /// Get the column name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the column data type
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Check if the column can contain NULL values
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Check if the column is part of the primary key
    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    /// Get the default value (if any)
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub(crate) fn rename(&mut self, new_name: &str) {
        self.name = new_name.to_string();
    }

    pub(crate) fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
    }
}
