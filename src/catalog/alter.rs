use crate::catalog::column::Column;
use crate::catalog::schema::DataType;

/// Alteration applied to the visible version of a catalog object
#[derive(Debug, Clone, PartialEq)]
pub enum AlterInfo {
    /// Bind the object to a new name, keeping its identity
    RenameEntry { new_name: String },
    AddColumn { column: Column },
    DropColumn { name: String },
    RenameColumn { old_name: String, new_name: String },
    AlterColumnType { column: String, data_type: DataType },
    SetViewQuery { query: String },
}

impl AlterInfo {
    /// New name of the object, for renames
    pub fn new_name(&self) -> Option<&str> {
        match self {
            AlterInfo::RenameEntry { new_name } => Some(new_name),
            _ => None,
        }
    }

    /// Short description used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            AlterInfo::RenameEntry { .. } => "RENAME",
            AlterInfo::AddColumn { .. } => "ADD COLUMN",
            AlterInfo::DropColumn { .. } => "DROP COLUMN",
            AlterInfo::RenameColumn { .. } => "RENAME COLUMN",
            AlterInfo::AlterColumnType { .. } => "ALTER COLUMN TYPE",
            AlterInfo::SetViewQuery { .. } => "SET QUERY",
        }
    }
}
