use std::any::Any;
use std::sync::Arc;

use serde::{Serialize, Deserialize};

use super::alter::AlterInfo;
use super::entry::{CatalogObject, CatalogType};
use super::error::{CatalogError, CatalogResult};

/// A named query. Views share the table namespace of their schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    name: String,
    query: String,
}

impl View {
    pub fn new(name: String, query: String) -> Self {
        View { name, query }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl CatalogObject for View {
    fn name(&self) -> &str {
        &self.name
    }

    fn catalog_type(&self) -> CatalogType {
        CatalogType::View
    }

    fn alter(&self, info: &AlterInfo) -> CatalogResult<Arc<dyn CatalogObject>> {
        let mut altered = self.clone();
        match info {
            AlterInfo::RenameEntry { new_name } => altered.name = new_name.clone(),
            AlterInfo::SetViewQuery { query } => altered.query = query.clone(),
            _ => {
                return Err(CatalogError::Unsupported(format!(
                    "cannot {} on view \"{}\"",
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
