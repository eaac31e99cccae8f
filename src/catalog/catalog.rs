// Catalog
//
// Registry of schemas plus a typed API over their catalog sets. Schemas
// themselves are not versioned; everything inside them is.

use std::collections::HashMap;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;

use super::alter::AlterInfo;
use super::catalog_set::SetRegistry;
use super::dependency::{DependencyGraph, DependencyManager};
use super::entry::{CatalogEntry, CatalogObject, CatalogType};
use super::error::{CatalogError, CatalogResult};
use super::schema::Schema;
use super::table::Table;
use crate::common::types::{ObjectId, Timestamp};
use crate::transaction::TransactionContext;

/// Catalog configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Schema created on startup and used until another is selected
    pub default_schema: String,
    /// Serve built-in scalar functions in every schema
    pub builtin_functions: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            default_schema: "main".to_string(),
            builtin_functions: true,
        }
    }
}

/// The Catalog is the central repository for all database schema information
pub struct Catalog {
    config: CatalogConfig,
    /// Schemas in the database
    schemas: RwLock<HashMap<String, Schema>>,
    /// Current schema name
    current_schema: RwLock<String>,
    registry: Arc<SetRegistry>,
    dependencies: Arc<dyn DependencyManager>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

impl Catalog {
    /// Create a catalog holding only the default schema
    pub fn new(config: CatalogConfig) -> Self {
        Self::with_dependency_manager(config, Arc::new(DependencyGraph::new()))
    }

    pub fn with_dependency_manager(config: CatalogConfig, dependencies: Arc<dyn DependencyManager>) -> Self {
        let registry = Arc::new(SetRegistry::new());
        let default_schema = Schema::new(
            &config.default_schema,
            &registry,
            dependencies.clone(),
            config.builtin_functions,
        );
        let mut schemas = HashMap::new();
        schemas.insert(config.default_schema.clone(), default_schema);

        Catalog {
            current_schema: RwLock::new(config.default_schema.clone()),
            config,
            schemas: RwLock::new(schemas),
            registry,
            dependencies,
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn dependencies(&self) -> &Arc<dyn DependencyManager> {
        &self.dependencies
    }

    pub fn registry(&self) -> &Arc<SetRegistry> {
        &self.registry
    }

    /// Create a new schema
    pub fn create_schema(&self, name: &str) -> CatalogResult<()> {
        let mut schemas = self.schemas.write();
        if schemas.contains_key(name) {
            return Err(CatalogError::SchemaAlreadyExists(name.to_string()));
        }
        let schema = Schema::new(
            name,
            &self.registry,
            self.dependencies.clone(),
            self.config.builtin_functions,
        );
        schemas.insert(name.to_string(), schema);
        info!("Created schema {}", name);
        Ok(())
    }

    /// Get a schema by name
    pub fn get_schema(&self, name: &str) -> CatalogResult<Schema> {
        self.schemas
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::SchemaNotFound(name.to_string()))
    }

    /// Set the current schema
    pub fn set_current_schema(&self, name: &str) -> CatalogResult<()> {
        if !self.schemas.read().contains_key(name) {
            return Err(CatalogError::SchemaNotFound(name.to_string()));
        }
        *self.current_schema.write() = name.to_string();
        Ok(())
    }

    /// Get the current schema
    pub fn current_schema(&self) -> CatalogResult<Schema> {
        let name = self.current_schema.read().clone();
        self.get_schema(&name)
    }

    /// Names of all schemas, sorted
    pub fn schema_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Create `object` in the current schema. Returns the new entry as the
    /// creating transaction sees it.
    pub fn create_entry(
        &self,
        ctx: &dyn TransactionContext,
        object: Arc<dyn CatalogObject>,
        dependencies: &[ObjectId],
    ) -> CatalogResult<CatalogEntry> {
        let schema = self.current_schema()?;
        let set = schema.set_for(object.catalog_type());
        let name = object.name().to_string();
        set.create_entry(ctx, &name, object, dependencies)?;
        set.get_entry(ctx, &name).ok_or(CatalogError::NotFound(name))
    }

    /// Look up an object of the given type in the current schema
    pub fn get_entry(&self, ctx: &dyn TransactionContext, catalog_type: CatalogType, name: &str) -> CatalogResult<CatalogEntry> {
        let schema = self.current_schema()?;
        let set = schema.set_for(catalog_type);
        match set.get_entry(ctx, name) {
            Some(entry) if entry.catalog_type() == catalog_type => Ok(entry),
            Some(entry) => Err(CatalogError::WrongType {
                name: name.to_string(),
                expected: catalog_type,
                actual: entry.catalog_type(),
            }),
            None => match set.similar_entry(ctx, name) {
                Some(suggestion) => Err(CatalogError::NotFoundSimilar {
                    name: name.to_string(),
                    suggestion,
                }),
                None => Err(CatalogError::NotFound(name.to_string())),
            },
        }
    }

    /// Look up a table and clone its definition
    pub fn get_table(&self, ctx: &dyn TransactionContext, name: &str) -> CatalogResult<Table> {
        let entry = self.get_entry(ctx, CatalogType::Table, name)?;
        entry.downcast::<Table>().cloned().ok_or(CatalogError::WrongType {
            name: name.to_string(),
            expected: CatalogType::Table,
            actual: entry.catalog_type(),
        })
    }

    pub fn alter_entry(
        &self,
        ctx: &dyn TransactionContext,
        catalog_type: CatalogType,
        name: &str,
        info: &AlterInfo,
    ) -> CatalogResult<()> {
        self.get_entry(ctx, catalog_type, name)?;
        self.current_schema()?.set_for(catalog_type).alter_entry(ctx, name, info)
    }

    pub fn drop_entry(&self, ctx: &dyn TransactionContext, catalog_type: CatalogType, name: &str, cascade: bool) -> CatalogResult<()> {
        self.get_entry(ctx, catalog_type, name)?;
        self.current_schema()?.set_for(catalog_type).drop_entry(ctx, name, cascade)
    }

    /// Every visible object of the given type in the current schema
    pub fn scan(&self, ctx: &dyn TransactionContext, catalog_type: CatalogType) -> CatalogResult<Vec<CatalogEntry>> {
        let schema = self.current_schema()?;
        let mut entries = Vec::new();
        schema.set_for(catalog_type).scan(ctx, |entry| {
            if entry.catalog_type() == catalog_type {
                entries.push(entry.clone());
            }
        });
        Ok(entries)
    }

    /// Vacuum every catalog set. Returns the number of versions freed.
    pub fn vacuum(&self, horizon: Timestamp) -> usize {
        let freed: usize = self.registry.sets().iter().map(|set| set.vacuum(horizon)).sum();
        info!("Vacuumed {} catalog versions below horizon {}", freed, horizon);
        freed
    }
}
