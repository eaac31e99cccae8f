#![allow(dead_code)]

use std::sync::Arc;

use bayundb_catalog::catalog::{CatalogEntry, CatalogObject, CatalogSet, Column, DataType, Table, View};
use bayundb_catalog::transaction::{TransactionContext, TransactionManager};

// Table with a single integer column
pub fn table(name: &str) -> Arc<dyn CatalogObject> {
    Arc::new(Table::new(name.to_string(), vec![Column::simple("id", DataType::Integer)]))
}

// Table from `name:TYPE` column specs
pub fn table_with(name: &str, columns: &[&str]) -> Arc<dyn CatalogObject> {
    let columns = columns
        .iter()
        .map(|spec| Column::parse_spec(spec).unwrap())
        .collect();
    Arc::new(Table::new(name.to_string(), columns))
}

pub fn view(name: &str, query: &str) -> Arc<dyn CatalogObject> {
    Arc::new(View::new(name.to_string(), query.to_string()))
}

// A standalone set plus a transaction manager to drive it
pub fn table_set() -> (TransactionManager, CatalogSet) {
    (TransactionManager::default(), CatalogSet::standalone("tables"))
}

pub fn column_count(entry: &CatalogEntry) -> usize {
    entry.downcast::<Table>().map(|table| table.columns().len()).unwrap_or(0)
}

// Visible names, sorted
pub fn visible_names(set: &CatalogSet, ctx: &dyn TransactionContext) -> Vec<String> {
    let mut names: Vec<String> = set.entries(ctx).iter().map(|entry| entry.name().to_string()).collect();
    names.sort();
    names
}
