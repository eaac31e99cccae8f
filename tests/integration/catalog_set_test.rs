// Catalog set integration tests
//
// Single-transaction behaviour of create, alter, rename, drop, lookups and
// default entries.

use std::sync::Arc;

use anyhow::Result;

use bayundb_catalog::catalog::{
    AlterInfo, BuiltinFunctionGenerator, CatalogError, CatalogSet, CatalogType, Column, DataType,
    DependencyGraph, ScalarFunction, SetRegistry, Table,
};
use bayundb_catalog::transaction::TransactionManager;

#[path = "../common/mod.rs"]
mod common;
use common::{column_count, table, table_set, visible_names};

#[test]
fn test_create_and_get() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();

    set.create_entry(&txn, "orders", table("orders"), &[])?;
    let entry = set.get_entry(&txn, "orders").expect("own create is visible");
    assert_eq!(entry.name(), "orders");
    assert_eq!(entry.catalog_type(), CatalogType::Table);
    assert_eq!(entry.set_id(), set.id());
    assert_eq!(entry.timestamp(), txn.id());

    manager.commit_transaction(txn.id())?;
    let reader = manager.begin_transaction();
    let entry = set.get_entry(&reader, "orders").expect("committed create is visible");
    assert!(entry.timestamp() < reader.id());
    Ok(())
}

#[test]
fn test_duplicate_name() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();

    set.create_entry(&txn, "orders", table("orders"), &[])?;
    let err = set.create_entry(&txn, "orders", table("orders"), &[]).unwrap_err();
    assert_eq!(err, CatalogError::DuplicateName("orders".to_string()));

    manager.commit_transaction(txn.id())?;
    let later = manager.begin_transaction();
    let err = set.create_entry(&later, "orders", table("orders"), &[]).unwrap_err();
    assert_eq!(err, CatalogError::DuplicateName("orders".to_string()));
    assert_eq!(set.entry_index_count(), 1);
    Ok(())
}

#[test]
fn test_not_found() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();

    assert!(set.get_entry(&txn, "missing").is_none());
    assert_eq!(
        set.drop_entry(&txn, "missing", false).unwrap_err(),
        CatalogError::NotFound("missing".to_string())
    );
    let info = AlterInfo::AddColumn { column: Column::simple("x", DataType::Text) };
    assert_eq!(
        set.alter_entry(&txn, "missing", &info).unwrap_err(),
        CatalogError::NotFound("missing".to_string())
    );
    assert_eq!(txn.undo_count(), 0);
    Ok(())
}

#[test]
fn test_alter_keeps_identity() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();
    set.create_entry(&txn, "orders", table("orders"), &[])?;
    let before = set.get_entry(&txn, "orders").unwrap();

    let info = AlterInfo::AddColumn { column: Column::simple("total", DataType::Float) };
    set.alter_entry(&txn, "orders", &info)?;
    let after = set.get_entry(&txn, "orders").unwrap();

    assert_eq!(after.entry_index(), before.entry_index());
    assert_eq!(column_count(&before), 1);
    assert_eq!(column_count(&after), 2);
    assert_eq!(txn.undo_count(), 2);

    // a failed alteration leaves nothing behind
    let bad = AlterInfo::DropColumn { name: "nope".to_string() };
    assert!(matches!(set.alter_entry(&txn, "orders", &bad), Err(CatalogError::ColumnNotFound { .. })));
    assert_eq!(txn.undo_count(), 2);
    Ok(())
}

#[test]
fn test_rename() -> Result<()> {
    let (manager, set) = table_set();
    let setup = manager.begin_transaction();
    set.create_entry(&setup, "a", table("a"), &[])?;
    set.create_entry(&setup, "c", table("c"), &[])?;
    manager.commit_transaction(setup.id())?;

    let txn = manager.begin_transaction();
    let original = set.get_entry(&txn, "a").unwrap();
    set.alter_entry(&txn, "a", &AlterInfo::RenameEntry { new_name: "b".to_string() })?;

    assert!(set.get_entry(&txn, "a").is_none());
    let renamed = set.get_entry(&txn, "b").unwrap();
    assert_eq!(renamed.entry_index(), original.entry_index());
    assert_eq!(renamed.downcast::<Table>().unwrap().name(), "b");

    let taken = AlterInfo::RenameEntry { new_name: "c".to_string() };
    assert_eq!(
        set.alter_entry(&txn, "b", &taken).unwrap_err(),
        CatalogError::DuplicateName("c".to_string())
    );

    // the old name is free again for this transaction
    set.create_entry(&txn, "a", table("a"), &[])?;
    assert_ne!(set.get_entry(&txn, "a").unwrap().entry_index(), original.entry_index());
    assert_eq!(visible_names(&set, &txn), vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_drop_then_recreate_gets_new_index() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();
    set.create_entry(&txn, "t", table("t"), &[])?;
    let first = set.get_entry(&txn, "t").unwrap().entry_index();

    set.drop_entry(&txn, "t", false)?;
    assert!(set.get_entry(&txn, "t").is_none());
    assert_eq!(
        set.drop_entry(&txn, "t", false).unwrap_err(),
        CatalogError::NotFound("t".to_string())
    );

    set.create_entry(&txn, "t", table("t"), &[])?;
    let second = set.get_entry(&txn, "t").unwrap().entry_index();
    assert_ne!(first, second);
    manager.commit_transaction(txn.id())?;

    let reader = manager.begin_transaction();
    assert_eq!(set.get_entry(&reader, "t").unwrap().entry_index(), second);
    assert!(set.get_entry_by_index(&reader, first).is_none());
    Ok(())
}

#[test]
fn test_scan_skips_tombstones() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();
    for name in ["c", "a", "b"] {
        set.create_entry(&txn, name, table(name), &[])?;
    }
    set.drop_entry(&txn, "a", false)?;

    let mut seen = Vec::new();
    set.scan(&txn, |entry| seen.push((entry.entry_index(), entry.name().to_string())));
    // storage order, not name order
    assert_eq!(seen, vec![(0, "c".to_string()), (2, "b".to_string())]);
    Ok(())
}

#[test]
fn test_similar_entry() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();
    for name in ["customers", "orders", "order_items"] {
        set.create_entry(&txn, name, table(name), &[])?;
    }

    assert_eq!(set.similar_entry(&txn, "ordrs").as_deref(), Some("orders"));
    assert_eq!(set.similar_entry(&txn, "customer").as_deref(), Some("customers"));

    set.drop_entry(&txn, "orders", false)?;
    assert_ne!(set.similar_entry(&txn, "ordrs").as_deref(), Some("orders"));

    let other = manager.begin_transaction();
    assert_eq!(set.similar_entry(&other, "ordrs"), None);
    Ok(())
}

#[test]
fn test_empty_name_rejected() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();
    assert!(matches!(set.create_entry(&txn, "", table(""), &[]), Err(CatalogError::Unsupported(_))));
    let info = AlterInfo::RenameEntry { new_name: String::new() };
    set.create_entry(&txn, "t", table("t"), &[])?;
    assert!(matches!(set.alter_entry(&txn, "t", &info), Err(CatalogError::Unsupported(_))));
    Ok(())
}

fn function_set() -> (TransactionManager, CatalogSet) {
    let registry = Arc::new(SetRegistry::new());
    let set = CatalogSet::new(
        &registry,
        "functions",
        Arc::new(DependencyGraph::new()),
        Some(Box::new(BuiltinFunctionGenerator)),
    );
    (TransactionManager::default(), set)
}

#[test]
fn test_default_entries_materialize_on_lookup() -> Result<()> {
    let (manager, set) = function_set();
    let txn = manager.begin_transaction();
    assert_eq!(set.entry_index_count(), 0);

    let lower = set.get_entry(&txn, "lower").expect("built-in");
    assert_eq!(lower.timestamp(), 0);
    assert_eq!(set.entry_index_count(), 1);

    // materialized once, visible to everybody
    let other = manager.begin_transaction();
    assert_eq!(set.get_entry(&other, "lower").unwrap().entry_index(), lower.entry_index());
    assert_eq!(set.entry_index_count(), 1);

    assert!(set.get_entry(&txn, "no_such_function").is_none());
    assert_eq!(set.entry_index_count(), 1);
    Ok(())
}

#[test]
fn test_default_entries_scan_and_protection() -> Result<()> {
    let (manager, set) = function_set();
    let txn = manager.begin_transaction();
    set.get_entry(&txn, "upper");

    let names = visible_names(&set, &txn);
    assert_eq!(names, vec!["abs", "concat", "length", "lower", "round", "upper"]);
    assert_eq!(set.entry_index_count(), 6);

    assert!(matches!(set.drop_entry(&txn, "abs", false), Err(CatalogError::Unsupported(_))));
    let shadow = Arc::new(ScalarFunction::new("length".to_string(), vec![DataType::Blob], DataType::Integer));
    assert_eq!(
        set.create_entry(&txn, "length", shadow, &[]).unwrap_err(),
        CatalogError::DuplicateName("length".to_string())
    );

    // a never-referenced built-in still blocks a user function of the same name
    let (manager, set) = function_set();
    let txn = manager.begin_transaction();
    let shadow = Arc::new(ScalarFunction::new("round".to_string(), vec![], DataType::Integer));
    assert!(set.create_entry(&txn, "round", shadow, &[]).is_err());
    Ok(())
}

#[test]
fn test_root_entry_and_index_lookups() -> Result<()> {
    let (manager, set) = table_set();
    let writer = manager.begin_transaction();
    set.create_entry(&writer, "t", table("t"), &[])?;

    // root lookups ignore visibility
    let root = set.get_root_entry("t").unwrap();
    assert_eq!(root.timestamp(), writer.id());
    assert_eq!(set.entry_from_index(root.entry_index()).unwrap().name(), "t");
    assert!(set.entry_from_index(99).is_none());

    let reader = manager.begin_transaction();
    assert!(set.get_entry_by_index(&reader, root.entry_index()).is_none());
    assert!(set.get_entry_by_index(&writer, root.entry_index()).is_some());

    set.drop_entry(&writer, "t", false)?;
    assert!(set.get_root_entry("t").is_none());
    assert!(set.entry_from_index(root.entry_index()).is_none());
    Ok(())
}
