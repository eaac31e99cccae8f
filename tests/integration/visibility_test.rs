// MVCC visibility integration tests
//
// Snapshot reads, own-write visibility, write-write conflicts, rollback and
// version reclamation across transactions driven by the transaction manager.

use anyhow::Result;

use bayundb_catalog::catalog::{AlterInfo, CatalogError, Column, DataType};
use bayundb_catalog::transaction::{
    IsolationLevel, TimestampBoundary, TransactionManager, TransactionManagerConfig,
};

#[path = "../common/mod.rs"]
mod common;
use common::{column_count, table, table_set, visible_names};

fn add_column(name: &str) -> AlterInfo {
    AlterInfo::AddColumn { column: Column::simple(name, DataType::Text) }
}

#[test]
fn test_snapshot_reader_keeps_old_version() -> Result<()> {
    let (manager, set) = table_set();

    let t1 = manager.begin_transaction();
    set.create_entry(&t1, "t1", table("t1"), &[])?;
    manager.commit_transaction(t1.id())?;

    let t2 = manager.begin_transaction();
    let t3 = manager.begin_transaction();
    set.alter_entry(&t2, "t1", &add_column("note"))?;

    assert_eq!(column_count(&set.get_entry(&t2, "t1").unwrap()), 2);
    assert_eq!(column_count(&set.get_entry(&t3, "t1").unwrap()), 1);

    manager.commit_transaction(t2.id())?;
    // still the snapshot t3 started with
    assert_eq!(column_count(&set.get_entry(&t3, "t1").unwrap()), 1);

    let t4 = manager.begin_transaction();
    assert_eq!(column_count(&set.get_entry(&t4, "t1").unwrap()), 2);
    Ok(())
}

#[test]
fn test_uncommitted_create_is_private() -> Result<()> {
    let (manager, set) = table_set();
    let writer = manager.begin_transaction();
    let reader = manager.begin_transaction();

    set.create_entry(&writer, "t", table("t"), &[])?;
    assert!(set.get_entry(&writer, "t").is_some());
    assert!(set.get_entry(&reader, "t").is_none());
    assert!(visible_names(&set, &reader).is_empty());

    manager.commit_transaction(writer.id())?;
    // started before the commit
    assert!(set.get_entry(&reader, "t").is_none());
    Ok(())
}

#[test]
fn test_own_drop_hides_entry() -> Result<()> {
    let (manager, set) = table_set();
    let setup = manager.begin_transaction();
    set.create_entry(&setup, "t", table("t"), &[])?;
    manager.commit_transaction(setup.id())?;

    let dropper = manager.begin_transaction();
    let reader = manager.begin_transaction();
    set.drop_entry(&dropper, "t", false)?;

    assert!(set.get_entry(&dropper, "t").is_none());
    assert!(visible_names(&set, &dropper).is_empty());
    assert!(set.get_entry(&reader, "t").is_some());
    assert_eq!(visible_names(&set, &reader), vec!["t"]);
    Ok(())
}

#[test]
fn test_concurrent_create_conflicts() -> Result<()> {
    let (manager, set) = table_set();
    let t1 = manager.begin_transaction();
    let t2 = manager.begin_transaction();

    set.create_entry(&t1, "x", table("x"), &[])?;
    let err = set.create_entry(&t2, "x", table("x"), &[]).unwrap_err();
    assert_eq!(err, CatalogError::WriteConflict("x".to_string()));
    assert!(err.is_conflict());

    manager.abort_transaction(t1.id())?;
    let t3 = manager.begin_transaction();
    set.create_entry(&t3, "x", table("x"), &[])?;
    manager.commit_transaction(t3.id())?;

    let t4 = manager.begin_transaction();
    assert!(set.get_entry(&t4, "x").is_some());
    Ok(())
}

#[test]
fn test_create_after_unseen_commit_conflicts() -> Result<()> {
    let (manager, set) = table_set();
    let early = manager.begin_transaction();
    let winner = manager.begin_transaction();
    set.create_entry(&winner, "x", table("x"), &[])?;
    manager.commit_transaction(winner.id())?;

    // the committed binding is invisible to `early` but still newer than its snapshot
    assert!(set.get_entry(&early, "x").is_none());
    assert_eq!(
        set.create_entry(&early, "x", table("x"), &[]).unwrap_err(),
        CatalogError::WriteConflict("x".to_string())
    );
    Ok(())
}

#[test]
fn test_alter_and_drop_conflicts() -> Result<()> {
    let (manager, set) = table_set();
    let setup = manager.begin_transaction();
    set.create_entry(&setup, "t", table("t"), &[])?;
    manager.commit_transaction(setup.id())?;

    let t1 = manager.begin_transaction();
    let t2 = manager.begin_transaction();
    set.alter_entry(&t1, "t", &add_column("a"))?;

    assert_eq!(
        set.alter_entry(&t2, "t", &add_column("b")).unwrap_err(),
        CatalogError::WriteConflict("t".to_string())
    );
    assert_eq!(
        set.drop_entry(&t2, "t", false).unwrap_err(),
        CatalogError::WriteConflict("t".to_string())
    );
    assert_eq!(t2.undo_count(), 0);

    manager.commit_transaction(t1.id())?;
    // t1 committed after t2 started
    assert_eq!(
        set.alter_entry(&t2, "t", &add_column("b")).unwrap_err(),
        CatalogError::WriteConflict("t".to_string())
    );
    Ok(())
}

#[test]
fn test_rename_conflicts_on_both_names() -> Result<()> {
    let (manager, set) = table_set();
    let setup = manager.begin_transaction();
    set.create_entry(&setup, "a", table("a"), &[])?;
    manager.commit_transaction(setup.id())?;

    let t1 = manager.begin_transaction();
    let t2 = manager.begin_transaction();
    set.alter_entry(&t1, "a", &AlterInfo::RenameEntry { new_name: "b".to_string() })?;

    // t2 still sees `a` and nothing under `b`, but both names are being written
    assert!(set.get_entry(&t2, "a").is_some());
    assert!(set.get_entry(&t2, "b").is_none());
    assert_eq!(
        set.create_entry(&t2, "b", table("b"), &[]).unwrap_err(),
        CatalogError::WriteConflict("b".to_string())
    );
    assert!(set.drop_entry(&t2, "a", false).unwrap_err().is_conflict());
    Ok(())
}

#[test]
fn test_abort_restores_prior_state() -> Result<()> {
    let (manager, set) = table_set();
    let setup = manager.begin_transaction();
    set.create_entry(&setup, "keep", table("keep"), &[])?;
    manager.commit_transaction(setup.id())?;
    let before = visible_names(&set, &manager.begin_transaction());
    let versions_before = set.version_count();

    let txn = manager.begin_transaction();
    set.create_entry(&txn, "temp", table("temp"), &[])?;
    set.alter_entry(&txn, "keep", &add_column("x"))?;
    set.alter_entry(&txn, "keep", &AlterInfo::RenameEntry { new_name: "kept".to_string() })?;
    set.drop_entry(&txn, "temp", false)?;
    set.create_entry(&txn, "temp", table("temp"), &[])?;
    assert_eq!(visible_names(&set, &txn), vec!["kept", "temp"]);
    manager.abort_transaction(txn.id())?;

    let after = manager.begin_transaction();
    assert_eq!(visible_names(&set, &after), before);
    assert_eq!(column_count(&set.get_entry(&after, "keep").unwrap()), 1);
    assert_eq!(set.version_count(), versions_before);
    assert!(set.get_root_entry("kept").is_none());

    // no leftover conflicts: the names are writable again
    set.create_entry(&after, "temp", table("temp"), &[])?;
    set.alter_entry(&after, "keep", &AlterInfo::RenameEntry { new_name: "kept".to_string() })?;
    Ok(())
}

#[test]
fn test_abort_of_drop_restores_binding() -> Result<()> {
    let (manager, set) = table_set();
    let setup = manager.begin_transaction();
    set.create_entry(&setup, "t", table("t"), &[])?;
    manager.commit_transaction(setup.id())?;
    let index = set.get_root_entry("t").unwrap().entry_index();

    let dropper = manager.begin_transaction();
    set.drop_entry(&dropper, "t", false)?;
    manager.abort_transaction(dropper.id())?;

    let reader = manager.begin_transaction();
    assert_eq!(set.get_entry(&reader, "t").unwrap().entry_index(), index);
    Ok(())
}

#[test]
fn test_read_committed_sees_latest_commit() -> Result<()> {
    let manager = TransactionManager::default();
    let set = bayundb_catalog::catalog::CatalogSet::standalone("tables");

    let reader = manager.begin_transaction_with(IsolationLevel::ReadCommitted, TimestampBoundary::Exclusive);
    let writer = manager.begin_transaction();
    set.create_entry(&writer, "t", table("t"), &[])?;
    assert!(set.get_entry(&reader, "t").is_none());

    manager.commit_transaction(writer.id())?;
    assert!(set.get_entry(&reader, "t").is_some());
    // and can write on top of it
    set.alter_entry(&reader, "t", &add_column("n"))?;
    Ok(())
}

#[test]
fn test_configured_isolation() -> Result<()> {
    let manager = TransactionManager::new(TransactionManagerConfig {
        isolation_level: IsolationLevel::Snapshot,
        timestamp_boundary: TimestampBoundary::Inclusive,
    });
    let txn = manager.begin_transaction();
    assert_eq!(txn.boundary(), TimestampBoundary::Inclusive);
    assert_eq!(txn.isolation_level(), IsolationLevel::Snapshot);
    Ok(())
}

#[test]
fn test_finished_transaction_cannot_write() -> Result<()> {
    let (manager, set) = table_set();

    let t1 = manager.begin_transaction();
    set.create_entry(&t1, "kept", table("kept"), &[])?;
    manager.commit_transaction(t1.id())?;
    assert_eq!(
        set.create_entry(&t1, "x", table("x"), &[]).unwrap_err(),
        CatalogError::TransactionNotActive(t1.id())
    );
    assert!(matches!(set.alter_entry(&t1, "kept", &add_column("note")), Err(CatalogError::TransactionNotActive(_))));
    assert!(matches!(set.drop_entry(&t1, "kept", false), Err(CatalogError::TransactionNotActive(_))));

    // nothing was left behind to conflict with
    let t2 = manager.begin_transaction();
    set.create_entry(&t2, "x", table("x"), &[])?;
    manager.commit_transaction(t2.id())?;

    let t3 = manager.begin_transaction();
    manager.abort_transaction(t3.id())?;
    assert!(matches!(set.drop_entry(&t3, "x", false), Err(CatalogError::TransactionNotActive(_))));

    let reader = manager.begin_transaction();
    assert_eq!(visible_names(&set, &reader), vec!["kept", "x"]);
    assert_eq!(column_count(&set.get_entry(&reader, "kept").unwrap()), 1);
    Ok(())
}

#[test]
fn test_vacuum_reclaims_superseded_versions() -> Result<()> {
    let (manager, set) = table_set();
    let setup = manager.begin_transaction();
    set.create_entry(&setup, "t", table("t"), &[])?;
    manager.commit_transaction(setup.id())?;

    for column in ["a", "b", "c"] {
        let txn = manager.begin_transaction();
        set.alter_entry(&txn, "t", &add_column(column))?;
        manager.commit_transaction(txn.id())?;
    }
    let pinned = manager.begin_transaction();
    let txn = manager.begin_transaction();
    set.alter_entry(&txn, "t", &add_column("d"))?;
    manager.commit_transaction(txn.id())?;

    // 5 entry versions + 1 mapping version
    assert_eq!(set.version_count(), 6);
    let freed = set.vacuum(manager.lowest_active_start());
    assert_eq!(freed, 3);
    assert_eq!(column_count(&set.get_entry(&pinned, "t").unwrap()), 4);

    manager.commit_transaction(pinned.id())?;
    assert_eq!(set.vacuum(manager.lowest_active_start()), 1);
    let reader = manager.begin_transaction();
    assert_eq!(column_count(&set.get_entry(&reader, "t").unwrap()), 5);
    assert_eq!(set.version_count(), 2);
    Ok(())
}

#[test]
fn test_vacuum_keeps_tombstones() -> Result<()> {
    let (manager, set) = table_set();
    let txn = manager.begin_transaction();
    set.create_entry(&txn, "t", table("t"), &[])?;
    manager.commit_transaction(txn.id())?;
    let txn = manager.begin_transaction();
    set.drop_entry(&txn, "t", false)?;
    manager.commit_transaction(txn.id())?;

    set.vacuum(manager.lowest_active_start());
    assert_eq!(set.version_count(), 2);
    let reader = manager.begin_transaction();
    assert!(set.get_entry(&reader, "t").is_none());
    set.create_entry(&reader, "t", table("t"), &[])?;
    assert_eq!(set.entry_index_count(), 2);
    Ok(())
}
