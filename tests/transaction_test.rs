mod test_utils;

use tiny_db::{
    storage::{tuple::Cell, tuple::Tuple, BufferPool},
    transaction::Transaction,
    utils::HandyRwLock,
};

use crate::test_utils::{new_empty_table, setup, table_path};

#[test]
// A committed insert is forced to disk before commit returns: the
// tuple is visible in the raw page image, without the buffer pool.
fn test_commit_forces_pages() {
    let _guard = setup();

    let path = table_path("tx_commit_test.db");
    let table_rc = new_empty_table(&path, 2);
    let table = table_rc.rl();

    let tx = Transaction::new();
    table
        .insert_tuple(&tx, &Tuple::new(&[Cell::new_int32(7), Cell::new_int32(8)]))
        .unwrap();
    tx.commit().unwrap();

    assert_eq!(
        std::fs::metadata(&path).unwrap().len() as usize,
        BufferPool::get_page_size()
    );

    // bypass the pool: decode the on-disk image directly
    let page = table.read_page(0).unwrap().unwrap();
    let rows: Vec<_> = page.iter().collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_cell(0).get_int32().unwrap(), 7);
    assert_eq!(rows[0].get_cell(1).get_int32().unwrap(), 8);
}

#[test]
// An aborted transaction leaves no trace: the page bytes on disk are
// unchanged and no later reader observes the aborted write.
fn test_abort_discards_writes() {
    let _guard = setup();

    let path = table_path("tx_abort_test.db");
    let table_rc = new_empty_table(&path, 1);
    let table = table_rc.rl();

    // committed baseline: one tuple on page 0
    let setup_tx = Transaction::new();
    table
        .insert_tuple(&setup_tx, &Tuple::new_int_tuples(7, 1))
        .unwrap();
    setup_tx.commit().unwrap();

    let image_before = std::fs::read(&path).unwrap();

    // insert 42, then change our mind
    let tx = Transaction::new();
    table
        .insert_tuple(&tx, &Tuple::new_int_tuples(42, 1))
        .unwrap();
    tx.abort().unwrap();

    // the raw file equals the pre-transaction image
    let image_after = std::fs::read(&path).unwrap();
    assert_eq!(image_before, image_after);

    // and a fresh read through the pool sees only the baseline row
    let reader = Transaction::new();
    let rows: Vec<_> = table.iter(&reader).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_cell(0).get_int32().unwrap(), 7);
    assert!(!rows.iter().any(|r| r.get_cell(0).get_int32().unwrap() == 42));
    reader.commit().unwrap();
}

#[test]
// Deletes hold to the same commit/abort rules as inserts.
fn test_delete_then_commit() {
    let _guard = setup();

    let path = table_path("tx_delete_test.db");
    let table_rc = new_empty_table(&path, 1);
    let table = table_rc.rl();

    let setup_tx = Transaction::new();
    for v in 0..10 {
        BufferPool::insert_tuple(&setup_tx, table.get_id(), &Tuple::new_int_tuples(v, 1))
            .unwrap();
    }
    setup_tx.commit().unwrap();

    // delete one row and abort: nothing changes
    let aborted = Transaction::new();
    let victim = table
        .iter(&aborted)
        .find(|r| r.get_cell(0).get_int32().unwrap() == 5)
        .unwrap();
    table.delete_tuple(&aborted, &victim).unwrap();
    aborted.abort().unwrap();

    let reader = Transaction::new();
    assert_eq!(table.tuples_count(&reader), 10);
    reader.commit().unwrap();

    // delete it again through the pool entry point and commit: the
    // row is gone, on disk too
    let tx = Transaction::new();
    let victim = table
        .iter(&tx)
        .find(|r| r.get_cell(0).get_int32().unwrap() == 5)
        .unwrap();
    BufferPool::delete_tuple(&tx, &victim).unwrap();
    tx.commit().unwrap();

    let page = table.read_page(0).unwrap().unwrap();
    assert_eq!(page.tuples_count(), 9);
    assert!(!page.iter().any(|r| r.get_cell(0).get_int32().unwrap() == 5));
}

#[test]
// Inserting into a freed slot reuses the lowest one.
fn test_slot_reuse_after_delete() {
    let _guard = setup();

    let path = table_path("tx_slot_reuse_test.db");
    let table_rc = new_empty_table(&path, 1);
    let table = table_rc.rl();

    let tx = Transaction::new();
    for v in 0..3 {
        table
            .insert_tuple(&tx, &Tuple::new_int_tuples(v, 1))
            .unwrap();
    }

    let victim = table
        .iter(&tx)
        .find(|r| r.get_cell(0).get_int32().unwrap() == 0)
        .unwrap();
    assert_eq!(victim.get_slot_number(), 0);
    table.delete_tuple(&tx, &victim).unwrap();

    let stored = table
        .insert_tuple(&tx, &Tuple::new_int_tuples(99, 1))
        .unwrap();
    assert_eq!(stored.get_slot_number(), 0);

    tx.commit().unwrap();
}
