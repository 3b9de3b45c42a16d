mod test_utils;

use tiny_db::{
    storage::{heap::HeapPageID, tuple::Tuple, BufferPool},
    transaction::{Permission, Transaction},
    utils::HandyRwLock,
    Database,
};

use crate::test_utils::{new_empty_table, new_random_table, row_matches, setup, table_path};

#[test]
// With a pool smaller than the table, a scan keeps working: clean
// pages are evicted to make room and faulted back in on demand.
fn test_eviction() {
    let _guard = setup();

    let path = table_path("eviction_test.db");
    let mut cells: Vec<Vec<i32>> = Vec::new();
    // two int columns: 504 slots per page, three pages
    let table_rc = new_random_table(&path, 2, 504 * 3, &mut cells);
    let table = table_rc.rl();

    BufferPool::set_capacity(2);
    Database::mut_buffer_pool().clear();

    let tx = Transaction::new();
    let mut row_index = 0;
    for row in table.iter(&tx) {
        assert!(row_matches(&row, &cells[row_index]));
        row_index += 1;
    }
    assert_eq!(row_index, cells.len());
    tx.commit().unwrap();

    // the pool never grew beyond its capacity
    assert!(Database::buffer_pool().len() <= 2);
}

#[test]
// The administrative flush writes dirty pages through and refreshes
// their before images.
fn test_flush_all_pages() {
    let _guard = setup();

    let path = table_path("flush_all_test.db");
    let table_rc = new_empty_table(&path, 1);
    let table = table_rc.rl();

    let tx = Transaction::new();
    table
        .insert_tuple(&tx, &Tuple::new_int_tuples(3, 1))
        .unwrap();

    // the insert is only in memory so far (page 0 was materialized
    // empty on allocation)
    let on_disk = table.read_page(0).unwrap().unwrap();
    assert_eq!(on_disk.tuples_count(), 0);

    BufferPool::flush_all_pages().unwrap();

    let on_disk = table.read_page(0).unwrap().unwrap();
    assert_eq!(on_disk.tuples_count(), 1);

    // the cached page is clean again and its before image matches
    // the flushed bytes
    let pid = HeapPageID::new(table.get_id(), 0);
    let page_rc = BufferPool::get_page(&tx, Permission::ReadWrite, &pid).unwrap();
    let page = page_rc.rl();
    assert!(page.dirtied_by().is_none());
    assert_eq!(
        page.get_before_image().unwrap().to_bytes().unwrap(),
        page.to_bytes().unwrap()
    );
    drop(page);

    tx.commit().unwrap();
}

#[test]
// A transaction that dirties more pages than the pool can hold hits
// "buffer pool exhausted"; after its commit cleans the pages the
// same insert goes through.
fn test_pool_exhausted_when_all_pages_dirty() {
    let _guard = setup();

    BufferPool::set_capacity(2);

    let path = table_path("exhausted_test.db");
    let table_rc = new_empty_table(&path, 2);
    let table = table_rc.rl();

    let tx = Transaction::new();
    // fill two pages completely (2 * 504 tuples), dirtying both
    for v in 0..1008 {
        table
            .insert_tuple(&tx, &Tuple::new_int_tuples(v, 2))
            .unwrap();
    }

    // the next insert needs a third page, but no clean page can be
    // evicted for it
    let result = table.insert_tuple(&tx, &Tuple::new_int_tuples(-1, 2));
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("buffer pool exhausted"));

    // commit forces the two dirty pages out; now there is room again
    tx.commit().unwrap();

    let tx2 = Transaction::new();
    table
        .insert_tuple(&tx2, &Tuple::new_int_tuples(-1, 2))
        .unwrap();
    tx2.commit().unwrap();

    let reader = Transaction::new();
    assert_eq!(table.tuples_count(&reader), 1009);
    reader.commit().unwrap();
}
