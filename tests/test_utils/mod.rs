// not every test binary uses every helper
#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use once_cell::sync::Lazy;
use rand::Rng;
use tiny_db::{
    int_schema,
    storage::{buffer_pool, tuple::Tuple, BufferPool},
    transaction::{ConcurrentStatus, Transaction},
    types::Pod,
    utils::{self, HandyRwLock},
    Catalog, Database, HeapTable,
};

// The database state is process-global, so the tests of one binary
// take this latch and cannot reset it out from under each other.
static TEST_LATCH: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

/// # Conduct the initialization
///
/// - Setting up log configurations.
/// - Reset page size, pool capacity and latch timeout.
/// - Reset the database (page cache, catalog, latch registry).
pub fn setup() -> MutexGuard<'static, ()> {
    let guard = TEST_LATCH.lock().unwrap_or_else(|e| e.into_inner());

    utils::init_log();
    BufferPool::set_page_size(buffer_pool::DEFAULT_PAGE_SIZE);
    BufferPool::set_capacity(buffer_pool::DEFAULT_CAPACITY);
    ConcurrentStatus::set_timeout(1000);
    Database::reset();

    guard
}

pub fn table_path(name: &str) -> String {
    std::env::temp_dir().join(name).to_string_lossy().to_string()
}

/// Create an empty heap table with the given number of int columns
/// and register it in the catalog. A stale backing file from an
/// earlier run is removed first.
pub fn new_empty_table(path: &str, columns: usize) -> Pod<HeapTable> {
    let _ = std::fs::remove_file(path);

    let table_rc = Arc::new(RwLock::new(HeapTable::new(path, &int_schema(columns, ""))));
    Catalog::add_table(table_rc.clone());
    table_rc
}

/// Create a table filled with `rows` random rows (each row repeats
/// one random value across its columns). The inserted values are
/// returned through `cells`, in insertion order.
pub fn new_random_table(
    path: &str,
    columns: usize,
    rows: usize,
    cells: &mut Vec<Vec<i32>>,
) -> Pod<HeapTable> {
    let table_rc = new_empty_table(path, columns);

    let tx = Transaction::new();
    {
        let table = table_rc.rl();
        let mut rng = rand::thread_rng();
        for _ in 0..rows {
            let value = rng.gen_range(-10000, 10000);
            table
                .insert_tuple(&tx, &Tuple::new_int_tuples(value, columns))
                .unwrap();
            cells.push(vec![value; columns]);
        }
    }
    tx.commit().unwrap();

    table_rc
}

/// Compare a scanned row against the expected cell values.
pub fn row_matches(tuple: &Tuple, expected: &[i32]) -> bool {
    (0..expected.len()).all(|i| tuple.get_cell(i).get_int32().unwrap() == expected[i])
}
