use crate::{
    error::TinyError,
    predicate::Predicate,
    storage::{buffer_pool::BufferPool, heap::HeapPageID, tuple::WrappedTuple},
    transaction::{Permission, Transaction},
    utils::HandyRwLock,
    Database, HeapTable,
};

/// Full-table scan in (page index, slot) order. Pages are faulted in
/// through the buffer pool under READ_ONLY permission, one page's
/// rows buffered at a time. The latches it takes stay with the
/// transaction until commit or abort.
pub struct HeapTableIterator {
    tx: Transaction,
    table_id: u32,

    page_index: u32,
    page_loaded: bool,
    rows: Vec<WrappedTuple>,
    row_index: usize,
}

impl HeapTableIterator {
    pub fn new(tx: &Transaction, table_id: u32) -> Self {
        Self {
            tx: *tx,
            table_id,
            page_index: 0,
            page_loaded: false,
            rows: Vec::new(),
            row_index: 0,
        }
    }

    fn pages_count(&self) -> Result<usize, TinyError> {
        let table_rc = Database::catalog()
            .get_table(&self.table_id)
            .ok_or_else(|| TinyError::new(&format!("no such table: {}", self.table_id)))?;
        let count = table_rc.rl().pages_count();
        Ok(count)
    }

    fn load_page(&mut self) -> Result<(), TinyError> {
        let pid = HeapPageID::new(self.table_id, self.page_index);
        let page_rc = BufferPool::get_page(&self.tx, Permission::ReadOnly, &pid)?;
        self.rows = page_rc.rl().iter().collect();
        self.row_index = 0;
        Ok(())
    }

    pub fn next_tuple(&mut self) -> Result<Option<WrappedTuple>, TinyError> {
        loop {
            if self.row_index < self.rows.len() {
                let row = self.rows[self.row_index].clone();
                self.row_index += 1;
                return Ok(Some(row));
            }

            let next_page = if self.page_loaded {
                self.page_index + 1
            } else {
                0
            };
            if (next_page as usize) >= self.pages_count()? {
                return Ok(None);
            }

            self.page_index = next_page;
            self.page_loaded = true;
            self.load_page()?;
        }
    }

    /// Restart at page 0. The transaction's latches are untouched.
    pub fn rewind(&mut self) {
        self.page_index = 0;
        self.page_loaded = false;
        self.rows.clear();
        self.row_index = 0;
    }

    /// Drop the buffered rows. Latches stay with the transaction.
    pub fn close(&mut self) {
        self.rows.clear();
        self.row_index = 0;
    }
}

// Convenience adapter for `for` loops; storage errors surface as
// panics here, use `next_tuple` where they must propagate.
impl Iterator for HeapTableIterator {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tuple().expect("scan failed")
    }
}

/// A scan filtered by a predicate, yielding only matching tuples.
pub struct HeapTableSearchIterator {
    iter: HeapTableIterator,
    predicate: Predicate,
}

impl HeapTableSearchIterator {
    pub fn new(tx: &Transaction, table: &HeapTable, predicate: &Predicate) -> Self {
        Self {
            iter: table.iter(tx),
            predicate: predicate.clone(),
        }
    }

    pub fn next_tuple(&mut self) -> Result<Option<WrappedTuple>, TinyError> {
        while let Some(tuple) = self.iter.next_tuple()? {
            if self
                .predicate
                .matches(&tuple.get_cell(self.predicate.field_index))
            {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
}

impl Iterator for HeapTableSearchIterator {
    type Item = WrappedTuple;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_tuple().expect("scan failed")
    }
}
