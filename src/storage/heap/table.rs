use std::{
    collections::hash_map::DefaultHasher,
    fmt,
    fs::{File, OpenOptions},
    hash::{Hash, Hasher},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use log::debug;

use super::{HeapPage, HeapPageID, HeapTableIterator};
use crate::{
    error::TinyError,
    storage::{
        buffer_pool::BufferPool,
        schema::Schema,
        tuple::{Tuple, WrappedTuple},
    },
    transaction::{Permission, Transaction},
    types::TinyResult,
    utils::HandyRwLock,
    Database,
};

/// A heap file: one backing file holding an unordered sequence of
/// fixed-size pages. All page access from transactions goes through
/// the buffer pool; this type only knows how to move page images
/// between memory and its byte offsets.
pub struct HeapTable {
    // absolute path of the backing file; also the source of the
    // table id, which must stay stable across opens
    file_path: String,

    pub schema: Schema,

    table_id: u32,

    // serializes file growth, so two inserts cannot claim the same
    // fresh page index
    extend_latch: Mutex<()>,

    // physical page reads, observable by tests
    read_count: AtomicUsize,
}

impl fmt::Display for HeapTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<HeapTable, file: {}, id: {}>", self.file_path, self.table_id)
    }
}

impl HeapTable {
    pub fn new(file_path: &str, schema: &Schema) -> Self {
        OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(file_path)
            .expect("io error");

        let file_path = std::fs::canonicalize(file_path)
            .expect("io error")
            .to_string_lossy()
            .to_string();

        let mut hasher = DefaultHasher::new();
        file_path.hash(&mut hasher);
        let table_id = hasher.finish() as u32;

        Self {
            file_path,
            schema: schema.clone(),
            table_id,
            extend_latch: Mutex::new(()),
            read_count: AtomicUsize::new(0),
        }
    }

    pub fn get_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_schema(&self) -> Schema {
        self.schema.clone()
    }

    pub fn get_read_count(&self) -> usize {
        self.read_count.load(Ordering::Relaxed)
    }

    // A fresh handle per call; concurrent access to one page is
    // serialized by that page's latch, not by the file.
    fn get_file(&self) -> Result<File, TinyError> {
        OpenOptions::new()
            .write(true)
            .read(true)
            .open(&self.file_path)
            .or_else(|e| Err(TinyError::new(&format!("io error, open failed: {}", e))))
    }

    /// Number of pages in the backing file, a trailing partial page
    /// rounded up. Advisory under concurrent inserts: the file only
    /// ever grows, and fresh pages are written through before use.
    pub fn pages_count(&self) -> usize {
        let len = std::fs::metadata(&self.file_path)
            .map(|m| m.len() as usize)
            .unwrap_or(0);
        let page_size = BufferPool::get_page_size();
        (len + page_size - 1) / page_size
    }

    /// Read the page image at the given index. A short read means the
    /// page does not exist (yet) and yields `None`.
    pub fn read_page(&self, page_index: u32) -> Result<Option<HeapPage>, TinyError> {
        let page_size = BufferPool::get_page_size();
        let mut file = self.get_file()?;
        file.seek(SeekFrom::Start((page_index as usize * page_size) as u64))
            .or_else(|e| Err(TinyError::new(&format!("io error, seek failed: {}", e))))?;

        let mut buf = vec![0u8; page_size];
        match file.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(TinyError::new(&format!("io error, read failed: {}", e))),
        }

        self.read_count.fetch_add(1, Ordering::Relaxed);
        debug!("page read from disk, pid: page_{}_{}", self.table_id, page_index);

        let pid = HeapPageID::new(self.table_id, page_index);
        let page = HeapPage::new(&pid, &buf, &self.schema)?;
        Ok(Some(page))
    }

    /// Write the page image at its offset. Atomicity with respect to
    /// readers of the same page is provided by the caller holding the
    /// page's exclusive latch.
    pub fn write_page(&self, page: &HeapPage) -> TinyResult {
        let data = page.to_bytes()?;
        self.write_page_data(&page.get_pid(), &data)
    }

    pub fn write_empty_page_to_disk(&self, pid: &HeapPageID) -> TinyResult {
        self.write_page_data(pid, &HeapPage::empty_page_data())
    }

    fn write_page_data(&self, pid: &HeapPageID, data: &[u8]) -> TinyResult {
        let page_size = BufferPool::get_page_size();
        let mut file = self.get_file()?;
        file.seek(SeekFrom::Start((pid.page_index as usize * page_size) as u64))
            .or_else(|e| Err(TinyError::new(&format!("io error, seek failed: {}", e))))?;
        file.write_all(data)
            .or_else(|e| Err(TinyError::new(&format!("io error, write failed: {}", e))))?;
        file.flush()
            .or_else(|e| Err(TinyError::new(&format!("io error, flush failed: {}", e))))?;
        Ok(())
    }

    /// Add the tuple to the first page with a free slot, extending the
    /// file when every page is full. Returns the stored tuple with its
    /// record id.
    ///
    /// The free-slot scan takes a write latch on each candidate page
    /// and hands it back immediately when the page turns out to be
    /// full, unless this transaction already dirtied that page (those
    /// latches are held to the end of the transaction).
    pub fn insert_tuple(
        &self,
        tx: &Transaction,
        tuple: &Tuple,
    ) -> Result<WrappedTuple, TinyError> {
        if !tuple.matches_schema(&self.schema) {
            return Err(TinyError::new(&format!(
                "schema mismatch, tuple {} does not fit table {}",
                tuple, self
            )));
        }

        let mut page_index: u32 = 0;
        while (page_index as usize) < self.pages_count() {
            let pid = HeapPageID::new(self.table_id, page_index);
            let page_rc = BufferPool::get_page(tx, Permission::ReadWrite, &pid)?;

            let inserted = {
                let mut page = page_rc.wl();
                if page.empty_slots_count() > 0 {
                    let slot = page.insert_tuple(tuple)?;
                    page.mark_dirty(Some(*tx));
                    Some(slot)
                } else {
                    None
                }
            };

            match inserted {
                Some(slot) => {
                    Database::mut_concurrent_status().set_dirty_page(tx, &pid);
                    return Ok(WrappedTuple::new(tuple.clone(), slot, pid));
                }
                None => {
                    if !Database::concurrent_status().is_dirtied_by(tx, &pid) {
                        BufferPool::release_page(tx, &pid);
                    }
                    page_index += 1;
                }
            }
        }

        // every page is full: materialize a fresh page on disk first,
        // so concurrent readers computing pages_count already see it
        let pid;
        {
            let _guard = self.extend_latch.lock().unwrap();
            pid = HeapPageID::new(self.table_id, self.pages_count() as u32);
            self.write_empty_page_to_disk(&pid)?;
        }
        debug!("table extended, tx: {}, new page: {}", tx, pid);

        let page_rc = BufferPool::get_page(tx, Permission::ReadWrite, &pid)?;
        let slot = {
            let mut page = page_rc.wl();
            let slot = page.insert_tuple(tuple)?;
            page.mark_dirty(Some(*tx));
            slot
        };
        Database::mut_concurrent_status().set_dirty_page(tx, &pid);
        Ok(WrappedTuple::new(tuple.clone(), slot, pid))
    }

    /// Remove the tuple addressed by its record id.
    pub fn delete_tuple(&self, tx: &Transaction, tuple: &WrappedTuple) -> TinyResult {
        let pid = tuple.get_pid();
        if pid.get_table_id() != self.table_id {
            return Err(TinyError::new(&format!(
                "record {} does not refer to table {}",
                pid, self
            )));
        }

        let page_rc = BufferPool::get_page(tx, Permission::ReadWrite, &pid)?;
        {
            let mut page = page_rc.wl();
            page.delete_tuple(tuple)?;
            page.mark_dirty(Some(*tx));
        }
        Database::mut_concurrent_status().set_dirty_page(tx, &pid);
        Ok(())
    }

    /// All used tuples in (page index, slot) order, read under
    /// READ_ONLY permission.
    pub fn iter(&self, tx: &Transaction) -> HeapTableIterator {
        HeapTableIterator::new(tx, self.table_id)
    }

    /// Count of used tuples, via a full scan.
    pub fn tuples_count(&self, tx: &Transaction) -> usize {
        self.iter(tx).count()
    }
}
