use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, RwLock,
    },
};

use log::debug;

use crate::{
    error::TinyError,
    storage::{
        heap::{HeapPage, HeapPageID},
        tuple::{Tuple, WrappedTuple},
    },
    transaction::{ConcurrentStatus, Permission, Transaction},
    types::{Pod, ResultPod, TinyResult},
    utils::HandyRwLock,
    Database,
};

pub const DEFAULT_PAGE_SIZE: usize = 4096;
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(DEFAULT_PAGE_SIZE);

pub const DEFAULT_CAPACITY: usize = 50;
static CAPACITY: AtomicUsize = AtomicUsize::new(DEFAULT_CAPACITY);

/// The bounded page cache. Every page access of every transaction
/// funnels through `get_page`, which acquires the page latch before
/// touching the cache; the blocking wait never happens while a
/// global guard is held.
///
/// Recovery policy is NO-STEAL / FORCE: a dirty page is never
/// evicted, and a committing transaction's dirty pages are written
/// through before the commit returns.
pub struct BufferPool {
    buffer: HashMap<HeapPageID, Pod<HeapPage>>,

    // arrival order of the cached pages, the eviction scan order
    arrivals: Vec<HeapPageID>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self {
            buffer: HashMap::new(),
            arrivals: Vec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.arrivals.clear();
    }

    /// Number of cached pages.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn set_page_size(page_size: usize) {
        PAGE_SIZE.store(page_size, Ordering::Relaxed);
    }

    pub fn get_page_size() -> usize {
        PAGE_SIZE.load(Ordering::Relaxed)
    }

    pub fn set_capacity(capacity: usize) {
        CAPACITY.store(capacity, Ordering::Relaxed);
    }

    pub fn get_capacity() -> usize {
        CAPACITY.load(Ordering::Relaxed)
    }

    /// Retrieve the page with the requested permission. Blocks until
    /// the page latch is granted or the wait times out (in which case
    /// the caller must abort its transaction).
    ///
    /// A cache miss faults the page in from its table's file; when the
    /// pool is full, a clean page is evicted first, and if every
    /// cached page is dirty the request fails.
    pub fn get_page(tx: &Transaction, perm: Permission, pid: &HeapPageID) -> ResultPod<HeapPage> {
        ConcurrentStatus::request_latch(tx, &perm.to_latch(), pid)?;

        // fast path: cache hit
        {
            let pool = Database::buffer_pool();
            if let Some(page_rc) = pool.buffer.get(pid) {
                return Ok(page_rc.clone());
            }
        }

        // miss: read the page image without holding the pool guard
        let table_rc = Database::catalog()
            .get_table(&pid.get_table_id())
            .ok_or_else(|| TinyError::new(&format!("no such table: {}", pid.get_table_id())))?;
        let page = {
            let table = table_rc.rl();
            table.read_page(pid.page_index)?
        };
        let page =
            page.ok_or_else(|| TinyError::new(&format!("page {} does not exist on disk", pid)))?;
        let page_rc = Arc::new(RwLock::new(page));

        let mut pool = Database::mut_buffer_pool();

        // another thread may have faulted the page in meanwhile
        if let Some(existing) = pool.buffer.get(pid) {
            return Ok(existing.clone());
        }

        if pool.buffer.len() >= Self::get_capacity() {
            pool.evict_page()?;
        }

        pool.buffer.insert(*pid, page_rc.clone());
        pool.arrivals.push(*pid);
        Ok(page_rc)
    }

    // NO-STEAL victim selection: the first clean page in arrival
    // order. Flushing a clean page is a no-op, so the victim is
    // simply dropped.
    fn evict_page(&mut self) -> TinyResult {
        let victim = self
            .arrivals
            .iter()
            .find(|pid| match self.buffer.get(*pid) {
                Some(page_rc) => page_rc.rl().dirtied_by().is_none(),
                None => false,
            })
            .copied();

        match victim {
            Some(pid) => {
                debug!("evicting page {}", pid);
                self.buffer.remove(&pid);
                self.arrivals.retain(|p| *p != pid);
                Ok(())
            }
            None => Err(TinyError::new("buffer pool exhausted, all pages are dirty")),
        }
    }

    /// Add a tuple to the table on behalf of the transaction. The
    /// dirtied page keeps its write latch and stays in the pool.
    pub fn insert_tuple(tx: &Transaction, table_id: u32, tuple: &Tuple) -> TinyResult {
        let table_rc = Database::catalog()
            .get_table(&table_id)
            .ok_or_else(|| TinyError::new(&format!("no such table: {}", table_id)))?;
        let table = table_rc.rl();
        table.insert_tuple(tx, tuple)?;
        Ok(())
    }

    /// Remove the tuple addressed by its record id.
    pub fn delete_tuple(tx: &Transaction, tuple: &WrappedTuple) -> TinyResult {
        let table_id = tuple.get_pid().get_table_id();
        let table_rc = Database::catalog()
            .get_table(&table_id)
            .ok_or_else(|| TinyError::new(&format!("no such table: {}", table_id)))?;
        let table = table_rc.rl();
        table.delete_tuple(tx, tuple)
    }

    /// Give a page's latch back before end of transaction. Under
    /// strict two-phase locking this is reserved for the insert
    /// path's free-slot scan, which must not keep latches on full
    /// pages it only glanced at.
    pub fn release_page(tx: &Transaction, pid: &HeapPageID) {
        Database::mut_concurrent_status().release_latch(tx, pid);
    }

    /// Drop the cached copy of a page, so the next reader faults the
    /// on-disk image back in.
    pub fn discard_page(pid: &HeapPageID) {
        let mut pool = Database::mut_buffer_pool();
        pool.buffer.remove(pid);
        pool.arrivals.retain(|p| p != pid);
    }

    /// Write the page through to its file if it is dirty, then mark
    /// it clean and refresh its before image.
    pub fn flush_page(pid: &HeapPageID) -> TinyResult {
        let page_rc = {
            let pool = Database::buffer_pool();
            match pool.buffer.get(pid) {
                Some(page_rc) => page_rc.clone(),
                None => return Ok(()),
            }
        };

        let table_rc = Database::catalog()
            .get_table(&pid.get_table_id())
            .ok_or_else(|| TinyError::new(&format!("no such table: {}", pid.get_table_id())))?;

        let mut page = page_rc.wl();
        if page.dirtied_by().is_some() {
            debug!("flushing page {}", pid);
            table_rc.rl().write_page(&page)?;
            page.set_before_image()?;
            page.mark_dirty(None);
        }
        Ok(())
    }

    /// Write every dirty page in the pool to disk. Breaks NO-STEAL
    /// when uncommitted transactions have dirty pages; administrative
    /// use only.
    pub fn flush_all_pages() -> TinyResult {
        let pids: Vec<HeapPageID> = {
            let pool = Database::buffer_pool();
            pool.buffer.keys().copied().collect()
        };
        for pid in pids {
            Self::flush_page(&pid)?;
        }
        Ok(())
    }

    /// Finish the transaction. Commit forces the transaction's dirty
    /// pages to disk; abort discards their cached copies so later
    /// readers reload the untouched on-disk image. Either way all of
    /// the transaction's latches are released.
    pub fn tx_complete(tx: &Transaction, commit: bool) -> TinyResult {
        let dirty_pids = Database::concurrent_status().get_dirty_pages(tx);

        if commit {
            for pid in &dirty_pids {
                Self::flush_page(pid)?;
            }
        } else {
            for pid in &dirty_pids {
                debug!("discarding page {} of aborted {}", pid, tx);
                Self::discard_page(pid);
            }
        }

        Database::mut_concurrent_status().remove_relation(tx);
        Ok(())
    }
}
