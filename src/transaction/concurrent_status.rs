use core::fmt;
use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
    thread::sleep,
    time::{Duration, Instant},
};

use log::debug;
use rand::Rng;

use crate::{
    error::TinyError, storage::heap::HeapPageID, transaction::Transaction, types::TinyResult,
    Database,
};

// A latch request waits somewhere between these two bounds before it
// gives up. The jitter keeps waiters from retrying in lockstep and
// breaks latch cycles probabilistically: there is no wait-for graph,
// a timed-out request simply aborts its transaction.
const MIN_WAIT_MS: u64 = 100;
static MAX_WAIT_MS: AtomicU64 = AtomicU64::new(1000);

const POLL_INTERVAL_MS: u64 = 10;

#[derive(Debug, PartialEq)]
pub enum Latch {
    SLatch,
    XLatch,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Permission {
    ReadOnly,
    ReadWrite,
}

impl Permission {
    pub fn to_latch(&self) -> Latch {
        match self {
            Permission::ReadOnly => Latch::SLatch,
            Permission::ReadWrite => Latch::XLatch,
        }
    }
}

/// The page latch registry: which transaction holds which page in
/// which mode, which pages a transaction has latched, and which it
/// has dirtied. All mutation happens under the registry's own
/// write guard, held only for the short map operations; the blocking
/// wait loop lives in `request_latch` with no guard held.
pub struct ConcurrentStatus {
    s_latch_map: HashMap<HeapPageID, HashSet<Transaction>>,
    x_latch_map: HashMap<HeapPageID, Transaction>,

    hold_pages: HashMap<Transaction, HashSet<HeapPageID>>,

    dirty_pages: HashMap<Transaction, HashSet<HeapPageID>>,
}

impl ConcurrentStatus {
    pub fn new() -> Self {
        Self {
            s_latch_map: HashMap::new(),
            x_latch_map: HashMap::new(),
            hold_pages: HashMap::new(),
            dirty_pages: HashMap::new(),
        }
    }

    /// Clamp the ceiling of the randomized wait, for tests that need
    /// a fast timeout.
    pub fn set_timeout(ms: u64) {
        MAX_WAIT_MS.store(ms, Ordering::Relaxed);
    }

    /// Request a latch on the given page. Blocks until granted or
    /// until a randomized deadline passes; a timeout means the caller
    /// must abort its transaction.
    pub(crate) fn request_latch(
        tx: &Transaction,
        latch: &Latch,
        pid: &HeapPageID,
    ) -> TinyResult {
        // fast path: a latch at this or a stronger mode is already held
        {
            let concurrent_status = Database::concurrent_status();
            if concurrent_status.holds_at_least(tx, latch, pid) {
                return Ok(());
            }
        }

        let ceiling = MAX_WAIT_MS.load(Ordering::Relaxed).max(1);
        let floor = MIN_WAIT_MS.min(ceiling);
        let timeout_ms = rand::thread_rng().gen_range(floor, ceiling + 1);
        let timeout = Duration::from_millis(timeout_ms);
        let start_time = Instant::now();

        loop {
            {
                let mut concurrent_status = Database::mut_concurrent_status();
                if concurrent_status.add_latch(tx, latch, pid) {
                    return Ok(());
                }
            }

            if start_time.elapsed() >= timeout {
                break;
            }
            sleep(Duration::from_millis(POLL_INTERVAL_MS));
        }

        debug!(
            "latch timeout after {:?}, tx: {}, latch: {:?}, page: {}, status: {:?}",
            timeout,
            tx,
            latch,
            pid,
            Database::concurrent_status(),
        );
        let err = TinyError::new(&format!(
            "transaction aborted, latch timeout, tx: {}, latch: {:?}, page: {}",
            tx, latch, pid
        ));
        err.show_backtrace();
        Err(err)
    }

    // Try to grant the latch right now. Idempotent: a transaction
    // re-requesting a page it already holds at the same or a weaker
    // mode succeeds immediately; the sole shared holder upgrades in
    // place.
    fn add_latch(&mut self, tx: &Transaction, latch: &Latch, pid: &HeapPageID) -> bool {
        if let Some(holder) = self.x_latch_map.get(pid) {
            // an exclusive holder satisfies any of its own requests
            // and blocks everyone else
            return holder == tx;
        }

        match latch {
            Latch::SLatch => {
                self.s_latch_map
                    .entry(*pid)
                    .or_insert_with(HashSet::new)
                    .insert(*tx);
            }
            Latch::XLatch => {
                if let Some(holders) = self.s_latch_map.get(pid) {
                    if holders.iter().any(|t| t != tx) {
                        return false;
                    }
                }

                // no holder at all, or upgrading our own shared latch
                self.s_latch_map.remove(pid);
                self.x_latch_map.insert(*pid, *tx);
            }
        }

        self.hold_pages
            .entry(*tx)
            .or_insert_with(HashSet::new)
            .insert(*pid);
        debug!("latch granted, tx: {}, latch: {:?}, page: {}", tx, latch, pid);
        true
    }

    fn holds_at_least(&self, tx: &Transaction, latch: &Latch, pid: &HeapPageID) -> bool {
        if self.x_latch_map.get(pid) == Some(tx) {
            return true;
        }

        match latch {
            Latch::SLatch => self
                .s_latch_map
                .get(pid)
                .map_or(false, |holders| holders.contains(tx)),
            Latch::XLatch => false,
        }
    }

    /// Whether the transaction holds the page in any mode.
    pub fn holds_latch(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        self.holds_at_least(tx, &Latch::SLatch, pid)
    }

    /// Give back one page. An entry left with no holder is removed
    /// from the registry; the polling waiters see the page as free on
    /// their next probe.
    pub(crate) fn release_latch(&mut self, tx: &Transaction, pid: &HeapPageID) {
        if let Some(holders) = self.s_latch_map.get_mut(pid) {
            holders.remove(tx);
            if holders.is_empty() {
                self.s_latch_map.remove(pid);
            }
        }

        if self.x_latch_map.get(pid) == Some(tx) {
            self.x_latch_map.remove(pid);
        }

        if let Some(pages) = self.hold_pages.get_mut(tx) {
            pages.remove(pid);
            if pages.is_empty() {
                self.hold_pages.remove(tx);
            }
        }
    }

    /// End of transaction: give back every held page and forget the
    /// dirty set.
    pub(crate) fn remove_relation(&mut self, tx: &Transaction) {
        self.dirty_pages.remove(tx);

        if let Some(pages) = self.hold_pages.remove(tx) {
            for pid in pages {
                if let Some(holders) = self.s_latch_map.get_mut(&pid) {
                    holders.remove(tx);
                    if holders.is_empty() {
                        self.s_latch_map.remove(&pid);
                    }
                }
                if self.x_latch_map.get(&pid) == Some(tx) {
                    self.x_latch_map.remove(&pid);
                }
            }
        }
    }

    pub(crate) fn set_dirty_page(&mut self, tx: &Transaction, pid: &HeapPageID) {
        self.dirty_pages
            .entry(*tx)
            .or_insert_with(HashSet::new)
            .insert(*pid);
    }

    pub(crate) fn get_dirty_pages(&self, tx: &Transaction) -> HashSet<HeapPageID> {
        self.dirty_pages.get(tx).cloned().unwrap_or_default()
    }

    pub(crate) fn is_dirtied_by(&self, tx: &Transaction, pid: &HeapPageID) -> bool {
        self.dirty_pages
            .get(tx)
            .map_or(false, |pages| pages.contains(pid))
    }

    pub fn clear(&mut self) {
        self.s_latch_map.clear();
        self.x_latch_map.clear();
        self.hold_pages.clear();
        self.dirty_pages.clear();
    }
}

impl fmt::Display for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut depiction = "\n".to_string();

        depiction.push_str("s_latch_map: {");
        for (pid, holders) in self.s_latch_map.iter() {
            depiction.push_str(&format!("\n\t{} -> {:?},", pid.get_short_repr(), holders));
        }
        depiction.push_str("\n}\n");

        depiction.push_str("x_latch_map: {");
        for (pid, holder) in self.x_latch_map.iter() {
            depiction.push_str(&format!("\n\t{} -> {:?},", pid.get_short_repr(), holder));
        }
        depiction.push_str("\n}\n");

        depiction.push_str("hold_pages: {");
        for (tx, pages) in self.hold_pages.iter() {
            let pages: Vec<String> = pages.iter().map(|p| p.get_short_repr()).collect();
            depiction.push_str(&format!("\n\t{:?} -> {:?},", tx, pages));
        }
        depiction.push_str("\n}\n");

        depiction.push_str("dirty_pages: {");
        for (tx, pages) in self.dirty_pages.iter() {
            let pages: Vec<String> = pages.iter().map(|p| p.get_short_repr()).collect();
            depiction.push_str(&format!("\n\t{:?} -> {:?},", tx, pages));
        }
        depiction.push_str("\n}\n");

        write!(f, "{}", depiction)
    }
}

impl fmt::Debug for ConcurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
