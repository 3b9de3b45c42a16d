use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{storage::buffer_pool::BufferPool, types::TinyResult};

static TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Eq, Hash, PartialEq, Clone, Copy)]
pub struct Transaction {
    // increase monotonically by 1
    id: u64,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            id: TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn get_id(&self) -> u64 {
        self.id
    }

    pub fn commit(&self) -> TinyResult {
        self.complete(true)
    }

    pub fn abort(&self) -> TinyResult {
        self.complete(false)
    }

    // Force dirty pages / discard them, then give back every latch.
    fn complete(&self, commit: bool) -> TinyResult {
        BufferPool::tx_complete(self, commit)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "tx_{}", self.id)
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}
