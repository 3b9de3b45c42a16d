mod concurrent_status;
mod tx;

pub use concurrent_status::{ConcurrentStatus, Latch, Permission};
pub use tx::Transaction;
