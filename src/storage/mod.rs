pub mod buffer_pool;
pub mod heap;
pub mod schema;
pub mod tuple;

pub use buffer_pool::BufferPool;
