use crate::{error::TinyError, storage::schema::Schema, storage::tuple::Tuple, types::TinyResult};

/// The tuple-stream contract every operator speaks.
///
/// A stream yields tuples only between `open` and `close`: `next_tuple`
/// and `rewind` before `open` (or after `close`) are errors. `close` is
/// idempotent, and a closed stream may be opened again.
pub trait OpIterator {
    fn open(&mut self) -> TinyResult;

    /// The next tuple of the stream, `None` once exhausted.
    fn next_tuple(&mut self) -> Result<Option<Tuple>, TinyError>;

    /// Restart the stream from the beginning. Legal only while open.
    fn rewind(&mut self) -> TinyResult;

    fn close(&mut self) -> TinyResult;

    /// Schema of the produced tuples.
    fn get_schema(&self) -> Schema;
}
