mod cell;
mod tuple;

pub use cell::Cell;
pub use tuple::{Tuple, WrappedTuple};
