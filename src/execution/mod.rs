mod aggregate;
mod op_iterator;
mod seq_scan;

pub use aggregate::{
    Aggregate, AggregateOp, Aggregator, IntegerAggregator, StringAggregator, TupleIterator,
};
pub use op_iterator::OpIterator;
pub use seq_scan::SequentialScan;
