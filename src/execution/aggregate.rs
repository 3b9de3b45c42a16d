use std::collections::HashMap;

use itertools::Itertools;

use crate::{
    error::TinyError,
    execution::OpIterator,
    storage::{
        schema::{Field, Schema, Type},
        tuple::{Cell, Tuple},
    },
    types::TinyResult,
};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

/// Online aggregation: tuples are folded in one at a time, keyed by
/// the group field (every tuple lands in the single `None` group when
/// no group field is configured), and the summary stream is produced
/// once the input is exhausted.
pub trait Aggregator {
    fn merge(&mut self, tuple: &Tuple) -> TinyResult;

    /// The materialized result stream: one tuple per group in
    /// ascending group order, `(group, aggregate)` when grouped and
    /// `(aggregate,)` otherwise.
    fn iterator(&self) -> TupleIterator;
}

fn group_key(tuple: &Tuple, gb_field: Option<usize>) -> Result<Option<Cell>, TinyError> {
    match gb_field {
        Some(i) => {
            if i >= tuple.cell_count() {
                return Err(TinyError::new(&format!("no such field: {}", i)));
            }
            Ok(Some(tuple.get_cell(i)))
        }
        None => Ok(None),
    }
}

fn output_schema(gb_type: Option<Type>) -> Schema {
    match gb_type {
        Some(t) => Schema::new(vec![
            Field::new("group", t),
            Field::new("aggregate", Type::Int),
        ]),
        None => Schema::new(vec![Field::new("aggregate", Type::Int)]),
    }
}

pub struct IntegerAggregator {
    gb_field: Option<usize>,
    gb_type: Option<Type>,
    agg_field: usize,
    op: AggregateOp,

    // per group: the running value (min/max/sum) and the row count
    groups: HashMap<Option<Cell>, (i32, usize)>,
}

impl IntegerAggregator {
    pub fn new(
        gb_field: Option<usize>,
        gb_type: Option<Type>,
        agg_field: usize,
        op: AggregateOp,
    ) -> Self {
        Self {
            gb_field,
            gb_type,
            agg_field,
            op,
            groups: HashMap::new(),
        }
    }
}

impl Aggregator for IntegerAggregator {
    fn merge(&mut self, tuple: &Tuple) -> TinyResult {
        let key = group_key(tuple, self.gb_field)?;

        if self.agg_field >= tuple.cell_count() {
            return Err(TinyError::new(&format!("no such field: {}", self.agg_field)));
        }
        let v = tuple.get_cell(self.agg_field).get_int32()?;

        if !self.groups.contains_key(&key) {
            // the first tuple seeds the group
            self.groups.insert(key, (v, 1));
            return Ok(());
        }

        let (acc, count) = self.groups.get_mut(&key).unwrap();
        match self.op {
            AggregateOp::Min => *acc = (*acc).min(v),
            AggregateOp::Max => *acc = (*acc).max(v),
            AggregateOp::Sum | AggregateOp::Avg => *acc += v,
            AggregateOp::Count => {}
        }
        *count += 1;
        Ok(())
    }

    fn iterator(&self) -> TupleIterator {
        let mut tuples = Vec::new();
        for (key, (acc, count)) in self.groups.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
            let result = match self.op {
                AggregateOp::Min | AggregateOp::Max | AggregateOp::Sum => *acc,
                // integer division, rounded towards zero
                AggregateOp::Avg => *acc / (*count as i32),
                AggregateOp::Count => *count as i32,
            };

            let mut cells = Vec::new();
            if let Some(group) = key {
                cells.push(group.clone());
            }
            cells.push(Cell::Int32(result));
            tuples.push(Tuple::new(&cells));
        }

        TupleIterator::new(&output_schema(self.gb_type), tuples)
    }
}

/// String columns only support COUNT.
pub struct StringAggregator {
    gb_field: Option<usize>,
    gb_type: Option<Type>,
    agg_field: usize,

    groups: HashMap<Option<Cell>, usize>,
}

impl StringAggregator {
    pub fn new(
        gb_field: Option<usize>,
        gb_type: Option<Type>,
        agg_field: usize,
        op: AggregateOp,
    ) -> Result<Self, TinyError> {
        if op != AggregateOp::Count {
            return Err(TinyError::new(&format!(
                "string aggregation supports COUNT only, got {:?}",
                op
            )));
        }

        Ok(Self {
            gb_field,
            gb_type,
            agg_field,
            groups: HashMap::new(),
        })
    }
}

impl Aggregator for StringAggregator {
    fn merge(&mut self, tuple: &Tuple) -> TinyResult {
        let key = group_key(tuple, self.gb_field)?;

        if self.agg_field >= tuple.cell_count() {
            return Err(TinyError::new(&format!("no such field: {}", self.agg_field)));
        }
        tuple.get_cell(self.agg_field).get_string()?;

        *self.groups.entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn iterator(&self) -> TupleIterator {
        let mut tuples = Vec::new();
        for (key, count) in self.groups.iter().sorted_by(|a, b| a.0.cmp(b.0)) {
            let mut cells = Vec::new();
            if let Some(group) = key {
                cells.push(group.clone());
            }
            cells.push(Cell::Int32(*count as i32));
            tuples.push(Tuple::new(&cells));
        }

        TupleIterator::new(&output_schema(self.gb_type), tuples)
    }
}

/// A stream over an in-memory tuple vector.
pub struct TupleIterator {
    schema: Schema,
    tuples: Vec<Tuple>,

    // None while closed
    cursor: Option<usize>,
}

impl TupleIterator {
    pub fn new(schema: &Schema, tuples: Vec<Tuple>) -> Self {
        Self {
            schema: schema.clone(),
            tuples,
            cursor: None,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> TinyResult {
        self.cursor = Some(0);
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<Option<Tuple>, TinyError> {
        match self.cursor {
            None => Err(TinyError::new("iterator not open")),
            Some(i) => {
                if i < self.tuples.len() {
                    self.cursor = Some(i + 1);
                    Ok(Some(self.tuples[i].clone()))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn rewind(&mut self) -> TinyResult {
        match self.cursor {
            None => Err(TinyError::new("iterator not open")),
            Some(_) => {
                self.cursor = Some(0);
                Ok(())
            }
        }
    }

    fn close(&mut self) -> TinyResult {
        self.cursor = None;
        Ok(())
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}

/// The aggregation operator. The first `open` drains the child once,
/// feeding every tuple to the aggregator, and materializes the group
/// stream; `rewind` (and close/open cycles) replay that materialized
/// result.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    aggregator: Box<dyn Aggregator>,
    schema: Schema,

    result: Option<TupleIterator>,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        gb_field: Option<usize>,
        agg_field: usize,
        op: AggregateOp,
    ) -> Result<Self, TinyError> {
        let child_schema = child.get_schema();
        let gb_type = match gb_field {
            Some(i) => Some(child_schema.get_type(i)?),
            None => None,
        };

        let aggregator: Box<dyn Aggregator> = match child_schema.get_type(agg_field)? {
            Type::Int => Box::new(IntegerAggregator::new(gb_field, gb_type, agg_field, op)),
            Type::String(_) => Box::new(StringAggregator::new(gb_field, gb_type, agg_field, op)?),
        };

        Ok(Self {
            child,
            aggregator,
            schema: output_schema(gb_type),
            result: None,
        })
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> TinyResult {
        if self.result.is_none() {
            self.child.open()?;
            while let Some(tuple) = self.child.next_tuple()? {
                self.aggregator.merge(&tuple)?;
            }
            self.child.close()?;
            self.result = Some(self.aggregator.iterator());
        }

        match self.result.as_mut() {
            Some(result) => result.open(),
            None => Err(TinyError::new("aggregate result missing")),
        }
    }

    fn next_tuple(&mut self) -> Result<Option<Tuple>, TinyError> {
        match self.result.as_mut() {
            Some(result) => result.next_tuple(),
            None => Err(TinyError::new("iterator not open")),
        }
    }

    fn rewind(&mut self) -> TinyResult {
        match self.result.as_mut() {
            Some(result) => result.rewind(),
            None => Err(TinyError::new("iterator not open")),
        }
    }

    fn close(&mut self) -> TinyResult {
        match self.result.as_mut() {
            Some(result) => result.close(),
            None => Ok(()),
        }
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}
