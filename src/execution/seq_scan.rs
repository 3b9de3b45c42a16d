use log::debug;

use crate::{
    error::TinyError,
    execution::OpIterator,
    storage::{heap::HeapTableIterator, schema::Schema, tuple::Tuple},
    transaction::Transaction,
    types::TinyResult,
    Database,
};

/// Table scan operator: the used tuples of one table, in storage
/// order, read under READ_ONLY permission on behalf of the given
/// transaction.
pub struct SequentialScan {
    pub table_id: u32,
    pub table_alias: String,

    schema: Schema,
    iter: HeapTableIterator,
    opened: bool,
}

impl SequentialScan {
    pub fn new(tx: &Transaction, table_id: u32, table_alias: &str) -> Self {
        let schema = Database::catalog()
            .get_schema(&table_id)
            .expect("no such table");

        debug!("seq scan created, tx: {}, table: {}", tx, table_id);

        Self {
            table_id,
            table_alias: table_alias.to_string(),
            schema,
            iter: HeapTableIterator::new(tx, table_id),
            opened: false,
        }
    }
}

impl OpIterator for SequentialScan {
    fn open(&mut self) -> TinyResult {
        self.iter.rewind();
        self.opened = true;
        Ok(())
    }

    fn next_tuple(&mut self) -> Result<Option<Tuple>, TinyError> {
        if !self.opened {
            return Err(TinyError::new("iterator not open"));
        }
        Ok(self.iter.next_tuple()?.map(|wrapped| (*wrapped).clone()))
    }

    fn rewind(&mut self) -> TinyResult {
        if !self.opened {
            return Err(TinyError::new("iterator not open"));
        }
        self.iter.rewind();
        Ok(())
    }

    fn close(&mut self) -> TinyResult {
        self.iter.close();
        self.opened = false;
        Ok(())
    }

    fn get_schema(&self) -> Schema {
        self.schema.clone()
    }
}
