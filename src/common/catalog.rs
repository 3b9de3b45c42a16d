use std::collections::HashMap;

use crate::{storage::schema::Schema, types::Pod, utils::HandyRwLock, Database, HeapTable};

type TableID = u32;
type TableRC = Pod<HeapTable>;

/// In-memory registry of the database's tables: table id to heap
/// file, and through it to the table's schema. Populating it is the
/// caller's business (there is no on-disk catalog).
pub struct Catalog {
    tables: HashMap<TableID, TableRC>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    pub fn add_table(table_rc: TableRC) {
        let mut catalog = Database::mut_catalog();
        let table_id = table_rc.rl().get_id();
        catalog.tables.insert(table_id, table_rc.clone());
    }

    pub fn get_table(&self, table_id: &TableID) -> Option<TableRC> {
        self.tables.get(table_id).cloned()
    }

    pub fn get_schema(&self, table_id: &TableID) -> Option<Schema> {
        self.tables.get(table_id).map(|t| t.rl().get_schema())
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }
}
