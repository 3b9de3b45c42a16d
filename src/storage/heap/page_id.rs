use std::fmt;

/// Identity of a page: the table it belongs to and its position in
/// the backing file. Doubles as the key of the page latch registry.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct HeapPageID {
    pub table_id: u32,
    pub page_index: u32,
}

impl HeapPageID {
    pub fn new(table_id: u32, page_index: u32) -> Self {
        Self {
            table_id,
            page_index,
        }
    }

    pub fn get_table_id(&self) -> u32 {
        self.table_id
    }

    pub fn get_short_repr(&self) -> String {
        format!("page_{}_{}", self.table_id, self.page_index)
    }
}

impl fmt::Display for HeapPageID {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.get_short_repr())
    }
}
