use std::fmt;

use crate::{
    error::TinyError,
    io::TinyWriter,
    storage::{heap::HeapPageID, schema::Schema, tuple::Cell},
};

pub struct Tuple {
    cells: Vec<Cell>,
}

// constructors
impl Tuple {
    pub fn new(cells: &[Cell]) -> Self {
        Self {
            cells: cells.to_vec(),
        }
    }

    pub fn read_from<R: std::io::Read>(
        reader: &mut R,
        schema: &Schema,
    ) -> Result<Self, TinyError> {
        let mut cells: Vec<Cell> = Vec::new();
        for field in &schema.fields {
            cells.push(Cell::decode(reader, &field.field_type)?);
        }
        Ok(Tuple { cells })
    }

    pub fn new_int_tuples(value: i32, width: usize) -> Self {
        let mut cells: Vec<Cell> = Vec::new();
        for _ in 0..width {
            cells.push(Cell::Int32(value));
        }

        Tuple { cells }
    }
}

impl Tuple {
    pub fn get_cell(&self, i: usize) -> Cell {
        self.cells[i].clone()
    }

    pub fn set_cell(&mut self, i: usize, cell: Cell) {
        self.cells[i] = cell;
    }

    pub fn get_cells(&self) -> Vec<Cell> {
        self.cells.clone()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether the cells fit the schema, pointwise.
    pub fn matches_schema(&self, schema: &Schema) -> bool {
        self.cells.len() == schema.fields.len()
            && self
                .cells
                .iter()
                .zip(&schema.fields)
                .all(|(c, f)| c.matches_type(&f.field_type))
    }

    /// The page image of this tuple under the given schema,
    /// exactly `schema.get_size()` bytes.
    pub fn encode(&self, schema: &Schema) -> Result<Vec<u8>, TinyError> {
        if self.cells.len() != schema.fields.len() {
            return Err(TinyError::new(&format!(
                "schema mismatch, {} cells vs {} fields",
                self.cells.len(),
                schema.fields.len()
            )));
        }

        let mut writer = TinyWriter::new();
        for (cell, field) in self.cells.iter().zip(&schema.fields) {
            writer.write_bytes(&cell.encode(&field.field_type)?);
        }
        Ok(writer.to_bytes())
    }
}

impl Clone for Tuple {
    fn clone(&self) -> Self {
        Tuple {
            cells: self.cells.clone(),
        }
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.cells == other.cells
    }
}

impl Eq for Tuple {}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut content: String = "{".to_owned();
        for cell in &self.cells {
            content.push_str(&format!("{:?}, ", cell));
        }
        content = content[..content.len() - 2].to_string();
        content.push_str("}");
        write!(f, "{}", content)
    }
}

impl fmt::Debug for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// A tuple together with its record identity: the page it sits on
/// and the slot it occupies. This is what scans yield and what the
/// delete path addresses.
#[derive(Clone, PartialEq)]
pub struct WrappedTuple {
    internal: Tuple,
    slot_number: usize,
    pid: HeapPageID,
}

impl std::ops::Deref for WrappedTuple {
    type Target = Tuple;
    fn deref(&self) -> &Self::Target {
        &self.internal
    }
}

impl std::ops::DerefMut for WrappedTuple {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.internal
    }
}

impl WrappedTuple {
    pub fn new(internal: Tuple, slot_number: usize, pid: HeapPageID) -> WrappedTuple {
        WrappedTuple {
            internal,
            slot_number,
            pid,
        }
    }

    pub fn get_slot_number(&self) -> usize {
        self.slot_number
    }

    pub fn get_pid(&self) -> HeapPageID {
        self.pid
    }
}

impl Eq for WrappedTuple {}

impl fmt::Display for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@{}:{}", self.internal, self.pid, self.slot_number)
    }
}

impl fmt::Debug for WrappedTuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::storage::schema::{Field, Type};

    #[test]
    fn test_tuple_round_trip() {
        let schema = Schema::new(vec![
            Field::new("id", Type::Int),
            Field::new("name", Type::String(10)),
        ]);
        let tuple = Tuple::new(&[Cell::new_int32(42), Cell::new_string("crab")]);

        let bytes = tuple.encode(&schema).unwrap();
        assert_eq!(bytes.len(), schema.get_size());

        let decoded = Tuple::read_from(&mut Cursor::new(bytes), &schema).unwrap();
        assert_eq!(decoded, tuple);
    }

    #[test]
    fn test_set_cell() {
        let mut tuple = Tuple::new_int_tuples(1, 3);
        tuple.set_cell(1, Cell::new_int32(42));

        assert_eq!(tuple.get_cell(0).get_int32().unwrap(), 1);
        assert_eq!(tuple.get_cell(1).get_int32().unwrap(), 42);
        assert_eq!(tuple.get_cell(2).get_int32().unwrap(), 1);
        assert_eq!(tuple.cell_count(), 3);
    }

    #[test]
    fn test_tuple_schema_mismatch() {
        let schema = Schema::from_types(&[Type::Int, Type::Int]);

        let short = Tuple::new(&[Cell::new_int32(1)]);
        assert!(!short.matches_schema(&schema));
        assert!(short.encode(&schema).is_err());

        let wrong_type = Tuple::new(&[Cell::new_int32(1), Cell::new_string("x")]);
        assert!(!wrong_type.matches_schema(&schema));
    }
}
