use std::cmp::Ordering;

use crate::{
    error::TinyError,
    io::{read_exact, Decodeable, Encodeable},
    storage::schema::Type,
};

#[derive(Debug, Clone, Hash)]
pub enum Cell {
    Int32(i32),
    String(String),
}

impl Cell {
    pub fn new_int32(v: i32) -> Self {
        Cell::Int32(v)
    }

    pub fn new_string(v: &str) -> Self {
        Cell::String(v.to_string())
    }

    pub fn get_int32(&self) -> Result<i32, TinyError> {
        match self {
            Cell::Int32(v) => Ok(*v),
            _ => Err(TinyError::new(&format!("not an int cell: {:?}", self))),
        }
    }

    pub fn get_string(&self) -> Result<String, TinyError> {
        match self {
            Cell::String(v) => Ok(v.clone()),
            _ => Err(TinyError::new(&format!("not a string cell: {:?}", self))),
        }
    }

    /// Whether this cell can be stored in a column of the given type.
    /// A string must fit the column's declared maximum.
    pub fn matches_type(&self, t: &Type) -> bool {
        match (self, t) {
            (Cell::Int32(_), Type::Int) => true,
            (Cell::String(v), Type::String(max_len)) => v.len() <= *max_len,
            _ => false,
        }
    }

    /// Encode the cell in the page format: INT as 4 big-endian bytes,
    /// STRING as a 4-byte big-endian length followed by the declared
    /// maximum of payload bytes, zero padded.
    pub fn encode(&self, t: &Type) -> Result<Vec<u8>, TinyError> {
        if !self.matches_type(t) {
            return Err(TinyError::new(&format!(
                "schema mismatch, cell: {:?}, type: {:?}",
                self, t
            )));
        }

        match (self, t) {
            (Cell::Int32(v), Type::Int) => Ok(v.to_bytes()),
            (Cell::String(v), Type::String(max_len)) => {
                let mut buf = (v.len() as u32).to_bytes();
                buf.extend_from_slice(v.as_bytes());
                buf.resize(4 + max_len, 0);
                Ok(buf)
            }
            _ => unreachable!(),
        }
    }

    pub fn decode<R: std::io::Read>(reader: &mut R, t: &Type) -> Result<Cell, TinyError> {
        match t {
            Type::Int => Ok(Cell::Int32(i32::read_from(reader)?)),
            Type::String(max_len) => {
                let len = u32::read_from(reader)? as usize;
                let payload = read_exact(reader, *max_len)?;
                if len > *max_len {
                    return Err(TinyError::new(&format!(
                        "corrupt string cell, length {} exceeds max {}",
                        len, max_len
                    )));
                }
                let v = String::from_utf8(payload[..len].to_vec())
                    .or_else(|_| Err(TinyError::new("corrupt string cell, invalid utf-8")))?;
                Ok(Cell::String(v))
            }
        }
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Cell::Int32(a), Cell::Int32(b)) => a == b,
            (Cell::String(a), Cell::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Cell::Int32(a), Cell::Int32(b)) => a.partial_cmp(b),
            (Cell::String(a), Cell::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.partial_cmp(other).unwrap()
    }
}
