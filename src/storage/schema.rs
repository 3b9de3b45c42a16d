use crate::error::TinyError;

/// The closed set of column types. A string column declares its
/// maximum payload length; the on-disk cell is a 4-byte length
/// prefix plus exactly that many payload bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Int,
    String(usize),
}

impl Type {
    /// Byte length of a cell of this type in the page format.
    pub fn get_len(&self) -> usize {
        match self {
            Type::Int => 4,
            Type::String(max_len) => 4 + max_len,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Field {
    pub field_type: Type,
    pub field_name: Option<String>,
}

impl Field {
    pub fn new(field_name: &str, field_type: Type) -> Self {
        Self {
            field_type,
            field_name: Some(field_name.to_string()),
        }
    }

    pub fn unnamed(field_type: Type) -> Self {
        Self {
            field_type,
            field_name: None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn from_types(types: &[Type]) -> Self {
        Self {
            fields: types.iter().map(|t| Field::unnamed(*t)).collect(),
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn get_type(&self, i: usize) -> Result<Type, TinyError> {
        match self.fields.get(i) {
            Some(f) => Ok(f.field_type),
            None => Err(TinyError::new(&format!("no such field: {}", i))),
        }
    }

    pub fn get_field_name(&self, i: usize) -> Result<Option<&str>, TinyError> {
        match self.fields.get(i) {
            Some(f) => Ok(f.field_name.as_deref()),
            None => Err(TinyError::new(&format!("no such field: {}", i))),
        }
    }

    /// Position of the first field carrying exactly this name.
    pub fn get_field_pos(&self, name: &str) -> Result<usize, TinyError> {
        for (i, f) in self.fields.iter().enumerate() {
            if f.field_name.as_deref() == Some(name) {
                return Ok(i);
            }
        }
        Err(TinyError::new(&format!("no such field: {}", name)))
    }

    pub fn merge(schema1: &Schema, schema2: &Schema) -> Schema {
        let mut new_schema = Schema::default();

        for f in &schema1.fields {
            new_schema.fields.push(f.clone());
        }
        for f in &schema2.fields {
            new_schema.fields.push(f.clone());
        }

        new_schema
    }

    /// get tuple size in bytes
    pub fn get_size(&self) -> usize {
        self.fields.iter().map(|f| f.field_type.get_len()).sum()
    }
}

// Schemas compare by their type sequences; field names play no part.
impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }

        self.fields
            .iter()
            .zip(&other.fields)
            .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for Schema {}

pub fn int_schema(width: usize, name_prefix: &str) -> Schema {
    let mut fields: Vec<Field> = Vec::new();
    for i in 0..width {
        fields.push(Field::new(&format!("{}-{}", name_prefix, i), Type::Int));
    }

    Schema { fields }
}
