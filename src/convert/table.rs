//! In-memory tabular view of a dataset

use std::fmt;

/// Declared type of an attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    Numeric,
    Real,
    Integer,
    /// Nominal attribute with its declared values, in declaration order
    Nominal(Vec<String>),
    String,
    /// Date attribute with an optional format pattern
    Date(Option<String>),
    Relational,
}

impl AttributeKind {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AttributeKind::Numeric | AttributeKind::Real | AttributeKind::Integer
        )
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Numeric => write!(f, "numeric"),
            AttributeKind::Real => write!(f, "real"),
            AttributeKind::Integer => write!(f, "integer"),
            AttributeKind::Nominal(_) => write!(f, "nominal"),
            AttributeKind::String => write!(f, "string"),
            AttributeKind::Date(_) => write!(f, "date"),
            AttributeKind::Relational => write!(f, "relational"),
        }
    }
}

/// Named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
}

static MISSING: Value = Value::Missing;

/// Rectangular data with named columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub relation: String,
    pub attributes: Vec<Attribute>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.name == name)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.attributes.len()
    }

    /// Iterate over one column's cells
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().map(move |row| row.get(index).unwrap_or(&MISSING))
    }
}
