//! Dataset format conversion
//!
//! - `arff`: parses the registry's native attribute-relation format into a [`Table`]
//! - `columnar`: encodes a [`Table`] as a Parquet file in memory

pub mod arff;
mod columnar;
mod table;

use thiserror::Error;

pub use columnar::{to_parquet, to_record_batch, ColumnSelection};
pub use table::{Attribute, AttributeKind, Table, Value};

/// Errors raised while building or encoding a tabular view
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("ARFF parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unsupported column type for '{column}': {kind}")]
    UnsupportedType { column: String, kind: String },

    #[error("Invalid value in column '{column}': {value}")]
    InvalidValue { column: String, value: String },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl ConvertError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        ConvertError::Parse {
            line,
            message: message.into(),
        }
    }
}
