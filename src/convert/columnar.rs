//! Parquet encoding of a tabular view
//!
//! Feature columns keep their declaration order, the target column(s) are
//! appended last. The file is assembled in memory; nothing touches disk.

use std::sync::Arc;

use arrow::array::{ArrayRef, DictionaryArray, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::table::{AttributeKind, Table, Value};
use super::ConvertError;

/// Which columns of a table end up in the columnar file, and in what order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnSelection {
    /// Target columns, appended after all feature columns
    pub targets: Vec<String>,
    /// Columns dropped entirely (row identifiers, ignored attributes)
    pub excluded: Vec<String>,
}

impl ColumnSelection {
    pub fn new(targets: Vec<String>, excluded: Vec<String>) -> Self {
        Self { targets, excluded }
    }

    fn column_order(&self, table: &Table) -> Result<Vec<usize>, ConvertError> {
        let mut order: Vec<usize> = table
            .attributes
            .iter()
            .enumerate()
            .filter(|(_, a)| !self.targets.contains(&a.name) && !self.excluded.contains(&a.name))
            .map(|(i, _)| i)
            .collect();

        for target in &self.targets {
            let index = table
                .column_index(target)
                .ok_or_else(|| ConvertError::MissingColumn(target.clone()))?;
            order.push(index);
        }

        Ok(order)
    }
}

/// Build an Arrow record batch from the selected columns
pub fn to_record_batch(table: &Table, selection: &ColumnSelection) -> Result<RecordBatch, ConvertError> {
    let order = selection.column_order(table)?;

    let mut fields = Vec::with_capacity(order.len());
    let mut columns = Vec::with_capacity(order.len());
    for index in order {
        let (field, column) = build_column(table, index)?;
        fields.push(field);
        columns.push(column);
    }

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Encode the selected columns as a SNAPPY-compressed Parquet file
pub fn to_parquet(table: &Table, selection: &ColumnSelection) -> Result<Bytes, ConvertError> {
    let batch = to_record_batch(table, selection)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(Bytes::from(buffer))
}

fn build_column(table: &Table, index: usize) -> Result<(Field, ArrayRef), ConvertError> {
    let attribute = &table.attributes[index];
    let name = attribute.name.as_str();

    match &attribute.kind {
        AttributeKind::Numeric | AttributeKind::Real => {
            let values = numeric_cells(table, index, name)?;
            Ok((
                Field::new(name, DataType::Float64, true),
                Arc::new(Float64Array::from(values)),
            ))
        }
        AttributeKind::Integer => {
            let values = numeric_cells(table, index, name)?
                .into_iter()
                .map(|v| v.map(|f| integral(f, name)).transpose())
                .collect::<Result<Vec<_>, _>>()?;
            Ok((
                Field::new(name, DataType::Int64, true),
                Arc::new(Int64Array::from(values)),
            ))
        }
        AttributeKind::Nominal(categories) => {
            let keys = table
                .column(index)
                .map(|cell| match cell {
                    Value::Missing => Ok(None),
                    Value::Text(t) => category_key(categories, t, name).map(Some),
                    Value::Number(n) => category_key(categories, &n.to_string(), name).map(Some),
                })
                .collect::<Result<Vec<_>, _>>()?;

            let dictionary: ArrayRef = Arc::new(StringArray::from(categories.clone()));
            let array = DictionaryArray::<Int32Type>::try_new(Int32Array::from(keys), dictionary)?;
            Ok((
                Field::new(
                    name,
                    DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
                    true,
                ),
                Arc::new(array),
            ))
        }
        AttributeKind::String => {
            let values: Vec<Option<String>> = table
                .column(index)
                .map(|cell| match cell {
                    Value::Missing => None,
                    Value::Text(t) => Some(t.clone()),
                    Value::Number(n) => Some(n.to_string()),
                })
                .collect();
            Ok((
                Field::new(name, DataType::Utf8, true),
                Arc::new(StringArray::from(values)),
            ))
        }
        kind @ (AttributeKind::Date(_) | AttributeKind::Relational) => {
            Err(ConvertError::UnsupportedType {
                column: name.to_string(),
                kind: kind.to_string(),
            })
        }
    }
}

fn numeric_cells(table: &Table, index: usize, name: &str) -> Result<Vec<Option<f64>>, ConvertError> {
    table
        .column(index)
        .map(|cell| match cell {
            Value::Missing => Ok(None),
            Value::Number(n) => Ok(Some(*n)),
            Value::Text(t) => t.trim().parse::<f64>().map(Some).map_err(|_| ConvertError::InvalidValue {
                column: name.to_string(),
                value: t.clone(),
            }),
        })
        .collect()
}

fn integral(value: f64, name: &str) -> Result<i64, ConvertError> {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Ok(value as i64)
    } else {
        Err(ConvertError::InvalidValue {
            column: name.to_string(),
            value: value.to_string(),
        })
    }
}

fn category_key(categories: &[String], value: &str, name: &str) -> Result<i32, ConvertError> {
    categories
        .iter()
        .position(|c| c == value)
        .map(|p| p as i32)
        .ok_or_else(|| ConvertError::InvalidValue {
            column: name.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::arff;
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    const SAMPLE: &str = "@relation sample\n\
        @attribute label {yes,no}\n\
        @attribute width numeric\n\
        @attribute count integer\n\
        @attribute note string\n\
        @data\n\
        yes,1.5,3,'a'\n\
        no,?,4,?\n\
        yes,2.25,?,'c'\n";

    fn sample_table() -> Table {
        arff::parse(SAMPLE.as_bytes()).unwrap()
    }

    fn read_back(bytes: Bytes) -> Vec<RecordBatch> {
        ParquetRecordBatchReaderBuilder::try_new(bytes)
            .unwrap()
            .build()
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_target_is_appended_last() {
        let selection = ColumnSelection::new(vec!["label".to_string()], Vec::new());
        let batch = to_record_batch(&sample_table(), &selection).unwrap();

        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["width", "count", "note", "label"]);
        assert_eq!(batch.num_rows(), 3);
    }

    #[test]
    fn test_column_types() {
        let selection = ColumnSelection::new(vec!["label".to_string()], Vec::new());
        let batch = to_record_batch(&sample_table(), &selection).unwrap();
        let schema = batch.schema();

        assert_eq!(schema.field(0).data_type(), &DataType::Float64);
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(schema.field(2).data_type(), &DataType::Utf8);
        assert_eq!(
            schema.field(3).data_type(),
            &DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
        );

        let width = batch.column(0).as_any().downcast_ref::<Float64Array>().unwrap();
        assert!(width.is_null(1));
        assert_eq!(width.value(2), 2.25);

        let count = batch.column(1).as_any().downcast_ref::<Int64Array>().unwrap();
        assert_eq!(count.value(1), 4);
        assert!(count.is_null(2));
    }

    #[test]
    fn test_excluded_columns_are_dropped() {
        let selection = ColumnSelection::new(vec!["label".to_string()], vec!["note".to_string()]);
        let batch = to_record_batch(&sample_table(), &selection).unwrap();
        assert_eq!(batch.num_columns(), 3);
        assert!(batch.schema().field_with_name("note").is_err());
    }

    #[test]
    fn test_parquet_round_trip_schema_and_rows() {
        let table = sample_table();
        let selection = ColumnSelection::new(vec!["label".to_string()], Vec::new());
        let bytes = to_parquet(&table, &selection).unwrap();

        assert_eq!(&bytes[..4], b"PAR1");

        let batches = read_back(bytes);
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 3);
        assert_eq!(batches[0].schema().field(3).name(), "label");
    }

    #[test]
    fn test_parquet_is_deterministic() {
        let table = sample_table();
        let before = table.clone();
        let selection = ColumnSelection::new(vec!["label".to_string()], Vec::new());

        let first = to_parquet(&table, &selection).unwrap();
        let second = to_parquet(&table, &selection).unwrap();

        assert_eq!(first, second);
        assert_eq!(table, before);
    }

    #[test]
    fn test_missing_target_column() {
        let selection = ColumnSelection::new(vec!["nope".to_string()], Vec::new());
        let err = to_parquet(&sample_table(), &selection).unwrap_err();
        assert!(matches!(err, ConvertError::MissingColumn(ref c) if c == "nope"));
    }

    #[test]
    fn test_date_column_is_unsupported() {
        let input = "@relation d\n@attribute when date\n@attribute y numeric\n@data\n'2020-01-01',1\n";
        let table = arff::parse(input.as_bytes()).unwrap();
        let selection = ColumnSelection::new(vec!["y".to_string()], Vec::new());

        let err = to_parquet(&table, &selection).unwrap_err();
        assert!(matches!(err, ConvertError::UnsupportedType { ref column, .. } if column == "when"));
    }

    #[test]
    fn test_non_integral_integer_value() {
        let input = "@relation d\n@attribute n integer\n@data\n1.5\n";
        let table = arff::parse(input.as_bytes()).unwrap();

        let err = to_parquet(&table, &ColumnSelection::default()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidValue { .. }));
    }
}
