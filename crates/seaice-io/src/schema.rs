//! Schema and nullable column types for tabular data

use crate::reader::{IoError, IoResult};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Date formats accepted when parsing text cells, tried in order
pub const DATE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a date or date-time cell
///
/// Plain dates (`2019-03-14`) are read as midnight.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}

/// Render a date-time the way `parse_datetime` reads it back
pub fn format_datetime(value: &NaiveDateTime) -> String {
    if value.num_seconds_from_midnight() == 0 && value.nanosecond() == 0 {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%dT%H:%M:%S").to_string()
    }
}

/// Schema describing the structure of a table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataSchema {
    /// Column descriptors
    pub columns: Vec<ColumnDescriptor>,

    /// Number of records
    pub num_records: usize,

    /// Additional metadata
    pub metadata: HashMap<String, String>,
}

impl DataSchema {
    /// Create a new schema
    pub fn new(columns: Vec<ColumnDescriptor>, num_records: usize) -> Self {
        Self {
            columns,
            num_records,
            metadata: HashMap::new(),
        }
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get column index by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }
}

/// Descriptor for a column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column name
    pub name: String,

    /// Data type
    pub dtype: ColumnType,

    /// Number of null cells
    pub null_count: usize,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, dtype: ColumnType) -> Self {
        Self {
            name: name.into(),
            dtype,
            null_count: 0,
        }
    }

    pub fn with_null_count(mut self, null_count: usize) -> Self {
        self.null_count = null_count;
        self
    }
}

/// Column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Float64,
    Int64,
    Bool,
    Date,
    String,
}

impl ColumnType {
    /// Check if this is a numeric type
    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnType::Float64 | ColumnType::Int64)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Float64 => "float64",
            ColumnType::Int64 => "int64",
            ColumnType::Bool => "bool",
            ColumnType::Date => "date",
            ColumnType::String => "string",
        }
    }
}

/// A column of nullable data
#[derive(Debug, Clone, PartialEq)]
pub enum DataColumn {
    Float64(Vec<Option<f64>>),
    Int64(Vec<Option<i64>>),
    Bool(Vec<Option<bool>>),
    Date(Vec<Option<NaiveDateTime>>),
    String(Vec<Option<String>>),
}

impl DataColumn {
    /// Get the column type
    pub fn dtype(&self) -> ColumnType {
        match self {
            DataColumn::Float64(_) => ColumnType::Float64,
            DataColumn::Int64(_) => ColumnType::Int64,
            DataColumn::Bool(_) => ColumnType::Bool,
            DataColumn::Date(_) => ColumnType::Date,
            DataColumn::String(_) => ColumnType::String,
        }
    }

    /// Get the number of elements
    pub fn len(&self) -> usize {
        match self {
            DataColumn::Float64(v) => v.len(),
            DataColumn::Int64(v) => v.len(),
            DataColumn::Bool(v) => v.len(),
            DataColumn::Date(v) => v.len(),
            DataColumn::String(v) => v.len(),
        }
    }

    /// Check if the column is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of null cells
    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    pub fn is_null(&self, index: usize) -> bool {
        match self {
            DataColumn::Float64(v) => v.get(index).map_or(true, |x| x.is_none()),
            DataColumn::Int64(v) => v.get(index).map_or(true, |x| x.is_none()),
            DataColumn::Bool(v) => v.get(index).map_or(true, |x| x.is_none()),
            DataColumn::Date(v) => v.get(index).map_or(true, |x| x.is_none()),
            DataColumn::String(v) => v.get(index).map_or(true, |x| x.is_none()),
        }
    }

    /// Numeric value at a row, for numeric columns and parseable text
    pub fn f64_at(&self, index: usize) -> Option<f64> {
        match self {
            DataColumn::Float64(v) => v.get(index).copied().flatten(),
            DataColumn::Int64(v) => v.get(index).copied().flatten().map(|x| x as f64),
            DataColumn::Bool(v) => v
                .get(index)
                .copied()
                .flatten()
                .map(|b| if b { 1.0 } else { 0.0 }),
            DataColumn::String(v) => v
                .get(index)
                .and_then(|s| s.as_deref())
                .and_then(|s| s.trim().parse().ok()),
            DataColumn::Date(_) => None,
        }
    }

    /// Date-time value at a row, for date columns and parseable text
    pub fn date_at(&self, index: usize) -> Option<NaiveDateTime> {
        match self {
            DataColumn::Date(v) => v.get(index).copied().flatten(),
            DataColumn::String(v) => v
                .get(index)
                .and_then(|s| s.as_deref())
                .and_then(parse_datetime),
            _ => None,
        }
    }

    /// Text rendering of a cell; `None` for nulls
    pub fn text_at(&self, index: usize) -> Option<String> {
        match self {
            DataColumn::Float64(v) => v.get(index).copied().flatten().map(|x| x.to_string()),
            DataColumn::Int64(v) => v.get(index).copied().flatten().map(|x| x.to_string()),
            DataColumn::Bool(v) => v.get(index).copied().flatten().map(|x| x.to_string()),
            DataColumn::Date(v) => v.get(index).copied().flatten().map(|d| format_datetime(&d)),
            DataColumn::String(v) => v.get(index).cloned().flatten(),
        }
    }

    /// Convert to nullable f64 (for numeric types)
    pub fn to_f64(&self) -> Option<Vec<Option<f64>>> {
        match self {
            DataColumn::Float64(v) => Some(v.clone()),
            DataColumn::Int64(v) => Some(v.iter().map(|x| x.map(|x| x as f64)).collect()),
            _ => None,
        }
    }
}

/// An ordered set of equally long named columns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<(String, DataColumn)>,
    num_rows: usize,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column, replacing any column of the same name
    ///
    /// The first column fixes the number of rows.
    pub fn add_column(&mut self, name: impl Into<String>, data: DataColumn) -> IoResult<()> {
        let name = name.into();
        if self.columns.is_empty() {
            self.num_rows = data.len();
        } else if data.len() != self.num_rows {
            return Err(IoError::LengthMismatch {
                column: name,
                expected: self.num_rows,
                actual: data.len(),
            });
        }

        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = data,
            None => self.columns.push((name, data)),
        }
        Ok(())
    }

    /// Builder-style `add_column`
    pub fn with_column(mut self, name: impl Into<String>, data: DataColumn) -> IoResult<Self> {
        self.add_column(name, data)?;
        Ok(self)
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&DataColumn> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Get a column by name or fail with `ColumnNotFound`
    pub fn require(&self, name: &str) -> IoResult<&DataColumn> {
        self.column(name)
            .ok_or_else(|| IoError::ColumnNotFound(name.to_string()))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Get column names in insertion order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Iterate over `(name, column)` pairs in insertion order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &DataColumn)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Describe the table
    pub fn schema(&self) -> DataSchema {
        let columns = self
            .columns
            .iter()
            .map(|(name, col)| {
                ColumnDescriptor::new(name.clone(), col.dtype()).with_null_count(col.null_count())
            })
            .collect();
        DataSchema::new(columns, self.num_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_column_lookup() {
        let schema = DataSchema::new(
            vec![
                ColumnDescriptor::new("y_mid", ColumnType::Float64),
                ColumnDescriptor::new("name", ColumnType::String),
            ],
            100,
        );

        assert_eq!(schema.column_index("y_mid"), Some(0));
        assert_eq!(schema.column_index("name"), Some(1));
        assert_eq!(schema.column_index("salinity"), None);
    }

    #[test]
    fn test_data_column_conversion() {
        let col = DataColumn::Int64(vec![Some(1), None, Some(3)]);
        assert_eq!(col.to_f64().unwrap(), vec![Some(1.0), None, Some(3.0)]);
        assert_eq!(col.null_count(), 1);
        assert_eq!(col.text_at(2), Some("3".to_string()));
        assert_eq!(col.text_at(1), None);
    }

    #[test]
    fn test_text_cells_parse_on_demand() {
        let col = DataColumn::String(vec![Some(" 2.5".into()), Some("2019-05-02".into()), None]);
        assert_eq!(col.f64_at(0), Some(2.5));
        assert_eq!(col.f64_at(1), None);
        assert_eq!(
            col.date_at(1),
            NaiveDate::from_ymd_opt(2019, 5, 2).and_then(|d| d.and_hms_opt(0, 0, 0))
        );
    }

    #[test]
    fn test_datetime_round_trip() {
        let d = parse_datetime("2018-04-30T13:45:00").unwrap();
        assert_eq!(format_datetime(&d), "2018-04-30T13:45:00");
        let d = parse_datetime("2018-04-30").unwrap();
        assert_eq!(format_datetime(&d), "2018-04-30");
        assert_eq!(parse_datetime("30/04/2018"), None);
    }

    #[test]
    fn test_table_rejects_ragged_columns() {
        let mut table = DataTable::new();
        table
            .add_column("y_mid", DataColumn::Float64(vec![Some(5.0), Some(15.0)]))
            .unwrap();
        let err = table
            .add_column("name", DataColumn::String(vec![Some("A".into())]))
            .unwrap_err();
        assert!(matches!(err, IoError::LengthMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_table_schema() {
        let table = DataTable::new()
            .with_column("name", DataColumn::String(vec![Some("A".into()), None]))
            .unwrap()
            .with_column("salinity", DataColumn::Float64(vec![Some(5.0), Some(7.0)]))
            .unwrap();
        let schema = table.schema();
        assert_eq!(schema.num_records, 2);
        assert_eq!(schema.column_names(), vec!["name", "salinity"]);
        assert_eq!(schema.column("name").unwrap().null_count, 1);
        assert_eq!(schema.column("salinity").unwrap().dtype, ColumnType::Float64);
    }
}
