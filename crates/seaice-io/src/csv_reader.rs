//! CSV file reader with type inference

use crate::reader::{IoError, IoResult, TableReader};
use crate::schema::{parse_datetime, ColumnDescriptor, ColumnType, DataColumn, DataSchema, DataTable};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// CSV file reader
pub struct CsvReader {
    path: String,
    table: DataTable,
    metadata: HashMap<String, String>,
}

impl CsvReader {
    /// Open a comma-separated file
    pub fn open(path: &str) -> IoResult<Self> {
        Self::open_with_options(path, b',')
    }

    /// Open a delimited file with a header row
    pub fn open_with_options(path: &str, delimiter: u8) -> IoResult<Self> {
        if !Path::new(path).exists() {
            return Err(IoError::FileNotFound(path.to_string()));
        }

        let file = File::open(path).map_err(|e| IoError::OpenFailed(e.to_string()))?;
        let table = read_delimited(BufReader::new(file), delimiter)?;

        let mut metadata = HashMap::new();
        metadata.insert("format".to_string(), "CSV".to_string());
        metadata.insert("delimiter".to_string(), (delimiter as char).to_string());

        Ok(Self {
            path: path.to_string(),
            table,
            metadata,
        })
    }

    /// Consume the reader and return the loaded table
    pub fn into_table(self) -> DataTable {
        self.table
    }
}

impl TableReader for CsvReader {
    fn read_schema(&self) -> IoResult<DataSchema> {
        let mut schema = self.table.schema();
        schema.metadata = self.metadata.clone();
        Ok(schema)
    }

    fn read_table(&self) -> IoResult<DataTable> {
        Ok(self.table.clone())
    }

    fn read_column(&self, name: &str) -> IoResult<DataColumn> {
        self.table.require(name).cloned()
    }

    fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    fn path(&self) -> Option<&str> {
        Some(&self.path)
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}

/// Read a delimited table with a header row from any reader
///
/// Types are inferred over every record so that a late non-numeric cell
/// never gets silently nulled.
pub fn read_delimited<R: Read>(source: R, delimiter: u8) -> IoResult<DataTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IoError::InvalidFormat(e.to_string()))?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for (line, result) in reader.records().enumerate() {
        let record = result.map_err(|e| IoError::InvalidFormat(format!("record {}: {}", line + 1, e)))?;
        for (i, column) in raw.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or_default().to_string());
        }
    }

    let mut table = DataTable::new();
    for (name, values) in headers.into_iter().zip(raw) {
        let dtype = infer_type(&values);
        table.add_column(name, parse_column(&values, dtype))?;
    }
    Ok(table)
}

/// Infer column type from sample values
fn infer_type(values: &[String]) -> ColumnType {
    let non_empty: Vec<&str> = values
        .iter()
        .map(|s| s.as_str())
        .filter(|s| !is_null_token(s))
        .collect();
    if non_empty.is_empty() {
        // All-null columns are most often unmeasured variables
        return ColumnType::Float64;
    }

    if non_empty.iter().all(|s| s.parse::<i64>().is_ok()) {
        return ColumnType::Int64;
    }

    if non_empty.iter().all(|s| s.parse::<f64>().is_ok()) {
        return ColumnType::Float64;
    }

    if non_empty
        .iter()
        .all(|s| matches!(s.to_lowercase().as_str(), "true" | "false"))
    {
        return ColumnType::Bool;
    }

    if non_empty.iter().all(|s| parse_datetime(s).is_some()) {
        return ColumnType::Date;
    }

    ColumnType::String
}

fn is_null_token(s: &str) -> bool {
    matches!(s, "" | "NaN" | "nan" | "NA" | "n/a" | "N/A")
}

/// Parse column values into a DataColumn
fn parse_column(values: &[String], dtype: ColumnType) -> DataColumn {
    let cells = values
        .iter()
        .map(|s| if is_null_token(s) { None } else { Some(s.as_str()) });

    match dtype {
        ColumnType::Float64 => DataColumn::Float64(cells.map(|c| c.and_then(|s| s.parse().ok())).collect()),
        ColumnType::Int64 => DataColumn::Int64(cells.map(|c| c.and_then(|s| s.parse().ok())).collect()),
        ColumnType::Bool => DataColumn::Bool(
            cells
                .map(|c| c.map(|s| s.eq_ignore_ascii_case("true")))
                .collect(),
        ),
        ColumnType::Date => DataColumn::Date(cells.map(|c| c.and_then(parse_datetime)).collect()),
        ColumnType::String => DataColumn::String(cells.map(|c| c.map(String::from)).collect()),
    }
}
