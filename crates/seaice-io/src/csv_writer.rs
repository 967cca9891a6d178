//! CSV writer for result tables

use crate::reader::{IoError, IoResult};
use crate::schema::DataTable;
use std::fs::File;
use std::io::Write;

/// Writes `DataTable`s as comma-separated text, nulls as empty cells
pub struct CsvWriter {
    delimiter: u8,
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Write a table to a file, replacing it if it exists
    pub fn write_file(&self, path: &str, table: &DataTable) -> IoResult<()> {
        let file = File::create(path).map_err(|e| IoError::OpenFailed(e.to_string()))?;
        self.write(file, table)
    }

    /// Write a table to any writer
    pub fn write<W: Write>(&self, sink: W, table: &DataTable) -> IoResult<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(sink);

        writer
            .write_record(table.column_names())
            .map_err(|e| IoError::Io(e.to_string()))?;

        let columns: Vec<_> = table.columns().map(|(_, c)| c).collect();
        for row in 0..table.num_rows() {
            let record: Vec<String> = columns
                .iter()
                .map(|c| c.text_at(row).unwrap_or_default())
                .collect();
            writer
                .write_record(&record)
                .map_err(|e| IoError::Io(e.to_string()))?;
        }

        writer.flush()?;
        Ok(())
    }
}
