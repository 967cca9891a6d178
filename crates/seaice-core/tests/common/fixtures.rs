//! Test fixture loading utilities

use seaice_core::{Diagnostics, ObservationRow, Stack};
use seaice_io::{CsvReader, DataTable};
use std::path::PathBuf;

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Load a CSV fixture as a table
pub fn load_table(name: &str) -> DataTable {
    let path = fixture_path(name);
    CsvReader::open(&path.to_string_lossy())
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", name, e))
        .into_table()
}

/// Load the stacked cores fixture
#[allow(dead_code)]
pub fn load_cores() -> (Stack, Diagnostics) {
    let mut diag = Diagnostics::new();
    let stack = Stack::from_table(&load_table("cores.csv"), &mut diag).unwrap();
    (stack, diag)
}

/// A stepwise salinity section with unit weight
#[allow(dead_code)]
pub fn salinity(name: &str, y_low: f64, y_sup: f64, value: Option<f64>) -> ObservationRow {
    ObservationRow::stepwise(name, "salinity", y_low, y_sup)
        .with_value("salinity", value)
        .with_weight(1.0)
}
