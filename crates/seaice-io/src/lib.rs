//! seaice-io - Tabular I/O for stacked ice-core data
//!
//! The climatology engine consumes normalized observation rows and produces a
//! flat result table. This crate owns the boundary between those tables and
//! files on disk:
//!
//! - **Schema**: nullable, typed columns (`DataColumn`) collected in an
//!   ordered `DataTable`
//! - **Reader**: the `TableReader` trait and extension-based `open_file`
//! - **CSV**: a reader with type inference (numbers, booleans, dates) and a
//!   matching writer
//!
//! # Design
//!
//! Empty cells are nulls in every column type. Readers load whole tables;
//! the datasets are research-scale and fit in memory.

pub mod reader;
pub mod schema;

#[cfg(feature = "csv")]
pub mod csv_reader;

#[cfg(feature = "csv")]
pub mod csv_writer;

pub use reader::*;
pub use schema::*;

#[cfg(feature = "csv")]
pub use csv_reader::CsvReader;

#[cfg(feature = "csv")]
pub use csv_writer::CsvWriter;
