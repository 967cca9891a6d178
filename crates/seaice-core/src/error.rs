//! Error types for seaice-core
//!
//! Only conditions that abort an operation are errors. Everything the
//! pipeline can recover from is recorded in [`crate::Diagnostics`] instead.

use seaice_io::IoError;
use seaice_stats::StatError;
use thiserror::Error;

/// Result type alias for seaice operations
pub type Result<T> = std::result::Result<T, SeaIceError>;

/// Main error type for seaice operations
#[derive(Error, Debug)]
pub enum SeaIceError {
    /// Profile normalization errors
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    /// Grouping specification errors
    #[error("Binning error: {0}")]
    Binning(#[from] BinningError),

    /// Statistic resolution errors
    #[error("Statistic error: {0}")]
    Stat(#[from] StatError),

    /// Table I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No row carries the requested variable
    #[error("Variable not found in stack: {0}")]
    VariableNotFound(String),

    /// No statistic requested
    #[error("At least one statistic is required")]
    NoStatistics,

    /// Statistic grid could not be shaped
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// Membership export errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::io::Error> for SeaIceError {
    fn from(err: std::io::Error) -> Self {
        SeaIceError::Io(err.into())
    }
}

/// Errors raised while normalizing profiles and assembling cores
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// A profile was attached to a core with a different name
    #[error("Core name {core} and profile name {profile} do not match")]
    CoreNameMismatch { core: String, profile: String },

    /// A profile mixes rows from several cores
    #[error("Profile mixes cores {0} and {1}")]
    MixedCores(String, String),

    /// A section carries a different number of values than the sheet has variables
    #[error("Section at row {row} has {actual} values for {expected} variables")]
    ValueCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Negative sample weight
    #[error("Invalid weight {weight} for core {core}")]
    InvalidWeight { core: String, weight: f64 },

    /// A required column is missing from an input table
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// Unknown vertical reference label
    #[error("Invalid vertical reference: {0}")]
    InvalidVerticalReference(String),

    /// Row without a core name
    #[error("Row {0} has no core name")]
    MissingName(usize),
}

/// Errors raised while building a binning plan
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BinningError {
    /// No grouping key given
    #[error("Grouping option cannot be empty; it should contain at least the vertical section y_mid")]
    EmptyGrouping,

    /// Bin edges are not a strictly increasing sequence of at least two values
    #[error("Bin edges for {column} must be at least two strictly increasing finite values")]
    InvalidEdges { column: String },

    /// A continuous key was written as a map with zero or several entries
    #[error("A continuous grouping key must map exactly one column to its edges, got {0} entries")]
    InvalidGroupKey(usize),

    /// Two depth keys in one specification
    #[error("Only one y_mid grouping key may be given")]
    DuplicateDepthKey,

    /// Depth edges could not be derived from section horizons
    #[error("y_mid not in grouping option and cannot be generated from section horizons")]
    NoDepthEdges,
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
