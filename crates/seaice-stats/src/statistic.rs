//! Supported bin statistics
//!
//! Statistics are resolved once, when an analysis is configured, into a
//! closed enumeration. Each variant knows which input column it reduces:
//! `mean` and `sum` work on the weight-scaled value, `min`, `max` and `std`
//! on the raw measured value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while resolving statistics
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatError {
    #[error("Unsupported statistic: {0}")]
    Unsupported(String),
}

/// Result type for statistic resolution
pub type StatResult<T> = Result<T, StatError>;

/// A reduction applied to every bin of a grouped collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Statistic {
    Min,
    Max,
    Std,
    Mean,
    Sum,
}

/// Which column a statistic reduces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatInput {
    /// `weight * value`, missing when the weight is zero
    Weighted,
    /// The measured value, restricted to samples with a present weighted value
    Raw,
}

impl Statistic {
    /// All supported statistics, in the order they are usually reported
    pub const ALL: [Statistic; 5] = [
        Statistic::Min,
        Statistic::Mean,
        Statistic::Max,
        Statistic::Std,
        Statistic::Sum,
    ];

    /// Default set computed by climatologies
    pub fn climatology_defaults() -> Vec<Statistic> {
        vec![
            Statistic::Mean,
            Statistic::Std,
            Statistic::Min,
            Statistic::Max,
        ]
    }

    /// Name used in configuration files and result tables
    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Std => "std",
            Statistic::Mean => "mean",
            Statistic::Sum => "sum",
        }
    }

    pub fn input(&self) -> StatInput {
        match self {
            Statistic::Mean | Statistic::Sum => StatInput::Weighted,
            Statistic::Min | Statistic::Max | Statistic::Std => StatInput::Raw,
        }
    }

    /// Parse a list of statistic names, failing on the first unsupported one
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> StatResult<Vec<Statistic>> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Statistic {
    type Err = StatError;

    fn from_str(s: &str) -> StatResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "min" => Ok(Statistic::Min),
            "max" => Ok(Statistic::Max),
            "std" => Ok(Statistic::Std),
            "mean" => Ok(Statistic::Mean),
            "sum" => Ok(Statistic::Sum),
            _ => Err(StatError::Unsupported(s.to_string())),
        }
    }
}

impl TryFrom<String> for Statistic {
    type Error = StatError;

    fn try_from(value: String) -> StatResult<Self> {
        value.parse()
    }
}

impl From<Statistic> for String {
    fn from(stat: Statistic) -> Self {
        stat.as_str().to_string()
    }
}
