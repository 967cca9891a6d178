//! seaice-stats - Reductions used by the climatology engine
//!
//! This crate provides the statistical primitives applied to each bin of a
//! stacked ice-core collection:
//!
//! - **Statistic**: the closed set of supported reductions (min, max, std,
//!   mean, sum) and their parsing from configuration strings
//! - **Weighted**: reductions over `(value, weight)` samples, where a weight of
//!   zero turns the sample into a missing value
//! - **Summary**: nan-aware helpers shared by metadata aggregation
//!
//! # Missing values
//!
//! Missing data is modelled with `Option<f64>`. Non-finite inputs (NaN, ±inf)
//! are treated as missing everywhere in this crate.

pub mod statistic;
pub mod summary;
pub mod weighted;

pub use statistic::*;
pub use summary::*;
pub use weighted::*;
