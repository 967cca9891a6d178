//! seaice-core - Stacking and climatology engine for sea-ice cores
//!
//! This crate turns normalized ice-core profiles into binned climatologies.
//!
//! # Key Components
//!
//! - **ObservationRow**: one measurement of one variable at one depth interval
//!   (stepwise profiles) or depth point (point profiles) of one core
//! - **Profile / IceCore**: the normalized output of an importer, one profile
//!   per variable sheet, grouped per core
//! - **Stack**: the append-only collection of rows from many cores, with
//!   vertical-reference conversion and filtering
//! - **BinningPlan**: multi-dimensional bin assignment over categorical and
//!   continuous grouping keys, depth always innermost
//! - **Climatology**: weighted statistics per bin, unrolled into a flat table
//!   with bin boundaries and provenance
//! - **DegreeDays**: freezing/thawing degree-day and freeze-up enrichment
//!
//! # Pipeline
//!
//! ```text
//! IceCore -> Stack::add_profiles -> DegreeDays::enrich -> BinningPlan
//!         -> grouped statistics -> ClimatologyTable
//! ```
//!
//! Every stage receives a [`Diagnostics`] log and records its non-fatal
//! conditions there; fatal conditions are returned as [`SeaIceError`].

pub mod binning;
pub mod climatology;
pub mod config;
pub mod degree_days;
pub mod diagnostics;
pub mod discretize;
pub mod error;
pub mod grouped;
pub mod ice_core;
pub mod observation;
pub mod profile;
pub mod stack;
pub mod table;
pub mod vertical;

pub use binning::*;
pub use climatology::*;
pub use config::{AnalysisConfig, ClimatologyConfig, GroupingConfig, InputConfig, OutputConfig, ReferenceConfig};
pub use degree_days::*;
pub use diagnostics::*;
pub use discretize::DiscretizeOptions;
pub use error::*;
pub use grouped::*;
pub use ice_core::*;
pub use observation::*;
pub use profile::*;
pub use stack::*;
pub use vertical::*;

pub use seaice_stats::Statistic;
