//! Per-call diagnostics
//!
//! Each pipeline stage records the conditions it recovered from (defaulted
//! weights, derived bin edges, skipped cores, ...) into a [`Diagnostics`]
//! value owned by the caller. Every record is mirrored to `tracing` so that a
//! subscriber installed by the application sees the same messages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Info => write!(f, "INFO"),
            Level::Warning => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

/// Pipeline stage that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Normalize,
    Stack,
    Reference,
    Enrich,
    Binning,
    Statistics,
    Assemble,
    Discretize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Stack => "stack",
            Stage::Reference => "reference",
            Stage::Enrich => "enrich",
            Stage::Binning => "binning",
            Stage::Statistics => "statistics",
            Stage::Assemble => "assemble",
            Stage::Discretize => "discretize",
        };
        f.write_str(name)
    }
}

/// A single recorded condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: Level,
    pub stage: Stage,
    /// Core the condition applies to, if any
    pub core: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.core {
            Some(core) => write!(f, "{} {} ({}): {}", self.level, self.stage, core, self.message),
            None => write!(f, "{} {}: {}", self.level, self.stage, self.message),
        }
    }
}

/// Ordered log of diagnostics collected during one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and mirror it to `tracing`
    pub fn record(&mut self, level: Level, stage: Stage, core: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        let core_field = core.unwrap_or("-");
        match level {
            Level::Info => tracing::info!(stage = %stage, core = core_field, "{}", message),
            Level::Warning => tracing::warn!(stage = %stage, core = core_field, "{}", message),
            Level::Error => tracing::error!(stage = %stage, core = core_field, "{}", message),
        }
        self.entries.push(Diagnostic {
            level,
            stage,
            core: core.map(String::from),
            message,
        });
    }

    pub fn info(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(Level::Info, stage, None, message);
    }

    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(Level::Warning, stage, None, message);
    }

    pub fn error(&mut self, stage: Stage, message: impl Into<String>) {
        self.record(Level::Error, stage, None, message);
    }

    pub fn warn_core(&mut self, stage: Stage, core: &str, message: impl Into<String>) {
        self.record(Level::Warning, stage, Some(core), message);
    }

    pub fn error_core(&mut self, stage: Stage, core: &str, message: impl Into<String>) {
        self.record(Level::Error, stage, Some(core), message);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries at exactly the given level
    pub fn at_level(&self, level: Level) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter().filter(move |d| d.level == level)
    }

    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.at_level(Level::Warning).collect()
    }

    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.at_level(Level::Error).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.at_level(Level::Error).next().is_some()
    }

    /// Entries produced by one stage
    pub fn for_stage(&self, stage: Stage) -> Vec<&Diagnostic> {
        self.entries.iter().filter(|d| d.stage == stage).collect()
    }

    /// Append another log
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}
