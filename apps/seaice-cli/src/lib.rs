//! Batch pipeline behind the `seaice` binary
//!
//! ```text
//! observations -> Stack -> degree days -> vertical reference
//!              -> discretize -> grouped statistics -> result table
//! ```

use seaice_core::{
    compute_climatology, AnalysisConfig, DegreeDays, Diagnostics, Result, Stack,
};
use seaice_io::{open_file, CsvWriter, DataTable, TableReader};
use std::path::Path;

/// Outcome of one pipeline run
#[derive(Debug)]
pub struct RunSummary {
    pub cores: usize,
    pub input_rows: usize,
    pub output_rows: usize,
    pub diagnostics: Diagnostics,
}

/// Load any supported table file
pub fn load_table(path: &Path) -> Result<DataTable> {
    let reader = open_file(&path.to_string_lossy())?;
    Ok(reader.read_table()?)
}

/// Load a normalized observation table into a stack
pub fn load_stack(path: &Path, diagnostics: &mut Diagnostics) -> Result<Stack> {
    let table = load_table(path)?;
    let stack = Stack::from_table(&table, diagnostics)?;
    tracing::info!(path = %path.display(), rows = stack.len(), "observations loaded");
    Ok(stack)
}

/// Run a configured analysis and write its outputs
pub fn run(config: &AnalysisConfig) -> Result<RunSummary> {
    config.validate()?;
    let mut diagnostics = Diagnostics::new();

    let mut stack = load_stack(&config.input.observations, &mut diagnostics)?;
    let input_rows = stack.len();

    if let (Some(dd), Some(freezup)) = (&config.input.degree_days, &config.input.freezeup) {
        let lookup = DegreeDays::from_tables(&load_table(dd)?, &load_table(freezup)?)?;
        stack = lookup.enrich(&stack, &mut diagnostics);
    }

    if let Some(target) = config.reference.target {
        stack = stack.set_vertical_reference(target, config.reference.h_ref, &mut diagnostics);
    }

    if let Some(options) = &config.discretize {
        stack = stack.discretize(options, &mut diagnostics)?;
    }

    let result = match &config.climatology {
        Some(climatology) => compute_climatology(
            &stack,
            &climatology.dd_bins,
            &climatology.y_bins,
            climatology.variables.as_deref(),
            &climatology.references,
            &mut diagnostics,
        )?,
        None => stack.section_stat(
            &config.grouping.groups,
            config.grouping.variables.as_deref(),
            &config.grouping.stats,
            &mut diagnostics,
        )?,
    };

    let table = result.to_table()?;
    CsvWriter::new().write_file(&config.output.path.to_string_lossy(), &table)?;
    tracing::info!(path = %config.output.path.display(), rows = table.num_rows(), "result written");

    if let Some(path) = &config.output.membership {
        std::fs::write(path, result.membership_json()?)?;
        tracing::info!(path = %path.display(), "membership written");
    }

    Ok(RunSummary {
        cores: stack.names().len(),
        input_rows,
        output_rows: result.len(),
        diagnostics,
    })
}

/// One-line overview per variable of a stack
pub fn describe(stack: &Stack) -> Vec<String> {
    stack
        .variables()
        .iter()
        .map(|variable| {
            let summary = stack.summary(variable);
            let cores = stack.for_variable(variable).names().len();
            format!(
                "{:<16} cores={:<4} values={:<6} missing={:<4} min={} max={} mean={}",
                variable,
                cores,
                summary.count,
                summary.missing,
                format_value(summary.min),
                format_value(summary.max),
                format_value(summary.mean),
            )
        })
        .collect()
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| format!("{:.3}", v)).unwrap_or_else(|| "-".to_string())
}
