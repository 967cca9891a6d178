//! Grouped weighted statistics
//!
//! For each variable the rows carrying it are bucketed by their flat bin
//! index, then every requested statistic is reduced per bucket. Buckets are
//! visited in ascending bin order, which fixes the order of the provenance
//! names.

use crate::binning::{flat_index, BinningPlan};
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{Result, SeaIceError};
use crate::observation::{unique_in_order, ObservationRow};
use crate::stack::Stack;
use ndarray::{ArrayD, IxDyn};
use seaice_stats::{reduce, Statistic, WeightedSample};
use std::collections::BTreeMap;

/// One statistic of one variable over the full bin grid
#[derive(Debug, Clone, PartialEq)]
pub struct StatGrid {
    pub statistic: Statistic,
    pub variable: String,
    /// Reduced value per bin, `None` for empty bins
    pub values: ArrayD<Option<f64>>,
    /// Distinct names of the cores that contributed to each bin
    pub provenance: ArrayD<Vec<String>>,
}

/// All statistics of one variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableGroups {
    pub variable: String,
    pub grids: Vec<StatGrid>,
    /// Member cores per outer bin in row-major order, zero-weight rows included
    pub members: Vec<Vec<String>>,
}

fn sample(row: &ObservationRow, variable: &str) -> WeightedSample {
    WeightedSample::new(row.value(variable), row.effective_weight())
}

/// Report rows whose weight will be taken as 1
pub fn check_weights(stack: &Stack, diagnostics: &mut Diagnostics) {
    let missing = stack.iter().filter(|r| r.weight.is_none()).count();
    if missing == 0 {
        return;
    }
    if missing == stack.len() {
        diagnostics.warn(Stage::Statistics, "No weight value are defined. Setting weight value to 1");
    } else {
        diagnostics.warn(
            Stage::Statistics,
            format!("{} weight value(s) are not defined. Setting weight value to 1", missing),
        );
    }
}

/// Reduce every variable and statistic over the plan's grid
///
/// A variable that no row measures is reported and skipped. It is an error
/// only when every requested variable is skipped.
pub fn grouped_stat(
    stack: &Stack,
    plan: &BinningPlan,
    variables: &[String],
    stats: &[Statistic],
    diagnostics: &mut Diagnostics,
) -> Result<Vec<VariableGroups>> {
    if stats.is_empty() {
        return Err(SeaIceError::NoStatistics);
    }
    check_weights(stack, diagnostics);

    let shape = plan.shape();
    let outer_shape = plan.outer_shape();
    let total: usize = shape.iter().product();
    let outer_total: usize = outer_shape.iter().product();

    let mut results = Vec::with_capacity(variables.len());
    for variable in variables {
        let rows: Vec<&ObservationRow> = stack
            .iter()
            .filter(|r| r.carries(variable) && r.values.contains_key(variable.as_str()))
            .collect();
        if rows.is_empty() {
            diagnostics.error(
                Stage::Statistics,
                format!("variable not found in stack: {}", variable),
            );
            continue;
        }
        tracing::info!(variable = %variable, "computing grouped statistics");

        let mut buckets: BTreeMap<usize, Vec<&ObservationRow>> = BTreeMap::new();
        let mut members: Vec<Vec<String>> = vec![Vec::new(); outer_total];
        for row in &rows {
            if let Some(outer) = plan
                .assign_outer(row)
                .and_then(|index| flat_index(&index, &outer_shape))
            {
                if !members[outer].contains(&row.name) {
                    members[outer].push(row.name.clone());
                }
            }
            if let Some(flat) = plan.assign_flat(row) {
                buckets.entry(flat).or_default().push(row);
            }
        }

        let mut provenance = vec![Vec::new(); total];
        for (&flat, bucket) in &buckets {
            provenance[flat] = unique_in_order(
                bucket
                    .iter()
                    .filter(|r| sample(r, variable).contributes())
                    .map(|r| r.name.as_str()),
            );
        }
        let provenance = ArrayD::from_shape_vec(IxDyn(&shape), provenance)?;

        let mut grids = Vec::with_capacity(stats.len());
        for &statistic in stats {
            tracing::debug!(variable = %variable, statistic = %statistic, "reducing");
            let mut values = vec![None; total];
            for (&flat, bucket) in &buckets {
                let samples: Vec<WeightedSample> = bucket.iter().map(|r| sample(r, variable)).collect();
                values[flat] = reduce(statistic, &samples);
            }
            grids.push(StatGrid {
                statistic,
                variable: variable.clone(),
                values: ArrayD::from_shape_vec(IxDyn(&shape), values)?,
                provenance: provenance.clone(),
            });
        }

        results.push(VariableGroups {
            variable: variable.clone(),
            grids,
            members,
        });
    }

    if results.is_empty() && !variables.is_empty() {
        return Err(SeaIceError::VariableNotFound(variables.join(", ")));
    }
    Ok(results)
}
