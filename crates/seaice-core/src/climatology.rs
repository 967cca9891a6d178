//! Climatology assembly
//!
//! Turns statistic grids back into a flat table: every outer bin
//! combination is unrolled along the depth axis into one row per depth bin,
//! with the outer codes resolved to their labels or bin bounds and the depth
//! bounds reconstructed from the profile shape of the variable.

use crate::binning::{outer_indices, BinningPlan, GroupKey, KeyValue, DEPTH_KEY};
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{BinningError, Result};
use crate::grouped::{grouped_stat, VariableGroups};
use crate::observation::{unique_in_order, ObservationRow, VerticalReference, VARIABLE_SEPARATOR};
use crate::profile::ProfileShape;
use crate::stack::Stack;
use ndarray::{ArrayD, IxDyn};
use seaice_io::{DataColumn, DataTable};
use seaice_stats::Statistic;
use std::collections::BTreeMap;

/// One outer grouping key of a climatology
#[derive(Debug, Clone, PartialEq)]
pub struct KeyColumn {
    pub column: String,
    pub categorical: bool,
}

/// One depth bin of one outer bin combination
#[derive(Debug, Clone, PartialEq)]
pub struct ClimatologyRow {
    pub variable: String,
    pub value: Option<f64>,
    /// Contributing cores joined with `", "`, `None` for empty bins
    pub collection: Option<String>,
    /// Number of distinct contributing cores
    pub n: usize,
    /// Resolved outer keys, in the order of [`ClimatologyTable::keys`]
    pub keys: Vec<Option<KeyValue>>,
    pub stats: Statistic,
    pub v_ref: VerticalReference,
    pub y_index: usize,
    pub y_low: Option<f64>,
    pub y_sup: Option<f64>,
    pub y_mid: Option<f64>,
}

impl ClimatologyRow {
    /// Contributing core names
    pub fn cores(&self) -> Vec<&str> {
        self.collection
            .as_deref()
            .map(|c| c.split(VARIABLE_SEPARATOR).collect())
            .unwrap_or_default()
    }
}

/// Result of a grouped statistics run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClimatologyTable {
    pub keys: Vec<KeyColumn>,
    pub rows: Vec<ClimatologyRow>,
    /// Variable to member cores per outer bin (row-major), zero-weight rows included
    pub membership: BTreeMap<String, Vec<Vec<String>>>,
}

impl ClimatologyTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows of one variable and statistic
    pub fn select(&self, variable: &str, stats: Statistic) -> Vec<&ClimatologyRow> {
        self.rows
            .iter()
            .filter(|r| r.variable == variable && r.stats == stats)
            .collect()
    }

    /// Append another table computed with the same keys
    ///
    /// Membership entries already present are kept.
    pub fn append(&mut self, other: ClimatologyTable) {
        if self.keys.is_empty() {
            self.keys = other.keys;
        }
        self.rows.extend(other.rows);
        for (variable, members) in other.membership {
            self.membership.entry(variable).or_insert(members);
        }
    }

    /// Membership dictionary as JSON
    pub fn membership_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.membership)
    }

    /// Flatten to a table
    ///
    /// Columns: one value column per variable, `collection`, `n`, then per
    /// outer key either `<key>` (categorical) or `bin_<key>`, `<key>_min`,
    /// `<key>_max` (continuous), then `stats`, `variable`, `v_ref`,
    /// `y_index`, `y_low`, `y_sup`, `y_mid`.
    pub fn to_table(&self) -> Result<DataTable> {
        let rows = &self.rows;
        let variables = unique_in_order(rows.iter().map(|r| r.variable.as_str()));

        let mut table = DataTable::new();
        for variable in &variables {
            table.add_column(
                variable.as_str(),
                DataColumn::Float64(
                    rows.iter()
                        .map(|r| if &r.variable == variable { r.value } else { None })
                        .collect(),
                ),
            )?;
        }
        table.add_column("collection", DataColumn::String(rows.iter().map(|r| r.collection.clone()).collect()))?;
        table.add_column("n", DataColumn::Int64(rows.iter().map(|r| Some(r.n as i64)).collect()))?;

        for (position, key) in self.keys.iter().enumerate() {
            let value = |r: &ClimatologyRow| r.keys.get(position).cloned().flatten();
            if key.categorical {
                table.add_column(
                    key.column.as_str(),
                    DataColumn::String(rows.iter().map(|r| value(r).map(|v| v.to_string())).collect()),
                )?;
            } else {
                let bins: Vec<Option<(usize, f64, f64)>> = rows
                    .iter()
                    .map(|r| match value(r) {
                        Some(KeyValue::Bin { index, low, high }) => Some((index, low, high)),
                        _ => None,
                    })
                    .collect();
                table.add_column(
                    format!("bin_{}", key.column),
                    DataColumn::Int64(bins.iter().map(|b| b.map(|(i, _, _)| i as i64)).collect()),
                )?;
                table.add_column(
                    format!("{}_min", key.column),
                    DataColumn::Float64(bins.iter().map(|b| b.map(|(_, low, _)| low)).collect()),
                )?;
                table.add_column(
                    format!("{}_max", key.column),
                    DataColumn::Float64(bins.iter().map(|b| b.map(|(_, _, high)| high)).collect()),
                )?;
            }
        }

        table.add_column("stats", DataColumn::String(rows.iter().map(|r| Some(r.stats.to_string())).collect()))?;
        table.add_column("variable", DataColumn::String(rows.iter().map(|r| Some(r.variable.clone())).collect()))?;
        table.add_column("v_ref", DataColumn::String(rows.iter().map(|r| Some(r.v_ref.to_string())).collect()))?;
        table.add_column("y_index", DataColumn::Int64(rows.iter().map(|r| Some(r.y_index as i64)).collect()))?;
        table.add_column("y_low", DataColumn::Float64(rows.iter().map(|r| r.y_low).collect()))?;
        table.add_column("y_sup", DataColumn::Float64(rows.iter().map(|r| r.y_sup).collect()))?;
        table.add_column("y_mid", DataColumn::Float64(rows.iter().map(|r| r.y_mid).collect()))?;
        Ok(table)
    }
}

/// Vertical reference of a variable's rows; the first one wins when mixed
fn variable_reference(rows: &[&ObservationRow], variable: &str, diagnostics: &mut Diagnostics) -> VerticalReference {
    let mut references: Vec<VerticalReference> = Vec::new();
    for row in rows {
        if !references.contains(&row.v_ref) {
            references.push(row.v_ref);
        }
    }
    if references.len() > 1 {
        diagnostics.warn(
            Stage::Assemble,
            format!("{} rows mix vertical references, reporting {}", variable, references[0]),
        );
    }
    references.first().copied().unwrap_or_default()
}

/// Unroll statistic grids into climatology rows
pub fn assemble(
    stack: &Stack,
    plan: &BinningPlan,
    groups: Vec<VariableGroups>,
    diagnostics: &mut Diagnostics,
) -> Result<ClimatologyTable> {
    let depth = plan.depth().ok_or(BinningError::NoDepthEdges)?;
    let edges = depth.edges().ok_or(BinningError::NoDepthEdges)?;
    let outer_shape = plan.outer_shape();

    let keys = plan
        .outer_dimensions()
        .iter()
        .map(|d| KeyColumn {
            column: d.column.clone(),
            categorical: d.is_categorical(),
        })
        .collect();
    let mut table = ClimatologyTable {
        keys,
        ..Default::default()
    };

    for group in groups {
        let rows: Vec<&ObservationRow> = stack.iter().filter(|r| r.carries(&group.variable)).collect();
        let shape = ProfileShape::of(rows.iter().copied());
        if shape == ProfileShape::Mixed {
            diagnostics.warn(
                Stage::Assemble,
                format!(
                    "{} mixes interval and point profiles, depth bounds reported as points",
                    group.variable
                ),
            );
        }
        let v_ref = variable_reference(&rows, &group.variable, diagnostics);

        for grid in &group.grids {
            for outer in outer_indices(&outer_shape) {
                let resolved = plan.resolve_outer(&outer);
                for y_index in 0..depth.len() {
                    let mut index = outer.clone();
                    index.push(y_index);
                    let value = grid.values[IxDyn(&index)];
                    let provenance = &grid.provenance[IxDyn(&index)];
                    let (low, high) = (edges[y_index], edges[y_index + 1]);
                    let (y_low, y_sup) = match shape {
                        ProfileShape::Stepwise => (Some(low), Some(high)),
                        _ => (None, None),
                    };
                    table.rows.push(ClimatologyRow {
                        variable: group.variable.clone(),
                        value,
                        collection: if provenance.is_empty() {
                            None
                        } else {
                            Some(provenance.join(VARIABLE_SEPARATOR))
                        },
                        n: provenance.len(),
                        keys: resolved.clone(),
                        stats: grid.statistic,
                        v_ref,
                        y_index,
                        y_low,
                        y_sup,
                        y_mid: Some((low + high) / 2.0),
                    });
                }
            }
        }
        table.membership.insert(group.variable, group.members);
    }
    Ok(table)
}

/// Grouped statistics of a stack
///
/// `variables` defaults to every variable of the stack.
pub fn section_stat(
    stack: &Stack,
    groups: &[GroupKey],
    variables: Option<&[String]>,
    stats: &[Statistic],
    diagnostics: &mut Diagnostics,
) -> Result<ClimatologyTable> {
    let variables = match variables {
        Some(v) => v.to_vec(),
        None => stack.variables(),
    };
    let plan = BinningPlan::build(stack, groups, &variables, diagnostics)?;
    let grouped = grouped_stat(stack, &plan, &variables, stats, diagnostics)?;
    assemble(stack, &plan, grouped, diagnostics)
}

/// Degree-day by depth climatology, once per vertical reference
///
/// Uses mean, std, min and max. Tables for the requested references are
/// concatenated in order.
pub fn compute_climatology(
    stack: &Stack,
    dd_edges: &[f64],
    y_edges: &[f64],
    variables: Option<&[String]>,
    references: &[VerticalReference],
    diagnostics: &mut Diagnostics,
) -> Result<ClimatologyTable> {
    let groups = vec![
        GroupKey::continuous("DD", dd_edges.to_vec()),
        GroupKey::continuous(DEPTH_KEY, y_edges.to_vec()),
    ];
    let stats = Statistic::climatology_defaults();
    let references = if references.is_empty() {
        &[VerticalReference::Top][..]
    } else {
        references
    };

    let mut table = ClimatologyTable::default();
    for &reference in references {
        tracing::info!(reference = %reference, "computing climatology");
        let referenced = stack.set_vertical_reference(reference, None, diagnostics);
        let part = section_stat(&referenced, &groups, variables, &stats, diagnostics)?;
        table.append(part);
    }
    Ok(table)
}

/// Sorted distinct core names of every bin of the grid
pub fn grouped_cores(stack: &Stack, groups: &[GroupKey]) -> Result<ArrayD<Vec<String>>> {
    let plan = BinningPlan::build_exact(stack, groups)?;
    let shape = plan.shape();
    let total: usize = shape.iter().product();
    let mut cores: Vec<Vec<String>> = vec![Vec::new(); total];
    for row in stack.iter() {
        if let Some(flat) = plan.assign_flat(row) {
            cores[flat].push(row.name.clone());
        }
    }
    for names in &mut cores {
        names.sort();
        names.dedup();
    }
    tracing::info!(
        groups = %plan.dimensions.iter().map(|d| d.column.as_str()).collect::<Vec<_>>().join(", "),
        "grouping ice cores"
    );
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), cores)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::FieldValue;

    fn scenario() -> Stack {
        Stack::from_rows(vec![
            ObservationRow::stepwise("A", "salinity", 0.0, 10.0)
                .with_value("salinity", Some(5.0))
                .with_weight(1.0),
            ObservationRow::stepwise("A", "salinity", 10.0, 20.0)
                .with_value("salinity", Some(7.0))
                .with_weight(1.0),
            ObservationRow::stepwise("B", "salinity", 0.0, 10.0)
                .with_value("salinity", Some(3.0))
                .with_weight(1.0),
        ])
    }

    #[test]
    fn test_section_stat_rows() {
        let mut diag = Diagnostics::new();
        let groups = vec![GroupKey::categorical("v_ref"), GroupKey::depth(vec![0.0, 10.0, 20.0])];
        let table = section_stat(&scenario(), &groups, None, &[Statistic::Mean], &mut diag).unwrap();
        assert_eq!(table.len(), 2);
        let first = &table.rows[0];
        assert_eq!(first.value, Some(4.0));
        assert_eq!(first.n, 2);
        assert_eq!(first.collection.as_deref(), Some("A, B"));
        assert_eq!(first.keys, vec![Some(KeyValue::Label(FieldValue::Text("top".into())))]);
        assert_eq!((first.y_low, first.y_sup, first.y_mid), (Some(0.0), Some(10.0), Some(5.0)));
        let second = &table.rows[1];
        assert_eq!(second.value, Some(7.0));
        assert_eq!(second.cores(), vec!["A"]);
        assert_eq!(second.y_index, 1);
    }

    #[test]
    fn test_point_profile_bounds() {
        let stack = Stack::from_rows(vec![ObservationRow::point("A", "temperature", 5.0)
            .with_value("temperature", Some(-4.0))
            .with_weight(1.0)]);
        let mut diag = Diagnostics::new();
        let table = section_stat(
            &stack,
            &[GroupKey::depth(vec![0.0, 10.0, 20.0])],
            None,
            &[Statistic::Mean],
            &mut diag,
        )
        .unwrap();
        assert_eq!(table.rows[0].y_low, None);
        assert_eq!(table.rows[0].y_mid, Some(5.0));
        assert_eq!(table.rows[1].value, None);
        assert_eq!(table.rows[1].n, 0);
        assert_eq!(table.rows[1].collection, None);
    }

    #[test]
    fn test_to_table_columns() {
        let mut diag = Diagnostics::new();
        let groups = vec![
            GroupKey::categorical("name"),
            GroupKey::continuous("ice_thickness", vec![0.0, 200.0]),
            GroupKey::depth(vec![0.0, 10.0, 20.0]),
        ];
        let stack = Stack::from_rows(
            scenario()
                .into_rows()
                .into_iter()
                .map(|r| r.with_ice_thickness(100.0))
                .collect(),
        );
        let table = section_stat(&stack, &groups, None, &[Statistic::Mean, Statistic::Std], &mut diag)
            .unwrap()
            .to_table()
            .unwrap();
        assert_eq!(
            table.column_names(),
            vec![
                "salinity",
                "collection",
                "n",
                "name",
                "bin_ice_thickness",
                "ice_thickness_min",
                "ice_thickness_max",
                "stats",
                "variable",
                "v_ref",
                "y_index",
                "y_low",
                "y_sup",
                "y_mid"
            ]
        );
        // 2 stats x 2 cores x 1 thickness bin x 2 depth bins
        assert_eq!(table.num_rows(), 8);
    }

    #[test]
    fn test_membership_json() {
        let mut diag = Diagnostics::new();
        let table = section_stat(
            &scenario(),
            &[GroupKey::depth(vec![0.0, 10.0, 20.0])],
            None,
            &[Statistic::Mean],
            &mut diag,
        )
        .unwrap();
        assert_eq!(table.membership["salinity"], vec![vec!["A".to_string(), "B".to_string()]]);
        let json = table.membership_json().unwrap();
        assert!(json.contains("\"salinity\""));
    }

    #[test]
    fn test_grouped_cores() {
        let groups = vec![GroupKey::depth(vec![0.0, 10.0, 20.0])];
        let cores = grouped_cores(&scenario(), &groups).unwrap();
        assert_eq!(cores.shape(), &[2]);
        assert_eq!(cores[[0]], vec!["A", "B"]);
        assert_eq!(cores[[1]], vec!["A"]);
    }
}
