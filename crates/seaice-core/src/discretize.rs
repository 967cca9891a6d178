//! Per-core depth discretization
//!
//! Brings every core onto a common depth grid before stacking statistics:
//!
//! - stepwise profiles are rebinned onto `y_bins` intervals, each bin taking
//!   the overlap-length weighted mean of the sections it intersects;
//! - point profiles are linearly interpolated at `y_mid` targets (the bin
//!   midpoints of `y_bins` when no targets are given).
//!
//! Only sections that would contribute to a statistic (finite value,
//! non-zero weight) are resampled, and each output row carries the weight
//! resampled from its sources the same way as its value. Only bins that
//! receive a value produce a row.

use crate::binning::check_edges;
use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{BinningError, Result};
use crate::observation::ObservationRow;
use crate::profile::ProfileShape;
use crate::stack::Stack;
use crate::table::rows_by_core;
use seaice_stats::WeightedSample;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discretization settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscretizeOptions {
    /// Interval edges for stepwise profiles
    pub y_bins: Option<Vec<f64>>,
    /// Target depths for point profiles
    pub y_mid: Option<Vec<f64>>,
    /// Variables to discretize; every variable of the stack when unset
    pub variables: Option<Vec<String>>,
    /// Interpolate bins that fall in a gap inside the profile
    pub fill_gap: bool,
    /// Extend the nearest value to bins beyond the profile
    pub fill_extremity: bool,
}

impl DiscretizeOptions {
    pub fn with_bins(y_bins: Vec<f64>) -> Self {
        Self {
            y_bins: Some(y_bins),
            ..Default::default()
        }
    }

    /// Point targets: explicit `y_mid`, otherwise bin midpoints
    pub fn targets(&self) -> Option<Vec<f64>> {
        self.y_mid.clone().or_else(|| {
            self.y_bins
                .as_ref()
                .map(|bins| bins.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect())
        })
    }
}

/// A measured depth, value and weight
#[derive(Debug, Clone, Copy)]
struct Node {
    low: f64,
    sup: f64,
    mid: f64,
    value: f64,
    weight: f64,
}

/// Resampled value and weight
type Sample = (f64, f64);

/// Linear interpolation through nodes sorted by `mid`
fn interpolate(nodes: &[Node], y: f64) -> Option<Sample> {
    let (first, last) = (nodes.first()?, nodes.last()?);
    if y < first.mid || y > last.mid {
        return None;
    }
    let upper = nodes.partition_point(|n| n.mid < y);
    let b = nodes.get(upper)?;
    if b.mid == y || upper == 0 {
        return Some((b.value, b.weight));
    }
    let a = nodes[upper - 1];
    let t = (y - a.mid) / (b.mid - a.mid);
    Some((a.value + (b.value - a.value) * t, a.weight + (b.weight - a.weight) * t))
}

/// Value and weight of the end node closest to `y`
fn nearest_end(nodes: &[Node], y: f64) -> Option<Sample> {
    let (first, last) = (nodes.first()?, nodes.last()?);
    let end = if (y - first.mid).abs() <= (y - last.mid).abs() {
        first
    } else {
        last
    };
    Some((end.value, end.weight))
}

/// Overlap-length weighted means of the sections intersecting `[low, sup)`
fn overlap_mean(nodes: &[Node], low: f64, sup: f64) -> Option<Sample> {
    let (value, weight, length) = nodes.iter().fold((0.0, 0.0, 0.0), |(value, weight, length), n| {
        let overlap = (sup.min(n.sup) - low.max(n.low)).max(0.0);
        (value + n.value * overlap, weight + n.weight * overlap, length + overlap)
    });
    if length > 0.0 {
        Some((value / length, weight / length))
    } else {
        None
    }
}

fn rebin_stepwise(nodes: &[Node], bins: &[f64], options: &DiscretizeOptions) -> Vec<(f64, f64, Sample)> {
    let span_low = nodes.iter().map(|n| n.low).fold(f64::INFINITY, f64::min);
    let span_sup = nodes.iter().map(|n| n.sup).fold(f64::NEG_INFINITY, f64::max);
    let mut out = Vec::new();
    for w in bins.windows(2) {
        let (low, sup) = (w[0], w[1]);
        let mid = (low + sup) / 2.0;
        let sample = overlap_mean(nodes, low, sup).or_else(|| {
            let inside = mid >= span_low && mid <= span_sup;
            if inside && options.fill_gap {
                interpolate(nodes, mid)
            } else if !inside && options.fill_extremity {
                nearest_end(nodes, mid)
            } else {
                None
            }
        });
        if let Some(sample) = sample {
            out.push((low, sup, sample));
        }
    }
    out
}

fn resample_points(nodes: &[Node], targets: &[f64], options: &DiscretizeOptions) -> Vec<(f64, Sample)> {
    targets
        .iter()
        .filter_map(|&y| {
            interpolate(nodes, y)
                .or_else(|| if options.fill_extremity { nearest_end(nodes, y) } else { None })
                .map(|sample| (y, sample))
        })
        .collect()
}

/// Discretize every core of a stack
pub fn discretize_stack(stack: &Stack, options: &DiscretizeOptions, diagnostics: &mut Diagnostics) -> Result<Stack> {
    if let Some(bins) = &options.y_bins {
        check_edges("y_bins", bins)?;
    }
    let targets = options.targets().ok_or(BinningError::NoDepthEdges)?;
    let variables = options.variables.clone().unwrap_or_else(|| stack.variables());

    let mut out = Vec::new();
    for (name, rows) in rows_by_core(stack).into_values() {
        for variable in &variables {
            let profile: Vec<&ObservationRow> = rows.iter().copied().filter(|r| r.carries(variable)).collect();
            let Some(template) = profile.first() else {
                continue;
            };

            let mut nodes: Vec<Node> = profile
                .iter()
                .filter(|r| WeightedSample::new(r.value(variable), r.effective_weight()).contributes())
                .filter_map(|r| {
                    Some(Node {
                        low: r.y_low.unwrap_or(f64::NAN),
                        sup: r.y_sup.unwrap_or(f64::NAN),
                        mid: r.y_mid?,
                        value: r.value(variable)?,
                        weight: r.effective_weight(),
                    })
                })
                .collect();
            nodes.sort_by(|a, b| a.mid.total_cmp(&b.mid));
            if nodes.is_empty() {
                continue;
            }

            // unweighted sources stay unweighted
            let weighted = profile.iter().any(|r| r.weight.is_some());
            let make_row = |y_low: Option<f64>, y_sup: Option<f64>, y_mid: f64, (value, weight): Sample| ObservationRow {
                variable: variable.clone(),
                y_low,
                y_sup,
                y_mid: Some(y_mid),
                values: BTreeMap::from([(variable.clone(), Some(value))]),
                weight: weighted.then_some(weight),
                ..(*template).clone()
            };

            match ProfileShape::of(profile.iter().copied()) {
                ProfileShape::Stepwise => match &options.y_bins {
                    Some(bins) => out.extend(
                        rebin_stepwise(&nodes, bins, options)
                            .into_iter()
                            .map(|(low, sup, sample)| make_row(Some(low), Some(sup), (low + sup) / 2.0, sample)),
                    ),
                    None => {
                        diagnostics.warn_core(
                            Stage::Discretize,
                            &name,
                            format!("{} is stepwise but no y_bins given, kept as is", variable),
                        );
                        out.extend(profile.iter().map(|r| (*r).clone()));
                    }
                },
                ProfileShape::Point => out.extend(
                    resample_points(&nodes, &targets, options)
                        .into_iter()
                        .map(|(y, sample)| make_row(None, None, y, sample)),
                ),
                ProfileShape::Mixed | ProfileShape::Empty => {
                    diagnostics.warn_core(
                        Stage::Discretize,
                        &name,
                        format!("{} has no consistent profile shape, kept as is", variable),
                    );
                    out.extend(profile.iter().map(|r| (*r).clone()));
                }
            }
        }
    }
    Ok(Stack::from_rows(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binning::GroupKey;
    use seaice_stats::Statistic;

    fn salinity(sections: &[(f64, f64, f64)]) -> Stack {
        Stack::from_rows(
            sections
                .iter()
                .map(|&(low, sup, v)| {
                    ObservationRow::stepwise("A", "salinity", low, sup)
                        .with_value("salinity", Some(v))
                        .with_ice_thickness(40.0)
                })
                .collect(),
        )
    }

    #[test]
    fn test_overlap_weighted_rebin() {
        let stack = salinity(&[(0.0, 5.0, 4.0), (5.0, 20.0, 8.0)]);
        let mut diag = Diagnostics::new();
        let out = discretize_stack(&stack, &DiscretizeOptions::with_bins(vec![0.0, 10.0, 20.0]), &mut diag).unwrap();
        assert_eq!(out.len(), 2);
        // 5 cm at 4.0 and 5 cm at 8.0
        assert_eq!(out.rows()[0].value("salinity"), Some(6.0));
        assert_eq!(out.rows()[1].value("salinity"), Some(8.0));
        assert_eq!(out.rows()[1].y_mid, Some(15.0));
        assert_eq!(out.rows()[0].ice_thickness, Some(40.0));
    }

    #[test]
    fn test_fill_gap_and_extremity() {
        let stack = salinity(&[(0.0, 10.0, 4.0), (20.0, 30.0, 8.0)]);
        let bins = vec![0.0, 10.0, 20.0, 30.0, 40.0];
        let mut diag = Diagnostics::new();

        let plain = discretize_stack(&stack, &DiscretizeOptions::with_bins(bins.clone()), &mut diag).unwrap();
        assert_eq!(plain.len(), 2);

        let options = DiscretizeOptions {
            fill_gap: true,
            fill_extremity: true,
            ..DiscretizeOptions::with_bins(bins)
        };
        let filled = discretize_stack(&stack, &options, &mut diag).unwrap();
        assert_eq!(filled.len(), 4);
        assert_eq!(filled.rows()[1].value("salinity"), Some(6.0));
        assert_eq!(filled.rows()[3].value("salinity"), Some(8.0));
    }

    #[test]
    fn test_point_interpolation() {
        let stack = Stack::from_rows(vec![
            ObservationRow::point("A", "temperature", 0.0).with_value("temperature", Some(-10.0)),
            ObservationRow::point("A", "temperature", 20.0).with_value("temperature", Some(-2.0)),
        ]);
        let options = DiscretizeOptions {
            y_mid: Some(vec![5.0, 20.0, 30.0]),
            ..Default::default()
        };
        let mut diag = Diagnostics::new();
        let out = discretize_stack(&stack, &options, &mut diag).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows()[0].value("temperature"), Some(-8.0));
        assert_eq!(out.rows()[1].value("temperature"), Some(-2.0));
        assert_eq!(out.rows()[0].y_low, None);
    }

    fn weighted(rows: &[(f64, f64, f64, f64)]) -> Stack {
        rows.iter()
            .map(|&(low, sup, v, w)| {
                ObservationRow::stepwise("A", "salinity", low, sup)
                    .with_value("salinity", Some(v))
                    .with_weight(w)
            })
            .collect()
    }

    fn binned_means(stack: &Stack) -> Vec<Option<f64>> {
        let mut diag = Diagnostics::new();
        let groups = [GroupKey::depth(vec![0.0, 10.0, 20.0])];
        stack
            .section_stat(&groups, None, &[Statistic::Mean], &mut diag)
            .unwrap()
            .rows
            .iter()
            .map(|r| r.value)
            .collect()
    }

    #[test]
    fn test_zero_weight_sections_never_contribute() {
        let options = DiscretizeOptions::with_bins(vec![0.0, 10.0, 20.0]);
        let zero_first = weighted(&[(0.0, 10.0, 100.0, 0.0), (10.0, 20.0, 5.0, 1.0)]);
        let zero_last = weighted(&[(10.0, 20.0, 5.0, 1.0), (0.0, 10.0, 100.0, 0.0)]);
        assert_eq!(binned_means(&zero_first), vec![None, Some(5.0)]);

        for stack in [zero_first, zero_last] {
            let mut diag = Diagnostics::new();
            let out = stack.discretize(&options, &mut diag).unwrap();
            assert_eq!(out.len(), 1);
            assert_eq!(out.rows()[0].y_low, Some(10.0));
            assert_eq!(out.rows()[0].weight, Some(1.0));
            assert_eq!(binned_means(&out), vec![None, Some(5.0)]);
        }
    }

    #[test]
    fn test_weight_resampled_from_sources() {
        let stack = weighted(&[(0.0, 5.0, 4.0, 2.0), (5.0, 20.0, 8.0, 4.0)]);
        let mut diag = Diagnostics::new();
        let out = discretize_stack(&stack, &DiscretizeOptions::with_bins(vec![0.0, 10.0, 20.0]), &mut diag).unwrap();
        assert_eq!(out.rows()[0].value("salinity"), Some(6.0));
        assert_eq!(out.rows()[0].weight, Some(3.0));
        assert_eq!(out.rows()[1].weight, Some(4.0));

        // rows without weight stay without weight
        let plain = discretize_stack(
            &salinity(&[(0.0, 10.0, 4.0)]),
            &DiscretizeOptions::with_bins(vec![0.0, 10.0]),
            &mut diag,
        )
        .unwrap();
        assert_eq!(plain.rows()[0].weight, None);
    }

    #[test]
    fn test_requires_targets() {
        let stack = salinity(&[(0.0, 10.0, 4.0)]);
        let mut diag = Diagnostics::new();
        assert!(discretize_stack(&stack, &DiscretizeOptions::default(), &mut diag).is_err());
        let bad = DiscretizeOptions::with_bins(vec![10.0, 0.0]);
        assert!(discretize_stack(&stack, &bad, &mut diag).is_err());
    }

    #[test]
    fn test_stepwise_without_bins_kept() {
        let stack = salinity(&[(0.0, 10.0, 4.0)]);
        let options = DiscretizeOptions {
            y_mid: Some(vec![5.0]),
            ..Default::default()
        };
        let mut diag = Diagnostics::new();
        let out = discretize_stack(&stack, &options, &mut diag).unwrap();
        assert_eq!(out, stack);
        assert_eq!(diag.warnings().len(), 1);
    }
}
