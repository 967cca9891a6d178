//! Nan-aware summaries
//!
//! Provides the small helpers used when scalar core metadata (ice thickness,
//! freeboard, snow depth) is reduced to a single value:
//! - Finite filtering
//! - Mean ignoring missing values
//! - A compact summary of a numeric series

use serde::{Deserialize, Serialize};

/// Keep a value only if it is present and finite
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Arithmetic mean ignoring non-finite values
///
/// Returns `None` when no finite value is present.
pub fn nan_mean(data: &[f64]) -> Option<f64> {
    let (sum, count) = data
        .iter()
        .filter(|x| x.is_finite())
        .fold((0.0, 0usize), |(sum, count), x| (sum + x, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Reduce a set of repeated measurements to one value
///
/// A single measurement is used as-is, several are averaged ignoring
/// missing entries.
pub fn collapse_measurements(data: &[f64]) -> Option<f64> {
    match data {
        [] => None,
        [single] => finite(Some(*single)),
        many => nan_mean(many),
    }
}

/// Summary statistics for a numeric series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    /// Number of finite values
    pub count: usize,
    /// Number of missing/NaN values
    pub missing: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
}

impl SummaryStats {
    /// Compute summary statistics from data
    pub fn from_data(data: &[f64]) -> Self {
        let finite: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
        let missing = data.len() - finite.len();

        Self {
            count: finite.len(),
            missing,
            min: finite.iter().copied().reduce(f64::min),
            max: finite.iter().copied().reduce(f64::max),
            mean: nan_mean(&finite),
        }
    }

    /// Get the range (max - min)
    pub fn range(&self) -> Option<f64> {
        Some(self.max? - self.min?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_mean() {
        assert_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), Some(2.0));
        assert_eq!(nan_mean(&[f64::NAN]), None);
        assert_eq!(nan_mean(&[]), None);
    }

    #[test]
    fn test_collapse_measurements() {
        assert_eq!(collapse_measurements(&[1.2]), Some(1.2));
        assert_eq!(collapse_measurements(&[1.0, 1.5, f64::NAN]), Some(1.25));
        assert_eq!(collapse_measurements(&[f64::NAN]), None);
        assert_eq!(collapse_measurements(&[]), None);
    }

    #[test]
    fn test_summary_stats_with_nan() {
        let data = vec![1.0, 2.0, f64::NAN, 4.0, 5.0];
        let stats = SummaryStats::from_data(&data);

        assert_eq!(stats.count, 4);
        assert_eq!(stats.missing, 1);
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(5.0));
        assert_eq!(stats.mean, Some(3.0));
        assert_eq!(stats.range(), Some(4.0));
    }

    #[test]
    fn test_summary_stats_empty() {
        let stats = SummaryStats::from_data(&[f64::NAN]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
        assert_eq!(stats.range(), None);
    }
}
