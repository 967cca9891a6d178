//! Weighted reductions over bin samples
//!
//! Every observation that falls into a bin becomes a [`WeightedSample`].
//! The weighted value of a sample is `weight * value`; it is missing when
//! the value is missing or when the weight is exactly zero. Only samples
//! with a present weighted value take part in any reduction:
//!
//! | statistic | reduced column |
//! |-----------|----------------|
//! | mean, sum | weighted value |
//! | min, max, std | raw value |
//!
//! `mean` is the plain average of the weighted values, not a normalized
//! weighted mean. `std` is the sample standard deviation (n - 1).

use crate::statistic::{StatInput, Statistic};
use crate::summary::finite;
use serde::{Deserialize, Serialize};

/// One observation entering a bin reduction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedSample {
    /// Measured value, `None` when not measured
    pub value: Option<f64>,
    /// Sample weight, never negative
    pub weight: f64,
}

impl WeightedSample {
    pub fn new(value: Option<f64>, weight: f64) -> Self {
        Self { value, weight }
    }

    /// A sample with unit weight
    pub fn unweighted(value: f64) -> Self {
        Self::new(Some(value), 1.0)
    }

    /// `weight * value`, or `None` for missing values and zero weights
    pub fn weighted_value(&self) -> Option<f64> {
        if self.weight == 0.0 || !self.weight.is_finite() {
            return None;
        }
        finite(self.value).map(|v| v * self.weight)
    }

    /// Whether this sample takes part in reductions (and in provenance)
    pub fn contributes(&self) -> bool {
        self.weighted_value().is_some()
    }
}

/// Reduce a bin's samples with the given statistic
///
/// Returns `None` when no sample contributes.
pub fn reduce(stat: Statistic, samples: &[WeightedSample]) -> Option<f64> {
    let values: Vec<f64> = match stat.input() {
        StatInput::Weighted => samples.iter().filter_map(|s| s.weighted_value()).collect(),
        StatInput::Raw => samples
            .iter()
            .filter(|s| s.contributes())
            .filter_map(|s| finite(s.value))
            .collect(),
    };

    if values.is_empty() {
        return None;
    }

    match stat {
        Statistic::Sum => Some(values.iter().sum()),
        Statistic::Mean => Some(values.iter().sum::<f64>() / values.len() as f64),
        Statistic::Min => values.iter().copied().reduce(f64::min),
        Statistic::Max => values.iter().copied().reduce(f64::max),
        Statistic::Std => sample_std(&values),
    }
}

/// Sample standard deviation; needs at least two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    Some((ss / (n - 1) as f64).sqrt())
}
