//! Multi-dimensional binning
//!
//! A grouping specification is an ordered list of [`GroupKey`]s. Each key
//! becomes one [`Dimension`] of the bin grid:
//!
//! - a categorical key enumerates the distinct values of its column in
//!   first-seen order over the stack;
//! - a continuous key cuts its column with right-open intervals
//!   `[edges[i], edges[i + 1])`.
//!
//! The depth key (`y_mid`) is always the innermost dimension, so that the
//! climatology assembler can unroll it into result rows. Rows that fall
//! outside any dimension get no bin and take part in no reduction.

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::BinningError;
use crate::observation::{FieldValue, ObservationRow};
use crate::stack::Stack;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Column holding the depth of a row
pub const DEPTH_KEY: &str = "y_mid";

/// One element of a grouping specification
///
/// The serialized form is either a bare column name (categorical) or a
/// single-entry map from column name to bin edges (continuous):
///
/// ```toml
/// groups = ["v_ref", { DD = [0.0, 500.0, 1000.0] }, { y_mid = [0.0, 10.0, 20.0] }]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGroupKey", into = "RawGroupKey")]
pub enum GroupKey {
    Categorical(String),
    Continuous { column: String, edges: Vec<f64> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawGroupKey {
    Column(String),
    Edges(BTreeMap<String, Vec<f64>>),
}

impl TryFrom<RawGroupKey> for GroupKey {
    type Error = BinningError;

    fn try_from(raw: RawGroupKey) -> Result<Self, Self::Error> {
        match raw {
            RawGroupKey::Column(column) => Ok(GroupKey::Categorical(column)),
            RawGroupKey::Edges(map) => {
                if map.len() != 1 {
                    return Err(BinningError::InvalidGroupKey(map.len()));
                }
                let (column, edges) = map
                    .into_iter()
                    .next()
                    .ok_or(BinningError::InvalidGroupKey(0))?;
                Ok(GroupKey::Continuous { column, edges })
            }
        }
    }
}

impl From<GroupKey> for RawGroupKey {
    fn from(key: GroupKey) -> Self {
        match key {
            GroupKey::Categorical(column) => RawGroupKey::Column(column),
            GroupKey::Continuous { column, edges } => {
                RawGroupKey::Edges(BTreeMap::from([(column, edges)]))
            }
        }
    }
}

impl GroupKey {
    pub fn categorical(column: impl Into<String>) -> Self {
        GroupKey::Categorical(column.into())
    }

    pub fn continuous(column: impl Into<String>, edges: Vec<f64>) -> Self {
        GroupKey::Continuous {
            column: column.into(),
            edges,
        }
    }

    /// Depth cut with the given edges
    pub fn depth(edges: Vec<f64>) -> Self {
        Self::continuous(DEPTH_KEY, edges)
    }

    pub fn column(&self) -> &str {
        match self {
            GroupKey::Categorical(column) => column,
            GroupKey::Continuous { column, .. } => column,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(self, GroupKey::Continuous { column, .. } if column == DEPTH_KEY)
    }
}

/// Validate a bin-edge sequence
pub fn check_edges(column: &str, edges: &[f64]) -> Result<(), BinningError> {
    let increasing = edges.windows(2).all(|w| w[0] < w[1]);
    if edges.len() < 2 || !increasing || edges.iter().any(|e| !e.is_finite()) {
        return Err(BinningError::InvalidEdges {
            column: column.to_string(),
        });
    }
    Ok(())
}

/// Bin of `x` within right-open intervals of `edges`
pub fn bin_index(edges: &[f64], x: f64) -> Option<usize> {
    let (first, last) = (*edges.first()?, *edges.last()?);
    if !x.is_finite() || x < first || x >= last {
        return None;
    }
    Some(edges.partition_point(|e| *e <= x) - 1)
}

/// Row-major offset of a multi-index
///
/// Returns `None` when the index rank differs from the grid rank or a
/// component is out of range.
pub fn flat_index(index: &[usize], dims: &[usize]) -> Option<usize> {
    if index.len() != dims.len() {
        return None;
    }
    let mut offset = 0usize;
    for (&i, &d) in index.iter().zip(dims) {
        if i >= d {
            return None;
        }
        offset = offset * d + i;
    }
    Some(offset)
}

/// Multi-index of a row-major offset
pub fn unflatten(mut offset: usize, dims: &[usize]) -> Vec<usize> {
    let mut index = vec![0; dims.len()];
    for (slot, &d) in index.iter_mut().zip(dims).rev() {
        if d == 0 {
            continue;
        }
        *slot = offset % d;
        offset /= d;
    }
    index
}

/// Every multi-index of a grid in row-major order
///
/// A rank-0 grid has exactly one (empty) index.
pub fn outer_indices(dims: &[usize]) -> impl Iterator<Item = Vec<usize>> + '_ {
    let total: usize = dims.iter().product();
    (0..total).map(move |offset| unflatten(offset, dims))
}

/// Kind of a grid dimension
#[derive(Debug, Clone, PartialEq)]
pub enum DimensionKind {
    /// Labels in first-seen order; the code of a label is its position
    Categorical {
        labels: Vec<FieldValue>,
        codes: HashMap<String, usize>,
    },
    Continuous { edges: Vec<f64> },
}

/// Resolved value of one dimension for one bin
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Label(FieldValue),
    Bin { index: usize, low: f64, high: f64 },
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Label(label) => write!(f, "{}", label),
            KeyValue::Bin { low, high, .. } => write!(f, "[{}, {})", low, high),
        }
    }
}

/// One axis of the bin grid
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub column: String,
    pub kind: DimensionKind,
}

impl Dimension {
    pub fn continuous(column: impl Into<String>, edges: Vec<f64>) -> Self {
        Self {
            column: column.into(),
            kind: DimensionKind::Continuous { edges },
        }
    }

    /// Enumerate the column's labels over `rows` in first-seen order
    pub fn categorical<'a, I>(column: impl Into<String>, rows: I) -> Self
    where
        I: IntoIterator<Item = &'a ObservationRow>,
    {
        let column = column.into();
        let mut labels = Vec::new();
        let mut codes = HashMap::new();
        for row in rows {
            if let Some(value) = row.field(&column) {
                let key = value.key();
                if !codes.contains_key(&key) {
                    codes.insert(key, labels.len());
                    labels.push(value);
                }
            }
        }
        Self {
            column,
            kind: DimensionKind::Categorical { labels, codes },
        }
    }

    /// Number of bins along this axis
    pub fn len(&self) -> usize {
        match &self.kind {
            DimensionKind::Categorical { labels, .. } => labels.len(),
            DimensionKind::Continuous { edges } => edges.len().saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self.kind, DimensionKind::Categorical { .. })
    }

    pub fn edges(&self) -> Option<&[f64]> {
        match &self.kind {
            DimensionKind::Continuous { edges } => Some(edges),
            DimensionKind::Categorical { .. } => None,
        }
    }

    /// Bin code of a row along this axis
    pub fn code(&self, row: &ObservationRow) -> Option<usize> {
        match &self.kind {
            DimensionKind::Categorical { codes, .. } => {
                row.field(&self.column).and_then(|v| codes.get(&v.key()).copied())
            }
            DimensionKind::Continuous { edges } => {
                row.numeric_field(&self.column).and_then(|x| bin_index(edges, x))
            }
        }
    }

    /// Inverse map from a code back to its label or bin bounds
    pub fn label(&self, code: usize) -> Option<KeyValue> {
        match &self.kind {
            DimensionKind::Categorical { labels, .. } => labels.get(code).cloned().map(KeyValue::Label),
            DimensionKind::Continuous { edges } => {
                let low = *edges.get(code)?;
                let high = *edges.get(code + 1)?;
                Some(KeyValue::Bin {
                    index: code,
                    low,
                    high,
                })
            }
        }
    }
}

/// Bin grid of a grouping specification
#[derive(Debug, Clone, PartialEq)]
pub struct BinningPlan {
    /// Axes in grid order; the depth axis, when present, is last
    pub dimensions: Vec<Dimension>,
}

impl BinningPlan {
    /// Build the grid used by grouped statistics
    ///
    /// When no depth key is given, depth edges are the sorted distinct
    /// section horizons (`y_low`, `y_sup`) of the rows carrying one of
    /// `variables`.
    pub fn build(
        stack: &Stack,
        groups: &[GroupKey],
        variables: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, BinningError> {
        validate(groups)?;
        let mut plan = Self::from_keys(stack, groups);
        if !groups.iter().any(GroupKey::is_depth) {
            diagnostics.info(Stage::Binning, "y_mid not in grouping option, generating it from section horizons");
            let edges = horizon_edges(
                stack
                    .iter()
                    .filter(|row| variables.is_empty() || variables.iter().any(|v| row.carries(v))),
            );
            if edges.len() < 2 {
                return Err(BinningError::NoDepthEdges);
            }
            diagnostics.info(
                Stage::Binning,
                format!("y_mid generated from {} section horizons", edges.len()),
            );
            plan.dimensions.push(Dimension::continuous(DEPTH_KEY, edges));
        }
        Ok(plan)
    }

    /// Build the grid exactly as specified, without synthesizing depth
    pub fn build_exact(stack: &Stack, groups: &[GroupKey]) -> Result<Self, BinningError> {
        validate(groups)?;
        Ok(Self::from_keys(stack, groups))
    }

    fn from_keys(stack: &Stack, groups: &[GroupKey]) -> Self {
        let mut dimensions: Vec<Dimension> = groups
            .iter()
            .filter(|key| !key.is_depth())
            .map(|key| match key {
                GroupKey::Categorical(column) => Dimension::categorical(column.as_str(), stack.iter()),
                GroupKey::Continuous { column, edges } => Dimension::continuous(column.as_str(), edges.clone()),
            })
            .collect();
        if let Some(GroupKey::Continuous { edges, .. }) = groups.iter().find(|key| key.is_depth()) {
            dimensions.push(Dimension::continuous(DEPTH_KEY, edges.clone()));
        }
        Self { dimensions }
    }

    /// Bins per axis
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::len).collect()
    }

    /// Shape without the innermost axis
    pub fn outer_shape(&self) -> Vec<usize> {
        let shape = self.shape();
        shape[..shape.len().saturating_sub(1)].to_vec()
    }

    pub fn depth(&self) -> Option<&Dimension> {
        self.dimensions.last().filter(|d| d.column == DEPTH_KEY)
    }

    pub fn outer_dimensions(&self) -> &[Dimension] {
        &self.dimensions[..self.dimensions.len().saturating_sub(1)]
    }

    /// Full multi-index of a row, `None` when any axis rejects it
    pub fn assign(&self, row: &ObservationRow) -> Option<Vec<usize>> {
        self.dimensions.iter().map(|d| d.code(row)).collect()
    }

    /// Row-major offset of a row in the full grid
    pub fn assign_flat(&self, row: &ObservationRow) -> Option<usize> {
        flat_index(&self.assign(row)?, &self.shape())
    }

    /// Multi-index of a row over the outer axes only
    pub fn assign_outer(&self, row: &ObservationRow) -> Option<Vec<usize>> {
        self.outer_dimensions().iter().map(|d| d.code(row)).collect()
    }

    /// Labels of an outer multi-index, one per outer axis
    pub fn resolve_outer(&self, index: &[usize]) -> Vec<Option<KeyValue>> {
        self.outer_dimensions()
            .iter()
            .zip(index)
            .map(|(d, &code)| d.label(code))
            .collect()
    }
}

fn validate(groups: &[GroupKey]) -> Result<(), BinningError> {
    if groups.is_empty() {
        return Err(BinningError::EmptyGrouping);
    }
    for key in groups {
        if let GroupKey::Continuous { column, edges } = key {
            check_edges(column, edges)?;
        }
    }
    if groups.iter().filter(|key| key.is_depth()).count() > 1 {
        return Err(BinningError::DuplicateDepthKey);
    }
    Ok(())
}

/// Sorted distinct section horizons
pub fn horizon_edges<'a, I>(rows: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a ObservationRow>,
{
    let mut edges: Vec<f64> = rows
        .into_iter()
        .flat_map(|row| [row.y_low, row.y_sup])
        .flatten()
        .filter(|y| y.is_finite())
        .collect();
    edges.sort_by(f64::total_cmp);
    edges.dedup();
    edges
}
