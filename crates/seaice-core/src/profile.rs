//! Profile normalization
//!
//! A profile is one variable sheet of one core: a list of depth sections
//! (stepwise) or depth points (point) carrying one value per sheet variable.
//! Importers hand raw sections to [`Profile::normalize`], which produces the
//! canonical [`ObservationRow`]s consumed by the stack.

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::ProfileError;
use crate::observation::{ObservationRow, VerticalReference, VARIABLE_SEPARATOR};
use crate::vertical::convert_row;
use std::collections::BTreeMap;

/// One section as read from an importer, before normalization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSection {
    pub y_low: Option<f64>,
    pub y_mid: Option<f64>,
    pub y_sup: Option<f64>,
    /// One value per sheet variable, in sheet order
    pub values: Vec<Option<f64>>,
    pub weight: Option<f64>,
}

impl RawSection {
    pub fn stepwise(y_low: f64, y_sup: f64, values: Vec<Option<f64>>) -> Self {
        Self {
            y_low: Some(y_low),
            y_sup: Some(y_sup),
            values,
            ..Default::default()
        }
    }

    pub fn point(y_mid: f64, values: Vec<Option<f64>>) -> Self {
        Self {
            y_mid: Some(y_mid),
            values,
            ..Default::default()
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

/// Topology of a profile's depth coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileShape {
    /// Every row has both interval bounds
    Stepwise,
    /// No row has interval bounds
    Point,
    /// Some rows have bounds and some do not
    Mixed,
    Empty,
}

impl ProfileShape {
    pub fn of<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a ObservationRow>,
    {
        let mut stepwise = 0usize;
        let mut point = 0usize;
        for row in rows {
            if row.is_stepwise() {
                stepwise += 1;
            } else if row.y_low.is_none() && row.y_sup.is_none() {
                point += 1;
            } else {
                return ProfileShape::Mixed;
            }
        }
        match (stepwise, point) {
            (0, 0) => ProfileShape::Empty,
            (_, 0) => ProfileShape::Stepwise,
            (0, _) => ProfileShape::Point,
            _ => ProfileShape::Mixed,
        }
    }
}

/// Normalized profile of one variable sheet on one core
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    /// Variables sharing this sheet
    pub variables: Vec<String>,
    pub v_ref: VerticalReference,
    pub rows: Vec<ObservationRow>,
}

impl Profile {
    /// Build canonical rows from raw sections
    ///
    /// Missing `y_mid` is derived from the interval bounds; sections with no
    /// depth at all are dropped; rows are sorted by `y_mid`.
    pub fn normalize(
        name: impl Into<String>,
        variables: Vec<String>,
        v_ref: VerticalReference,
        sections: Vec<RawSection>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self, ProfileError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProfileError::MissingName(0));
        }
        let sheet = variables.join(VARIABLE_SEPARATOR);
        let mut rows = Vec::with_capacity(sections.len());
        let mut dropped = 0usize;

        for (index, section) in sections.into_iter().enumerate() {
            if section.values.len() != variables.len() {
                return Err(ProfileError::ValueCountMismatch {
                    row: index,
                    expected: variables.len(),
                    actual: section.values.len(),
                });
            }
            if let Some(weight) = section.weight {
                if weight < 0.0 {
                    return Err(ProfileError::InvalidWeight { core: name, weight });
                }
            }

            let y_mid = match (section.y_mid, section.y_low, section.y_sup) {
                (Some(mid), _, _) if mid.is_finite() => Some(mid),
                (_, Some(low), Some(sup)) => Some((low + sup) / 2.0),
                _ => None,
            };
            let Some(y_mid) = y_mid else {
                dropped += 1;
                continue;
            };

            let mut values = BTreeMap::new();
            for (variable, value) in variables.iter().zip(section.values) {
                values.insert(variable.clone(), value);
            }
            rows.push(ObservationRow {
                name: name.clone(),
                variable: sheet.clone(),
                y_low: section.y_low,
                y_sup: section.y_sup,
                y_mid: Some(y_mid),
                v_ref,
                values,
                weight: section.weight,
                ..Default::default()
            });
        }

        if dropped > 0 {
            diagnostics.warn_core(
                Stage::Normalize,
                &name,
                format!("{} section(s) of {} without depth dropped", dropped, sheet),
            );
        }
        if ProfileShape::of(&rows) == ProfileShape::Mixed {
            diagnostics.warn_core(
                Stage::Normalize,
                &name,
                format!("{} mixes interval and point sections", sheet),
            );
        }

        rows.sort_by(|a, b| a.y_mid.partial_cmp(&b.y_mid).unwrap_or(std::cmp::Ordering::Equal));

        Ok(Self {
            name,
            variables,
            v_ref,
            rows,
        })
    }

    /// Wrap already-normalized rows; they must all belong to one core
    pub fn from_rows(rows: Vec<ObservationRow>) -> Result<Self, ProfileError> {
        let first = rows.first().ok_or(ProfileError::MissingName(0))?;
        let name = first.name.clone();
        let v_ref = first.v_ref;
        if let Some(other) = rows.iter().find(|r| r.name != name) {
            return Err(ProfileError::MixedCores(name, other.name.clone()));
        }
        let mut variables: Vec<String> = Vec::new();
        for row in &rows {
            for variable in row.variables() {
                if !variables.iter().any(|v| v == variable) {
                    variables.push(variable.to_string());
                }
            }
        }
        Ok(Self {
            name,
            variables,
            v_ref,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn shape(&self) -> ProfileShape {
        ProfileShape::of(&self.rows)
    }

    /// The joined variable sheet label
    pub fn sheet(&self) -> String {
        self.variables.join(VARIABLE_SEPARATOR)
    }

    /// Remove variables whose values are all missing
    ///
    /// Returns the removed names. A profile left without variables keeps no
    /// rows.
    pub fn drop_empty_variables(&mut self) -> Vec<String> {
        let empty: Vec<String> = self
            .variables
            .iter()
            .filter(|v| self.rows.iter().all(|row| row.value(v).is_none()))
            .cloned()
            .collect();
        if empty.is_empty() {
            return empty;
        }
        self.variables.retain(|v| !empty.contains(v));
        let sheet = self.sheet();
        if self.variables.is_empty() {
            self.rows.clear();
        } else {
            for row in &mut self.rows {
                for variable in &empty {
                    row.values.remove(variable);
                }
                row.variable = sheet.clone();
            }
        }
        empty
    }

    /// Convert every row to `target` using thickness `h`
    pub fn set_vertical_reference(&mut self, target: VerticalReference, h: f64) {
        for row in &mut self.rows {
            convert_row(row, target, h);
        }
        self.v_ref = target;
    }
}
