//! The stack of observation rows
//!
//! A [`Stack`] is an append-only collection of [`ObservationRow`]s taken from
//! many cores. Every operation returns a new stack and leaves `self`
//! untouched, so a stack can be shared by several analyses.

use crate::binning::GroupKey;
use crate::climatology::{section_stat, ClimatologyTable};
use crate::diagnostics::{Diagnostics, Level, Stage};
use crate::discretize::{discretize_stack, DiscretizeOptions};
use crate::error::{ProfileError, Result};
use crate::ice_core::IceCore;
use crate::observation::{unique_in_order, FieldValue, ObservationRow, VerticalReference, VARIABLE_SEPARATOR};
use crate::profile::Profile;
use crate::vertical::convert_row;
use seaice_stats::{Statistic, SummaryStats};
use std::collections::HashMap;

/// Ordered collection of observation rows from many cores
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stack {
    rows: Vec<ObservationRow>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<ObservationRow>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ObservationRow] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ObservationRow> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<ObservationRow> {
        self.rows
    }

    /// Append the rows of one profile
    pub fn add_profile(&self, profile: &Profile) -> Stack {
        let mut rows = self.rows.clone();
        rows.extend(profile.rows.iter().cloned());
        Stack { rows }
    }

    /// Append every profile of a core, broadcasting its metadata
    ///
    /// Thickness, freeboard and snow depth are collapsed to one value each;
    /// the collection labels are joined with `", "`.
    pub fn add_profiles(&self, core: &IceCore, diagnostics: &mut Diagnostics) -> Stack {
        let mut rows = self.rows.clone();
        append_core(&mut rows, core, diagnostics);
        Stack { rows }
    }

    /// Build a stack from many cores
    ///
    /// A core whose profiles fail validation is excluded and recorded as an
    /// error; the remaining cores are still stacked.
    pub fn stack_cores(cores: &[IceCore], diagnostics: &mut Diagnostics) -> Stack {
        tracing::info!(cores = cores.len(), "Stacking ice cores");
        let mut rows = Vec::new();
        for core in cores {
            match validate_core(core) {
                Ok(()) => append_core(&mut rows, core, diagnostics),
                Err(e) => diagnostics.error_core(Stage::Stack, &core.name, format!("core excluded: {}", e)),
            }
        }
        Stack { rows }
    }

    /// Remove a core's rows, or only those carrying one of `variables`
    pub fn remove_profile_from_core(&self, name: &str, variables: Option<&[&str]>) -> Stack {
        self.filter(|row| {
            if row.name != name {
                return true;
            }
            match variables {
                None => false,
                Some(variables) => !variables.iter().any(|v| row.carries(v)),
            }
        })
    }

    pub fn filter<F>(&self, predicate: F) -> Stack
    where
        F: Fn(&ObservationRow) -> bool,
    {
        Stack {
            rows: self.rows.iter().filter(|r| predicate(r)).cloned().collect(),
        }
    }

    /// Rows whose `column` equals `value`
    pub fn select(&self, column: &str, value: &FieldValue) -> Stack {
        self.filter(|row| row.field(column).as_ref() == Some(value))
    }

    /// Rows carrying `variable`
    pub fn for_variable(&self, variable: &str) -> Stack {
        self.filter(|row| row.carries(variable))
    }

    /// Sorted collection labels of one core
    pub fn core_in_collection(&self, name: &str) -> Vec<String> {
        let mut labels = unique_in_order(
            self.rows
                .iter()
                .filter(|r| r.name == name)
                .filter_map(|r| r.collection.as_deref())
                .flat_map(|c| c.split(VARIABLE_SEPARATOR))
                .map(str::trim)
                .filter(|c| !c.is_empty()),
        );
        labels.sort();
        labels
    }

    /// Core names in first-seen order
    pub fn names(&self) -> Vec<String> {
        unique_in_order(self.rows.iter().map(|r| r.name.as_str()))
    }

    /// Individual variables in first-seen order
    pub fn variables(&self) -> Vec<String> {
        unique_in_order(self.rows.iter().flat_map(|r| r.variables()))
    }

    /// Convert every core to `target`
    ///
    /// Each core uses `h_ref` when given, otherwise its own ice thickness. A
    /// core without thickness is left unchanged and reported.
    pub fn set_vertical_reference(
        &self,
        target: VerticalReference,
        h_ref: Option<f64>,
        diagnostics: &mut Diagnostics,
    ) -> Stack {
        let mut thickness: HashMap<&str, Option<f64>> = HashMap::new();
        for row in &self.rows {
            let entry = thickness.entry(row.name.as_str()).or_insert(None);
            if entry.is_none() {
                *entry = row.ice_thickness.filter(|h| h.is_finite());
            }
        }

        let mut reported: Vec<&str> = Vec::new();
        let mut rows = self.rows.clone();
        for (row, original) in rows.iter_mut().zip(&self.rows) {
            if row.v_ref == target {
                continue;
            }
            let h = h_ref.or_else(|| thickness.get(original.name.as_str()).copied().flatten());
            match h {
                Some(h) => convert_row(row, target, h),
                None => {
                    if !reported.contains(&original.name.as_str()) {
                        reported.push(original.name.as_str());
                        diagnostics.warn_core(
                            Stage::Reference,
                            &original.name,
                            format!("ice thickness unavailable, profile not converted to {}", target),
                        );
                    }
                }
            }
        }
        Stack { rows }
    }

    /// Grouped statistics over this stack
    pub fn section_stat(
        &self,
        groups: &[GroupKey],
        variables: Option<&[String]>,
        stats: &[Statistic],
        diagnostics: &mut Diagnostics,
    ) -> Result<ClimatologyTable> {
        section_stat(self, groups, variables, stats, diagnostics)
    }

    /// Rebin every core onto common depth bins
    pub fn discretize(&self, options: &DiscretizeOptions, diagnostics: &mut Diagnostics) -> Result<Stack> {
        discretize_stack(self, options, diagnostics)
    }

    /// Summary of one variable's values across the stack
    pub fn summary(&self, variable: &str) -> SummaryStats {
        let values: Vec<f64> = self
            .rows
            .iter()
            .filter(|r| r.carries(variable))
            .map(|r| r.values.get(variable).copied().flatten().unwrap_or(f64::NAN))
            .collect();
        SummaryStats::from_data(&values)
    }
}

impl<'a> IntoIterator for &'a Stack {
    type Item = &'a ObservationRow;
    type IntoIter = std::slice::Iter<'a, ObservationRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl FromIterator<ObservationRow> for Stack {
    fn from_iter<I: IntoIterator<Item = ObservationRow>>(iter: I) -> Self {
        Stack {
            rows: iter.into_iter().collect(),
        }
    }
}

fn append_core(rows: &mut Vec<ObservationRow>, core: &IceCore, diagnostics: &mut Diagnostics) {
    if !core.has_profiles() {
        diagnostics.record(Level::Info, Stage::Stack, Some(&core.name), "no profile to stack");
        return;
    }
    tracing::info!(
        core = %core.name,
        variables = %core.variables().join(VARIABLE_SEPARATOR),
        "Adding profiles"
    );
    if core.ice_thickness.len() > 1 {
        tracing::debug!(core = %core.name, "ice thickness is the mean of all finite measurements");
    }

    let ice_thickness = core.mean_ice_thickness();
    let freeboard = core.mean_freeboard();
    let snow_depth = core.mean_snow_depth();
    let collection = core.collection.join(VARIABLE_SEPARATOR);

    for profile in &core.profiles {
        rows.extend(profile.rows.iter().map(|row| ObservationRow {
            ice_thickness,
            freeboard,
            snow_depth,
            date: core.date,
            collection: Some(collection.clone()),
            ..row.clone()
        }));
    }
}

fn validate_core(core: &IceCore) -> std::result::Result<(), ProfileError> {
    for profile in &core.profiles {
        for row in &profile.rows {
            if row.name != core.name {
                return Err(ProfileError::CoreNameMismatch {
                    core: core.name.clone(),
                    profile: row.name.clone(),
                });
            }
            if let Some(weight) = row.weight {
                if weight < 0.0 {
                    return Err(ProfileError::InvalidWeight {
                        core: core.name.clone(),
                        weight,
                    });
                }
            }
        }
    }
    Ok(())
}
