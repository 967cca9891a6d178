//! Ice core container
//!
//! An [`IceCore`] is what an importer produces for one physical core: its
//! identity, sampling metadata and one normalized profile per variable sheet.

use crate::error::ProfileError;
use crate::observation::unique_in_order;
use crate::profile::Profile;
use chrono::NaiveDateTime;
use seaice_stats::collapse_measurements;

/// One sea-ice core
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IceCore {
    pub name: String,
    pub date: Option<NaiveDateTime>,
    /// Free-text sampling location
    pub origin: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Repeated thickness measurements around the core hole
    pub ice_thickness: Vec<f64>,
    pub freeboard: Vec<f64>,
    pub snow_depth: Vec<f64>,
    /// Names of the cores collected together with this one
    pub collection: Vec<String>,
    pub profiles: Vec<Profile>,
}

impl IceCore {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            collection: vec![name.clone()],
            name,
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: NaiveDateTime) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_ice_thickness(mut self, measurements: Vec<f64>) -> Self {
        self.ice_thickness = measurements;
        self
    }

    pub fn with_freeboard(mut self, measurements: Vec<f64>) -> Self {
        self.freeboard = measurements;
        self
    }

    pub fn with_snow_depth(mut self, measurements: Vec<f64>) -> Self {
        self.snow_depth = measurements;
        self
    }

    /// Attach a profile; its rows must carry this core's name
    pub fn add_profile(&mut self, profile: Profile) -> Result<(), ProfileError> {
        if profile.name != self.name {
            return Err(ProfileError::CoreNameMismatch {
                core: self.name.clone(),
                profile: profile.name,
            });
        }
        if let Some(row) = profile.rows.iter().find(|r| r.name != self.name) {
            return Err(ProfileError::CoreNameMismatch {
                core: self.name.clone(),
                profile: row.name.clone(),
            });
        }
        self.profiles.push(profile);
        Ok(())
    }

    pub fn add_to_collection(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.collection.contains(&name) {
            self.collection.push(name);
        }
    }

    pub fn del_from_collection(&mut self, name: &str) {
        self.collection.retain(|c| c != name);
    }

    /// Variables measured on this core, in profile order
    pub fn variables(&self) -> Vec<String> {
        unique_in_order(
            self.profiles
                .iter()
                .flat_map(|p| p.variables.iter().map(String::as_str)),
        )
    }

    pub fn has_profiles(&self) -> bool {
        self.profiles.iter().any(|p| !p.is_empty())
    }

    /// Ice thickness collapsed to one value
    pub fn mean_ice_thickness(&self) -> Option<f64> {
        collapse_measurements(&self.ice_thickness)
    }

    pub fn mean_freeboard(&self) -> Option<f64> {
        collapse_measurements(&self.freeboard)
    }

    pub fn mean_snow_depth(&self) -> Option<f64> {
        collapse_measurements(&self.snow_depth)
    }
}
