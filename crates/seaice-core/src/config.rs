//! Analysis configuration
//!
//! A TOML document describing one batch run: where the normalized
//! observations come from, how they are grouped and reduced, and where the
//! result goes.
//!
//! ```toml
//! [input]
//! observations = "cores.csv"
//! degree_days = "dd.csv"
//! freezeup = "freezeup.csv"
//!
//! [output]
//! path = "climatology.csv"
//!
//! [grouping]
//! groups = ["v_ref", { y_mid = [0.0, 10.0, 20.0] }]
//! stats = ["mean", "std"]
//! ```

use crate::binning::{check_edges, GroupKey, DEPTH_KEY};
use crate::discretize::DiscretizeOptions;
use crate::error::ConfigError;
use crate::observation::VerticalReference;
use seaice_stats::Statistic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete description of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub reference: ReferenceConfig,
    /// Degree-day by depth climatology; replaces `grouping` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climatology: Option<ClimatologyConfig>,
    /// Per-core rebinning applied before grouping
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discretize: Option<DiscretizeOptions>,
}

/// Input files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Normalized observation table
    pub observations: PathBuf,
    /// `date, FDD, TDD` table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degree_days: Option<PathBuf>,
    /// `year, freezup_day` table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freezeup: Option<PathBuf>,
}

/// Output files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Result table
    pub path: PathBuf,
    /// Membership dictionary as JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership: Option<PathBuf>,
}

/// Grouped statistics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupingConfig {
    pub groups: Vec<GroupKey>,
    /// Variables to reduce; every variable of the stack when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    pub stats: Vec<Statistic>,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            variables: None,
            stats: Statistic::climatology_defaults(),
        }
    }
}

/// Vertical reference conversion applied after loading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<VerticalReference>,
    /// Reference thickness used instead of each core's own
    #[serde(skip_serializing_if = "Option::is_none")]
    pub h_ref: Option<f64>,
}

/// Degree-day by depth climatology settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimatologyConfig {
    pub dd_bins: Vec<f64>,
    pub y_bins: Vec<f64>,
    #[serde(default = "default_references")]
    pub references: Vec<VerticalReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
}

fn default_references() -> Vec<VerticalReference> {
    vec![VerticalReference::Top]
}

impl AnalysisConfig {
    /// Minimal configuration reading `observations` and writing `output`
    pub fn new(observations: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: InputConfig {
                observations: observations.into(),
                degree_days: None,
                freezeup: None,
            },
            output: OutputConfig {
                path: output.into(),
                membership: None,
            },
            grouping: GroupingConfig::default(),
            reference: ReferenceConfig::default(),
            climatology: None,
            discretize: None,
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// Relative input and output paths are resolved against the file's
    /// directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.input.observations);
        resolve(&mut self.output.path);
        for path in [
            self.input.degree_days.as_mut(),
            self.input.freezeup.as_mut(),
            self.output.membership.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            resolve(path);
        }
    }

    /// Whether degree-day enrichment is configured
    pub fn has_degree_days(&self) -> bool {
        self.input.degree_days.is_some() && self.input.freezeup.is_some()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.climatology {
            Some(climatology) => {
                check_edges("DD", &climatology.dd_bins).map_err(|e| ConfigError::Invalid(e.to_string()))?;
                check_edges(DEPTH_KEY, &climatology.y_bins).map_err(|e| ConfigError::Invalid(e.to_string()))?;
                if !self.has_degree_days() {
                    return Err(ConfigError::Invalid(
                        "climatology requires input.degree_days and input.freezeup".to_string(),
                    ));
                }
            }
            None => {
                if self.grouping.groups.is_empty() {
                    return Err(ConfigError::Invalid(
                        "grouping.groups must contain at least one key".to_string(),
                    ));
                }
                if self.grouping.stats.is_empty() {
                    return Err(ConfigError::Invalid(
                        "grouping.stats must name at least one statistic".to_string(),
                    ));
                }
                for key in &self.grouping.groups {
                    if let GroupKey::Continuous { column, edges } = key {
                        check_edges(column, edges).map_err(|e| ConfigError::Invalid(e.to_string()))?;
                    }
                }
            }
        }

        if self.input.degree_days.is_some() != self.input.freezeup.is_some() {
            return Err(ConfigError::Invalid(
                "input.degree_days and input.freezeup must be given together".to_string(),
            ));
        }

        if let Some(h_ref) = self.reference.h_ref {
            if !(h_ref.is_finite() && h_ref > 0.0) {
                return Err(ConfigError::Invalid("reference.h_ref must be positive".to_string()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUPED: &str = r#"
[input]
observations = "cores.csv"

[output]
path = "out.csv"

[grouping]
groups = ["v_ref", { y_mid = [0.0, 10.0, 20.0] }]
stats = ["mean", "Max"]

[reference]
target = "bottom"
"#;

    #[test]
    fn test_parse_grouped() {
        let config = AnalysisConfig::from_toml_str(GROUPED).unwrap();
        assert_eq!(config.grouping.groups.len(), 2);
        assert_eq!(config.grouping.groups[1], GroupKey::depth(vec![0.0, 10.0, 20.0]));
        assert_eq!(config.grouping.stats, vec![Statistic::Mean, Statistic::Max]);
        assert_eq!(config.reference.target, Some(VerticalReference::Bottom));
        assert!(config.climatology.is_none());
    }

    #[test]
    fn test_unsupported_statistic() {
        let text = GROUPED.replace("\"Max\"", "\"median\"");
        let err = AnalysisConfig::from_toml_str(&text).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("median"));
    }

    #[test]
    fn test_default_stats() {
        let text = GROUPED.replace("stats = [\"mean\", \"Max\"]\n", "");
        let config = AnalysisConfig::from_toml_str(&text).unwrap();
        assert_eq!(config.grouping.stats, Statistic::climatology_defaults());
    }

    #[test]
    fn test_empty_grouping_rejected() {
        let config = AnalysisConfig::new("cores.csv", "out.csv");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_climatology_section() {
        let text = r#"
[input]
observations = "cores.csv"
degree_days = "dd.csv"
freezeup = "fud.csv"

[output]
path = "out.csv"

[climatology]
dd_bins = [0.0, 1000.0, 2000.0]
y_bins = [0.0, 50.0, 100.0]
references = ["top", "bottom"]
"#;
        let config = AnalysisConfig::from_toml_str(text).unwrap();
        let climatology = config.climatology.unwrap();
        assert_eq!(climatology.references, vec![VerticalReference::Top, VerticalReference::Bottom]);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AnalysisConfig::from_toml_str(GROUPED).unwrap();
        let text = config.to_toml().unwrap();
        assert_eq!(AnalysisConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_from_file_resolves_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analysis.toml");
        std::fs::write(&path, GROUPED).unwrap();
        let config = AnalysisConfig::from_file(&path).unwrap();
        assert_eq!(config.input.observations, dir.path().join("cores.csv"));

        let missing = AnalysisConfig::from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
