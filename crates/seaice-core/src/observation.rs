//! Observation rows - the atomic unit of a stack
//!
//! One row holds the measurement of one variable sheet at one depth
//! interval (stepwise profiles, e.g. salinity sections) or one depth point
//! (point profiles, e.g. temperature probes) of one core, together with the
//! core metadata broadcast onto it.

use crate::error::ProfileError;
use chrono::{NaiveDate, NaiveDateTime};
use seaice_io::format_datetime;
use seaice_stats::finite;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Separator used when several variables share one measurement sheet
pub const VARIABLE_SEPARATOR: &str = ", ";

/// Vertical reference frame of the depth coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalReference {
    /// Zero at the ice/snow or ice/air interface
    #[default]
    Top,
    /// Zero at the ice/water interface
    Bottom,
}

impl VerticalReference {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerticalReference::Top => "top",
            VerticalReference::Bottom => "bottom",
        }
    }
}

impl fmt::Display for VerticalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerticalReference {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "top" => Ok(VerticalReference::Top),
            "bottom" => Ok(VerticalReference::Bottom),
            _ => Err(ProfileError::InvalidVerticalReference(s.to_string())),
        }
    }
}

/// A typed cell read from a row by column name
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(x) => Some(*x),
            FieldValue::Text(s) => s.trim().parse().ok(),
            FieldValue::Date(_) => None,
        }
    }

    /// Stable text key used to enumerate categorical labels
    ///
    /// Tagged with the variant so that `Number(5.0)` and `Text("5")` stay
    /// distinct labels.
    pub fn key(&self) -> String {
        let tag = match self {
            FieldValue::Text(_) => 't',
            FieldValue::Number(_) => 'n',
            FieldValue::Date(_) => 'd',
        };
        format!("{}:{}", tag, self)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Number(x) => write!(f, "{}", x),
            FieldValue::Date(d) => f.write_str(&format_datetime(d)),
        }
    }
}

/// One normalized observation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationRow {
    /// Core identifier
    pub name: String,
    /// Variable sheet, `", "`-joined when several variables share it
    pub variable: String,
    pub y_low: Option<f64>,
    pub y_sup: Option<f64>,
    pub y_mid: Option<f64>,
    pub v_ref: VerticalReference,
    /// Measured values keyed by variable name
    pub values: BTreeMap<String, Option<f64>>,
    /// Sample weight; `None` is read as 1
    pub weight: Option<f64>,
    pub collection: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub ice_thickness: Option<f64>,
    pub freeboard: Option<f64>,
    pub snow_depth: Option<f64>,
    /// Freezing degree-days accumulated to `date`
    pub fdd: Option<f64>,
    /// Thawing degree-days accumulated to `date`
    pub tdd: Option<f64>,
    /// Whichever of FDD/TDD is accruing
    pub dd: Option<f64>,
    pub freezup_day: Option<NaiveDate>,
    /// Free-form text columns usable as categorical grouping keys
    pub attributes: BTreeMap<String, String>,
}

impl ObservationRow {
    pub fn new(name: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variable: variable.into(),
            ..Default::default()
        }
    }

    /// A row of a stepwise profile; `y_mid` is the interval midpoint
    pub fn stepwise(name: impl Into<String>, variable: impl Into<String>, y_low: f64, y_sup: f64) -> Self {
        Self {
            y_low: Some(y_low),
            y_sup: Some(y_sup),
            y_mid: Some((y_low + y_sup) / 2.0),
            ..Self::new(name, variable)
        }
    }

    /// A row of a point profile
    pub fn point(name: impl Into<String>, variable: impl Into<String>, y_mid: f64) -> Self {
        Self {
            y_mid: Some(y_mid),
            ..Self::new(name, variable)
        }
    }

    pub fn with_value(mut self, variable: impl Into<String>, value: Option<f64>) -> Self {
        self.values.insert(variable.into(), value);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_v_ref(mut self, v_ref: VerticalReference) -> Self {
        self.v_ref = v_ref;
        self
    }

    pub fn with_date(mut self, date: NaiveDateTime) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_ice_thickness(mut self, ice_thickness: f64) -> Self {
        self.ice_thickness = Some(ice_thickness);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Individual variable names of this row's sheet
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variable
            .split(VARIABLE_SEPARATOR)
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Whether the row belongs to the given variable's profile
    pub fn carries(&self, variable: &str) -> bool {
        self.variables().any(|v| v == variable)
    }

    /// Finite measured value of a variable
    pub fn value(&self, variable: &str) -> Option<f64> {
        finite(self.values.get(variable).copied().flatten())
    }

    /// Weight used by reductions; missing weights count as 1
    pub fn effective_weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }

    /// Interval rows have both bounds, point rows neither
    pub fn is_stepwise(&self) -> bool {
        self.y_low.is_some() && self.y_sup.is_some()
    }

    /// Read a column by name
    ///
    /// Known columns map to their typed fields; other names are looked up in
    /// the value columns, then in the free-form attributes.
    pub fn field(&self, column: &str) -> Option<FieldValue> {
        let number = |x: Option<f64>| finite(x).map(FieldValue::Number);
        match column {
            "name" => Some(FieldValue::Text(self.name.clone())),
            "variable" => Some(FieldValue::Text(self.variable.clone())),
            "y_low" => number(self.y_low),
            "y_sup" => number(self.y_sup),
            "y_mid" => number(self.y_mid),
            "v_ref" => Some(FieldValue::Text(self.v_ref.to_string())),
            "weight" => number(self.weight),
            "collection" => self.collection.clone().map(FieldValue::Text),
            "date" => self.date.map(FieldValue::Date),
            "ice_thickness" => number(self.ice_thickness),
            "freeboard" => number(self.freeboard),
            "snow_depth" => number(self.snow_depth),
            "FDD" | "fdd" => number(self.fdd),
            "TDD" | "tdd" => number(self.tdd),
            "DD" | "dd" => number(self.dd),
            "freezup_day" => self
                .freezup_day
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(FieldValue::Date),
            other => match self.values.get(other) {
                Some(value) => number(*value),
                None => self.attributes.get(other).cloned().map(FieldValue::Text),
            },
        }
    }

    /// Numeric column value, used by continuous grouping keys
    pub fn numeric_field(&self, column: &str) -> Option<f64> {
        self.field(column).and_then(|f| f.as_f64())
    }
}

/// Distinct values in first-seen order
pub(crate) fn unique_in_order<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        if !seen.iter().any(|s| s == item) {
            seen.push(item.to_string());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stepwise_midpoint() {
        let row = ObservationRow::stepwise("A", "salinity", 10.0, 20.0);
        assert_eq!(row.y_mid, Some(15.0));
        assert!(row.is_stepwise());
        assert!(!ObservationRow::point("A", "temperature", 5.0).is_stepwise());
    }

    #[test]
    fn test_joined_variables() {
        let row = ObservationRow::new("A", "salinity, conductivity")
            .with_value("salinity", Some(5.1))
            .with_value("conductivity", None);
        assert!(row.carries("salinity"));
        assert!(row.carries("conductivity"));
        assert!(!row.carries("sal"));
        assert_eq!(row.value("salinity"), Some(5.1));
        assert_eq!(row.value("conductivity"), None);
    }

    #[test]
    fn test_field_lookup() {
        let row = ObservationRow::stepwise("A", "salinity", 0.0, 10.0)
            .with_value("salinity", Some(5.0))
            .with_attribute("site", "Barrow");
        assert_eq!(row.field("v_ref"), Some(FieldValue::Text("top".into())));
        assert_eq!(row.numeric_field("y_mid"), Some(5.0));
        assert_eq!(row.numeric_field("salinity"), Some(5.0));
        assert_eq!(row.field("site"), Some(FieldValue::Text("Barrow".into())));
        assert_eq!(row.field("DD"), None);
        assert_eq!(row.field("unknown"), None);
    }

    #[test]
    fn test_vertical_reference_parse() {
        assert_eq!("Bottom".parse::<VerticalReference>(), Ok(VerticalReference::Bottom));
        assert!("middle".parse::<VerticalReference>().is_err());
    }

    #[test]
    fn test_effective_weight_defaults_to_one() {
        let row = ObservationRow::point("A", "temperature", 5.0);
        assert_eq!(row.effective_weight(), 1.0);
        assert_eq!(row.with_weight(0.0).effective_weight(), 0.0);
    }

    #[test]
    fn test_field_key_tagged_by_type() {
        assert_ne!(FieldValue::Number(5.0).key(), FieldValue::Text("5".into()).key());
        assert_eq!(FieldValue::Text("north".into()).key(), "t:north");
        assert_eq!(FieldValue::Number(5.0).to_string(), "5");
    }

    #[test]
    fn test_unique_in_order() {
        assert_eq!(unique_in_order(["B", "A", "B", "C"]), vec!["B", "A", "C"]);
    }
}
