//! Conversion between a [`Stack`] and a flat [`DataTable`]
//!
//! Column contract, one row per observation:
//!
//! | column | type | notes |
//! |--------|------|-------|
//! | `name`, `variable` | text | required |
//! | `y_low`, `y_sup`, `y_mid` | number | `y_mid` derived when missing |
//! | `v_ref` | text | `top` or `bottom`, defaults to `top` |
//! | `weight` | number | must not be negative |
//! | `collection` | text | |
//! | `date` | date | |
//! | `ice_thickness`, `freeboard`, `snow_depth` | number | |
//! | `FDD`, `TDD`, `DD` | number | degree-day enrichment |
//! | `freezup_day` | date or ordinal | |
//!
//! Any other numeric column is a value column; any other text column is kept
//! as a free-form attribute.

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::{ProfileError, Result};
use crate::observation::{ObservationRow, VerticalReference};
use crate::stack::Stack;
use chrono::NaiveDate;
use seaice_io::{ColumnType, DataColumn, DataTable};
use std::collections::{BTreeMap, BTreeSet};

const METADATA_COLUMNS: &[&str] = &[
    "name",
    "variable",
    "y_low",
    "y_sup",
    "y_mid",
    "v_ref",
    "weight",
    "collection",
    "date",
    "ice_thickness",
    "freeboard",
    "snow_depth",
    "FDD",
    "TDD",
    "DD",
    "freezup_day",
];

/// Ordinal day counted from 0001-01-01 (day 1)
pub fn date_from_ordinal(ordinal: i64) -> Option<NaiveDate> {
    i32::try_from(ordinal)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

fn number(table: &DataTable, column: &str, index: usize) -> Option<f64> {
    table
        .column(column)
        .and_then(|c| c.f64_at(index))
        .filter(|x| x.is_finite())
}

fn text(table: &DataTable, column: &str, index: usize) -> Option<String> {
    table
        .column(column)
        .and_then(|c| c.text_at(index))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn freezup_at(column: &DataColumn, index: usize) -> Option<NaiveDate> {
    match column.dtype() {
        ColumnType::Int64 | ColumnType::Float64 => column
            .f64_at(index)
            .filter(|x| x.is_finite())
            .and_then(|x| date_from_ordinal(x.round() as i64)),
        _ => column.date_at(index).map(|d| d.date()),
    }
}

impl Stack {
    /// Load a stack from a normalized table
    ///
    /// Rows without any depth are dropped; rows without `v_ref` default to
    /// `top`. Both conditions are reported.
    pub fn from_table(table: &DataTable, diagnostics: &mut Diagnostics) -> Result<Stack> {
        for required in ["name", "variable"] {
            if !table.has_column(required) {
                return Err(ProfileError::MissingColumn(required.to_string()).into());
            }
        }

        let sheet_variables: BTreeSet<String> = (0..table.num_rows())
            .filter_map(|i| text(table, "variable", i))
            .flat_map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect();

        let mut value_columns = Vec::new();
        let mut attribute_columns = Vec::new();
        for (name, column) in table.columns() {
            if METADATA_COLUMNS.contains(&name) {
                continue;
            }
            if sheet_variables.contains(name) || column.dtype().is_numeric() {
                if column.null_count() == column.len() && !sheet_variables.contains(name) {
                    continue;
                }
                value_columns.push((name, column));
            } else {
                attribute_columns.push((name, column));
            }
        }

        let mut rows = Vec::with_capacity(table.num_rows());
        let mut dropped = 0usize;
        let mut defaulted_v_ref = 0usize;

        for index in 0..table.num_rows() {
            let name = text(table, "name", index).ok_or(ProfileError::MissingName(index))?;
            let variable = text(table, "variable", index).unwrap_or_default();

            let y_low = number(table, "y_low", index);
            let y_sup = number(table, "y_sup", index);
            let y_mid = number(table, "y_mid", index).or(match (y_low, y_sup) {
                (Some(low), Some(sup)) => Some((low + sup) / 2.0),
                _ => None,
            });
            if y_mid.is_none() {
                dropped += 1;
                continue;
            }

            let v_ref = match text(table, "v_ref", index) {
                Some(label) => label.parse::<VerticalReference>()?,
                None => {
                    defaulted_v_ref += 1;
                    VerticalReference::Top
                }
            };

            let weight = number(table, "weight", index);
            if let Some(weight) = weight {
                if weight < 0.0 {
                    return Err(ProfileError::InvalidWeight { core: name, weight }.into());
                }
            }

            let mut row = ObservationRow {
                name,
                variable,
                y_low,
                y_sup,
                y_mid,
                v_ref,
                weight,
                collection: text(table, "collection", index),
                date: table.column("date").and_then(|c| c.date_at(index)),
                ice_thickness: number(table, "ice_thickness", index),
                freeboard: number(table, "freeboard", index),
                snow_depth: number(table, "snow_depth", index),
                fdd: number(table, "FDD", index),
                tdd: number(table, "TDD", index),
                dd: number(table, "DD", index),
                freezup_day: table.column("freezup_day").and_then(|c| freezup_at(c, index)),
                ..Default::default()
            };

            for (column_name, column) in &value_columns {
                let value = column.f64_at(index).filter(|x| x.is_finite());
                if row.carries(column_name) || (!sheet_variables.contains(*column_name) && value.is_some()) {
                    row.values.insert(column_name.to_string(), value);
                }
            }
            for (column_name, column) in &attribute_columns {
                if let Some(value) = column.text_at(index) {
                    row.attributes.insert(column_name.to_string(), value);
                }
            }
            rows.push(row);
        }

        if dropped > 0 {
            diagnostics.warn(Stage::Normalize, format!("{} row(s) without depth dropped", dropped));
        }
        if defaulted_v_ref > 0 {
            diagnostics.warn(
                Stage::Normalize,
                format!("{} row(s) without vertical reference, assuming top", defaulted_v_ref),
            );
        }
        tracing::debug!(rows = rows.len(), "Stack loaded from table");
        Ok(Stack::from_rows(rows))
    }

    /// Flatten the stack into a table following the column contract
    pub fn to_table(&self) -> Result<DataTable> {
        let rows = self.rows();
        let value_columns: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.values.keys().map(String::as_str))
            .collect();
        let attribute_columns: BTreeSet<&str> = rows
            .iter()
            .flat_map(|r| r.attributes.keys().map(String::as_str))
            .collect();

        let mut table = DataTable::new();
        table.add_column("name", string_column(rows, |r| Some(r.name.clone())))?;
        table.add_column("variable", string_column(rows, |r| Some(r.variable.clone())))?;
        table.add_column("y_low", float_column(rows, |r| r.y_low))?;
        table.add_column("y_sup", float_column(rows, |r| r.y_sup))?;
        table.add_column("y_mid", float_column(rows, |r| r.y_mid))?;
        table.add_column("v_ref", string_column(rows, |r| Some(r.v_ref.to_string())))?;
        for column in &value_columns {
            table.add_column(*column, float_column(rows, |r| r.values.get(*column).copied().flatten()))?;
        }
        table.add_column("weight", float_column(rows, |r| r.weight))?;
        table.add_column("collection", string_column(rows, |r| r.collection.clone()))?;
        table.add_column("date", DataColumn::Date(rows.iter().map(|r| r.date).collect()))?;
        table.add_column("ice_thickness", float_column(rows, |r| r.ice_thickness))?;
        table.add_column("freeboard", float_column(rows, |r| r.freeboard))?;
        table.add_column("snow_depth", float_column(rows, |r| r.snow_depth))?;
        if rows.iter().any(|r| r.fdd.is_some() || r.tdd.is_some() || r.freezup_day.is_some()) {
            table.add_column("FDD", float_column(rows, |r| r.fdd))?;
            table.add_column("TDD", float_column(rows, |r| r.tdd))?;
            table.add_column("DD", float_column(rows, |r| r.dd))?;
            table.add_column(
                "freezup_day",
                DataColumn::Date(
                    rows.iter()
                        .map(|r| r.freezup_day.and_then(|d| d.and_hms_opt(0, 0, 0)))
                        .collect(),
                ),
            )?;
        }
        for column in &attribute_columns {
            table.add_column(*column, string_column(rows, |r| r.attributes.get(*column).cloned()))?;
        }
        Ok(table)
    }
}

fn float_column(rows: &[ObservationRow], f: impl Fn(&ObservationRow) -> Option<f64>) -> DataColumn {
    DataColumn::Float64(rows.iter().map(f).collect())
}

fn string_column(rows: &[ObservationRow], f: impl Fn(&ObservationRow) -> Option<String>) -> DataColumn {
    DataColumn::String(rows.iter().map(f).collect())
}

/// Group a table's rows by core name, preserving first-seen order
pub fn rows_by_core(stack: &Stack) -> BTreeMap<usize, (String, Vec<&ObservationRow>)> {
    let names = stack.names();
    let mut grouped: BTreeMap<usize, (String, Vec<&ObservationRow>)> = BTreeMap::new();
    for row in stack.rows() {
        if let Some(position) = names.iter().position(|n| *n == row.name) {
            grouped
                .entry(position)
                .or_insert_with(|| (row.name.clone(), Vec::new()))
                .1
                .push(row);
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeaIceError;

    fn observations() -> DataTable {
        DataTable::new()
            .with_column(
                "name",
                DataColumn::String(vec![Some("A".into()), Some("A".into()), Some("B".into())]),
            )
            .unwrap()
            .with_column(
                "variable",
                DataColumn::String(vec![
                    Some("salinity".into()),
                    Some("salinity".into()),
                    Some("temperature".into()),
                ]),
            )
            .unwrap()
            .with_column("y_low", DataColumn::Float64(vec![Some(0.0), Some(10.0), None]))
            .unwrap()
            .with_column("y_sup", DataColumn::Float64(vec![Some(10.0), Some(20.0), None]))
            .unwrap()
            .with_column("y_mid", DataColumn::Float64(vec![None, None, Some(5.0)]))
            .unwrap()
            .with_column("salinity", DataColumn::Float64(vec![Some(5.0), Some(7.0), None]))
            .unwrap()
            .with_column("temperature", DataColumn::Float64(vec![None, None, Some(-3.0)]))
            .unwrap()
            .with_column(
                "site",
                DataColumn::String(vec![Some("BRW".into()), Some("BRW".into()), None]),
            )
            .unwrap()
    }

    #[test]
    fn test_from_table() {
        let mut diag = Diagnostics::new();
        let stack = Stack::from_table(&observations(), &mut diag).unwrap();
        assert_eq!(stack.len(), 3);
        let rows = stack.rows();
        assert_eq!(rows[0].y_mid, Some(5.0));
        assert_eq!(rows[1].value("salinity"), Some(7.0));
        assert!(!rows[0].values.contains_key("temperature"));
        assert_eq!(rows[2].value("temperature"), Some(-3.0));
        assert_eq!(rows[0].attributes.get("site").map(String::as_str), Some("BRW"));
        // no v_ref column
        assert_eq!(diag.warnings().len(), 1);
    }

    #[test]
    fn test_missing_required_column() {
        let table = DataTable::new()
            .with_column("name", DataColumn::String(vec![Some("A".into())]))
            .unwrap();
        let mut diag = Diagnostics::new();
        let err = Stack::from_table(&table, &mut diag).unwrap_err();
        assert!(matches!(
            err,
            SeaIceError::Profile(ProfileError::MissingColumn(ref c)) if c == "variable"
        ));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let table = observations()
            .with_column("weight", DataColumn::Float64(vec![Some(1.0), Some(-0.5), None]))
            .unwrap();
        let mut diag = Diagnostics::new();
        assert!(matches!(
            Stack::from_table(&table, &mut diag),
            Err(SeaIceError::Profile(ProfileError::InvalidWeight { .. }))
        ));
    }

    #[test]
    fn test_table_round_trip() {
        let mut diag = Diagnostics::new();
        let stack = Stack::from_table(&observations(), &mut diag).unwrap();
        let table = stack.to_table().unwrap();
        assert_eq!(table.num_rows(), 3);
        assert!(table.has_column("salinity"));
        assert!(table.has_column("site"));
        assert!(!table.has_column("FDD"));
        let again = Stack::from_table(&table, &mut Diagnostics::new()).unwrap();
        assert_eq!(again, stack);
    }

    #[test]
    fn test_ordinal_dates() {
        assert_eq!(date_from_ordinal(1), NaiveDate::from_ymd_opt(1, 1, 1));
        assert_eq!(date_from_ordinal(736_624), NaiveDate::from_ymd_opt(2017, 10, 22));
    }

    #[test]
    fn test_rows_by_core() {
        let stack = Stack::from_rows(vec![
            ObservationRow::point("B", "t", 1.0),
            ObservationRow::point("A", "t", 1.0),
            ObservationRow::point("B", "t", 2.0),
        ]);
        let grouped = rows_by_core(&stack);
        assert_eq!(grouped[&0].0, "B");
        assert_eq!(grouped[&0].1.len(), 2);
        assert_eq!(grouped[&1].0, "A");
    }
}
