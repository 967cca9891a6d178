//! Freezing/thawing degree-day enrichment
//!
//! Each sampling date is attached to the degree-days accumulated since the
//! freeze-up of its ice season. A season starts on September 1: a core
//! sampled before September 1 belongs to the season that froze up the
//! previous year.

use crate::diagnostics::{Diagnostics, Stage};
use crate::error::Result;
use crate::stack::Stack;
use crate::table::freezup_at;
use chrono::{Datelike, NaiveDate};
use seaice_io::DataTable;
use std::collections::{BTreeMap, BTreeSet};

/// First month of an ice season
const SEASON_START_MONTH: u32 = 9;

/// Degree-day and freeze-up lookup tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DegreeDays {
    /// Date to (FDD, TDD)
    daily: BTreeMap<NaiveDate, (f64, f64)>,
    /// Season year to freeze-up date
    freezup: BTreeMap<i32, NaiveDate>,
}

impl DegreeDays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_day(&mut self, date: NaiveDate, fdd: f64, tdd: f64) {
        self.daily.insert(date, (fdd, tdd));
    }

    pub fn insert_freezup(&mut self, year: i32, date: NaiveDate) {
        self.freezup.insert(year, date);
    }

    pub fn with_day(mut self, date: NaiveDate, fdd: f64, tdd: f64) -> Self {
        self.insert_day(date, fdd, tdd);
        self
    }

    pub fn with_freezup(mut self, year: i32, date: NaiveDate) -> Self {
        self.insert_freezup(year, date);
        self
    }

    pub fn days(&self) -> usize {
        self.daily.len()
    }

    /// Year in which the season of `date` froze up
    pub fn season_year(date: NaiveDate) -> i32 {
        if date.month() < SEASON_START_MONTH {
            date.year() - 1
        } else {
            date.year()
        }
    }

    pub fn freezup_for(&self, date: NaiveDate) -> Option<NaiveDate> {
        self.freezup.get(&Self::season_year(date)).copied()
    }

    pub fn degree_days(&self, date: NaiveDate) -> Option<(f64, f64)> {
        self.daily.get(&date).copied()
    }

    /// Accruing degree-days: TDD once it turns negative, FDD otherwise
    pub fn select_dd(fdd: f64, tdd: f64) -> f64 {
        if tdd < 0.0 {
            tdd
        } else {
            fdd
        }
    }

    /// Attach FDD, TDD, DD and the freeze-up day to every dated row
    ///
    /// Dates missing from either table are reported and their rows left
    /// untouched.
    pub fn enrich(&self, stack: &Stack, diagnostics: &mut Diagnostics) -> Stack {
        let undated = stack.iter().filter(|r| r.date.is_none()).count();
        if undated > 0 {
            diagnostics.warn(Stage::Enrich, format!("{} row(s) without date not enriched", undated));
        }

        let dates: BTreeSet<NaiveDate> = stack.iter().filter_map(|r| r.date).map(|d| d.date()).collect();
        let mut resolved: BTreeMap<NaiveDate, (f64, f64, NaiveDate)> = BTreeMap::new();
        for date in dates {
            let Some((fdd, tdd)) = self.degree_days(date) else {
                diagnostics.warn(Stage::Enrich, format!("no degree-day value for {}", date));
                continue;
            };
            let Some(freezup) = self.freezup_for(date) else {
                diagnostics.warn(
                    Stage::Enrich,
                    format!("no freeze-up day for season {} ({})", Self::season_year(date), date),
                );
                continue;
            };
            resolved.insert(date, (fdd, tdd, freezup));
        }

        stack
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if let Some(&(fdd, tdd, freezup)) = row.date.and_then(|d| resolved.get(&d.date())) {
                    row.fdd = Some(fdd);
                    row.tdd = Some(tdd);
                    row.dd = Some(Self::select_dd(fdd, tdd));
                    row.freezup_day = Some(freezup);
                }
                row
            })
            .collect()
    }

    /// Load from a `date, FDD, TDD` table and a `year, freezup_day` table
    pub fn from_tables(degree_days: &DataTable, freezup: &DataTable) -> Result<Self> {
        let mut lookup = Self::new();

        let date = degree_days.require("date")?;
        let fdd = degree_days.require("FDD")?;
        let tdd = degree_days.require("TDD")?;
        for index in 0..degree_days.num_rows() {
            if let (Some(d), Some(f), Some(t)) = (date.date_at(index), fdd.f64_at(index), tdd.f64_at(index)) {
                lookup.insert_day(d.date(), f, t);
            }
        }

        let year = freezup.require("year")?;
        let day = freezup.require("freezup_day")?;
        for index in 0..freezup.num_rows() {
            if let (Some(y), Some(d)) = (year.f64_at(index), freezup_at(day, index)) {
                lookup.insert_freezup(y.round() as i32, d);
            }
        }
        tracing::debug!(
            days = lookup.daily.len(),
            seasons = lookup.freezup.len(),
            "Degree-day tables loaded"
        );
        Ok(lookup)
    }
}
