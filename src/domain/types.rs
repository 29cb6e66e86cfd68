//! Shared domain types.
//!
//! Series values are plain `(date, Option<f64>)` pairs so they can be:
//!
//! - produced by any source (CSV, snapshot, Yahoo, FRED)
//! - filtered and aligned without knowing where they came from
//! - exported back to flat tables

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// One observation. `value` is `None` when the raw number failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl TimePoint {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

/// An ordered sequence of observations.
///
/// Construction via [`Series::from_unsorted`] guarantees ascending dates with
/// ties kept in input order. [`Series::from_points`] keeps the given order
/// as-is; consumers that need sorted input check it themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    points: Vec<TimePoint>,
}

impl Series {
    pub fn from_points(points: Vec<TimePoint>) -> Self {
        Self { points }
    }

    /// Stable-sort `points` by date.
    pub fn from_unsorted(mut points: Vec<TimePoint>) -> Self {
        points.sort_by_key(|p| p.date);
        Self { points }
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<TimePoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimePoint> {
        self.points.iter()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Inclusive `[min, max]` of the dates, or `None` for an empty series.
    pub fn span(&self) -> Option<DateRange> {
        let start = self.points.iter().map(|p| p.date).min()?;
        let end = self.points.iter().map(|p| p.date).max()?;
        Some(DateRange { start, end })
    }

    /// Number of points whose value is missing.
    pub fn null_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_none()).count()
    }

    /// Index of the first point whose date is earlier than its predecessor.
    pub fn first_unsorted_index(&self) -> Option<usize> {
        self.points
            .windows(2)
            .position(|w| w[1].date < w[0].date)
            .map(|i| i + 1)
    }

    pub fn ensure_sorted(&self, series: &'static str) -> Result<(), SeriesError> {
        match self.first_unsorted_index() {
            Some(index) => Err(SeriesError::Unsorted { series, index }),
            None => Ok(()),
        }
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a TimePoint;
    type IntoIter = std::slice::Iter<'a, TimePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// One row of the aligned output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignedRecord {
    /// Date taken from the left (index) series.
    pub date: NaiveDate,
    pub left: f64,
    pub right: f64,
    /// Date of the right-series point that was matched (always `<= date`).
    pub right_date: NaiveDate,
}

/// Closed date interval, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SeriesError> {
        let range = Self { start, end };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), SeriesError> {
        if self.start > self.end {
            return Err(SeriesError::InvalidRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Clamp both endpoints into `bounds`.
    ///
    /// Ordering between the endpoints is left untouched: a user-selected
    /// `start > end` stays invalid after clamping.
    pub fn clamp_to(&self, bounds: &DateRange) -> DateRange {
        DateRange {
            start: self.start.clamp(bounds.start, bounds.end),
            end: self.end.clamp(bounds.start, bounds.end),
        }
    }

    /// `true` when `self` lies entirely inside `other`.
    pub fn is_within(&self, other: &DateRange) -> bool {
        other.start <= self.start && self.end <= other.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Where the index series is downloaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexSourceKind {
    /// Yahoo Finance chart API (daily closes).
    Yahoo,
    /// FRED observations API (requires `FRED_API_KEY`).
    Fred,
}

impl IndexSourceKind {
    pub fn default_symbol(self) -> &'static str {
        match self {
            IndexSourceKind::Yahoo => "DX-Y.NYB",
            IndexSourceKind::Fred => "DTWEXBGS",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IndexSourceKind::Yahoo => "yahoo",
            IndexSourceKind::Fred => "fred",
        }
    }
}

/// What to do when a requested index fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FetchFallback {
    /// Abort the view with a source-unavailable error.
    Fail,
    /// Use the last good snapshot without telling the user.
    Snapshot,
    /// Use the last good snapshot and show a staleness banner.
    SnapshotWarn,
}

/// A vertical annotation line on the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub date: NaiveDate,
    pub label: String,
}

impl Marker {
    pub fn liberation_day() -> Self {
        Self {
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap_or_default(),
            label: "‘Liberation Day’".to_string(),
        }
    }
}

/// Parameters for downloading a fresh index snapshot.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub source: IndexSourceKind,
    pub symbol: String,
    pub window: DateRange,
}

/// On-disk locations of the two inputs.
#[derive(Debug, Clone)]
pub struct DataPaths {
    /// Index snapshot CSV; its manifest sits next to it.
    pub index_snapshot: PathBuf,
    /// Local yield CSV (FRED download format).
    pub yield_csv: PathBuf,
}

/// Resolved options for one viewing session (CLI `show` or TUI).
#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub paths: DataPaths,
    pub index_column: Option<String>,
    pub yield_column: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub preview_rows: usize,
    pub style: crate::chart::ChartStyle,
    /// Fetch a fresh snapshot before viewing.
    pub refresh: Option<RefreshConfig>,
    pub fallback: FetchFallback,
    pub export_png: Option<PathBuf>,
    pub export_csv: Option<PathBuf>,
}
