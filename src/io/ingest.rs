//! CSV ingest and normalization.
//!
//! Turns a two-column-ish table (a date column plus a numeric column, with
//! whatever else the exporter added) into a date-sorted [`Series`].
//!
//! Row policy:
//! - unparseable date: row dropped, recorded as a [`RowError`]
//! - unparseable number: row kept with `value = None`
//!
//! Sorting is stable, so duplicate dates keep their file order.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::{debug, info};

use crate::domain::{Series, TimePoint};
use crate::error::SourceError;

/// Header names accepted for the date column, in priority order.
pub const DATE_COLUMNS: [&str; 3] = ["date", "observation_date", "timestamp"];

/// Which columns to read from a source table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub date: Vec<String>,
    pub value: Vec<String>,
}

impl ColumnSpec {
    pub fn new(value: &[&str]) -> Self {
        Self {
            date: DATE_COLUMNS.iter().map(|s| s.to_string()).collect(),
            value: value.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Dollar index tables (`dxy_data.csv`, snapshots, yfinance exports).
    pub fn index() -> Self {
        Self::new(&["dxy", "close", "value"])
    }

    /// FRED 10-year yield tables (`dgs10_data.csv`).
    pub fn treasury_yield() -> Self {
        Self::new(&["dgs10", "yield", "value"])
    }

    /// Replace the value candidates with a single explicit column.
    pub fn with_value_column(mut self, name: Option<&str>) -> Self {
        if let Some(name) = name {
            self.value = vec![normalize_header_name(name)];
        }
        self
    }
}

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the series plus what happened along the way.
#[derive(Debug, Clone)]
pub struct LoadedSeries {
    pub series: Series,
    pub date_column: String,
    pub value_column: String,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
    /// Retained rows whose value failed to parse.
    pub null_values: usize,
}

/// Open `path` and load it with [`parse_series_csv`].
pub fn read_series_csv(path: &Path, spec: &ColumnSpec) -> Result<LoadedSeries, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_series_csv(file, spec)?;

    info!(
        path = %path.display(),
        rows_read = loaded.rows_read,
        rows_used = loaded.rows_used,
        null_values = loaded.null_values,
        dropped = loaded.row_errors.len(),
        "loaded series"
    );
    Ok(loaded)
}

/// Parse CSV from any reader into a sorted series.
pub fn parse_series_csv<R: Read>(reader: R, spec: &ColumnSpec) -> Result<LoadedSeries, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let (date_column, date_idx) = resolve_column(&header_map, &spec.date)?;
    let (value_column, value_idx) = resolve_column(&header_map, &spec.value)?;

    let mut points = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: one for the header, one for 1-based line numbers.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let raw_date = record.get(date_idx).unwrap_or("");
        let Some(date) = parse_date(raw_date) else {
            debug!(line, raw = raw_date, "dropping row with unparseable date");
            row_errors.push(RowError {
                line,
                message: format!("Invalid date '{raw_date}'."),
            });
            continue;
        };

        let value = parse_value(record.get(value_idx).unwrap_or(""));
        points.push(TimePoint::new(date, value));
    }

    let series = Series::from_unsorted(points);
    let null_values = series.null_count();

    Ok(LoadedSeries {
        rows_used: series.len(),
        series,
        date_column,
        value_column,
        row_errors,
        rows_read,
        null_values,
    })
}

/// Build a series from already-split `(date, value)` strings.
///
/// Used by API clients whose payloads carry string fields (FRED). Same row
/// policy as the CSV path.
pub fn series_from_raw<'a, I>(rows: I) -> Series
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let points = rows
        .into_iter()
        .filter_map(|(date, value)| parse_date(date).map(|d| TimePoint::new(d, parse_value(value))))
        .collect();
    Series::from_unsorted(points)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins on duplicate headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_column(
    header_map: &HashMap<String, usize>,
    candidates: &[String],
) -> Result<(String, usize), SourceError> {
    candidates
        .iter()
        .find_map(|name| header_map.get(name).map(|&idx| (name.clone(), idx)))
        .ok_or_else(|| SourceError::MissingColumn {
            expected: candidates.to_vec(),
        })
}

/// Parse a calendar date, accepting a handful of common export formats.
///
/// Slash and dash forms with the year last are read month-first
/// (`03/01/2023` is March 1). Timestamps keep only their date part.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z"))
        .ok()
        .map(|dt| dt.date_naive())
}

/// Parse a number after removing `,` grouping separators.
///
/// Anything that does not come out as a finite `f64` (`n/a`, FRED's `.`,
/// blanks, `inf`) is `None`.
pub fn parse_value(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|&c| c != ',').collect();
    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
