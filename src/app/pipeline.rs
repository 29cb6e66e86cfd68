//! Shared pipeline used by both the CLI and the TUI.
//!
//! Two halves, kept apart on purpose:
//!
//! - acquisition: fetch (optional) -> snapshot -> load both inputs
//! - presentation: `recompute(index, yields, range)` -> filter -> align -> assemble
//!
//! The presentation half is pure; front-ends call it on every range change.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use crate::align::{align, filter};
use crate::chart::{ChartData, assemble};
use crate::data::index_source;
use crate::domain::{AlignedRecord, DateRange, FetchFallback, RefreshConfig, Series, ViewConfig};
use crate::error::{AppError, SeriesError, SourceError};
use crate::io::ingest::{ColumnSpec, LoadedSeries, read_series_csv};
use crate::io::snapshot::{SnapshotHandle, open_snapshot, write_snapshot};

/// Output of one recompute.
#[derive(Debug, Clone)]
pub struct AlignedResult {
    pub range: DateRange,
    pub records: Vec<AlignedRecord>,
    pub chart: ChartData,
    /// Index points that fell inside `range` (before alignment).
    pub index_in_range: usize,
    /// Yield points that fell inside `range` (before alignment).
    pub yield_in_range: usize,
}

impl AlignedResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Index points in range that did not make it into the output.
    pub fn dropped(&self) -> usize {
        self.index_in_range.saturating_sub(self.records.len())
    }
}

/// Filter both series to `range`, align them, and assemble the chart table.
///
/// An empty result is returned as-is; only an inverted range is an error.
pub fn recompute(
    index: &Series,
    yields: &Series,
    range: &DateRange,
    preview_rows: usize,
) -> Result<AlignedResult, SeriesError> {
    let index_in = filter(index, range)?;
    let yield_in = filter(yields, range)?;
    let records = align(&index_in, &yield_in)?;
    let chart = assemble(&records, preview_rows);

    Ok(AlignedResult {
        range: *range,
        index_in_range: index_in.len(),
        yield_in_range: yield_in.len(),
        records,
        chart,
    })
}

/// Where the index series used for this session came from.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexOrigin {
    /// Fetched during this session and written as a new snapshot.
    Fresh { fetched_at: DateTime<Utc> },
    /// Read from an existing snapshot. `fetch_error` is set when a fetch was
    /// attempted and failed.
    Snapshot {
        fetched_at: DateTime<Utc>,
        fetch_error: Option<String>,
    },
}

/// A fetched index series, ready to be snapshotted.
#[derive(Debug, Clone)]
pub struct FetchedIndex {
    pub series: Series,
    pub source: String,
    pub symbol: String,
    pub fetched_at: DateTime<Utc>,
}

/// Result of index acquisition.
#[derive(Debug, Clone)]
pub struct IndexAcquisition {
    pub handle: SnapshotHandle,
    pub origin: IndexOrigin,
    /// User-facing staleness notice (only under `FetchFallback::SnapshotWarn`).
    pub banner: Option<String>,
}

/// Both inputs of a viewing session.
#[derive(Debug, Clone)]
pub struct Inputs {
    pub index: LoadedSeries,
    pub yields: LoadedSeries,
    pub acquisition: IndexAcquisition,
}

impl Inputs {
    pub fn banner(&self) -> Option<&str> {
        self.acquisition.banner.as_deref()
    }
}

/// Fetch the index from the configured remote source.
pub fn fetch_index(config: &RefreshConfig) -> Result<FetchedIndex, SourceError> {
    let source = index_source(config.source, &config.symbol)?;
    let series = source.fetch(&config.window)?;
    Ok(FetchedIndex {
        series,
        source: source.name().to_string(),
        symbol: source.symbol().to_string(),
        fetched_at: Utc::now(),
    })
}

/// Turn an optional fetch outcome into a snapshot handle, applying `policy`
/// when the fetch failed.
pub fn acquire_index(
    fetched: Option<Result<FetchedIndex, SourceError>>,
    snapshot_path: &Path,
    policy: FetchFallback,
) -> Result<IndexAcquisition, AppError> {
    let fetch_error = match fetched {
        Some(Ok(f)) => {
            let handle = write_snapshot(snapshot_path, &f.series, &f.source, &f.symbol, f.fetched_at)?;
            return Ok(IndexAcquisition {
                origin: IndexOrigin::Fresh { fetched_at: f.fetched_at },
                handle,
                banner: None,
            });
        }
        Some(Err(err)) => {
            if policy == FetchFallback::Fail {
                return Err(err.into());
            }
            warn!(error = %err, policy = ?policy, "index fetch failed; falling back to snapshot");
            Some(err.to_string())
        }
        None => None,
    };

    let handle = open_snapshot(snapshot_path).map_err(|e| match &fetch_error {
        Some(fetch) => AppError::new(4, format!("Index fetch failed ({fetch}) and no usable snapshot: {e}")),
        None => AppError::new(
            4,
            format!("No index snapshot ({e}). Run `dxy refresh` or pass `--refresh`."),
        ),
    })?;

    let fetched_at = handle.manifest.fetched_at;
    let banner = match (&fetch_error, policy) {
        (Some(err), FetchFallback::SnapshotWarn) => Some(format!(
            "Index fetch failed ({err}); showing snapshot from {} ({})",
            fetched_at.format("%Y-%m-%d %H:%M UTC"),
            describe_age(handle.age(Utc::now())),
        )),
        (Some(_), _) => {
            info!(fetched_at = %fetched_at, "using snapshot after failed fetch");
            None
        }
        (None, _) => None,
    };

    Ok(IndexAcquisition {
        handle,
        origin: IndexOrigin::Snapshot { fetched_at, fetch_error },
        banner,
    })
}

/// Human-readable snapshot age, at day or hour resolution.
fn describe_age(age: chrono::Duration) -> String {
    match (age.num_days(), age.num_hours()) {
        (days, _) if days >= 1 => format!("{days}d old"),
        (_, hours) if hours >= 1 => format!("{hours}h old"),
        _ => "under 1h old".to_string(),
    }
}

/// Acquire the index and load both inputs for a viewing session.
pub fn load_inputs(config: &ViewConfig) -> Result<Inputs, AppError> {
    let fetched = config.refresh.as_ref().map(fetch_index);
    let acquisition = acquire_index(fetched, &config.paths.index_snapshot, config.fallback)?;

    let index_spec = ColumnSpec::index().with_value_column(config.index_column.as_deref());
    let index = acquisition.handle.load(&index_spec)?;

    let yield_spec = ColumnSpec::treasury_yield().with_value_column(config.yield_column.as_deref());
    let yields = read_series_csv(&config.paths.yield_csv, &yield_spec)?;

    Ok(Inputs {
        index,
        yields,
        acquisition,
    })
}

/// Resolve the requested range against the index span.
///
/// Missing endpoints default to the span; given endpoints are clamped into it.
/// An inverted request is returned unclamped so `start > end` stays visible
/// to the caller.
pub fn resolve_range(span: Option<DateRange>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> DateRange {
    let Some(span) = span else {
        let fallback = start.or(end).unwrap_or_default();
        return DateRange {
            start: start.unwrap_or(fallback),
            end: end.unwrap_or(fallback),
        };
    };

    let requested = DateRange {
        start: start.unwrap_or(span.start),
        end: end.unwrap_or(span.end),
    };
    // Clamping could fold an inverted request onto one valid day.
    if requested.validate().is_err() {
        return requested;
    }
    let clamped = requested.clamp_to(&span);
    if clamped != requested {
        warn!(requested = %requested, clamped = %clamped, "date range clamped to index span");
    }
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimePoint;
    use std::fs;
    use std::path::PathBuf;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(points: &[(NaiveDate, Option<f64>)]) -> Series {
        Series::from_points(points.iter().map(|&(dt, v)| TimePoint::new(dt, v)).collect())
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dxy-pipeline-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir.join("dxy_data.csv")
    }

    fn fetched(series: Series) -> FetchedIndex {
        FetchedIndex {
            series,
            source: "yahoo".to_string(),
            symbol: "DX-Y.NYB".to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn inverted_range_halts_before_alignment() {
        let index = series(&[(d(2023, 3, 1), Some(104.0))]);
        let yields = series(&[(d(2023, 3, 1), Some(4.0))]);
        let range = DateRange { start: d(2023, 6, 1), end: d(2023, 1, 1) };
        assert!(matches!(
            recompute(&index, &yields, &range, 5),
            Err(SeriesError::InvalidRange { .. })
        ));
    }

    #[test]
    fn recompute_filters_then_aligns() {
        let index = series(&[
            (d(2023, 1, 1), Some(102.0)),
            (d(2023, 1, 3), Some(103.0)),
            (d(2023, 1, 4), None),
            (d(2023, 2, 1), Some(99.0)),
        ]);
        let yields = series(&[(d(2023, 1, 1), Some(4.0)), (d(2023, 1, 2), Some(4.1))]);
        let range = DateRange { start: d(2023, 1, 1), end: d(2023, 1, 31) };

        let result = recompute(&index, &yields, &range, 5).unwrap();
        assert_eq!(result.index_in_range, 3);
        assert_eq!(result.yield_in_range, 2);
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.dropped(), 1);
        assert_eq!(result.chart.right.values, vec![4.0, 4.1]);
    }

    #[test]
    fn empty_alignment_is_not_an_error() {
        let index = series(&[(d(2023, 1, 1), Some(102.0))]);
        let range = DateRange { start: d(2023, 1, 1), end: d(2023, 1, 1) };
        let result = recompute(&index, &Series::default(), &range, 5).unwrap();
        assert!(result.is_empty());
        assert!(result.chart.preview.is_empty());
    }

    #[test]
    fn successful_fetch_writes_a_fresh_snapshot() {
        let path = scratch("fresh");
        let s = series(&[(d(2023, 1, 3), Some(104.5))]);
        let acq = acquire_index(Some(Ok(fetched(s))), &path, FetchFallback::Fail).unwrap();

        assert!(matches!(acq.origin, IndexOrigin::Fresh { .. }));
        assert!(acq.banner.is_none());
        assert_eq!(acq.handle.load(&ColumnSpec::index()).unwrap().rows_used, 1);
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn failed_fetch_follows_fallback_policy() {
        let path = scratch("fallback");
        let s = series(&[(d(2023, 1, 3), Some(104.5))]);
        acquire_index(Some(Ok(fetched(s))), &path, FetchFallback::Fail).unwrap();

        let fail = acquire_index(Some(Err(SourceError::Status(503))), &path, FetchFallback::Fail);
        assert_eq!(fail.unwrap_err().exit_code(), 4);

        let silent = acquire_index(Some(Err(SourceError::Status(503))), &path, FetchFallback::Snapshot).unwrap();
        assert!(silent.banner.is_none());
        assert!(matches!(
            silent.origin,
            IndexOrigin::Snapshot { fetch_error: Some(_), .. }
        ));

        let warned =
            acquire_index(Some(Err(SourceError::Status(503))), &path, FetchFallback::SnapshotWarn).unwrap();
        let banner = warned.banner.unwrap();
        assert!(banner.contains("503"), "banner: {banner}");
        assert!(banner.contains("old)"), "banner: {banner}");

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn failed_fetch_without_snapshot_is_source_unavailable() {
        let path = scratch("none");
        let err = acquire_index(
            Some(Err(SourceError::Http("offline".into()))),
            &path,
            FetchFallback::SnapshotWarn,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("offline"));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn snapshot_age_is_described_coarsely() {
        assert_eq!(describe_age(chrono::Duration::minutes(5)), "under 1h old");
        assert_eq!(describe_age(chrono::Duration::hours(5)), "5h old");
        assert_eq!(describe_age(chrono::Duration::hours(50)), "2d old");
    }

    #[test]
    fn range_defaults_to_span_and_clamps() {
        let span = Some(DateRange { start: d(2023, 1, 2), end: d(2025, 4, 14) });
        assert_eq!(resolve_range(span, None, None), span.unwrap());

        let r = resolve_range(span, Some(d(2020, 1, 1)), Some(d(2024, 1, 1)));
        assert_eq!(r, DateRange { start: d(2023, 1, 2), end: d(2024, 1, 1) });

        let inverted = resolve_range(span, Some(d(2023, 6, 1)), Some(d(2023, 1, 1)));
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn inverted_range_past_the_span_stays_inverted() {
        let span = Some(DateRange { start: d(2023, 1, 2), end: d(2025, 4, 14) });
        let requested = DateRange { start: d(2030, 1, 1), end: d(2029, 1, 1) };

        let r = resolve_range(span, Some(requested.start), Some(requested.end));
        assert_eq!(r, requested);

        let index = series(&[(d(2025, 4, 14), Some(100.0))]);
        let yields = series(&[(d(2025, 4, 14), Some(4.3))]);
        assert!(matches!(
            recompute(&index, &yields, &r, 5),
            Err(SeriesError::InvalidRange { .. })
        ));

        let before_span = resolve_range(span, Some(d(2020, 6, 1)), Some(d(2020, 1, 1)));
        assert!(before_span.validate().is_err());
    }
}
