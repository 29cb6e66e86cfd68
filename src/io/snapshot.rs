//! Index snapshots: an immutable CSV capture plus a JSON manifest.
//!
//! Layout for a snapshot at `dxy_data.csv`:
//!
//! - `dxy_data.csv`           `date,value` rows, ascending
//! - `dxy_data.manifest.json` [`SnapshotManifest`]
//!
//! A refresh writes both files (CSV first, manifest last, each through a
//! temporary file + rename) and hands back a [`SnapshotHandle`]. Viewers
//! open the handle and never write to it.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::Series;
use crate::error::SourceError;
use crate::io::export::write_series_csv;
use crate::io::ingest::{ColumnSpec, LoadedSeries, read_series_csv};

/// Metadata describing one capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub source: String,
    pub symbol: String,
    pub fetched_at: DateTime<Utc>,
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
    pub rows: usize,
}

/// Reference to a snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotHandle {
    pub csv_path: PathBuf,
    pub manifest: SnapshotManifest,
}

impl SnapshotHandle {
    /// Read the snapshot's rows.
    pub fn load(&self, spec: &ColumnSpec) -> Result<LoadedSeries, SourceError> {
        read_series_csv(&self.csv_path, spec)
    }

    /// Time elapsed since the capture.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.manifest.fetched_at
    }
}

/// Manifest path belonging to a snapshot CSV.
pub fn manifest_path(csv_path: &Path) -> PathBuf {
    csv_path.with_extension("manifest.json")
}

/// Write `series` as a new snapshot at `csv_path`, replacing any previous one.
pub fn write_snapshot(
    csv_path: &Path,
    series: &Series,
    source: &str,
    symbol: &str,
    fetched_at: DateTime<Utc>,
) -> Result<SnapshotHandle, SourceError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| SourceError::Io { path, source }
    };

    if let Some(parent) = csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err(parent))?;
    }

    let tmp_csv = csv_path.with_extension("csv.tmp");
    write_series_csv(&tmp_csv, series, "date", "value")?;
    fs::rename(&tmp_csv, csv_path).map_err(io_err(csv_path))?;

    let manifest = SnapshotManifest {
        source: source.to_string(),
        symbol: symbol.to_string(),
        fetched_at,
        first: series.first_date(),
        last: series.last_date(),
        rows: series.len(),
    };

    let manifest_file = manifest_path(csv_path);
    let tmp_manifest = manifest_file.with_extension("json.tmp");
    let file = File::create(&tmp_manifest).map_err(io_err(&tmp_manifest))?;
    serde_json::to_writer_pretty(file, &manifest).map_err(|e| SourceError::Manifest {
        path: tmp_manifest.clone(),
        message: e.to_string(),
    })?;
    fs::rename(&tmp_manifest, &manifest_file).map_err(io_err(&manifest_file))?;

    info!(
        path = %csv_path.display(),
        rows = manifest.rows,
        source,
        symbol,
        "wrote index snapshot"
    );

    Ok(SnapshotHandle {
        csv_path: csv_path.to_path_buf(),
        manifest,
    })
}

/// Open an existing snapshot.
///
/// A CSV without a manifest (e.g. a hand-placed `dxy_data.csv`) is accepted;
/// its manifest is synthesized from the file's modification time.
pub fn open_snapshot(csv_path: &Path) -> Result<SnapshotHandle, SourceError> {
    let csv_meta = fs::metadata(csv_path).map_err(|source| SourceError::Io {
        path: csv_path.to_path_buf(),
        source,
    })?;

    let manifest_file = manifest_path(csv_path);
    let manifest = match File::open(&manifest_file) {
        Ok(file) => serde_json::from_reader(file).map_err(|e| SourceError::Manifest {
            path: manifest_file.clone(),
            message: e.to_string(),
        })?,
        Err(_) => {
            let fetched_at = csv_meta
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            SnapshotManifest {
                source: "file".to_string(),
                symbol: csv_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("index")
                    .to_string(),
                fetched_at,
                first: None,
                last: None,
                rows: 0,
            }
        }
    };

    Ok(SnapshotHandle {
        csv_path: csv_path.to_path_buf(),
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimePoint;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("dxy-snapshot-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir.join("dxy_data.csv")
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn written_snapshot_reopens_with_manifest_and_nulls() {
        let path = scratch("reopen");
        let series = Series::from_points(vec![
            TimePoint::new(d(2023, 1, 3), Some(104.52)),
            TimePoint::new(d(2023, 1, 4), None),
        ]);
        let fetched_at = DateTime::parse_from_rfc3339("2025-04-15T12:00:00Z").unwrap().with_timezone(&Utc);

        let written = write_snapshot(&path, &series, "yahoo", "DX-Y.NYB", fetched_at).unwrap();
        assert_eq!(written.manifest.rows, 2);
        assert_eq!(written.manifest.last, Some(d(2023, 1, 4)));

        let handle = open_snapshot(&path).unwrap();
        assert_eq!(handle.manifest, written.manifest);

        let loaded = handle.load(&ColumnSpec::index()).unwrap();
        assert_eq!(loaded.series, series);
        assert_eq!(loaded.null_values, 1);

        let later = fetched_at + chrono::Duration::hours(3);
        assert_eq!(handle.age(later).num_hours(), 3);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn csv_without_manifest_is_accepted() {
        let path = scratch("bare");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "Date,DXY\n2023-01-03,104.5\n").unwrap();

        let handle = open_snapshot(&path).unwrap();
        assert_eq!(handle.manifest.source, "file");
        assert_eq!(handle.load(&ColumnSpec::index()).unwrap().rows_used, 1);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_snapshot_is_a_source_error() {
        let path = scratch("missing");
        assert!(matches!(open_snapshot(&path), Err(SourceError::Io { .. })));
    }
}
