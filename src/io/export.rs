//! Export the aligned table to CSV and rendered images to disk.
//!
//! The CSV is meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::{AlignedRecord, Series};
use crate::error::ExportError;

/// Default filename offered for the chart image download.
pub const DEFAULT_PNG_NAME: &str = "dxy_vs_yield.png";
/// Default filename for the aligned table export.
pub const DEFAULT_CSV_NAME: &str = "dxy_vs_yield.csv";

/// Write aligned records as `date,dxy,yield,yield_date`.
pub fn write_aligned_csv(path: &Path, records: &[AlignedRecord]) -> Result<(), ExportError> {
    let io_err = |e: csv::Error| ExportError::Io {
        path: path.to_path_buf(),
        source: e.into(),
    };

    let mut writer = csv::Writer::from_path(path).map_err(io_err)?;
    writer
        .write_record(["date", "dxy", "yield", "yield_date"])
        .map_err(io_err)?;
    for r in records {
        writer
            .write_record([
                r.date.to_string(),
                format!("{:.4}", r.left),
                format!("{:.4}", r.right),
                r.right_date.to_string(),
            ])
            .map_err(io_err)?;
    }
    writer.flush().map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), rows = records.len(), "wrote aligned CSV");
    Ok(())
}

/// Write a series as a two-column CSV with the given headers.
///
/// Null values are written as empty fields so they read back as null.
pub fn write_series_csv(path: &Path, series: &Series, date_header: &str, value_header: &str) -> csv::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([date_header, value_header])?;
    for p in series {
        let value = p.value.map(|v| v.to_string()).unwrap_or_default();
        writer.write_record([p.date.to_string(), value])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a rendered image artifact.
pub fn write_image(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    fs::write(path, bytes).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote chart image");
    Ok(())
}
