//! Error types.
//!
//! The core (`align`, `chart`) speaks in small typed errors; the application
//! edge folds everything into [`AppError`], which carries the process exit code.
//!
//! Exit codes:
//! - `2` input/config problems (missing files, missing columns, unsorted series, bad flags)
//! - `3` invalid date range
//! - `4` data source unavailable (network, API, snapshot)
//! - `5` export failure

use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the alignment core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    /// The requested range has its start after its end.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// A series handed to the aligner is not sorted ascending by date.
    #[error("{series} series is not sorted by date (first out-of-order point at index {index})")]
    Unsorted { series: &'static str, index: usize },
}

/// Failures acquiring a series from a file, snapshot, or remote API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column: expected one of {expected:?}")]
    MissingColumn { expected: Vec<String> },

    #[error("request failed: {0}")]
    Http(String),

    #[error("request failed with status {0}")]
    Status(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("no observations returned for {0}")]
    Empty(String),

    #[error("missing credentials: {0}")]
    Credentials(String),

    #[error("invalid snapshot manifest '{}': {message}", path.display())]
    Manifest { path: PathBuf, message: String },
}

/// Failures rendering or writing an export artifact.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("failed to write '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Application-level error with an exit code.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<SeriesError> for AppError {
    fn from(err: SeriesError) -> Self {
        match err {
            SeriesError::InvalidRange { .. } => AppError::new(3, err.to_string()),
            SeriesError::Unsorted { .. } => AppError::new(2, err.to_string()),
        }
    }
}

impl From<SourceError> for AppError {
    fn from(err: SourceError) -> Self {
        let code = match err {
            SourceError::Io { .. } | SourceError::Csv(_) | SourceError::MissingColumn { .. } => 2,
            _ => 4,
        };
        AppError::new(code, format!("Source unavailable: {err}"))
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::new(5, format!("Export failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let d = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let range: AppError = SeriesError::InvalidRange { start: d, end: d }.into();
        assert_eq!(range.exit_code(), 3);

        let unsorted: AppError = SeriesError::Unsorted { series: "left", index: 1 }.into();
        assert_eq!(unsorted.exit_code(), 2);

        let missing: AppError = SourceError::MissingColumn { expected: vec!["date".into()] }.into();
        assert_eq!(missing.exit_code(), 2);

        let network: AppError = SourceError::Status(503).into();
        assert_eq!(network.exit_code(), 4);
        assert!(network.to_string().contains("503"));

        let export: AppError = ExportError::Render("no font".into()).into();
        assert_eq!(export.exit_code(), 5);
    }
}
