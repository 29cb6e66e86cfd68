//! Command-line parsing for the DXY vs 10-year yield dashboard.
//!
//! The goal of this module is to keep **argument parsing** separate from
//! loading, alignment, and rendering.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::data::fred::SERIES_DGS10;
use crate::domain::{FetchFallback, IndexSourceKind, Marker};
use crate::io::export::DEFAULT_PNG_NAME;

/// Default index snapshot location.
pub const DEFAULT_SNAPSHOT: &str = "dxy_data.csv";
/// Default local yield file (FRED download format).
pub const DEFAULT_YIELD_FILE: &str = "dgs10_data.csv";

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "dxy", version, about = "US Dollar Index vs 10-Year Treasury Yield")]
pub struct Cli {
    /// More log output (debug level) on stderr. `RUST_LOG` overrides.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch the index and write a new snapshot (optionally refresh the yield file).
    Refresh(RefreshArgs),
    /// Print the summary and preview table, and write requested exports.
    Show(ShowArgs),
    /// Launch the interactive dashboard.
    ///
    /// Uses the same load -> filter -> align pipeline as `dxy show`, but lets
    /// the date range be changed live.
    Tui(ViewArgs),
}

/// Where and how to fetch the index.
#[derive(Debug, Args, Clone)]
pub struct SourceArgs {
    /// Index provider.
    #[arg(long, value_enum, default_value_t = IndexSourceKind::Yahoo)]
    pub source: IndexSourceKind,

    /// Symbol or series id (default depends on `--source`).
    #[arg(long)]
    pub symbol: Option<String>,

    /// First date to fetch.
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_day, default_value = "2023-01-01")]
    pub from: NaiveDate,

    /// Last date to fetch (default: today).
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_day)]
    pub to: Option<NaiveDate>,
}

/// Options for `dxy refresh`.
#[derive(Debug, Args, Clone)]
pub struct RefreshArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Snapshot CSV to write (the manifest is written next to it).
    #[arg(long, default_value = DEFAULT_SNAPSHOT)]
    pub snapshot: PathBuf,

    /// Also refresh the local yield file from this FRED series (needs `FRED_API_KEY`).
    #[arg(long, value_name = "SERIES_ID", num_args = 0..=1, default_missing_value = SERIES_DGS10)]
    pub yield_series: Option<String>,

    /// Local yield file written by `--yield-series`.
    #[arg(long, default_value = DEFAULT_YIELD_FILE)]
    pub yield_file: PathBuf,
}

/// Options shared by `show` and `tui`.
#[derive(Debug, Args, Clone)]
pub struct ViewArgs {
    /// Index snapshot CSV.
    #[arg(long, default_value = DEFAULT_SNAPSHOT)]
    pub snapshot: PathBuf,

    /// Local yield CSV.
    #[arg(long, default_value = DEFAULT_YIELD_FILE)]
    pub yield_file: PathBuf,

    /// Index value column (default: first of dxy, close, value).
    #[arg(long)]
    pub index_column: Option<String>,

    /// Yield value column (default: first of dgs10, yield, value).
    #[arg(long)]
    pub yield_column: Option<String>,

    /// Range start (default: first index date).
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_day)]
    pub start: Option<NaiveDate>,

    /// Range end (default: last index date).
    #[arg(long, value_name = "YYYY-MM-DD", value_parser = parse_day)]
    pub end: Option<NaiveDate>,

    /// Rows shown in the preview table.
    #[arg(long, default_value_t = crate::chart::DEFAULT_PREVIEW_ROWS)]
    pub preview: usize,

    /// Fixed left (index) axis limits.
    #[arg(long, value_name = "MIN,MAX", value_parser = parse_limits)]
    pub left_limits: Option<(f64, f64)>,

    /// Fixed right (yield) axis limits.
    #[arg(long, value_name = "MIN,MAX", value_parser = parse_limits)]
    pub right_limits: Option<(f64, f64)>,

    /// Vertical marker (default: 2025-03-01 'Liberation Day').
    #[arg(long, value_name = "DATE[:LABEL]", value_parser = parse_marker)]
    pub marker: Option<Marker>,

    /// Do not draw a marker.
    #[arg(long, conflicts_with = "marker")]
    pub no_marker: bool,

    /// Fetch the index and write a new snapshot before viewing.
    #[arg(long)]
    pub refresh: bool,

    /// What to do when `--refresh` fails.
    #[arg(long, value_enum, default_value_t = FetchFallback::SnapshotWarn)]
    pub on_fetch_failure: FetchFallback,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Options for `dxy show`.
#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    #[command(flatten)]
    pub view: ViewArgs,

    /// Write the chart as PNG.
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = DEFAULT_PNG_NAME)]
    pub png: Option<PathBuf>,

    /// Write the aligned table as CSV.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

/// Parse `MIN,MAX` axis limits.
pub fn parse_limits(s: &str) -> Result<(f64, f64), String> {
    let (lo, hi) = s
        .split_once(',')
        .ok_or_else(|| format!("expected MIN,MAX, got '{s}'"))?;
    let lo: f64 = lo.trim().parse().map_err(|e| format!("bad MIN '{lo}': {e}"))?;
    let hi: f64 = hi.trim().parse().map_err(|e| format!("bad MAX '{hi}': {e}"))?;
    if !lo.is_finite() || !hi.is_finite() || lo >= hi {
        return Err(format!("limits must be finite with MIN < MAX, got {lo},{hi}"));
    }
    Ok((lo, hi))
}

/// Parse `DATE[:LABEL]`. Without a label the date itself is used.
pub fn parse_marker(s: &str) -> Result<Marker, String> {
    let (date, label) = match s.split_once(':') {
        Some((date, label)) => (date, label.trim()),
        None => (s, ""),
    };
    let date = parse_day(date)?;
    let label = if label.is_empty() { date.to_string() } else { label.to_string() };
    Ok(Marker { date, label })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_parse_and_validate() {
        assert_eq!(parse_limits("95, 110").unwrap(), (95.0, 110.0));
        assert!(parse_limits("110,95").is_err());
        assert!(parse_limits("95").is_err());
        assert!(parse_limits("a,b").is_err());
    }

    #[test]
    fn marker_label_is_optional() {
        let m = parse_marker("2025-04-02:Tariffs").unwrap();
        assert_eq!(m.date, NaiveDate::from_ymd_opt(2025, 4, 2).unwrap());
        assert_eq!(m.label, "Tariffs");

        assert_eq!(parse_marker("2025-04-02").unwrap().label, "2025-04-02");
        assert!(parse_marker("April:x").is_err());
    }

    #[test]
    fn png_flag_defaults_filename() {
        let cli = Cli::parse_from(["dxy", "show", "--png"]);
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.png, Some(PathBuf::from(DEFAULT_PNG_NAME)));

        let cli = Cli::parse_from(["dxy", "show", "--png", "out.png", "--start", "2024-01-01"]);
        let Command::Show(args) = cli.command else {
            panic!("expected show");
        };
        assert_eq!(args.png, Some(PathBuf::from("out.png")));
        assert_eq!(args.view.start, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn yield_series_flag_defaults_to_dgs10() {
        let cli = Cli::parse_from(["dxy", "refresh", "--yield-series"]);
        let Command::Refresh(args) = cli.command else {
            panic!("expected refresh");
        };
        assert_eq!(args.yield_series.as_deref(), Some("DGS10"));

        let cli = Cli::parse_from(["dxy", "refresh"]);
        let Command::Refresh(args) = cli.command else {
            panic!("expected refresh");
        };
        assert_eq!(args.yield_series, None);
    }

    #[test]
    fn marker_flags_conflict() {
        let parsed = Cli::try_parse_from(["dxy", "tui", "--marker", "2025-01-01", "--no-marker"]);
        assert!(parsed.is_err());
    }
}
