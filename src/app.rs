//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - refreshes the index snapshot (and optionally the yield file)
//! - runs load -> filter -> align -> assemble
//! - prints the summary/preview and writes optional exports

use std::io::IsTerminal;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::chart::{ChartRenderer, ChartStyle, PngRenderer};
use crate::cli::{Command, RefreshArgs, ShowArgs, SourceArgs, ViewArgs};
use crate::data::{FredClient, SeriesSource};
use crate::domain::{DataPaths, DateRange, RefreshConfig, ViewConfig};
use crate::error::{AppError, SeriesError, SourceError};
use crate::io::export::{write_aligned_csv, write_image, write_series_csv};
use crate::io::snapshot::write_snapshot;

pub mod pipeline;

/// Entry point for the `dxy` binary.
pub fn run() -> Result<(), AppError> {
    // We want `dxy` and `dxy --start 2024-01-01` to behave like `dxy tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let interactive = matches!(cli.command, Command::Tui(_));
    init_tracing(cli.verbose, interactive);

    match cli.command {
        Command::Refresh(args) => handle_refresh(args),
        Command::Show(args) => handle_show(args),
        Command::Tui(args) => handle_tui(args),
    }
}

/// Install the stderr subscriber.
///
/// The dashboard owns the terminal, so in interactive mode nothing is
/// installed unless `RUST_LOG` asks for it.
fn init_tracing(verbose: bool, interactive: bool) {
    let from_env = EnvFilter::try_from_default_env().ok();
    if interactive && from_env.is_none() {
        return;
    }

    let default_level = if verbose { "debug" } else { "info" };
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

fn handle_refresh(args: RefreshArgs) -> Result<(), AppError> {
    let config = refresh_config_from_args(&args.source, today())?;
    info!(source = config.source.as_str(), symbol = %config.symbol, window = %config.window, "refreshing index");

    let fetched = pipeline::fetch_index(&config)?;
    let handle = write_snapshot(
        &args.snapshot,
        &fetched.series,
        &fetched.source,
        &fetched.symbol,
        fetched.fetched_at,
    )?;
    println!(
        "Wrote {} rows of {} ({}) to {}",
        handle.manifest.rows,
        handle.manifest.symbol,
        handle.manifest.source,
        handle.csv_path.display()
    );

    if let Some(series_id) = &args.yield_series {
        let client = FredClient::from_env(series_id.as_str())?;
        let series = client.fetch(&config.window)?;
        write_series_csv(&args.yield_file, &series, "observation_date", series_id).map_err(SourceError::from)?;
        println!(
            "Wrote {} rows of {series_id} (fred) to {}",
            series.len(),
            args.yield_file.display()
        );
    }

    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let config = view_config_from_args(&args.view, today())?;
    let config = ViewConfig {
        export_png: args.png.clone(),
        export_csv: args.csv.clone(),
        ..config
    };

    let inputs = pipeline::load_inputs(&config)?;
    if let Some(banner) = inputs.banner() {
        eprintln!("Warning: {banner}");
    }

    let range = pipeline::resolve_range(inputs.index.series.span(), config.start, config.end);
    let result = match pipeline::recompute(&inputs.index.series, &inputs.yields.series, &range, config.preview_rows) {
        Ok(result) => result,
        Err(err @ SeriesError::InvalidRange { .. }) => {
            eprintln!("Warning: Start date must be before end date.");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    println!("{}", crate::report::format_run_summary(&inputs, &result));
    println!("{}", crate::report::format_preview(&result.chart.preview));

    // Exports run after the report so a failed write never hides the output.
    let mut first_failure: Option<AppError> = None;

    if let Some(path) = &config.export_csv {
        match write_aligned_csv(path, &result.records) {
            Ok(()) => println!("Wrote aligned CSV to {}", path.display()),
            Err(e) => {
                eprintln!("CSV export failed: {e}");
                first_failure.get_or_insert(e.into());
            }
        }
    }
    if let Some(path) = &config.export_png {
        let written = PngRenderer::default()
            .render(&result.chart, &config.style)
            .and_then(|bytes| write_image(path, &bytes));
        match written {
            Ok(()) => println!("Wrote chart to {}", path.display()),
            Err(e) => {
                eprintln!("PNG export failed: {e}");
                first_failure.get_or_insert(e.into());
            }
        }
    }

    match first_failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_tui(args: ViewArgs) -> Result<(), AppError> {
    let config = view_config_from_args(&args, today())?;
    crate::tui::run(config)
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Resolve source flags into a download window ending at `to` (or `today`).
pub fn refresh_config_from_args(args: &SourceArgs, today: NaiveDate) -> Result<RefreshConfig, AppError> {
    let window = DateRange::new(args.from, args.to.unwrap_or(today))?;
    let symbol = args
        .symbol
        .clone()
        .unwrap_or_else(|| args.source.default_symbol().to_string());
    Ok(RefreshConfig {
        source: args.source,
        symbol,
        window,
    })
}

pub fn view_config_from_args(args: &ViewArgs, today: NaiveDate) -> Result<ViewConfig, AppError> {
    let refresh = if args.refresh {
        Some(refresh_config_from_args(&args.source, today)?)
    } else {
        None
    };

    let defaults = ChartStyle::default();
    let marker = if args.no_marker {
        None
    } else {
        args.marker.clone().or(defaults.marker.clone())
    };
    let style = ChartStyle {
        left_limits: args.left_limits,
        right_limits: args.right_limits,
        marker,
        ..defaults
    };

    if let (Some(start), Some(end)) = (args.start, args.end) {
        if start > end {
            warn!(%start, %end, "requested start is after end");
        }
    }

    Ok(ViewConfig {
        paths: DataPaths {
            index_snapshot: args.snapshot.clone(),
            yield_csv: args.yield_file.clone(),
        },
        index_column: args.index_column.clone(),
        yield_column: args.yield_column.clone(),
        start: args.start,
        end: args.end,
        preview_rows: args.preview,
        style,
        refresh,
        fallback: args.on_fetch_failure,
        export_png: None,
        export_csv: None,
    })
}

/// Rewrite argv so `dxy` defaults to `dxy tui`.
///
/// Rules:
/// - `dxy`                      -> `dxy tui`
/// - `dxy --start D ...`        -> `dxy tui --start D ...`
/// - `dxy --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "refresh" | "show" | "tui");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::domain::{FetchFallback, IndexSourceKind};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn view_args(args: &[&str]) -> ViewArgs {
        match Cli::parse_from(rewrite_args(argv(args))).command {
            Command::Tui(args) => args,
            other => panic!("expected tui, got {other:?}"),
        }
    }

    #[test]
    fn bare_invocation_and_flags_default_to_tui() {
        assert_eq!(rewrite_args(argv(&["dxy"])), argv(&["dxy", "tui"]));
        assert_eq!(
            rewrite_args(argv(&["dxy", "--start", "2024-01-01"])),
            argv(&["dxy", "tui", "--start", "2024-01-01"])
        );
        assert_eq!(rewrite_args(argv(&["dxy", "show"])), argv(&["dxy", "show"]));
        assert_eq!(rewrite_args(argv(&["dxy", "--help"])), argv(&["dxy", "--help"]));
    }

    #[test]
    fn view_config_carries_flags() {
        let args = view_args(&[
            "dxy",
            "--start",
            "2024-01-01",
            "--left-limits",
            "95,110",
            "--no-marker",
            "--on-fetch-failure",
            "fail",
        ]);
        let config = view_config_from_args(&args, d(2025, 4, 15)).unwrap();

        assert_eq!(config.start, Some(d(2024, 1, 1)));
        assert_eq!(config.end, None);
        assert_eq!(config.style.left_limits, Some((95.0, 110.0)));
        assert_eq!(config.style.marker, None);
        assert_eq!(config.fallback, FetchFallback::Fail);
        assert!(config.refresh.is_none());
        assert_eq!(config.paths.index_snapshot, std::path::PathBuf::from("dxy_data.csv"));
    }

    #[test]
    fn default_marker_is_kept() {
        let config = view_config_from_args(&view_args(&["dxy"]), d(2025, 4, 15)).unwrap();
        assert_eq!(config.style.marker, ChartStyle::default().marker);
        assert_eq!(config.fallback, FetchFallback::SnapshotWarn);
    }

    #[test]
    fn refresh_window_ends_today_by_default() {
        let args = view_args(&["dxy", "--refresh", "--source", "fred"]);
        let config = view_config_from_args(&args, d(2025, 4, 15)).unwrap();
        let refresh = config.refresh.unwrap();

        assert_eq!(refresh.source, IndexSourceKind::Fred);
        assert_eq!(refresh.symbol, "DTWEXBGS");
        assert_eq!(refresh.window, DateRange { start: d(2023, 1, 1), end: d(2025, 4, 15) });
    }

    #[test]
    fn inverted_fetch_window_is_a_range_error() {
        let args = view_args(&["dxy", "--refresh", "--from", "2025-05-01", "--to", "2025-01-01"]);
        let err = view_config_from_args(&args, d(2025, 6, 1)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
