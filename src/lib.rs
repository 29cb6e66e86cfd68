//! `dxy-yield` library crate.
//!
//! The binary (`dxy`) is a thin wrapper around this library so that:
//!
//! - the alignment core is testable without spawning processes
//! - the CLI and the TUI share one load -> filter -> align -> assemble pipeline

pub mod align;
pub mod app;
pub mod chart;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod tui;
