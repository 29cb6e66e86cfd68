//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - series primitives (`TimePoint`, `Series`, `DateRange`)
//! - aligned output rows (`AlignedRecord`)
//! - run configuration (`ViewConfig`, `RefreshConfig`, `FetchFallback`)

pub mod types;

pub use types::*;
