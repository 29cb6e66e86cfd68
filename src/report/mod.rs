//! Reporting utilities: formatted summaries and preview tables.

pub mod format;

pub use format::*;
