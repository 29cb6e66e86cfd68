//! Remote data sources.
//!
//! Each source fetches one series for a date window. Callers do not care
//! which API sits behind it, so the pipeline works against [`SeriesSource`].

use crate::domain::{DateRange, IndexSourceKind, Series};
use crate::error::SourceError;

pub mod fred;
pub mod yahoo;

pub use fred::FredClient;
pub use yahoo::YahooClient;

/// A remote series provider.
pub trait SeriesSource {
    /// Short provider name recorded in snapshot manifests.
    fn name(&self) -> &'static str;

    /// Symbol or series id being fetched.
    fn symbol(&self) -> &str;

    /// Fetch observations dated within `window` (inclusive), sorted by date.
    fn fetch(&self, window: &DateRange) -> Result<Series, SourceError>;
}

/// Build the configured index source.
pub fn index_source(kind: IndexSourceKind, symbol: &str) -> Result<Box<dyn SeriesSource>, SourceError> {
    Ok(match kind {
        IndexSourceKind::Yahoo => Box::new(YahooClient::new(symbol)?),
        IndexSourceKind::Fred => Box::new(FredClient::from_env(symbol)?),
    })
}
