//! Closed-interval date filter.

use crate::domain::{DateRange, Series};
use crate::error::SeriesError;

/// Keep exactly the points with `range.start <= date <= range.end`, in order.
///
/// An empty result is valid. `range.start > range.end` is rejected before any
/// point is looked at.
pub fn filter(series: &Series, range: &DateRange) -> Result<Series, SeriesError> {
    range.validate()?;
    let points = series
        .iter()
        .filter(|p| range.contains(p.date))
        .copied()
        .collect();
    Ok(Series::from_points(points))
}
