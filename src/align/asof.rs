//! Backward as-of join of two date-sorted series.
//!
//! For each left point we take the latest right point dated on or before it.
//! Both inputs are walked once with a cursor over `right` that only moves
//! forward, so the join is linear in `left.len() + right.len()`.

use crate::domain::{AlignedRecord, Series, TimePoint};
use crate::error::SeriesError;

/// Pair each left point with the nearest prior (or same-day) right point.
///
/// Rules:
/// - left points dated before every right point are dropped (inner join)
/// - a missing value on either side drops the record
/// - among right points sharing the winning date, the last one in input order wins
/// - output follows left order
///
/// Unsorted input is rejected with [`SeriesError::Unsorted`].
pub fn align(left: &Series, right: &Series) -> Result<Vec<AlignedRecord>, SeriesError> {
    left.ensure_sorted("left")?;
    right.ensure_sorted("right")?;

    let right = right.points();
    let mut out = Vec::with_capacity(left.len());
    let mut cursor = 0usize;
    let mut matched: Option<&TimePoint> = None;

    for l in left {
        // Advance past every right point not after `l`; the last one visited is
        // the match (latest date, last duplicate).
        while let Some(r) = right.get(cursor) {
            if r.date > l.date {
                break;
            }
            matched = Some(r);
            cursor += 1;
        }

        let Some(r) = matched else {
            continue;
        };
        let (Some(left_value), Some(right_value)) = (l.value, r.value) else {
            continue;
        };

        out.push(AlignedRecord {
            date: l.date,
            left: left_value,
            right: right_value,
            right_date: r.date,
        });
    }

    Ok(out)
}
