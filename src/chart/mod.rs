//! Plot-ready data and presentation settings.
//!
//! [`assemble`] only reshapes aligned records: no scaling, no smoothing. Axis
//! limits and styling are presentation concerns and live in [`ChartStyle`],
//! consumed by the renderers in [`render`].

use chrono::{Datelike, NaiveDate};

use crate::domain::{AlignedRecord, Marker};

pub mod render;

pub use render::{ChartRenderer, ChartTheme, PngRenderer, draw_dual_axis};

/// Number of head rows shown in the preview table by default.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// One axis' worth of points, as parallel arrays.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl AxisSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// `(x, y)` pairs with dates mapped through [`date_to_x`].
    pub fn xy(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.dates.iter().zip(&self.values).map(|(&d, &v)| (date_to_x(d), v))
    }

    /// `(min, max)` of the values, or `None` when empty.
    pub fn value_bounds(&self) -> Option<(f64, f64)> {
        if self.values.is_empty() {
            return None;
        }
        let min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }
}

/// Plotting-ready table: head preview plus one series per axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    pub preview: Vec<AlignedRecord>,
    /// Index values (left axis).
    pub left: AxisSeries,
    /// Yield values (right axis).
    pub right: AxisSeries,
}

impl ChartData {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((*self.left.dates.first()?, *self.left.dates.last()?))
    }
}

/// Split aligned records into the preview and the two axis series.
pub fn assemble(records: &[AlignedRecord], preview_rows: usize) -> ChartData {
    let preview = records.iter().take(preview_rows).copied().collect();

    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    let left = AxisSeries {
        dates: dates.clone(),
        values: records.iter().map(|r| r.left).collect(),
    };
    let right = AxisSeries {
        dates,
        values: records.iter().map(|r| r.right).collect(),
    };

    ChartData { preview, left, right }
}

/// Presentation settings shared by the terminal chart and the PNG export.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartStyle {
    pub title: String,
    pub x_label: String,
    pub left_label: String,
    pub right_label: String,
    /// Fixed left-axis limits; `None` means fit to the data.
    pub left_limits: Option<(f64, f64)>,
    pub right_limits: Option<(f64, f64)>,
    pub marker: Option<Marker>,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            title: "US Dollar Index vs 10-Year Treasury Yield".to_string(),
            x_label: "Date".to_string(),
            left_label: "US Dollar Index".to_string(),
            right_label: "10-Year Yield (%)".to_string(),
            left_limits: None,
            right_limits: None,
            marker: Some(Marker::liberation_day()),
            width: 1200,
            height: 600,
        }
    }
}

/// Resolved axis ranges for one draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBounds {
    pub x: [f64; 2],
    pub left: [f64; 2],
    pub right: [f64; 2],
}

impl ChartBounds {
    pub fn resolve(data: &ChartData, style: &ChartStyle) -> Self {
        let x = match data.date_span() {
            Some((a, b)) if b > a => [date_to_x(a), date_to_x(b)],
            Some((a, _)) => [date_to_x(a) - 1.0, date_to_x(a) + 1.0],
            None => [0.0, 1.0],
        };
        Self {
            x,
            left: axis_range(style.left_limits, data.left.value_bounds()),
            right: axis_range(style.right_limits, data.right.value_bounds()),
        }
    }
}

fn axis_range(fixed: Option<(f64, f64)>, data: Option<(f64, f64)>) -> [f64; 2] {
    if let Some((lo, hi)) = fixed.filter(|(lo, hi)| lo.is_finite() && hi.is_finite() && hi > lo) {
        return [lo, hi];
    }
    match data {
        Some((lo, hi)) if lo.is_finite() && hi.is_finite() && hi > lo => {
            let pad = (hi - lo) * 0.05;
            [lo - pad, hi + pad]
        }
        Some((v, _)) if v.is_finite() => [v - 0.5, v + 0.5],
        _ => [0.0, 1.0],
    }
}

/// Map a date onto the chart's numeric x axis (days since the common era).
pub fn date_to_x(date: NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce())
}

/// Inverse of [`date_to_x`], rounding to the nearest day.
pub fn x_to_date(x: f64) -> Option<NaiveDate> {
    if !x.is_finite() {
        return None;
    }
    NaiveDate::from_num_days_from_ce_opt(x.round() as i32)
}
