//! Dual-axis chart drawing.
//!
//! [`draw_dual_axis`] is backend-agnostic: the PNG export runs it on
//! Plotters' bitmap backend and the TUI runs it on `plotters-ratatui-backend`.
//! The two only differ in their [`ChartTheme`].

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use plotters::coord::Shift;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use tracing::debug;

use crate::chart::{ChartBounds, ChartData, ChartStyle, date_to_x, x_to_date};
use crate::error::ExportError;

/// Renders assembled chart data to an encoded image.
///
/// Implementations only read `data`; a failed render leaves it untouched.
pub trait ChartRenderer {
    fn render(&self, data: &ChartData, style: &ChartStyle) -> Result<Vec<u8>, ExportError>;
}

/// Colors and sizing for one drawing surface.
#[derive(Debug, Clone)]
pub struct ChartTheme {
    pub background: Option<RGBColor>,
    pub foreground: RGBColor,
    pub left: RGBColor,
    pub right: RGBColor,
    pub marker: RGBColor,
    pub font_size: u32,
    pub margin: u32,
    pub y_label_area: u32,
    pub x_label_area: u32,
    pub line_width: u32,
    pub date_format: &'static str,
    pub caption: bool,
    pub legend: bool,
}

impl ChartTheme {
    /// White-background image for export.
    pub fn png() -> Self {
        Self {
            background: Some(WHITE),
            foreground: BLACK,
            left: RGBColor(220, 20, 60),  // crimson
            right: RGBColor(0, 0, 128),   // navy
            marker: BLACK,
            font_size: 16,
            margin: 16,
            y_label_area: 70,
            x_label_area: 50,
            line_width: 2,
            date_format: "%Y-%m-%d",
            caption: true,
            legend: true,
        }
    }

    /// High-contrast palette for low-resolution terminal cells.
    pub fn terminal() -> Self {
        Self {
            background: None,
            foreground: WHITE,
            left: RGBColor(255, 64, 96),
            right: RGBColor(0, 255, 255),
            marker: RGBColor(255, 255, 0),
            font_size: 10,
            margin: 1,
            y_label_area: 7,
            x_label_area: 3,
            line_width: 1,
            date_format: "%y-%m",
            caption: false,
            legend: false,
        }
    }
}

/// Draw `data` as two lines sharing the date axis: index on the left scale,
/// yield on the right scale, plus the optional marker.
///
/// Errors stay in the backend's own type so each surface can handle them its
/// own way.
pub fn draw_dual_axis<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    data: &ChartData,
    style: &ChartStyle,
    theme: &ChartTheme,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    if let Some(bg) = theme.background {
        root.fill(&bg)?;
    }

    let bounds = ChartBounds::resolve(data, style);
    let [x0, x1] = bounds.x;
    let [l0, l1] = bounds.left;
    let [r0, r1] = bounds.right;

    let fg = theme.foreground;
    let font = || ("sans-serif", theme.font_size).into_font().color(&fg);
    let fmt_date = |v: &f64| {
        x_to_date(*v)
            .map(|d| d.format(theme.date_format).to_string())
            .unwrap_or_default()
    };

    let mut builder = ChartBuilder::on(root);
    builder
        .margin(theme.margin)
        .set_label_area_size(LabelAreaPosition::Left, theme.y_label_area)
        .set_label_area_size(LabelAreaPosition::Right, theme.y_label_area)
        .set_label_area_size(LabelAreaPosition::Bottom, theme.x_label_area);
    if theme.caption {
        builder.caption(&style.title, ("sans-serif", theme.font_size + 6).into_font().color(&fg));
    }

    let mut chart = builder
        .build_cartesian_2d(x0..x1, l0..l1)?
        .set_secondary_coord(x0..x1, r0..r1);

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc(style.x_label.as_str())
        .y_desc(style.left_label.as_str())
        .x_labels(6)
        .y_labels(6)
        .x_label_formatter(&fmt_date)
        .y_label_formatter(&|v| format!("{v:.1}"))
        .label_style(font())
        .axis_desc_style(("sans-serif", theme.font_size).into_font().color(&theme.left))
        .axis_style(&fg)
        .draw()?;

    chart
        .configure_secondary_axes()
        .y_desc(style.right_label.as_str())
        .y_labels(6)
        .y_label_formatter(&|v| format!("{v:.2}"))
        .label_style(font())
        .axis_desc_style(("sans-serif", theme.font_size).into_font().color(&theme.right))
        .axis_style(&fg)
        .draw()?;

    let left_color = theme.left;
    let right_color = theme.right;

    chart
        .draw_series(LineSeries::new(data.left.xy(), left_color.stroke_width(theme.line_width)))?
        .label(style.left_label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], left_color.stroke_width(2)));

    chart
        .draw_secondary_series(LineSeries::new(data.right.xy(), right_color.stroke_width(theme.line_width)))?
        .label(style.right_label.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], right_color.stroke_width(2)));

    if let Some(marker) = &style.marker {
        let x = date_to_x(marker.date);
        if (x0..=x1).contains(&x) {
            // Dotted vertical line: short segments with equal gaps.
            const DASHES: usize = 40;
            let step = (l1 - l0) / (2 * DASHES) as f64;
            let marker_color = theme.marker;
            chart
                .draw_series((0..DASHES).map(move |i| {
                    let y = l0 + step * (2 * i) as f64;
                    PathElement::new(vec![(x, y), (x, y + step)], marker_color.stroke_width(1))
                }))?
                .label(marker.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], marker_color.stroke_width(1)));
        }
    }

    if theme.legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.85))
            .border_style(&fg)
            .label_font(font())
            .draw()?;
    }

    root.present()?;
    Ok(())
}

static SCRATCH_SEQ: AtomicUsize = AtomicUsize::new(0);

/// PNG export through Plotters' bitmap backend.
///
/// The bitmap backend encodes to a file, so rendering goes through a scratch
/// file that is read back and removed.
#[derive(Debug, Clone)]
pub struct PngRenderer {
    pub scratch_dir: PathBuf,
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl ChartRenderer for PngRenderer {
    fn render(&self, data: &ChartData, style: &ChartStyle) -> Result<Vec<u8>, ExportError> {
        let seq = SCRATCH_SEQ.fetch_add(1, Ordering::Relaxed);
        let path = self
            .scratch_dir
            .join(format!("dxy-render-{}-{seq}.png", std::process::id()));

        let drawn = {
            let root = BitMapBackend::new(&path, (style.width.max(200), style.height.max(150))).into_drawing_area();
            draw_dual_axis(&root, data, style, &ChartTheme::png()).map_err(|e| ExportError::Render(e.to_string()))
        };
        if let Err(e) = drawn {
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        let bytes = fs::read(&path).map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        let _ = fs::remove_file(&path);

        debug!(bytes = bytes.len(), points = data.len(), "rendered PNG");
        Ok(bytes)
    }
}
