//! Plotters-powered dual-axis chart widget for Ratatui.
//!
//! Drawing goes through the same [`draw_dual_axis`] routine the PNG export
//! uses, rendered into the Ratatui buffer via `plotters-ratatui-backend`.

use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::chart::{ChartData, ChartStyle, ChartTheme, draw_dual_axis};

/// Render-only chart description; all data is assembled outside `render()`.
pub struct DualAxisChart<'a> {
    pub data: &'a ChartData,
    pub style: &'a ChartStyle,
}

impl<'a> Widget for DualAxisChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area; show a hint
        // instead.
        if area.width < 30 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let data = self.data;
        let style = self.style;
        let theme = ChartTheme::terminal();
        let widget = widget_fn(move |root| draw_dual_axis(&root, data, style, &theme));

        widget.render(area, buf);
    }
}
