//! Ratatui-based terminal UI.
//!
//! The dashboard shows the dual-axis chart for the selected date range, a
//! preview of the merged rows, and the two date inputs. Every range change
//! goes back through [`pipeline::recompute`].

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Wrap},
};
use tracing::{info, warn};

use crate::app::pipeline::{self, AlignedResult, Inputs};
use crate::chart::{ChartRenderer, PngRenderer};
use crate::domain::{DateRange, ViewConfig};
use crate::error::{AppError, SeriesError};
use crate::io::export::{DEFAULT_CSV_NAME, DEFAULT_PNG_NAME, write_aligned_csv, write_image};

mod plotters_chart;

use plotters_chart::DualAxisChart;

const RANGE_WARNING: &str = "Start date must be before end date.";

/// Start the TUI.
pub fn run(config: ViewConfig) -> Result<(), AppError> {
    // Load before touching the terminal so input errors print normally.
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Which date input is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Start,
    End,
}

struct App {
    config: ViewConfig,
    inputs: Inputs,
    /// Index span; the date inputs are constrained to it.
    span: Option<DateRange>,
    /// Current selection. May be inverted; `result` then holds the error.
    range: DateRange,
    selected: Field,
    editing: bool,
    edit_buffer: String,
    status: String,
    result: Result<AlignedResult, SeriesError>,
    renderer: PngRenderer,
}

impl App {
    fn new(config: ViewConfig) -> Result<Self, AppError> {
        let inputs = pipeline::load_inputs(&config)?;
        Ok(Self::with_inputs(config, inputs))
    }

    fn with_inputs(config: ViewConfig, inputs: Inputs) -> Self {
        let span = inputs.index.series.span();
        let range = pipeline::resolve_range(span, config.start, config.end);
        let result = pipeline::recompute(&inputs.index.series, &inputs.yields.series, &range, config.preview_rows);
        let status = match (&result, span) {
            (Err(SeriesError::InvalidRange { .. }), _) => RANGE_WARNING.to_string(),
            (_, Some(span)) => format!("Loaded {} index rows ({span}).", inputs.index.series.len()),
            (_, None) => "Index snapshot has no usable rows.".to_string(),
        };

        Self {
            config,
            inputs,
            span,
            range,
            selected: Field::Start,
            editing: false,
            edit_buffer: String::new(),
            status,
            result,
            renderer: PngRenderer::default(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100)).map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing {
            self.handle_date_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => self.selected = Field::Start,
            KeyCode::Down => self.selected = Field::End,
            KeyCode::Left => self.step_selected(-1),
            KeyCode::Right => self.step_selected(1),
            KeyCode::Enter => {
                self.editing = true;
                self.edit_buffer = self.selected_date().to_string();
                self.status = "Editing date (YYYY-MM-DD). Enter to apply, Esc to cancel.".to_string();
            }
            KeyCode::Char('e') => self.export_png(),
            KeyCode::Char('c') => self.export_csv(),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }

        false
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing = false;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing = false;
                self.apply_date_input();
            }
            KeyCode::Backspace => {
                self.edit_buffer.pop();
            }
            KeyCode::Char(c) => {
                if (c.is_ascii_digit() || c == '-') && self.edit_buffer.len() < 10 {
                    self.edit_buffer.push(c);
                }
            }
            _ => {}
        }
    }

    fn selected_date(&self) -> NaiveDate {
        match self.selected {
            Field::Start => self.range.start,
            Field::End => self.range.end,
        }
    }

    fn apply_date_input(&mut self) {
        let trimmed = self.edit_buffer.trim();
        let date = match NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
            Ok(date) => date,
            Err(e) => {
                self.status = format!("Invalid date '{trimmed}': {e}");
                return;
            }
        };

        let requested = match self.selected {
            Field::Start => DateRange { start: date, end: self.range.end },
            Field::End => DateRange { start: self.range.start, end: date },
        };
        self.range = pipeline::resolve_range(self.span, Some(requested.start), Some(requested.end));
        self.recompute();
        let applied = self.selected_date();
        if self.result.is_ok() && applied != date {
            self.status = format!("{date} is outside the data; using {applied}.");
        }
    }

    fn step_selected(&mut self, delta: i32) {
        let current = self.selected_date();
        let stepped = if delta >= 0 {
            current.checked_add_days(Days::new(delta.unsigned_abs().into()))
        } else {
            current.checked_sub_days(Days::new(delta.unsigned_abs().into()))
        };
        let Some(stepped) = stepped else {
            return;
        };
        self.set_selected_date(self.clamp_to_span(stepped));
    }

    fn clamp_to_span(&self, date: NaiveDate) -> NaiveDate {
        match self.span {
            Some(span) => date.clamp(span.start, span.end),
            None => date,
        }
    }

    fn set_selected_date(&mut self, date: NaiveDate) {
        match self.selected {
            Field::Start => self.range.start = date,
            Field::End => self.range.end = date,
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.result = pipeline::recompute(
            &self.inputs.index.series,
            &self.inputs.yields.series,
            &self.range,
            self.config.preview_rows,
        );
        self.status = match &self.result {
            Ok(result) => format!("{}: {} aligned rows.", result.range, result.records.len()),
            Err(SeriesError::InvalidRange { .. }) => RANGE_WARNING.to_string(),
            Err(err) => err.to_string(),
        };
    }

    /// Re-read both inputs from disk, keeping the current selection.
    fn reload(&mut self) {
        let config = ViewConfig {
            refresh: None,
            ..self.config.clone()
        };
        match pipeline::load_inputs(&config) {
            Ok(inputs) => {
                self.inputs = inputs;
                self.span = self.inputs.index.series.span();
                if let Some(span) = self.span {
                    self.range = self.range.clamp_to(&span);
                }
                self.recompute();
                info!(rows = self.inputs.index.series.len(), "reloaded inputs");
                self.status = format!("Reloaded. {}", self.status);
            }
            Err(err) => {
                warn!(error = %err, "reload failed");
                self.status = format!("Reload failed: {err}");
            }
        }
    }

    fn export_png(&mut self) {
        let Ok(result) = &self.result else {
            self.status = format!("Nothing to export. {RANGE_WARNING}");
            return;
        };
        let path = self
            .config
            .export_png
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PNG_NAME));

        let written = self
            .renderer
            .render(&result.chart, &self.config.style)
            .and_then(|bytes| write_image(&path, &bytes));
        self.status = match written {
            Ok(()) => format!("Wrote chart to {}", path.display()),
            Err(err) => format!("PNG export failed: {err}"),
        };
    }

    fn export_csv(&mut self) {
        let Ok(result) = &self.result else {
            self.status = format!("Nothing to export. {RANGE_WARNING}");
            return;
        };
        let path = self
            .config
            .export_csv
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CSV_NAME));

        self.status = match write_aligned_csv(&path, &result.records) {
            Ok(()) => format!("Wrote {} rows to {}", result.records.len(), path.display()),
            Err(err) => format!("CSV export failed: {err}"),
        };
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let manifest = &self.inputs.acquisition.handle.manifest;
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("dxy", Style::default().fg(Color::Cyan)),
            Span::raw(format!(" | {}", self.config.style.title)),
        ]));

        let span = self
            .span
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(Line::from(Span::styled(
            format!(
                "index: {} via {} (fetched {}) | yield: {} | span: {span}",
                manifest.symbol,
                manifest.source,
                manifest.fetched_at.format("%Y-%m-%d %H:%M UTC"),
                self.inputs.yields.value_column,
            ),
            Style::default().fg(Color::Gray),
        )));

        if let Some(banner) = self.inputs.banner() {
            lines.push(Line::from(Span::styled(
                banner.to_string(),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )));
        }

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(area);

        self.draw_chart(frame, chunks[0]);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(0)])
            .split(chunks[1]);
        self.draw_settings(frame, side[0]);
        self.draw_preview(frame, side[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = match &self.result {
            Ok(result) if result.is_empty() => "Chart (no aligned rows in range)".to_string(),
            Ok(result) => format!("Chart ({} rows)", result.records.len()),
            Err(_) => "Chart".to_string(),
        };
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        match &self.result {
            Ok(result) => {
                let widget = DualAxisChart {
                    data: &result.chart,
                    style: &self.config.style,
                };
                frame.render_widget(widget, inner);
            }
            Err(err) => {
                let text = match err {
                    SeriesError::InvalidRange { .. } => RANGE_WARNING.to_string(),
                    other => other.to_string(),
                };
                let msg = Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .wrap(Wrap { trim: true })
                    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
                frame.render_widget(msg, inner);
            }
        }
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let date_text = |field: Field, date: NaiveDate| {
            if self.editing && self.selected == field {
                format!("{}_", self.edit_buffer)
            } else {
                date.to_string()
            }
        };

        let mut items = Vec::new();
        items.push(ListItem::new(format!("Start: {}", date_text(Field::Start, self.range.start))));
        items.push(ListItem::new(format!("End:   {}", date_text(Field::End, self.range.end))));

        let list = List::new(items)
            .block(Block::default().title("Range").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(match self.selected {
            Field::Start => 0,
            Field::End => 1,
        }));
        frame.render_stateful_widget(list, area, &mut state);

        if self.editing {
            let hint = Paragraph::new("Editing date…")
                .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
            let rect = Rect {
                x: area.x + 2,
                y: area.y + area.height.saturating_sub(2),
                width: area.width.saturating_sub(4),
                height: 1,
            };
            frame.render_widget(hint, rect);
        }
    }

    fn draw_preview(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Preview of merged data").borders(Borders::ALL);
        let preview = match &self.result {
            Ok(result) => result.chart.preview.as_slice(),
            Err(_) => &[],
        };

        let rows = preview.iter().map(|r| {
            Row::new(vec![
                Cell::from(r.date.to_string()),
                Cell::from(format!("{:.2}", r.left)),
                Cell::from(format!("{:.2}", r.right)),
            ])
        });
        let header = Row::new(vec!["date", "dxy", "yield"])
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [Constraint::Length(10), Constraint::Length(8), Constraint::Length(6)],
        )
        .header(header)
        .block(block);

        frame.render_widget(table, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ ±1 day  Enter edit  e png  c csv  r reload  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{IndexAcquisition, IndexOrigin};
    use crate::chart::ChartStyle;
    use crate::domain::{DataPaths, FetchFallback, Series, TimePoint};
    use crate::io::ingest::LoadedSeries;
    use crate::io::snapshot::{SnapshotHandle, SnapshotManifest};
    use chrono::Utc;
    use ratatui::backend::TestBackend;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn loaded(points: &[(NaiveDate, f64)], column: &str) -> LoadedSeries {
        let series = Series::from_points(points.iter().map(|&(dt, v)| TimePoint::new(dt, Some(v))).collect());
        LoadedSeries {
            rows_read: series.len(),
            rows_used: series.len(),
            series,
            date_column: "date".to_string(),
            value_column: column.to_string(),
            row_errors: Vec::new(),
            null_values: 0,
        }
    }

    fn app(start: Option<NaiveDate>, end: Option<NaiveDate>) -> App {
        let index = loaded(
            &[(d(2023, 1, 2), 104.0), (d(2023, 1, 3), 104.5), (d(2023, 1, 4), 103.9), (d(2023, 1, 5), 104.2)],
            "value",
        );
        let yields = loaded(&[(d(2023, 1, 2), 3.79), (d(2023, 1, 4), 3.69)], "dgs10");
        let fetched_at = Utc::now();
        let inputs = Inputs {
            index,
            yields,
            acquisition: IndexAcquisition {
                handle: SnapshotHandle {
                    csv_path: PathBuf::from("dxy_data.csv"),
                    manifest: SnapshotManifest {
                        source: "yahoo".to_string(),
                        symbol: "DX-Y.NYB".to_string(),
                        fetched_at,
                        first: Some(d(2023, 1, 2)),
                        last: Some(d(2023, 1, 5)),
                        rows: 4,
                    },
                },
                origin: IndexOrigin::Fresh { fetched_at },
                banner: None,
            },
        };
        let config = ViewConfig {
            paths: DataPaths {
                index_snapshot: PathBuf::from("dxy_data.csv"),
                yield_csv: PathBuf::from("dgs10_data.csv"),
            },
            index_column: None,
            yield_column: None,
            start,
            end,
            preview_rows: 5,
            style: ChartStyle::default(),
            refresh: None,
            fallback: FetchFallback::SnapshotWarn,
            export_png: None,
            export_csv: None,
        };
        App::with_inputs(config, inputs)
    }

    fn screen_text(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn starts_on_full_span() {
        let app = app(None, None);
        assert_eq!(app.range, DateRange { start: d(2023, 1, 2), end: d(2023, 1, 5) });
        assert_eq!(app.result.as_ref().unwrap().records.len(), 4);
    }

    #[test]
    fn stepping_is_clamped_to_span() {
        let mut app = app(None, None);
        app.handle_key(KeyCode::Left);
        assert_eq!(app.range.start, d(2023, 1, 2));

        app.handle_key(KeyCode::Right);
        assert_eq!(app.range.start, d(2023, 1, 3));
        // 2023-01-03 has no yield inside the range, so it drops out.
        assert_eq!(app.result.as_ref().unwrap().records.len(), 2);

        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.range.end, d(2023, 1, 5));
    }

    #[test]
    fn edited_start_after_end_shows_warning() {
        let mut app = app(None, Some(d(2023, 1, 3)));
        app.handle_key(KeyCode::Enter);
        assert!(app.editing);
        for _ in 0..10 {
            app.handle_key(KeyCode::Backspace);
        }
        for c in "2023-01-05".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        app.handle_key(KeyCode::Enter);

        assert!(!app.editing);
        assert_eq!(app.range.start, d(2023, 1, 5));
        assert!(matches!(app.result, Err(SeriesError::InvalidRange { .. })));
        assert_eq!(app.status, RANGE_WARNING);
        assert!(screen_text(&app).contains(RANGE_WARNING));
    }

    #[test]
    fn start_typed_past_the_span_is_not_folded_into_range() {
        let mut app = app(None, None);
        app.handle_key(KeyCode::Enter);
        app.edit_buffer = "2030-01-01".to_string();
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.range.start, d(2030, 1, 1));
        assert!(matches!(app.result, Err(SeriesError::InvalidRange { .. })));
        assert_eq!(app.status, RANGE_WARNING);
    }

    #[test]
    fn end_typed_past_the_span_is_clamped() {
        let mut app = app(None, Some(d(2023, 1, 3)));
        app.handle_key(KeyCode::Down);
        app.handle_key(KeyCode::Enter);
        app.edit_buffer = "2030-01-01".to_string();
        app.handle_key(KeyCode::Enter);

        assert_eq!(app.range.end, d(2023, 1, 5));
        assert!(app.result.is_ok());
        assert!(app.status.contains("outside the data"));
    }

    #[test]
    fn bad_date_input_keeps_range() {
        let mut app = app(None, None);
        let before = app.range;
        app.handle_key(KeyCode::Enter);
        app.handle_key(KeyCode::Backspace);
        app.handle_key(KeyCode::Enter);
        assert_eq!(app.range, before);
        assert!(app.status.starts_with("Invalid date"));
    }

    #[test]
    fn export_refused_for_invalid_range() {
        let mut app = app(Some(d(2023, 1, 5)), Some(d(2023, 1, 2)));
        app.handle_key(KeyCode::Char('c'));
        assert!(app.status.starts_with("Nothing to export"));
    }

    #[test]
    fn quit_keys_exit() {
        let mut app = app(None, None);
        assert!(!app.handle_key(KeyCode::Char('x')));
        assert!(app.handle_key(KeyCode::Char('q')));
    }
}
