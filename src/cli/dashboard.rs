use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table, Tabs,
    },
    Frame,
};

use crate::cli::Session;
use crate::error::Result;
use crate::export::write_export;
use crate::filter::{filter, FilterState};
use crate::fmt::{compact, number, ratio};
use crate::loader;
use crate::models::{Dimension, Table as Campaigns};
use crate::pages::{self, Orientation, Page, PageView, ScatterPoint, Widget};
use crate::settings::InitialDateRange;
use crate::tui::{
    metric_span, run_screen, series_color, truncate, Screen, ScreenAction, ACTIVE_TAB_STYLE,
    FOOTER_STYLE, HEADER_STYLE, SELECTED_STYLE, TITLE_STYLE,
};

const SIDEBAR_WIDTH: u16 = 34;

/// Sidebar section 0 is the date range; section `i > 0` is `Dimension::SIDEBAR[i - 1]`.
const DATE_SECTION: usize = 0;

pub struct Dashboard {
    table: Arc<Campaigns>,
    data_path: PathBuf,
    export_dir: PathBuf,
    initial: InitialDateRange,
    state: FilterState,
    options: Vec<Vec<String>>,
    page: Page,
    section: usize,
    cursors: Vec<usize>,
    view: Option<PageView>,
    filtered_rows: usize,
    table_offset: usize,
    table_visible: usize,
    status_message: Option<String>,
}

impl Dashboard {
    pub fn new(
        table: Arc<Campaigns>,
        data_path: PathBuf,
        export_dir: PathBuf,
        initial: InitialDateRange,
        page: Page,
    ) -> Self {
        let mut dashboard = Self {
            state: initial_state(&table, initial),
            options: sidebar_options(&table),
            table,
            data_path,
            export_dir,
            initial,
            page,
            section: DATE_SECTION,
            cursors: vec![0; Dimension::SIDEBAR.len()],
            view: None,
            filtered_rows: 0,
            table_offset: 0,
            table_visible: 20,
            status_message: None,
        };
        dashboard.recompute();
        dashboard
    }

    /// Re-run filter and the active page renderer. Called after every interaction.
    fn recompute(&mut self) {
        let filtered = filter(&self.table, &self.state);
        self.filtered_rows = filtered.len();
        match pages::render(self.page, &filtered) {
            Ok(view) => self.view = Some(view),
            Err(e) => {
                self.view = None;
                self.status_message = Some(format!("Could not render page: {e}"));
            }
        }
        let max = self.table_len().saturating_sub(self.table_visible);
        self.table_offset = self.table_offset.min(max);
    }

    fn table_len(&self) -> usize {
        self.view
            .as_ref()
            .and_then(|v| {
                v.widgets.iter().find_map(|w| match w {
                    Widget::Table { rows, .. } => Some(rows.len()),
                    _ => None,
                })
            })
            .unwrap_or(0)
    }

    fn focused_dimension(&self) -> Option<(usize, Dimension)> {
        if self.section == DATE_SECTION {
            None
        } else {
            let idx = self.section - 1;
            Dimension::SIDEBAR.get(idx).map(|d| (idx, *d))
        }
    }

    fn set_page(&mut self, page: Page) {
        self.page = page;
        self.table_offset = 0;
    }

    fn shift_start(&mut self, forward: bool) {
        let d = self.state.date_range.start;
        self.state.date_range.start = if forward {
            d.succ_opt().unwrap_or(d)
        } else {
            d.pred_opt().unwrap_or(d)
        };
    }

    fn shift_end(&mut self, forward: bool) {
        let d = self.state.date_range.end;
        self.state.date_range.end = if forward {
            d.succ_opt().unwrap_or(d)
        } else {
            d.pred_opt().unwrap_or(d)
        };
    }

    fn toggle_at_cursor(&mut self) {
        if let Some((idx, dim)) = self.focused_dimension() {
            if let Some(value) = self.options[idx].get(self.cursors[idx]).cloned() {
                self.state.toggle(dim, &value);
            }
        }
    }

    fn select_all(&mut self) {
        match self.focused_dimension() {
            Some((idx, dim)) => self.state.select(dim, self.options[idx].clone()),
            None => {
                if let Some((min, max)) = self.table.date_bounds() {
                    self.state.date_range = crate::filter::DateRange::new(min, max);
                }
            }
        }
    }

    fn select_none(&mut self) {
        if let Some((_, dim)) = self.focused_dimension() {
            self.state.select(dim, Vec::<String>::new());
        }
    }

    fn export(&mut self) {
        let target = self
            .view
            .as_ref()
            .and_then(|v| v.download())
            .map(|(name, data)| (name.to_string(), data.to_string()));
        self.status_message = Some(match target {
            None => "Export is available on the Campaign Deep Dive page.".to_string(),
            Some((name, data)) => match write_export(&data, &self.export_dir, &name) {
                Ok(path) => format!("Saved {} campaigns to {}", self.filtered_rows, path.display()),
                Err(e) => format!("Export failed: {e}"),
            },
        });
    }

    fn reload(&mut self) {
        loader::clear_cache();
        match loader::load(&self.data_path) {
            Ok(table) => {
                self.state = initial_state(&table, self.initial);
                self.options = sidebar_options(&table);
                self.cursors = vec![0; Dimension::SIDEBAR.len()];
                self.table = table;
                self.status_message = Some(format!("Reloaded {}", self.data_path.display()));
            }
            Err(e) => self.status_message = Some(format!("Reload failed: {e}")),
        }
    }

    // -----------------------------------------------------------------------
    // Drawing
    // -----------------------------------------------------------------------

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(
            Paragraph::new(format!(
                " Marketing Campaign Dashboard \u{2014} {} of {} campaigns",
                number(self.filtered_rows as f64),
                number(self.table.len() as f64)
            ))
            .style(HEADER_STYLE),
            area,
        );
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<String> = Page::ALL
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{} {}", i + 1, p.title()))
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.page.index())
            .style(FOOTER_STYLE)
            .highlight_style(ACTIVE_TAB_STYLE)
            .divider(" ");
        frame.render_widget(tabs, area);
    }

    fn draw_sidebar(&self, frame: &mut Frame, area: Rect) {
        let text_width = SIDEBAR_WIDTH.saturating_sub(8) as usize;
        let mut lines: Vec<Line> = vec![Line::from(Span::styled(" Filters", TITLE_STYLE)), Line::from("")];
        let mut focus_line = 0usize;

        let marker = |focused: bool| if focused { "\u{25b8} " } else { "  " };

        let date_focused = self.section == DATE_SECTION;
        if date_focused {
            focus_line = lines.len();
        }
        lines.push(Line::from(Span::styled(
            format!("{}Date Range", marker(date_focused)),
            TITLE_STYLE,
        )));
        lines.push(Line::from(format!(
            "   {} \u{2192} {}",
            self.state.date_range.start, self.state.date_range.end
        )));
        lines.push(Line::from(Span::styled("   [/] start  {/} end", FOOTER_STYLE)));
        lines.push(Line::from(""));

        for (idx, dim) in Dimension::SIDEBAR.iter().enumerate() {
            let focused = self.section == idx + 1;
            let selected = self.options[idx]
                .iter()
                .filter(|v| self.state.is_selected(*dim, v))
                .count();
            lines.push(Line::from(Span::styled(
                format!(
                    "{}{} ({}/{})",
                    marker(focused),
                    dim.label(),
                    selected,
                    self.options[idx].len()
                ),
                TITLE_STYLE,
            )));
            for (j, value) in self.options[idx].iter().enumerate() {
                let check = if self.state.is_selected(*dim, value) { "[x]" } else { "[ ]" };
                let text = format!("   {check} {}", truncate(value, text_width));
                if focused && self.cursors[idx] == j {
                    focus_line = lines.len();
                    lines.push(Line::from(Span::styled(text, SELECTED_STYLE)));
                } else {
                    lines.push(Line::from(text));
                }
            }
            lines.push(Line::from(""));
        }

        let height = area.height as usize;
        let scroll = if focus_line + 2 > height {
            focus_line + 2 - height
        } else {
            0
        };
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(FOOTER_STYLE);
        frame.render_widget(
            Paragraph::new(lines).block(block).scroll((scroll as u16, 0)),
            area,
        );
    }

    fn draw_main(&mut self, frame: &mut Frame, area: Rect) {
        let Some(view) = &self.view else {
            frame.render_widget(Paragraph::new(" Nothing to show."), area);
            return;
        };

        let metrics: Vec<(&str, &str)> = view.metrics().collect();
        let download = view.widgets.iter().find_map(|w| match w {
            Widget::Download { label, file_name, .. } => Some(format!(" {label}: press e to save {file_name}")),
            _ => None,
        });
        let panels: Vec<&Widget> = view
            .widgets
            .iter()
            .filter(|w| matches!(w, Widget::Bar { .. } | Widget::Scatter { .. } | Widget::Table { .. }))
            .collect();
        let panel_rows: Vec<&[&Widget]> = panels.chunks(2).collect();

        let mut constraints = Vec::new();
        if !metrics.is_empty() {
            constraints.push(Constraint::Length(3));
        }
        if download.is_some() {
            constraints.push(Constraint::Length(1));
        }
        constraints.extend(panel_rows.iter().map(|_| Constraint::Fill(1)));
        let areas = Layout::vertical(constraints).split(area);
        let mut next = 0usize;

        if !metrics.is_empty() {
            draw_metrics(frame, areas[next], &metrics);
            next += 1;
        }
        if let Some(text) = download {
            frame.render_widget(Paragraph::new(text).style(FOOTER_STYLE), areas[next]);
            next += 1;
        }

        let mut table_visible = None;
        for row in panel_rows {
            let cells = Layout::horizontal(vec![Constraint::Fill(1); row.len()]).split(areas[next]);
            next += 1;
            for (widget, cell) in row.iter().zip(cells.iter()) {
                match widget {
                    Widget::Bar {
                        title,
                        orientation,
                        value_label,
                        bars,
                        ..
                    } => draw_bar(frame, *cell, title, *orientation, value_label, bars),
                    Widget::Scatter {
                        title,
                        x_label,
                        y_label,
                        points,
                        ..
                    } => draw_scatter(frame, *cell, title, x_label, y_label, points),
                    Widget::Table {
                        caption,
                        columns,
                        rows,
                    } => {
                        table_visible = Some(draw_table(
                            frame,
                            *cell,
                            caption.as_deref(),
                            columns,
                            rows,
                            self.table_offset,
                        ));
                    }
                    _ => {}
                }
            }
        }
        if let Some(visible) = table_visible {
            self.table_visible = visible.max(1);
        }
    }
}

impl Screen for Dashboard {
    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let [header_area, tabs_area, sep_area, body_area, status_area, footer_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .areas(area);

        self.draw_header(frame, header_area);
        self.draw_tabs(frame, tabs_area);
        frame.render_widget(
            Paragraph::new("\u{2501}".repeat(area.width as usize)).style(FOOTER_STYLE),
            sep_area,
        );

        let [sidebar_area, main_area] =
            Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Fill(1)])
                .areas(body_area);
        self.draw_sidebar(frame, sidebar_area);
        self.draw_main(frame, main_area);

        if let Some(msg) = &self.status_message {
            frame.render_widget(
                Paragraph::new(format!(" {msg}")).style(Style::default().add_modifier(Modifier::ITALIC)),
                status_area,
            );
        }
        frame.render_widget(
            Paragraph::new(
                " 1-4/Tab=page  \u{2190}/\u{2192}=section  \u{2191}/\u{2193}=move  Space=toggle  a/n=all/none  [ ] { }=dates  r=full range  PgUp/PgDn=scroll  e=export  R=reload  q=quit",
            )
            .style(FOOTER_STYLE),
            footer_area,
        );
    }

    fn handle_key(&mut self, code: KeyCode) -> ScreenAction {
        self.status_message = None;
        let sections = Dimension::SIDEBAR.len() + 1;
        let page_size = self.table_visible.max(1);

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return ScreenAction::Close,
            KeyCode::Char(c @ '1'..='4') => {
                let idx = c as usize - '1' as usize;
                self.set_page(Page::ALL[idx]);
            }
            KeyCode::Tab => self.set_page(self.page.next()),
            KeyCode::BackTab => self.set_page(self.page.prev()),
            KeyCode::Left | KeyCode::Char('h') => {
                self.section = (self.section + sections - 1) % sections;
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.section = (self.section + 1) % sections;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                if let Some((idx, _)) = self.focused_dimension() {
                    self.cursors[idx] = self.cursors[idx].saturating_sub(1);
                }
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some((idx, _)) = self.focused_dimension() {
                    let last = self.options[idx].len().saturating_sub(1);
                    self.cursors[idx] = (self.cursors[idx] + 1).min(last);
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_at_cursor(),
            KeyCode::Char('a') => self.select_all(),
            KeyCode::Char('n') => self.select_none(),
            KeyCode::Char('[') => self.shift_start(false),
            KeyCode::Char(']') => self.shift_start(true),
            KeyCode::Char('{') => self.shift_end(false),
            KeyCode::Char('}') => self.shift_end(true),
            KeyCode::Char('r') => {
                if let Some((min, max)) = self.table.date_bounds() {
                    self.state.date_range = crate::filter::DateRange::new(min, max);
                }
            }
            KeyCode::PageUp => {
                self.table_offset = self.table_offset.saturating_sub(page_size);
            }
            KeyCode::PageDown => {
                let max = self.table_len().saturating_sub(page_size);
                self.table_offset = (self.table_offset + page_size).min(max);
            }
            KeyCode::Char('e') => {
                self.export();
                return ScreenAction::Continue;
            }
            KeyCode::Char('R') => self.reload(),
            _ => return ScreenAction::Continue,
        }

        self.recompute();
        ScreenAction::Continue
    }
}

fn initial_state(table: &Campaigns, initial: InitialDateRange) -> FilterState {
    match initial {
        InitialDateRange::Latest => FilterState::defaults_for(table),
        InitialDateRange::Full => FilterState::full_range(table),
    }
}

fn sidebar_options(table: &Campaigns) -> Vec<Vec<String>> {
    Dimension::SIDEBAR
        .iter()
        .map(|d| table.unique_values(*d))
        .collect()
}

/// Short label for a bar's value.
fn bar_value(v: f64) -> String {
    let abs = v.abs();
    if !v.is_finite() || abs >= 1000.0 {
        compact(v)
    } else if abs >= 1.0 {
        ratio(v, 2)
    } else {
        ratio(v, 3)
    }
}

fn titled(title: &str) -> Block<'static> {
    Block::default()
        .title(format!(" {title} "))
        .title_style(TITLE_STYLE)
        .borders(Borders::ALL)
        .border_style(FOOTER_STYLE)
}

fn draw_metrics(frame: &mut Frame, area: Rect, metrics: &[(&str, &str)]) {
    let cells = Layout::horizontal(vec![Constraint::Fill(1); metrics.len()]).split(area);
    for ((label, value), cell) in metrics.iter().zip(cells.iter()) {
        frame.render_widget(
            Paragraph::new(Line::from(metric_span(value)))
                .alignment(Alignment::Center)
                .block(titled(label)),
            *cell,
        );
    }
}

fn draw_bar(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    orientation: Orientation,
    value_label: &str,
    bars: &[(String, f64)],
) {
    let block = titled(&format!("{title} \u{00b7} {value_label}"));
    if bars.is_empty() {
        frame.render_widget(Paragraph::new(" No data").block(block), area);
        return;
    }

    // Bar heights are integers; scale so the tallest finite bar maps to 1000.
    let max = bars
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);
    let factor = if max > 0.0 { 1000.0 / max } else { 1.0 };

    let label_width = match orientation {
        Orientation::Horizontal => 14,
        Orientation::Vertical => {
            let inner = area.width.saturating_sub(2) as usize;
            (inner / bars.len()).saturating_sub(1).clamp(3, 14)
        }
    };

    let data: Vec<Bar> = bars
        .iter()
        .enumerate()
        .map(|(i, (label, v))| {
            let height = if v.is_finite() && *v > 0.0 {
                (v * factor).round() as u64
            } else {
                0
            };
            Bar::default()
                .value(height)
                .text_value(bar_value(*v))
                .label(Line::from(truncate(label, label_width)))
                .style(Style::default().fg(series_color(i)))
        })
        .collect();

    let mut chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&data))
        .max(1000);
    chart = match orientation {
        Orientation::Horizontal => chart.direction(Direction::Horizontal).bar_width(1).bar_gap(0),
        Orientation::Vertical => chart.bar_width(label_width as u16).bar_gap(1),
    };
    frame.render_widget(chart, area);
}

fn bounds(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if lo > hi {
        return None;
    }
    if lo == hi {
        Some([lo - 1.0, hi + 1.0])
    } else {
        Some([lo, hi])
    }
}

fn axis_labels(b: [f64; 2]) -> Vec<String> {
    vec![compact(b[0]), compact((b[0] + b[1]) / 2.0), compact(b[1])]
}

fn draw_scatter(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    x_label: &str,
    y_label: &str,
    points: &[ScatterPoint],
) {
    let mut series: BTreeMap<&str, Vec<(f64, f64)>> = BTreeMap::new();
    for p in points.iter().filter(|p| p.x.is_finite() && p.y.is_finite()) {
        series.entry(p.series.as_str()).or_default().push((p.x, p.y));
    }

    let all = || series.values().flatten();
    let (Some(xb), Some(yb)) = (bounds(all().map(|p| p.0)), bounds(all().map(|p| p.1))) else {
        frame.render_widget(Paragraph::new(" No data").block(titled(title)), area);
        return;
    };

    let datasets: Vec<Dataset> = series
        .iter()
        .enumerate()
        .map(|(i, (name, data))| {
            Dataset::default()
                .name(name.to_string())
                .marker(Marker::Braille)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(series_color(i)))
                .data(data)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(titled(title))
        .x_axis(
            Axis::default()
                .title(x_label.to_string())
                .style(FOOTER_STYLE)
                .bounds(xb)
                .labels(axis_labels(xb)),
        )
        .y_axis(
            Axis::default()
                .title(y_label.to_string())
                .style(FOOTER_STYLE)
                .bounds(yb)
                .labels(axis_labels(yb)),
        );
    frame.render_widget(chart, area);
}

/// Draw a scrolling table window. Returns how many data rows fit.
fn draw_table(
    frame: &mut Frame,
    area: Rect,
    caption: Option<&str>,
    columns: &[String],
    rows: &[Vec<String>],
    offset: usize,
) -> usize {
    // Borders (2) plus header row and its bottom margin (2).
    let visible = area.height.saturating_sub(4) as usize;
    let window: Vec<&Vec<String>> = rows.iter().skip(offset).take(visible).collect();

    let widths: Vec<Constraint> = columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            let widest = window
                .iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0);
            Constraint::Length(widest.max(col.chars().count()).min(24) as u16)
        })
        .collect();

    let header = Row::new(columns.iter().map(|c| Cell::from(c.clone())))
        .style(TITLE_STYLE)
        .bottom_margin(1);
    let body: Vec<Row> = window
        .iter()
        .map(|r| Row::new(r.iter().map(|c| Cell::from(c.clone()))))
        .collect();

    let position = if rows.len() > visible {
        format!("  rows {}-{} of {}", offset + 1, (offset + visible).min(rows.len()), rows.len())
    } else {
        String::new()
    };
    let title = format!("{}{position}", caption.unwrap_or(""));

    frame.render_widget(
        Table::new(body, widths)
            .header(header)
            .column_spacing(1)
            .block(titled(&title)),
        area,
    );
    visible
}

/// Open the interactive dashboard.
pub fn run(session: &Session) -> Result<()> {
    let page = session
        .settings
        .default_page
        .parse::<Page>()
        .unwrap_or_else(|e| {
            log::warn!("{e}; starting on the overview page");
            Page::ExecutiveOverview
        });
    let mut dashboard = Dashboard::new(
        Arc::clone(&session.table),
        session.data_path.clone(),
        session.export_dir(),
        session.settings.initial_date_range,
        page,
    );
    run_screen(&mut dashboard)
}
