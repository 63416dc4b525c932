use std::collections::BTreeMap;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::aggregate;
use crate::cli::{FilterArgs, Session};
use crate::error::Result;
use crate::filter::filter;
use crate::fmt::{compact, number, ratio};
use crate::pages::{self, Orientation, Page, PageView, ScatterPoint, Widget};

const BAR_WIDTH: usize = 30;

/// Print one page for the given filters.
pub fn run(session: &Session, page: &str, filters: &FilterArgs) -> Result<()> {
    let page: Page = page.parse()?;
    let state = filters.to_state(&session.table, session.settings.initial_date_range)?;
    let filtered = filter(&session.table, &state);
    if filtered.is_empty() {
        log::warn!("no campaigns match the current filters");
    }
    let view = pages::render(page, &filtered)?;
    println!("{}", format_page(&view));
    Ok(())
}

/// List page names with their slugs.
pub fn list() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["Slug", "Page"]);
    for page in Page::ALL {
        table.add_row(vec![page.slug(), page.title()]);
    }
    println!("{table}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Pure formatting functions (page view → String)
// ---------------------------------------------------------------------------

pub fn format_page(view: &PageView) -> String {
    let mut out = format!("{}\n", view.title().bold());

    let metrics: Vec<(&str, &str)> = view.metrics().collect();
    if !metrics.is_empty() {
        let mut table = Table::new();
        table.set_header(metrics.iter().map(|(label, _)| *label).collect::<Vec<_>>());
        table.add_row(metrics.iter().map(|(_, value)| *value).collect::<Vec<_>>());
        out.push_str(&format!("{table}\n"));
    }

    for widget in &view.widgets {
        let section = match widget {
            Widget::Metric { .. } => continue,
            Widget::Bar {
                title,
                orientation,
                category_label,
                value_label,
                bars,
            } => format_bar(title, *orientation, category_label, value_label, bars),
            Widget::Scatter {
                title,
                x_label,
                y_label,
                size_label,
                series_label,
                points,
            } => format_scatter(title, x_label, y_label, size_label.as_deref(), series_label, points),
            Widget::Table {
                caption,
                columns,
                rows,
            } => format_table(caption.as_deref(), columns, rows),
            Widget::Download {
                label,
                file_name,
                mime,
                data,
            } => format!(
                "{label}: {file_name} ({mime}, {} bytes) \u{2014} run `campaign-dash export` to save it\n",
                number(data.len() as f64)
            ),
        };
        out.push('\n');
        out.push_str(&section);
    }
    out
}

fn format_bar(
    title: &str,
    orientation: Orientation,
    category_label: &str,
    value_label: &str,
    bars: &[(String, f64)],
) -> String {
    let max = bars
        .iter()
        .map(|(_, v)| v.abs())
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max);

    let mut table = Table::new();
    table.set_header(vec![category_label, value_label, ""]);
    for (label, value) in bars {
        let len = if max > 0.0 && value.is_finite() {
            ((value.abs() / max) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(ratio(*value, 4)).set_alignment(CellAlignment::Right),
            Cell::new("\u{2588}".repeat(len)),
        ]);
    }
    let hint = match orientation {
        Orientation::Horizontal => "",
        Orientation::Vertical => " (columns)",
    };
    format!("{}{hint}\n{table}\n", title.bold())
}

/// Scatter charts do not survive plain text; summarize each series instead.
fn format_scatter(
    title: &str,
    x_label: &str,
    y_label: &str,
    size_label: Option<&str>,
    series_label: &str,
    points: &[ScatterPoint],
) -> String {
    let mut by_series: BTreeMap<&str, Vec<&ScatterPoint>> = BTreeMap::new();
    for p in points {
        by_series.entry(p.series.as_str()).or_default().push(p);
    }

    let mut header = vec![
        series_label.to_string(),
        "Points".to_string(),
        format!("Mean {x_label}"),
        format!("Mean {y_label}"),
    ];
    if let Some(size) = size_label {
        header.push(format!("Total {size}"));
    }

    let mut table = Table::new();
    table.set_header(header);
    for (series, pts) in &by_series {
        let mut row = vec![
            series.to_string(),
            pts.len().to_string(),
            compact(aggregate::mean(pts.iter().map(|p| p.x))),
            ratio(aggregate::mean(pts.iter().map(|p| p.y)), 4),
        ];
        if size_label.is_some() {
            row.push(number(aggregate::sum(pts.iter().filter_map(|p| p.size))));
        }
        table.add_row(row);
    }
    format!("{}\n{table}\n", title.bold())
}

fn format_table(caption: Option<&str>, columns: &[String], rows: &[Vec<String>]) -> String {
    let mut table = Table::new();
    table.set_header(columns);
    for row in rows {
        table.add_row(row);
    }
    match caption {
        Some(c) => format!("{}\n{table}\n", c.bold()),
        None => format!("{table}\n"),
    }
}
