use std::str::FromStr;

use crate::aggregate::{self, group_by, sort_by_value, Reduce};
use crate::error::{DashError, Result};
use crate::export::{self, DEEP_DIVE_COLUMNS, EXPORT_FILE_NAME, EXPORT_MIME};
use crate::fmt::{money, money_whole, number, ratio};
use crate::models::{CampaignRecord, Dimension, Measure, Table};

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    ExecutiveOverview,
    AudienceEngagement,
    EfficiencyRisk,
    CampaignDeepDive,
}

impl Page {
    pub const ALL: &'static [Page] = &[
        Self::ExecutiveOverview,
        Self::AudienceEngagement,
        Self::EfficiencyRisk,
        Self::CampaignDeepDive,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::ExecutiveOverview => "Executive Overview",
            Self::AudienceEngagement => "Audience & Engagement",
            Self::EfficiencyRisk => "Efficiency & Risk",
            Self::CampaignDeepDive => "Campaign Deep Dive",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Self::ExecutiveOverview => "overview",
            Self::AudienceEngagement => "audience",
            Self::EfficiencyRisk => "efficiency",
            Self::CampaignDeepDive => "deep-dive",
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|p| p == self).unwrap_or(0)
    }

    pub fn next(&self) -> Page {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Page {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl FromStr for Page {
    type Err = DashError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|p| p.slug() == needle || p.title().to_ascii_lowercase() == needle)
            .copied()
            .ok_or_else(|| DashError::UnknownPage(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Widget descriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub size: Option<f64>,
    pub series: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Metric {
        label: String,
        value: String,
    },
    Bar {
        title: String,
        orientation: Orientation,
        category_label: String,
        value_label: String,
        bars: Vec<(String, f64)>,
    },
    Scatter {
        title: String,
        x_label: String,
        y_label: String,
        size_label: Option<String>,
        series_label: String,
        points: Vec<ScatterPoint>,
    },
    Table {
        caption: Option<String>,
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Download {
        label: String,
        file_name: String,
        mime: String,
        data: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub page: Page,
    pub widgets: Vec<Widget>,
}

impl PageView {
    pub fn title(&self) -> &'static str {
        self.page.title()
    }

    pub fn metrics(&self) -> impl Iterator<Item = (&str, &str)> {
        self.widgets.iter().filter_map(|w| match w {
            Widget::Metric { label, value } => Some((label.as_str(), value.as_str())),
            _ => None,
        })
    }

    pub fn download(&self) -> Option<(&str, &str)> {
        self.widgets.iter().find_map(|w| match w {
            Widget::Download { file_name, data, .. } => Some((file_name.as_str(), data.as_str())),
            _ => None,
        })
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Render one page from the filtered view. Pure: no page depends on another.
pub fn render(page: Page, table: &Table) -> Result<PageView> {
    log::debug!("rendering {} over {} rows", page.title(), table.len());
    let widgets = match page {
        Page::ExecutiveOverview => executive_overview(table),
        Page::AudienceEngagement => audience_engagement(table),
        Page::EfficiencyRisk => efficiency_risk(table),
        Page::CampaignDeepDive => campaign_deep_dive(table)?,
    };
    Ok(PageView { page, widgets })
}

fn metric(label: &str, value: String) -> Widget {
    Widget::Metric {
        label: label.to_string(),
        value,
    }
}

fn bar(
    title: &str,
    orientation: Orientation,
    category_label: &str,
    value_label: &str,
    groups: Vec<aggregate::Group>,
) -> Widget {
    Widget::Bar {
        title: title.to_string(),
        orientation,
        category_label: category_label.to_string(),
        value_label: value_label.to_string(),
        bars: groups.into_iter().map(|g| (g.key, g.value)).collect(),
    }
}

fn scatter(
    title: &str,
    rows: &[CampaignRecord],
    x: Measure,
    y: Measure,
    size: Option<Measure>,
    series: Dimension,
) -> Widget {
    let points = rows
        .iter()
        .filter_map(|r| {
            Some(ScatterPoint {
                x: x.value(r)?,
                y: y.value(r)?,
                size: size.and_then(|m| m.value(r)),
                series: series.value(r).to_string(),
            })
        })
        .collect();
    Widget::Scatter {
        title: title.to_string(),
        x_label: x.column().to_string(),
        y_label: y.column().to_string(),
        size_label: size.map(|m| m.column().to_string()),
        series_label: series.column().to_string(),
        points,
    }
}

// ---------------------------------------------------------------------------
// Renderers
// ---------------------------------------------------------------------------

fn executive_overview(table: &Table) -> Vec<Widget> {
    let rows = table.rows();

    let mut channel_roi = group_by(rows, |r| r.channel.as_str(), |r| r.roi, Reduce::Mean);
    sort_by_value(&mut channel_roi, true);
    let goal_clicks = group_by(rows, |r| r.goal.as_str(), |r| r.clicks, Reduce::Sum);

    vec![
        metric(
            "Total Spend",
            money_whole(aggregate::sum(rows.iter().map(|r| r.acquisition_cost))),
        ),
        metric("Impressions", number(aggregate::sum(rows.iter().map(|r| r.impressions)))),
        metric("Clicks", number(aggregate::sum(rows.iter().map(|r| r.clicks)))),
        metric("Avg ROI", ratio(aggregate::mean(rows.iter().map(|r| r.roi)), 2)),
        metric(
            "Cost / Conversion",
            money(aggregate::mean(rows.iter().map(|r| r.cost_per_conversion))),
        ),
        bar(
            "Which Channels Actually Perform",
            Orientation::Horizontal,
            "Channel_Used",
            "ROI",
            channel_roi,
        ),
        scatter(
            "Scale vs Efficiency",
            rows,
            Measure::Clicks,
            Measure::Roi,
            Some(Measure::Impressions),
            Dimension::Channel,
        ),
        bar(
            "Where Volume Is Coming From",
            Orientation::Vertical,
            "Campaign_Goal",
            "Clicks",
            goal_clicks,
        ),
    ]
}

fn audience_engagement(table: &Table) -> Vec<Widget> {
    let rows = table.rows();
    let by_segment = group_by(
        rows,
        |r| r.segment.as_str(),
        |r| r.conversion_rate,
        Reduce::Mean,
    );
    let by_language = group_by(rows, |r| r.language.as_str(), |r| r.ctr, Reduce::Mean);

    vec![
        scatter(
            "Engagement vs Conversion",
            rows,
            Measure::EngagementScore,
            Measure::ConversionRate,
            Some(Measure::Clicks),
            Dimension::Audience,
        ),
        bar(
            "Conversion by Segment",
            Orientation::Vertical,
            "Customer_Segment",
            "Conversion_Rate",
            by_segment,
        ),
        bar(
            "CTR by Language",
            Orientation::Vertical,
            "Language",
            "CTR",
            by_language,
        ),
    ]
}

/// Campaigns with the lowest mean ROI, paired with their total spend.
pub fn lowest_roi_campaigns(table: &Table, limit: usize) -> Vec<(String, f64, f64)> {
    let rows = table.rows();
    let roi = group_by(rows, |r| r.campaign_id.as_str(), |r| r.roi, Reduce::Mean);
    let spend = group_by(
        rows,
        |r| r.campaign_id.as_str(),
        |r| r.acquisition_cost,
        Reduce::Sum,
    );
    // Both groupings iterate the same sorted keys, so they line up index by index.
    let mut merged: Vec<(String, f64, f64)> = roi
        .into_iter()
        .zip(spend)
        .map(|(r, s)| (r.key, r.value, s.value))
        .collect();
    merged.sort_by(|a, b| aggregate::cmp_nan_last(a.1, b.1, false));
    merged.truncate(limit);
    merged
}

fn efficiency_risk(table: &Table) -> Vec<Widget> {
    let worst = lowest_roi_campaigns(table, 10);
    let bars = worst
        .iter()
        .map(|(id, roi, _)| (id.clone(), *roi))
        .collect();

    vec![
        Widget::Bar {
            title: "Lowest ROI Campaigns".to_string(),
            orientation: Orientation::Horizontal,
            category_label: "Campaign_ID".to_string(),
            value_label: "ROI".to_string(),
            bars,
        },
        Widget::Table {
            caption: Some("Spend behind the lowest ROI campaigns".to_string()),
            columns: vec![
                "Campaign_ID".to_string(),
                "ROI".to_string(),
                "Acquisition_Cost".to_string(),
            ],
            rows: worst
                .iter()
                .map(|(id, roi, cost)| vec![id.clone(), ratio(*roi, 2), money(*cost)])
                .collect(),
        },
        scatter(
            "Campaign Duration vs Cost Efficiency",
            table.rows(),
            Measure::DurationDays,
            Measure::CostPerConversion,
            None,
            Dimension::Goal,
        ),
    ]
}

fn campaign_deep_dive(table: &Table) -> Result<Vec<Widget>> {
    let rows: Vec<Vec<String>> = export::deep_dive_rows(table)
        .into_iter()
        .map(|r| {
            vec![
                r.campaign_id.clone(),
                r.company.clone(),
                r.channel.clone(),
                r.goal.clone(),
                r.audience.clone(),
                r.segment.clone(),
                r.language.clone(),
                r.location.clone(),
                r.duration.clone(),
                number(r.impressions),
                number(r.clicks),
                ratio(r.ctr, 4),
                ratio(r.roi, 2),
                ratio(r.estimated_conversions, 2),
                money(r.cost_per_conversion),
            ]
        })
        .collect();

    Ok(vec![
        Widget::Download {
            label: "Download filtered data as CSV".to_string(),
            file_name: EXPORT_FILE_NAME.to_string(),
            mime: EXPORT_MIME.to_string(),
            data: export::deep_dive_csv(table)?,
        },
        Widget::Table {
            caption: Some(format!("Showing {} campaigns", number(rows.len() as f64))),
            columns: DEEP_DIVE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        },
    ])
}
