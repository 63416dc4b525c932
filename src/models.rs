use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::DashError;

/// One campaign row after load-time parsing, with the derived metrics attached.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRecord {
    pub campaign_id: String,
    pub company: String,
    pub date: NaiveDate,
    pub channel: String,
    pub goal: String,
    pub audience: String,
    pub segment: String,
    pub language: String,
    pub location: String,
    /// Raw duration text, e.g. "30 days".
    pub duration: String,
    /// Leading integer of `duration`, when there is one.
    pub duration_days: Option<u32>,
    pub acquisition_cost: f64,
    pub impressions: f64,
    pub clicks: f64,
    pub conversion_rate: f64,
    pub engagement_score: f64,
    pub roi: f64,
    // Derived at load time. Zero denominators propagate as inf/NaN.
    pub ctr: f64,
    pub estimated_conversions: f64,
    pub cpc: f64,
    pub cost_per_conversion: f64,
}

/// Categorical columns that can be filtered or grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    Company,
    Channel,
    Goal,
    Audience,
    Segment,
    Language,
    Location,
}

impl Dimension {
    pub const ALL: &'static [Dimension] = &[
        Self::Company,
        Self::Channel,
        Self::Goal,
        Self::Audience,
        Self::Segment,
        Self::Language,
        Self::Location,
    ];

    /// The multi-selects shown in the dashboard sidebar, in display order.
    pub const SIDEBAR: &'static [Dimension] =
        &[Self::Company, Self::Channel, Self::Goal, Self::Audience];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Channel => "channel",
            Self::Goal => "goal",
            Self::Audience => "audience",
            Self::Segment => "segment",
            Self::Language => "language",
            Self::Location => "location",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Company => "Company",
            Self::Channel => "Channel",
            Self::Goal => "Campaign Goal",
            Self::Audience => "Target Audience",
            Self::Segment => "Customer Segment",
            Self::Language => "Language",
            Self::Location => "Location",
        }
    }

    /// Header of the backing column in the source file.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Company => "Company",
            Self::Channel => "Channel_Used",
            Self::Goal => "Campaign_Goal",
            Self::Audience => "Target_Audience",
            Self::Segment => "Customer_Segment",
            Self::Language => "Language",
            Self::Location => "Location",
        }
    }

    pub fn value<'a>(&self, record: &'a CampaignRecord) -> &'a str {
        match self {
            Self::Company => &record.company,
            Self::Channel => &record.channel,
            Self::Goal => &record.goal,
            Self::Audience => &record.audience,
            Self::Segment => &record.segment,
            Self::Language => &record.language,
            Self::Location => &record.location,
        }
    }
}

impl FromStr for Dimension {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Self::ALL
            .iter()
            .find(|d| {
                d.key() == needle
                    || d.column().to_ascii_lowercase().replace('_', "-") == needle
                    || d.label().to_ascii_lowercase().replace(' ', "-") == needle
            })
            .copied()
            .ok_or_else(|| DashError::UnknownDimension(s.to_string()))
    }
}

/// Numeric columns used as chart axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measure {
    Clicks,
    Impressions,
    Roi,
    EngagementScore,
    ConversionRate,
    DurationDays,
    CostPerConversion,
}

impl Measure {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Clicks => "Clicks",
            Self::Impressions => "Impressions",
            Self::Roi => "ROI",
            Self::EngagementScore => "Engagement_Score",
            Self::ConversionRate => "Conversion_Rate",
            Self::DurationDays => "Duration",
            Self::CostPerConversion => "Cost_per_Conversion",
        }
    }

    /// `None` only for a duration whose text carries no day count.
    pub fn value(&self, r: &CampaignRecord) -> Option<f64> {
        match self {
            Self::Clicks => Some(r.clicks),
            Self::Impressions => Some(r.impressions),
            Self::Roi => Some(r.roi),
            Self::EngagementScore => Some(r.engagement_score),
            Self::ConversionRate => Some(r.conversion_rate),
            Self::DurationDays => r.duration_days.map(f64::from),
            Self::CostPerConversion => Some(r.cost_per_conversion),
        }
    }
}

/// An immutable, ordered set of campaign records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<CampaignRecord>,
}

impl Table {
    pub fn from_rows(rows: Vec<CampaignRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CampaignRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Earliest and latest campaign date, or `None` for an empty table.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let min = self.rows.iter().map(|r| r.date).min()?;
        let max = self.rows.iter().map(|r| r.date).max()?;
        Some((min, max))
    }

    /// Sorted distinct values of a categorical column.
    pub fn unique_values(&self, dim: Dimension) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| dim.value(r).to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
