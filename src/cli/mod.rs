pub mod config;
pub mod dashboard;
pub mod export;
pub mod page;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::error::Result;
use crate::filter::{DateRange, FilterState};
use crate::loader;
use crate::models::{Dimension, Table};
use crate::settings::{load_settings, shellexpand_path, InitialDateRange, Settings};

#[derive(Parser)]
#[command(
    name = "campaign-dash",
    about = "Terminal dashboard for advertising campaign performance."
)]
pub struct Cli {
    /// Path to the campaign CSV (default from settings: data/Social_Media_Advertising.csv)
    #[arg(long, global = true)]
    pub data: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive dashboard.
    Dashboard,
    /// Print one page as text.
    Page {
        /// Page name or slug: overview, audience, efficiency, deep-dive
        page: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Write the deep-dive table for the current filters as CSV.
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        /// Output file (default: <export_dir>/campaign_deep_dive.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// List the available pages.
    Pages,
    /// Show the active settings.
    Config {
        /// Write a settings file with default values
        #[arg(long)]
        init: bool,
    },
}

/// Sidebar filters expressed as flags. A dimension with no flag is unconstrained.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    /// Start date: YYYY-MM-DD
    #[arg(long = "from")]
    pub from_date: Option<String>,
    /// End date: YYYY-MM-DD
    #[arg(long = "to")]
    pub to_date: Option<String>,
    /// Use every date in the dataset
    #[arg(long = "all-dates", conflicts_with_all = ["from_date", "to_date"])]
    pub all_dates: bool,
    /// Accepted company (repeatable)
    #[arg(long)]
    pub company: Vec<String>,
    /// Accepted channel (repeatable)
    #[arg(long)]
    pub channel: Vec<String>,
    /// Accepted campaign goal (repeatable)
    #[arg(long)]
    pub goal: Vec<String>,
    /// Accepted target audience (repeatable)
    #[arg(long)]
    pub audience: Vec<String>,
    /// Accepted customer segment (repeatable)
    #[arg(long)]
    pub segment: Vec<String>,
    /// Accepted language (repeatable)
    #[arg(long)]
    pub language: Vec<String>,
    /// Accepted location (repeatable)
    #[arg(long)]
    pub location: Vec<String>,
    /// Select nothing for a dimension, e.g. --clear company (repeatable)
    #[arg(long)]
    pub clear: Vec<String>,
}

impl FilterArgs {
    fn values_for(&self, dim: Dimension) -> &[String] {
        match dim {
            Dimension::Company => &self.company,
            Dimension::Channel => &self.channel,
            Dimension::Goal => &self.goal,
            Dimension::Audience => &self.audience,
            Dimension::Segment => &self.segment,
            Dimension::Language => &self.language,
            Dimension::Location => &self.location,
        }
    }

    /// Turn the flags into a filter state for `table`.
    pub fn to_state(&self, table: &Table, initial: InitialDateRange) -> Result<FilterState> {
        let (min, max) = table.date_bounds().unwrap_or_default();
        let range = if self.all_dates {
            DateRange::new(min, max)
        } else if self.from_date.is_some() || self.to_date.is_some() {
            let start = match &self.from_date {
                Some(s) => DateRange::parse_bound(s)?,
                None => min,
            };
            let end = match &self.to_date {
                Some(s) => DateRange::parse_bound(s)?,
                None => max,
            };
            DateRange::new(start, end)
        } else {
            match initial {
                InitialDateRange::Latest => DateRange::new(max, max),
                InitialDateRange::Full => DateRange::new(min, max),
            }
        };

        let mut state = FilterState::new(range);
        for dim in Dimension::ALL {
            let values = self.values_for(*dim);
            if !values.is_empty() {
                state.select(*dim, values.iter().cloned());
            }
        }
        for raw in &self.clear {
            let dim: Dimension = raw.parse()?;
            state.select(dim, Vec::<String>::new());
        }
        Ok(state)
    }
}

/// Settings merged with the `--data` override, plus the loaded (cached) dataset.
pub struct Session {
    pub settings: Settings,
    pub data_path: PathBuf,
    pub table: Arc<Table>,
}

impl Session {
    pub fn open(data_override: Option<&str>) -> Result<Self> {
        let settings = load_settings();
        let raw_path = data_override.unwrap_or(&settings.data_path);
        let data_path = shellexpand_path(raw_path);
        let table = loader::load(&data_path)?;
        Ok(Self {
            settings,
            data_path,
            table,
        })
    }

    pub fn export_dir(&self) -> PathBuf {
        shellexpand_path(&self.settings.export_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter;
    use crate::models::tests::record;

    fn table() -> Table {
        Table::from_rows(vec![
            record("1", "Acme", "2021-01-01"),
            record("2", "Globex", "2021-06-01"),
            record("3", "Initech", "2021-12-01"),
        ])
    }

    #[test]
    fn test_no_flags_uses_initial_range() {
        let t = table();
        let latest = FilterArgs::default().to_state(&t, InitialDateRange::Latest).unwrap();
        assert_eq!(filter(&t, &latest).len(), 1);
        let full = FilterArgs::default().to_state(&t, InitialDateRange::Full).unwrap();
        assert_eq!(filter(&t, &full).len(), 3);
    }

    #[test]
    fn test_open_ended_range_uses_dataset_bounds() {
        let t = table();
        let args = FilterArgs {
            from_date: Some("2021-03-01".into()),
            ..Default::default()
        };
        let state = args.to_state(&t, InitialDateRange::Latest).unwrap();
        assert_eq!(filter(&t, &state).len(), 2);
    }

    #[test]
    fn test_company_flags_and_clear() {
        let t = table();
        let args = FilterArgs {
            all_dates: true,
            company: vec!["Acme".into(), "Initech".into()],
            ..Default::default()
        };
        let state = args.to_state(&t, InitialDateRange::Latest).unwrap();
        assert_eq!(filter(&t, &state).len(), 2);

        let args = FilterArgs {
            all_dates: true,
            clear: vec!["company".into()],
            ..Default::default()
        };
        let state = args.to_state(&t, InitialDateRange::Latest).unwrap();
        assert!(filter(&t, &state).is_empty());
    }

    #[test]
    fn test_bad_date_and_dimension_are_errors() {
        let t = table();
        let args = FilterArgs {
            to_date: Some("31/12/2021".into()),
            ..Default::default()
        };
        assert!(args.to_state(&t, InitialDateRange::Latest).is_err());
        let args = FilterArgs {
            clear: vec!["budget".into()],
            ..Default::default()
        };
        assert!(args.to_state(&t, InitialDateRange::Latest).is_err());
    }
}
