use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::error::{DashError, Result};
use crate::models::{CampaignRecord, Dimension, Table};

/// Inclusive date interval. `start > end` is allowed and matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Parse a `YYYY-MM-DD` command-line value.
    pub fn parse_bound(raw: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| DashError::BadDateArg(raw.to_string()))
    }
}

/// Current sidebar selections.
///
/// A dimension missing from `selections` is unconstrained. A dimension mapped to an
/// empty set excludes every row; there is no implicit "all" once a selection is cleared.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    pub date_range: DateRange,
    pub selections: BTreeMap<Dimension, BTreeSet<String>>,
}

impl FilterState {
    pub fn new(date_range: DateRange) -> Self {
        Self {
            date_range,
            selections: BTreeMap::new(),
        }
    }

    /// Initial dashboard state: the latest date only, every sidebar value selected.
    pub fn defaults_for(table: &Table) -> Self {
        let latest = table
            .date_bounds()
            .map(|(_, max)| max)
            .unwrap_or_default();
        Self::with_sidebar_defaults(table, DateRange::new(latest, latest))
    }

    /// Same as `defaults_for` but spanning every date in the table.
    pub fn full_range(table: &Table) -> Self {
        let (min, max) = table.date_bounds().unwrap_or_default();
        Self::with_sidebar_defaults(table, DateRange::new(min, max))
    }

    fn with_sidebar_defaults(table: &Table, date_range: DateRange) -> Self {
        let selections = Dimension::SIDEBAR
            .iter()
            .map(|dim| (*dim, table.unique_values(*dim).into_iter().collect()))
            .collect();
        Self {
            date_range,
            selections,
        }
    }

    /// Replace the accepted set for a dimension.
    pub fn select<I, S>(&mut self, dim: Dimension, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .insert(dim, values.into_iter().map(Into::into).collect());
    }

    /// Flip one value in a dimension's accepted set. An unconstrained dimension
    /// first becomes an explicit empty set.
    pub fn toggle(&mut self, dim: Dimension, value: &str) {
        let set = self.selections.entry(dim).or_default();
        if !set.remove(value) {
            set.insert(value.to_string());
        }
    }

    pub fn is_selected(&self, dim: Dimension, value: &str) -> bool {
        self.selections
            .get(&dim)
            .map_or(true, |set| set.contains(value))
    }

    pub fn matches(&self, record: &CampaignRecord) -> bool {
        self.date_range.contains(record.date)
            && self
                .selections
                .iter()
                .all(|(dim, accepted)| accepted.contains(dim.value(record)))
    }
}

/// Materialize the rows that satisfy every active constraint, in table order.
pub fn filter(table: &Table, state: &FilterState) -> Table {
    let rows: Vec<CampaignRecord> = table
        .rows()
        .iter()
        .filter(|r| state.matches(r))
        .cloned()
        .collect();
    log::debug!("filter kept {} of {} rows", rows.len(), table.len());
    Table::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::record;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn three_rows() -> Table {
        Table::from_rows(vec![
            record("1", "Acme", "2021-01-01"),
            record("2", "Globex", "2021-06-01"),
            record("3", "Initech", "2021-12-01"),
        ])
    }

    #[test]
    fn test_date_window_returns_middle_row() {
        let table = three_rows();
        let state = FilterState::new(DateRange::new(d("2021-03-01"), d("2021-09-01")));
        let out = filter(&table, &state);
        assert_eq!(out.len(), 1);
        assert_eq!(out.rows()[0].campaign_id, "2");
    }

    #[test]
    fn test_date_bounds_are_inclusive() {
        let table = three_rows();
        let state = FilterState::new(DateRange::new(d("2021-01-01"), d("2021-12-01")));
        assert_eq!(filter(&table, &state).len(), 3);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let table = three_rows();
        let state = FilterState::new(DateRange::new(d("2021-12-01"), d("2021-01-01")));
        assert!(filter(&table, &state).is_empty());
    }

    #[test]
    fn test_empty_company_selection_yields_nothing() {
        let table = three_rows();
        let mut state = FilterState::full_range(&table);
        state.select(Dimension::Company, Vec::<String>::new());
        assert!(filter(&table, &state).is_empty());
    }

    #[test]
    fn test_category_membership() {
        let table = three_rows();
        let mut state = FilterState::full_range(&table);
        state.select(Dimension::Company, ["Acme", "Initech"]);
        let out = filter(&table, &state);
        let ids: Vec<&str> = out.rows().iter().map(|r| r.campaign_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_unconstrained_dimension_passes_everything() {
        let table = three_rows();
        let mut state = FilterState::full_range(&table);
        state.selections.remove(&Dimension::Company);
        assert!(state.is_selected(Dimension::Company, "Anything"));
        assert_eq!(filter(&table, &state).len(), 3);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let table = three_rows();
        let mut state = FilterState::full_range(&table);
        state.select(Dimension::Company, ["Globex"]);
        let once = filter(&table, &state);
        let twice = filter(&table, &state);
        assert_eq!(once, twice);
        assert_eq!(filter(&once, &state), once);
    }

    #[test]
    fn test_defaults_pick_latest_date_and_all_values() {
        let table = three_rows();
        let state = FilterState::defaults_for(&table);
        assert_eq!(state.date_range, DateRange::new(d("2021-12-01"), d("2021-12-01")));
        assert_eq!(state.selections[&Dimension::Company].len(), 3);
        assert_eq!(filter(&table, &state).len(), 1);
    }

    #[test]
    fn test_toggle_round_trips() {
        let table = three_rows();
        let mut state = FilterState::full_range(&table);
        state.toggle(Dimension::Company, "Acme");
        assert!(!state.is_selected(Dimension::Company, "Acme"));
        state.toggle(Dimension::Company, "Acme");
        assert!(state.is_selected(Dimension::Company, "Acme"));
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(DateRange::parse_bound("2021-03-01").unwrap(), d("2021-03-01"));
        assert!(DateRange::parse_bound("03/01/2021").is_err());
    }
}
