use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::error::{DashError, Result};
use crate::models::{CampaignRecord, Table};

/// Columns the source file must carry, in the order the dataset ships them.
pub const REQUIRED_COLUMNS: &[&str] = &[
    "Campaign_ID",
    "Company",
    "Campaign_Goal",
    "Duration",
    "Channel_Used",
    "Conversion_Rate",
    "Acquisition_Cost",
    "ROI",
    "Location",
    "Language",
    "Clicks",
    "Impressions",
    "Engagement_Score",
    "Target_Audience",
    "Customer_Segment",
    "Date",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

static CURRENCY_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\$,]").unwrap());

static CACHE: Lazy<Mutex<HashMap<PathBuf, Arc<Table>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Strip `$` and thousands separators, then parse. `None` if what remains is not a number.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let cleaned = CURRENCY_NOISE.replace_all(raw, "");
    cleaned.trim().parse().ok()
}

/// Parse the dataset's date column. Accepts the common day-first/month-first layouts
/// and a trailing time component, which is dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw
        .split(|c| c == ' ' || c == 'T')
        .next()
        .unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

fn leading_days(duration: &str) -> Option<u32> {
    let digits: String = duration
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "Campaign_ID")]
    campaign_id: String,
    #[serde(rename = "Company")]
    company: String,
    #[serde(rename = "Campaign_Goal")]
    goal: String,
    #[serde(rename = "Duration")]
    duration: String,
    #[serde(rename = "Channel_Used")]
    channel: String,
    #[serde(rename = "Conversion_Rate")]
    conversion_rate: f64,
    #[serde(rename = "Acquisition_Cost")]
    acquisition_cost: String,
    #[serde(rename = "ROI")]
    roi: f64,
    #[serde(rename = "Location")]
    location: String,
    #[serde(rename = "Language")]
    language: String,
    #[serde(rename = "Clicks")]
    clicks: f64,
    #[serde(rename = "Impressions")]
    impressions: f64,
    #[serde(rename = "Engagement_Score")]
    engagement_score: f64,
    #[serde(rename = "Target_Audience")]
    audience: String,
    #[serde(rename = "Customer_Segment")]
    segment: String,
    #[serde(rename = "Date")]
    date: String,
}

impl RawRow {
    fn into_record(self, row: usize) -> Result<CampaignRecord> {
        let date = parse_date(&self.date).ok_or_else(|| DashError::InvalidDate {
            row,
            value: self.date.clone(),
        })?;
        let acquisition_cost =
            parse_currency(&self.acquisition_cost).ok_or_else(|| DashError::InvalidCurrency {
                row,
                value: self.acquisition_cost.clone(),
            })?;

        let ctr = self.clicks / self.impressions;
        let estimated_conversions = self.clicks * self.conversion_rate;
        let cpc = acquisition_cost / self.clicks;
        let cost_per_conversion = acquisition_cost / estimated_conversions;

        Ok(CampaignRecord {
            duration_days: leading_days(&self.duration),
            campaign_id: self.campaign_id,
            company: self.company,
            date,
            channel: self.channel,
            goal: self.goal,
            audience: self.audience,
            segment: self.segment,
            language: self.language,
            location: self.location,
            duration: self.duration,
            acquisition_cost,
            impressions: self.impressions,
            clicks: self.clicks,
            conversion_rate: self.conversion_rate,
            engagement_score: self.engagement_score,
            roi: self.roi,
            ctr,
            estimated_conversions,
            cpc,
            cost_per_conversion,
        })
    }
}

/// Parse a full dataset from any reader. No caching.
pub fn parse_reader<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    for col in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == *col) {
            return Err(DashError::MissingColumn(col.to_string()));
        }
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let raw: RawRow = record.deserialize(Some(&headers))?;
        // 1-based data row, header excluded.
        let row = rows.len() + 1;
        rows.push(raw.into_record(row)?);
    }
    Ok(Table::from_rows(rows))
}

/// Read and parse a dataset file, bypassing the cache.
pub fn load_uncached(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)?;
    let table = parse_reader(std::io::BufReader::new(file))?;
    log::info!("loaded {} campaign rows from {}", table.len(), path.display());
    Ok(table)
}

// ---------------------------------------------------------------------------
// Cached entry point
// ---------------------------------------------------------------------------

/// Load a dataset once per process. Later calls with the same path share the
/// same table without touching the file again.
pub fn load(path: &Path) -> Result<Arc<Table>> {
    let key = std::fs::canonicalize(path)?;
    let mut cache = CACHE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(table) = cache.get(&key) {
        log::debug!("dataset cache hit for {}", key.display());
        return Ok(Arc::clone(table));
    }
    let table = Arc::new(load_uncached(&key)?);
    cache.insert(key, Arc::clone(&table));
    Ok(table)
}

/// Drop every cached dataset; the next `load` re-reads from disk.
pub fn clear_cache() {
    CACHE.lock().unwrap_or_else(|e| e.into_inner()).clear();
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const HEADER: &str = "Campaign_ID,Company,Campaign_Goal,Duration,Channel_Used,Conversion_Rate,Acquisition_Cost,ROI,Location,Language,Clicks,Impressions,Engagement_Score,Target_Audience,Customer_Segment,Date";

    pub(crate) fn write_fixture(dir: &Path, rows: &[&str]) -> PathBuf {
        let path = dir.join("campaigns.csv");
        let mut body = String::from(HEADER);
        body.push('\n');
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        std::fs::write(&path, body).unwrap();
        path
    }

    /// Held by tests that touch the process-wide cache.
    pub(crate) static CACHE_LOCK: Mutex<()> = Mutex::new(());

    const ROW_A: &str = r#"1,Innovate Industries,Increase Sales,30 days,Google Ads,0.05,"$200.00",2.5,Chicago,English,100,1000,6,Men 18-24,Health,2021-01-01"#;

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$16,174.00"), Some(16174.0));
        assert_eq!(parse_currency("$200"), Some(200.0));
        assert_eq!(parse_currency("1,000"), Some(1000.0));
        assert_eq!(parse_currency("n/a"), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 7).unwrap();
        assert_eq!(parse_date("2021-03-07"), Some(expected));
        assert_eq!(parse_date("2021/03/07"), Some(expected));
        assert_eq!(parse_date("03/07/2021"), Some(expected));
        assert_eq!(parse_date("2021-03-07 00:00:00"), Some(expected));
        assert_eq!(parse_date("2021-03-07T12:30:00"), Some(expected));
        assert_eq!(parse_date("yesterday"), None);
    }

    #[test]
    fn test_derived_metrics_single_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), &[ROW_A]);
        let table = load_uncached(&path).unwrap();
        assert_eq!(table.len(), 1);
        let r = &table.rows()[0];
        assert_eq!(r.acquisition_cost, 200.0);
        assert_eq!(r.ctr, 0.1);
        assert_eq!(r.estimated_conversions, 5.0);
        assert_eq!(r.cpc, 2.0);
        assert_eq!(r.cost_per_conversion, 40.0);
        assert_eq!(r.duration_days, Some(30));
        assert_eq!(r.date, NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
    }

    #[test]
    fn test_zero_denominators_propagate() {
        let dir = tempfile::tempdir().unwrap();
        let row = r#"2,Alpha Innovations,Product Launch,15 days,Email,0.0,"$500",1.0,Miami,Spanish,0,0,3,All Ages,Fashion,2021-02-01"#;
        let path = write_fixture(dir.path(), &[row]);
        let table = load_uncached(&path).unwrap();
        let r = &table.rows()[0];
        assert!(r.ctr.is_nan());
        assert!(r.cpc.is_infinite());
        assert!(r.cost_per_conversion.is_infinite());
        assert_eq!(r.estimated_conversions, 0.0);
    }

    #[test]
    fn test_row_count_matches_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), &[ROW_A, ROW_A, ROW_A]);
        assert_eq!(load_uncached(&path).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let data = "Campaign_ID,Company\n1,Acme\n";
        let err = parse_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DashError::MissingColumn(_)));
    }

    #[test]
    fn test_bad_date_is_fatal() {
        let row = ROW_A.replace("2021-01-01", "not-a-date");
        let data = format!("{HEADER}\n{row}\n");
        let err = parse_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DashError::InvalidDate { row: 1, .. }));
    }

    #[test]
    fn test_bad_date_reports_data_row() {
        let bad = ROW_A.replace("2021-01-01", "bad");
        let data = format!("{HEADER}\n{ROW_A}\n{bad}\n");
        let err = parse_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DashError::InvalidDate { row: 2, .. }));
        assert_eq!(err.to_string(), "Row 2: could not parse date 'bad'");
    }

    #[test]
    fn test_bad_currency_is_fatal() {
        let row = ROW_A.replace("$200.00", "two hundred");
        let data = format!("{HEADER}\n{row}\n");
        let err = parse_reader(data.as_bytes()).unwrap_err();
        assert!(matches!(err, DashError::InvalidCurrency { .. }));
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn test_load_is_cached_per_path() {
        let _guard = CACHE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), &[ROW_A]);
        let first = load(&path).unwrap();
        // Rewriting the file must not be observed while the cache holds the table.
        write_fixture(dir.path(), &[ROW_A, ROW_A]);
        let second = load(&path).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_clear_cache_rereads_file() {
        let _guard = CACHE_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), &[ROW_A]);
        let first = load(&path).unwrap();
        write_fixture(dir.path(), &[ROW_A, ROW_A, ROW_A]);
        clear_cache();
        let second = load(&path).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 3);
    }
}
