use std::path::{Path, PathBuf};

use crate::aggregate::cmp_nan_last;
use crate::error::{DashError, Result};
use crate::models::{CampaignRecord, Table};

pub const EXPORT_FILE_NAME: &str = "campaign_deep_dive.csv";
pub const EXPORT_MIME: &str = "text/csv";

/// Column subset shown on the deep-dive page and written by the export.
pub const DEEP_DIVE_COLUMNS: &[&str] = &[
    "Campaign_ID",
    "Company",
    "Channel_Used",
    "Campaign_Goal",
    "Target_Audience",
    "Customer_Segment",
    "Language",
    "Location",
    "Duration",
    "Impressions",
    "Clicks",
    "CTR",
    "ROI",
    "Estimated_Conversions",
    "Cost_per_Conversion",
];

/// Rows of the deep-dive view: every filtered record, highest ROI first.
pub fn deep_dive_rows(table: &Table) -> Vec<&CampaignRecord> {
    let mut rows: Vec<&CampaignRecord> = table.rows().iter().collect();
    rows.sort_by(|a, b| cmp_nan_last(a.roi, b.roi, true));
    rows
}

/// One record as raw cell values in `DEEP_DIVE_COLUMNS` order.
pub fn deep_dive_cells(r: &CampaignRecord) -> Vec<String> {
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
        count_cell(r.impressions),
        count_cell(r.clicks),
        float_cell(r.ctr),
        float_cell(r.roi),
        float_cell(r.estimated_conversions),
        float_cell(r.cost_per_conversion),
    ]
}

/// Float column cell: NaN is left empty, whole values keep a `.0`.
fn float_cell(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        v.to_string()
    }
}

/// Integer column cell: whole values are written without a decimal point.
fn count_cell(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        float_cell(v)
    }
}

/// Serialize the deep-dive view as CSV text.
pub fn deep_dive_csv(table: &Table) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(DEEP_DIVE_COLUMNS)?;
    for r in deep_dive_rows(table) {
        wtr.write_record(deep_dive_cells(r))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| DashError::Other(format!("could not finish CSV export: {e}")))?;
    String::from_utf8(bytes).map_err(|e| DashError::Other(e.to_string()))
}

/// Write export data into `dir`, creating it if needed.
pub fn write_export(data: &str, dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, data)?;
    log::info!("wrote export {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tests::record;

    #[test]
    fn test_csv_sorted_by_roi_descending() {
        let mut low = record("low", "Acme", "2021-01-01");
        low.roi = 1.0;
        let mut high = record("high", "Acme", "2021-01-02");
        high.roi = 7.5;
        let table = Table::from_rows(vec![low, high]);

        let csv = deep_dive_csv(&table).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], DEEP_DIVE_COLUMNS.join(","));
        assert!(lines[1].starts_with("high,"));
        assert!(lines[2].starts_with("low,"));
    }

    #[test]
    fn test_csv_number_cells() {
        let table = Table::from_rows(vec![record("1", "Acme", "2021-01-01")]);
        let csv = deep_dive_csv(&table).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "1,Acme,Facebook,Brand Awareness,Women 25-34,Health,English,New York,30 days,1000,100,0.1,2.0,5.0,40.0"
        );
    }

    #[test]
    fn test_csv_non_finite_cells() {
        let mut r = record("1", "Acme", "2021-01-01");
        r.impressions = 0.0;
        r.ctr = f64::NAN;
        r.cost_per_conversion = f64::INFINITY;
        let csv = deep_dive_csv(&Table::from_rows(vec![r])).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",30 days,0,100,,2.0,5.0,inf"), "{row}");
    }

    #[test]
    fn test_empty_table_exports_header_only() {
        let csv = deep_dive_csv(&Table::default()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn test_write_export_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("exports");
        let path = write_export("a,b\n", &nested, EXPORT_FILE_NAME).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b\n");
    }
}
