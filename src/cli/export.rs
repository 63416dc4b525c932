use std::path::PathBuf;

use crate::cli::{FilterArgs, Session};
use crate::error::Result;
use crate::export::{deep_dive_csv, write_export, EXPORT_FILE_NAME};
use crate::filter::filter;

/// Write the deep-dive CSV for the given filters. Returns the written path.
pub fn run(session: &Session, filters: &FilterArgs, output: Option<String>) -> Result<PathBuf> {
    let state = filters.to_state(&session.table, session.settings.initial_date_range)?;
    let filtered = filter(&session.table, &state);
    if filtered.is_empty() {
        log::warn!("no campaigns match the current filters; the export has a header only");
    }
    let data = deep_dive_csv(&filtered)?;

    let path = match output {
        Some(out) => {
            let p = PathBuf::from(out);
            let dir = p.parent().map(PathBuf::from).unwrap_or_default();
            let name = p
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(EXPORT_FILE_NAME)
                .to_string();
            write_export(&data, &dir, &name)?
        }
        None => write_export(&data, &session.export_dir(), EXPORT_FILE_NAME)?,
    };
    println!("Wrote {} ({} campaigns)", path.display(), filtered.len());
    Ok(path)
}
