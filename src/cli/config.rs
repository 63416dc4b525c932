use crate::error::{DashError, Result};
use crate::settings::{load_settings, save_settings, settings_path, settings_file_exists, Settings};

/// Print the active settings; with `init`, write defaults first.
pub fn run(init: bool) -> Result<()> {
    if init {
        if settings_file_exists() {
            println!("Settings already exist at {}", settings_path().display());
        } else {
            save_settings(&Settings::default())?;
            println!("Wrote {}", settings_path().display());
        }
    }
    let settings = load_settings();
    let json = serde_json::to_string_pretty(&settings)
        .map_err(|e| DashError::Settings(e.to_string()))?;
    println!("# {}", settings_path().display());
    println!("{json}");
    Ok(())
}
