use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub fn database_file_path() -> Result<PathBuf> {
    if let Some(custom) = env::var_os("ANITRACKER_DB").filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(custom));
    }
    let base = dirs::data_dir().context("unable to resolve data directory")?;
    Ok(base.join("anitracker").join("anitracker.db"))
}

pub fn config_file_path() -> Option<PathBuf> {
    if let Some(custom) = env::var_os("ANITRACKER_CONFIG").filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(custom));
    }
    dirs::config_dir().map(|base| base.join("anitracker").join("config.toml"))
}
