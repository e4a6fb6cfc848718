use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_DIR_NAME: &str = "ai-history-importer";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default settings file location (`<platform config dir>/ai-history-importer/config.toml`)
pub fn get_default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("Failed to get platform config directory")?;
    Ok(config_dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}
