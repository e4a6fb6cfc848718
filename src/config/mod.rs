//! Persisted settings for the command-line importer
//!
//! Settings come from a TOML file; command-line flags override individual values. A missing
//! default settings file means built-in defaults, a missing explicit one is an error.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::importer::{
    DEFAULT_ATTACHMENTS_DIRECTORY, DEFAULT_NOTES_ROOT, ExportImportOptions, ImportOptions,
    STATE_DIR_NAME, STATE_FILE_NAME,
};
use crate::indexer::DEFAULT_ATTACHMENT_SCAN_DEPTH;
use crate::parsers::ParseOptions;
use crate::utils::get_default_config_path;

/// Environment variable naming the settings file
pub const CONFIG_ENV_VAR: &str = "AI_HISTORY_IMPORTER_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[value(name = "chatgpt")]
    ChatGpt,
    Claude,
}

impl ExportFormat {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ChatGpt => "ChatGPT",
            Self::Claude => "Claude",
        }
    }

    /// `AI Chat History/<Format>`
    pub fn default_notes_directory(self) -> String {
        format!("{}/{}", DEFAULT_NOTES_ROOT, self.display_name())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Per-format overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    pub notes_directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Vault root; may also be given on the command line
    pub vault: Option<PathBuf>,
    /// Defaults to `<vault>/.ai-history-importer/state.json`
    pub state_file: Option<PathBuf>,
    pub attachments_directory: String,
    pub overwrite_on_reimport: bool,
    pub custom_template_path: Option<String>,
    pub attachment_scan_depth: usize,
    pub parse: ParseOptions,
    pub chatgpt: FormatSettings,
    pub claude: FormatSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault: None,
            state_file: None,
            attachments_directory: DEFAULT_ATTACHMENTS_DIRECTORY.to_string(),
            overwrite_on_reimport: true,
            custom_template_path: None,
            attachment_scan_depth: DEFAULT_ATTACHMENT_SCAN_DEPTH,
            parse: ParseOptions::default(),
            chatgpt: FormatSettings::default(),
            claude: FormatSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("Failed to parse settings")
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        Self::from_toml(&contents).with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    /// Load `explicit` if given (it must exist), else the default location if present
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                bail!("Settings file not found: {}", path.display());
            }
            debug!("Loading settings from {}", path.display());
            return Self::load_from_file(path);
        }

        match get_default_config_path() {
            Ok(path) if path.exists() => {
                debug!("Loading settings from {}", path.display());
                Self::load_from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    fn format_settings(&self, format: ExportFormat) -> &FormatSettings {
        match format {
            ExportFormat::ChatGpt => &self.chatgpt,
            ExportFormat::Claude => &self.claude,
        }
    }

    pub fn notes_directory(&self, format: ExportFormat) -> String {
        self.format_settings(format)
            .notes_directory
            .clone()
            .unwrap_or_else(|| format.default_notes_directory())
    }

    pub fn import_options(&self, format: ExportFormat) -> ImportOptions {
        ImportOptions {
            notes_directory: self.notes_directory(format),
            attachments_directory: self.attachments_directory.clone(),
            overwrite_on_reimport: self.overwrite_on_reimport,
            custom_template_path: self.custom_template_path.clone(),
        }
    }

    pub fn export_options(&self, format: ExportFormat, export_dir: &str) -> ExportImportOptions {
        ExportImportOptions {
            export_dir: export_dir.to_string(),
            import: self.import_options(format),
            parse: self.parse.clone(),
            attachment_scan_depth: self.attachment_scan_depth,
        }
    }

    /// Explicit state file, or the default one inside `vault`
    pub fn state_path(&self, vault: &Path) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| vault.join(STATE_DIR_NAME).join(STATE_FILE_NAME))
    }
}
