use serde::{Deserialize, Serialize};

use crate::indexer::DEFAULT_ATTACHMENT_SCAN_DEPTH;
use crate::parsers::ParseOptions;

pub const DEFAULT_NOTES_ROOT: &str = "AI Chat History";
pub const DEFAULT_ATTACHMENTS_DIRECTORY: &str = "AI Chat History/Attachments";

/// Where notes and attachments go, and what to do when a note already exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub notes_directory: String,
    pub attachments_directory: String,
    pub overwrite_on_reimport: bool,
    /// Read through the export source, like every other input file
    pub custom_template_path: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            notes_directory: DEFAULT_NOTES_ROOT.to_string(),
            attachments_directory: DEFAULT_ATTACHMENTS_DIRECTORY.to_string(),
            overwrite_on_reimport: true,
            custom_template_path: None,
        }
    }
}

/// Everything a format import entry point needs besides its adapters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportImportOptions {
    pub export_dir: String,
    pub import: ImportOptions,
    pub parse: ParseOptions,
    /// Only used by formats that ship attachment files
    pub attachment_scan_depth: usize,
}

impl ExportImportOptions {
    pub fn new(export_dir: impl Into<String>) -> Self {
        Self {
            export_dir: export_dir.into(),
            import: ImportOptions::default(),
            parse: ParseOptions::default(),
            attachment_scan_depth: DEFAULT_ATTACHMENT_SCAN_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    /// `"<conversationId>: <message>"` per failed conversation
    pub errors: Vec<String>,
}

impl ImportResult {
    pub fn processed(&self) -> usize {
        self.imported + self.skipped + self.errors.len()
    }
}
