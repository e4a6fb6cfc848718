//! Import state: which note each conversation was last written to
//!
//! The reconciler works without it (identity metadata inside notes is enough to re-match), but
//! with it a renamed note is still found and unchanged conversations are skipped even when
//! overwriting is enabled.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::ConversationRecord;
use crate::utils::format_iso;

/// State schema version; a mismatch discards the file
pub const STATE_VERSION: u32 = 1;

/// Default location, relative to the vault root
pub const STATE_DIR_NAME: &str = ".ai-history-importer";
pub const STATE_FILE_NAME: &str = "state.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStateItem {
    pub conversation_id: String,
    pub import_key: String,
    pub note_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub imported_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportState {
    pub version: u32,
    /// Keyed by import key
    pub conversations: BTreeMap<String, ImportStateItem>,
}

impl Default for ImportState {
    fn default() -> Self {
        Self { version: STATE_VERSION, conversations: BTreeMap::new() }
    }
}

impl ImportState {
    pub fn get(&self, import_key: &str) -> Option<&ImportStateItem> {
        self.conversations.get(import_key)
    }

    /// `true` if the state saw this exact revision of the conversation
    pub fn is_unchanged(&self, record: &ConversationRecord) -> bool {
        match (self.get(&record.import_key), record.updated_at.as_deref()) {
            (Some(item), Some(updated_at)) => item.updated_at.as_deref() == Some(updated_at),
            _ => false,
        }
    }

    pub fn record_import(&mut self, record: &ConversationRecord, note_path: &str) {
        self.conversations.insert(
            record.import_key.clone(),
            ImportStateItem {
                conversation_id: record.conversation_id.clone(),
                import_key: record.import_key.clone(),
                note_path: note_path.to_string(),
                updated_at: record.updated_at.clone(),
                imported_at: format_iso(&Utc::now()),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    /// Load from `path`
    ///
    /// A missing file, or one written by a different schema version, yields an empty state.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read import state: {}", path.display()))?;
        let state: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse import state: {}", path.display()))?;

        if state.version != STATE_VERSION {
            warn!(
                "Import state version mismatch (expected {}, found {}), starting fresh",
                STATE_VERSION, state.version
            );
            return Ok(Self::default());
        }
        Ok(state)
    }

    /// Save atomically (temp file + rename), creating the parent directory if needed
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create import state directory: {}", parent.display())
            })?;
        }

        let temp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self).context("Failed to serialize import state")?;
        fs::write(&temp, json).context("Failed to write import state temp file")?;
        fs::rename(&temp, path).context("Failed to rename import state temp file")?;
        Ok(())
    }
}
