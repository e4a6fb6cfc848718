//! Note destination resolution and vault folder helpers

use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::ImportContext;
use crate::io::{ImportTarget, VaultPathApi};
use crate::rendering::IDENTITY_KEY;
use crate::utils::{build_conversation_file_name, split_extension};

/// Normalized, without leading separators or surrounding whitespace
pub fn normalize_vault_path(vault_path: &dyn VaultPathApi, input: &str) -> String {
    vault_path.normalize(input).trim_start_matches('/').trim().to_string()
}

/// Create `dir` and every missing ancestor, one segment at a time
pub fn ensure_vault_folder(
    target: &dyn ImportTarget,
    vault_path: &dyn VaultPathApi,
    dir: &str,
) -> Result<()> {
    let normalized = normalize_vault_path(vault_path, dir);
    let mut current = String::new();

    for part in normalized.split('/').filter(|p| !p.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(part);
        if !target.exists(&current)? {
            target
                .create_folder(&current)
                .with_context(|| format!("Failed to create folder {}", current))?;
        }
    }
    Ok(())
}

/// Conversation id recorded in a note's front matter, if any
///
/// Looks for an `ai_conversation_id: "<id>"` line (quotes optional) in a leading `---` block.
pub fn extract_conversation_id(markdown: &str) -> Option<String> {
    let rest = markdown.strip_prefix("---")?;
    let end = rest.find("\n---")?;
    let prefix = format!("{}:", IDENTITY_KEY);

    rest[..end].lines().map(str::trim).find_map(|line| {
        let value = line.strip_prefix(prefix.as_str())?.trim();
        let value = value.strip_prefix(['"', '\'']).unwrap_or(value);
        let value = value.strip_suffix(['"', '\'']).unwrap_or(value);
        Some(value.to_string())
    })
}

/// First free path among `base.md`, `base-2.md`, `base-3.md`, ...
pub fn ensure_unique_note_path(target: &dyn ImportTarget, initial: &str) -> Result<String> {
    if !target.exists(initial)? {
        return Ok(initial.to_string());
    }
    let base = initial.strip_suffix(".md").unwrap_or(initial);
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}.md", base, suffix);
        if !target.exists(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

/// First free path, numbering before the extension: `photo.jpg`, `photo-2.jpg`, ...
pub fn ensure_unique_file_path(target: &dyn ImportTarget, initial: &str) -> Result<String> {
    if !target.exists(initial)? {
        return Ok(initial.to_string());
    }
    let (base, ext) = split_extension(initial);
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}{}", base, suffix, ext);
        if !target.exists(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

/// Where a conversation's note lives, decided before anything is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteDestination {
    /// A note for this conversation already exists here
    Existing(String),
    /// No note yet; this path is free
    New(String),
}

impl NoteDestination {
    pub fn path(&self) -> &str {
        match self {
            Self::Existing(path) | Self::New(path) => path,
        }
    }
}

/// Identity-metadata index over the vault's notes, built on first use and kept current as the
/// run creates notes
///
/// Files inside the notes directory come first, so a match there wins over a stray copy
/// elsewhere in the vault.
#[derive(Debug, Default)]
pub struct NoteIdentityIndex {
    by_conversation_id: Option<HashMap<String, String>>,
}

impl NoteIdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(
        &mut self,
        ctx: &ImportContext<'_>,
        notes_dir: &str,
        conversation_id: &str,
    ) -> Result<Option<String>> {
        if self.by_conversation_id.is_none() {
            self.by_conversation_id = Some(scan_identities(ctx, notes_dir)?);
        }
        Ok(self.by_conversation_id.as_ref().and_then(|index| index.get(conversation_id)).cloned())
    }

    /// Register a note created during this run
    pub fn insert(&mut self, conversation_id: &str, path: &str) {
        if let Some(index) = self.by_conversation_id.as_mut() {
            index.entry(conversation_id.to_string()).or_insert_with(|| path.to_string());
        }
    }
}

fn scan_identities(ctx: &ImportContext<'_>, notes_dir: &str) -> Result<HashMap<String, String>> {
    let files = ctx.target.list_markdown_files().context("Failed to list vault notes")?;
    let normalized_dir = normalize_vault_path(ctx.vault_path, notes_dir);
    let in_notes_dir = |path: &str| {
        !normalized_dir.is_empty()
            && (path == normalized_dir
                || path.strip_prefix(normalized_dir.as_str()).is_some_and(|rest| rest.starts_with('/')))
    };

    let (preferred, fallback): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|file| in_notes_dir(&file.path));

    let mut index = HashMap::new();
    for file in preferred.into_iter().chain(fallback) {
        let content = match ctx.target.read_text(&file.path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Skipping unreadable note during identity scan {}: {}", file.path, e);
                continue;
            }
        };
        if let Some(id) = extract_conversation_id(&content) {
            index.entry(id).or_insert(file.path);
        }
    }

    debug!("Identity scan indexed {} notes", index.len());
    Ok(index)
}

/// `true` only if the note at `path` names a different conversation in its front matter
///
/// Notes without identity metadata are assumed to be ours.
fn belongs_to_other_conversation(ctx: &ImportContext<'_>, path: &str, conversation_id: &str) -> bool {
    match ctx.target.read_text(path) {
        Ok(content) => extract_conversation_id(&content).is_some_and(|id| id != conversation_id),
        Err(_) => false,
    }
}

/// Decide where a record's note goes, without writing anything
///
/// In order: the path recorded in the import state (if the file still exists), the
/// deterministic title/id path unless another conversation's note occupies it, a note
/// elsewhere whose front matter carries the conversation id, and finally a fresh path numbered
/// until free.
pub fn resolve_note_destination(
    ctx: &ImportContext<'_>,
    notes_dir: &str,
    title: &str,
    conversation_id: &str,
    recorded_path: Option<&str>,
    identities: &mut NoteIdentityIndex,
) -> Result<NoteDestination> {
    if let Some(recorded) = recorded_path.map(|p| normalize_vault_path(ctx.vault_path, p))
        && !recorded.is_empty()
        && ctx.target.exists(&recorded)?
    {
        return Ok(NoteDestination::Existing(recorded));
    }

    let file_name = build_conversation_file_name(title, conversation_id);
    let requested = normalize_vault_path(ctx.vault_path, &ctx.vault_path.join(&[notes_dir, &file_name]));
    if ctx.target.exists(&requested)? && !belongs_to_other_conversation(ctx, &requested, conversation_id) {
        return Ok(NoteDestination::Existing(requested));
    }

    if let Some(found) = identities.find(ctx, notes_dir, conversation_id)? {
        debug!("Matched conversation {} to existing note {}", conversation_id, found);
        return Ok(NoteDestination::Existing(found));
    }

    Ok(NoteDestination::New(ensure_unique_note_path(ctx.target, &requested)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{MemoryExportSource, MemoryVault, PosixVaultPath, SlashExportPath};

    fn note(id: &str) -> String {
        format!("---\nai_source: \"chatgpt\"\nai_conversation_id: \"{}\"\n---\n\n# Title\n", id)
    }

    #[test]
    fn test_extract_conversation_id_variants() {
        assert_eq!(extract_conversation_id(&note("c1")).as_deref(), Some("c1"));
        assert_eq!(
            extract_conversation_id("---\nai_conversation_id: abc:def\n---\n").as_deref(),
            Some("abc:def")
        );
        assert_eq!(
            extract_conversation_id("---\n  ai_conversation_id: 'single'\n---\n").as_deref(),
            Some("single")
        );
    }

    #[test]
    fn test_extract_conversation_id_requires_front_matter() {
        assert!(extract_conversation_id("ai_conversation_id: \"c1\"\n").is_none());
        assert!(extract_conversation_id("---\nai_conversation_id: \"c1\"\n").is_none());
        assert!(extract_conversation_id("---\ntitle: x\n---\nai_conversation_id: \"c1\"\n").is_none());
    }

    #[test]
    fn test_ensure_vault_folder_creates_each_segment() {
        let vault = MemoryVault::new();
        ensure_vault_folder(&vault, &PosixVaultPath, "/AI Chat History//ChatGPT/").unwrap();
        assert!(vault.has_folder("AI Chat History"));
        assert!(vault.has_folder("AI Chat History/ChatGPT"));
        ensure_vault_folder(&vault, &PosixVaultPath, "").unwrap();
    }

    #[test]
    fn test_unique_paths() {
        let vault = MemoryVault::new();
        vault.insert_text("notes/a.md", "1");
        vault.insert_text("notes/a-2.md", "2");
        vault.insert_text("files/photo.jpg", "x");
        vault.insert_text("files/README", "x");
        assert_eq!(ensure_unique_note_path(&vault, "notes/a.md").unwrap(), "notes/a-3.md");
        assert_eq!(ensure_unique_note_path(&vault, "notes/b.md").unwrap(), "notes/b.md");
        assert_eq!(ensure_unique_file_path(&vault, "files/photo.jpg").unwrap(), "files/photo-2.jpg");
        assert_eq!(ensure_unique_file_path(&vault, "files/README").unwrap(), "files/README-2");
    }

    fn resolve(vault: &MemoryVault, recorded: Option<&str>, index: &mut NoteIdentityIndex) -> NoteDestination {
        let source = MemoryExportSource::new();
        let ctx = ImportContext {
            source: &source,
            export_path: &SlashExportPath,
            target: vault,
            vault_path: &PosixVaultPath,
        };
        resolve_note_destination(&ctx, "notes", "My Chat", "conv-12345678", recorded, index).unwrap()
    }

    #[test]
    fn test_resolution_order() {
        let vault = MemoryVault::new();
        assert_eq!(
            resolve(&vault, None, &mut NoteIdentityIndex::new()),
            NoteDestination::New("notes/My Chat-conv-123.md".to_string())
        );

        vault.insert_text("elsewhere/renamed.md", &note("conv-12345678"));
        assert_eq!(
            resolve(&vault, None, &mut NoteIdentityIndex::new()),
            NoteDestination::Existing("elsewhere/renamed.md".to_string())
        );

        vault.insert_text("notes/My Chat-conv-123.md", "no front matter");
        assert_eq!(
            resolve(&vault, None, &mut NoteIdentityIndex::new()),
            NoteDestination::Existing("notes/My Chat-conv-123.md".to_string())
        );

        vault.insert_text("moved/by-hand.md", "anything");
        assert_eq!(
            resolve(&vault, Some("moved/by-hand.md"), &mut NoteIdentityIndex::new()),
            NoteDestination::Existing("moved/by-hand.md".to_string())
        );
        assert_eq!(
            resolve(&vault, Some("gone.md"), &mut NoteIdentityIndex::new()),
            NoteDestination::Existing("notes/My Chat-conv-123.md".to_string())
        );
    }

    #[test]
    fn test_identity_scan_prefers_notes_directory() {
        let vault = MemoryVault::new();
        vault.insert_text("archive/copy.md", &note("conv-12345678"));
        vault.insert_text("notes/sub/original.md", &note("conv-12345678"));
        assert_eq!(
            resolve(&vault, None, &mut NoteIdentityIndex::new()),
            NoteDestination::Existing("notes/sub/original.md".to_string())
        );
    }

    #[test]
    fn test_identity_scan_ignores_sibling_prefix_directory() {
        let vault = MemoryVault::new();
        vault.insert_text("notes-old/a.md", &note("conv-12345678"));
        vault.insert_text("notes/b.md", &note("conv-12345678"));
        assert_eq!(
            resolve(&vault, None, &mut NoteIdentityIndex::new()),
            NoteDestination::Existing("notes/b.md".to_string())
        );
    }

    #[test]
    fn test_path_taken_by_other_conversation_is_numbered() {
        let vault = MemoryVault::new();
        vault.insert_text("notes/My Chat-conv-123.md", &note("conv-12399999"));
        assert_eq!(
            resolve(&vault, None, &mut NoteIdentityIndex::new()),
            NoteDestination::New("notes/My Chat-conv-123-2.md".to_string())
        );
    }

    #[test]
    fn test_identity_index_tracks_inserted_notes() {
        let vault = MemoryVault::new();
        let mut index = NoteIdentityIndex::new();
        assert_eq!(
            resolve(&vault, None, &mut index),
            NoteDestination::New("notes/My Chat-conv-123.md".to_string())
        );
        index.insert("conv-12345678", "notes/created.md");
        assert_eq!(
            resolve(&vault, None, &mut index),
            NoteDestination::Existing("notes/created.md".to_string())
        );
    }
}
