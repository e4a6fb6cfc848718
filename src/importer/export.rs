//! Per-format entry points: read the export, parse it, reconcile it

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use super::ImportContext;
use super::options::{ExportImportOptions, ImportResult};
use super::reconciler::import_conversation_records;
use super::state::ImportState;
use crate::error::ImportError;
use crate::indexer::{IndexedAttachmentResolver, build_attachment_index};
use crate::io::{ExportPathApi, ExportSource};
use crate::models::ConversationRecord;
use crate::parsers::{ParseOptions, parse_chatgpt_conversations, parse_claude_conversations};
use crate::rendering::TemplateRenderer;

pub const CONVERSATIONS_FILE: &str = "conversations.json";

/// Trimmed export directory, or [`ImportError::EmptyExportDir`] if blank
pub fn validate_export_dir(export_dir: &str) -> Result<&str, ImportError> {
    let trimmed = export_dir.trim();
    if trimmed.is_empty() {
        return Err(ImportError::EmptyExportDir);
    }
    Ok(trimmed)
}

/// Elements of `<export_dir>/conversations.json`
pub fn read_conversations_file(
    source: &dyn ExportSource,
    export_path: &dyn ExportPathApi,
    export_dir: &str,
) -> Result<Vec<Value>, ImportError> {
    let path = export_path.join(&[export_dir, CONVERSATIONS_FILE]);
    let text = source.read_text(&path)?;
    let value: Value =
        serde_json::from_str(&text).map_err(|source| ImportError::InvalidJson { path: path.clone(), source })?;

    match value {
        Value::Array(conversations) => Ok(conversations),
        _ => Err(ImportError::NotAnArray { path }),
    }
}

/// Parse a ChatGPT export, resolving attachments against the files found within `scan_depth`
pub fn parse_chatgpt_export(
    source: &dyn ExportSource,
    export_path: &dyn ExportPathApi,
    export_dir: &str,
    options: &ParseOptions,
    scan_depth: usize,
) -> Result<Vec<ConversationRecord>> {
    let export_dir = validate_export_dir(export_dir)?;
    let conversations = read_conversations_file(source, export_path, export_dir)?;
    let files = build_attachment_index(source, export_dir, scan_depth)?;

    let mut resolver = IndexedAttachmentResolver::new(files);
    let records = parse_chatgpt_conversations(&conversations, options, &mut resolver);
    info!(
        "Parsed {} ChatGPT conversations from {} ({} export files indexed)",
        records.len(),
        export_dir,
        resolver.indexed_files()
    );
    Ok(records)
}

pub fn parse_claude_export(
    source: &dyn ExportSource,
    export_path: &dyn ExportPathApi,
    export_dir: &str,
    options: &ParseOptions,
) -> Result<Vec<ConversationRecord>> {
    let export_dir = validate_export_dir(export_dir)?;
    let conversations = read_conversations_file(source, export_path, export_dir)?;
    let records = parse_claude_conversations(&conversations, options);
    info!("Parsed {} Claude conversations from {}", records.len(), export_dir);
    Ok(records)
}

/// Import an unpacked ChatGPT export into the vault
///
/// # Errors
///
/// Fails before any vault write if the export directory is blank, the conversations file is
/// missing or not a JSON array, or the export root cannot be listed. Everything after that is
/// reported per conversation in the returned [`ImportResult`].
pub fn import_chatgpt_export(
    options: &ExportImportOptions,
    ctx: &ImportContext<'_>,
    renderer: &dyn TemplateRenderer,
    state: Option<&mut ImportState>,
) -> Result<ImportResult> {
    let records = parse_chatgpt_export(
        ctx.source,
        ctx.export_path,
        &options.export_dir,
        &options.parse,
        options.attachment_scan_depth,
    )
    .context("Failed to read ChatGPT export")?;
    Ok(import_conversation_records(&records, &options.import, ctx, renderer, state))
}

/// Import an unpacked Claude export into the vault
///
/// Same fatal conditions as [`import_chatgpt_export`], minus the attachment scan.
pub fn import_claude_export(
    options: &ExportImportOptions,
    ctx: &ImportContext<'_>,
    renderer: &dyn TemplateRenderer,
    state: Option<&mut ImportState>,
) -> Result<ImportResult> {
    let records = parse_claude_export(ctx.source, ctx.export_path, &options.export_dir, &options.parse)
        .context("Failed to read Claude export")?;
    Ok(import_conversation_records(&records, &options.import, ctx, renderer, state))
}
