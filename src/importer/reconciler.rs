use std::collections::HashSet;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, info, warn};

use super::ImportContext;
use super::attachments::merge_conversation_attachments;
use super::notes::{NoteDestination, NoteIdentityIndex, ensure_vault_folder, resolve_note_destination};
use super::options::{ImportOptions, ImportResult};
use super::state::ImportState;
use crate::error::ImportError;
use crate::models::ConversationRecord;
use crate::rendering::{DEFAULT_MARKDOWN_TEMPLATE, TemplateRenderer};

#[derive(Debug, Clone, PartialEq, Eq)]
enum RecordOutcome {
    Imported(String),
    Skipped(String),
}

/// Default template, or the custom template read through the export source
pub fn load_template(ctx: &ImportContext<'_>, options: &ImportOptions) -> Result<String> {
    match options.custom_template_path.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(DEFAULT_MARKDOWN_TEMPLATE.to_string()),
        Some(path) => ctx
            .source
            .read_text(path)
            .with_context(|| format!("Failed to load template {}", path)),
    }
}

/// Write one note per record into the vault, one record at a time and in input order
///
/// Each record ends imported, skipped or errored. A failure is recorded as
/// `"<conversationId>: <message>"` and the batch moves on to the next record.
///
/// With `state`, recorded note paths are honoured, revisions the state has already seen are
/// skipped, and every imported record refreshes its entry.
pub fn import_conversation_records(
    records: &[ConversationRecord],
    options: &ImportOptions,
    ctx: &ImportContext<'_>,
    renderer: &dyn TemplateRenderer,
    mut state: Option<&mut ImportState>,
) -> ImportResult {
    let template = load_template(ctx, options);
    let mut identities = NoteIdentityIndex::new();
    let mut written_attachments = HashSet::new();
    let mut result = ImportResult::default();

    for record in records {
        let outcome = import_record(
            record,
            &template,
            options,
            ctx,
            renderer,
            state.as_deref(),
            &mut identities,
            &mut written_attachments,
        );

        match outcome {
            Ok(RecordOutcome::Imported(path)) => {
                info!("Imported {} -> {}", record.import_key, path);
                if let Some(state) = state.as_deref_mut() {
                    state.record_import(record, &path);
                }
                result.imported += 1;
            }
            Ok(RecordOutcome::Skipped(path)) => {
                debug!("Skipped {} ({})", record.import_key, path);
                result.skipped += 1;
            }
            Err(e) => {
                let message = format!("{}: {:#}", record.conversation_id, e);
                warn!("Import failed for {}", message);
                result.errors.push(message);
            }
        }
    }

    info!(
        "Import finished: {} imported, {} skipped, {} errors",
        result.imported,
        result.skipped,
        result.errors.len()
    );
    result
}

#[allow(clippy::too_many_arguments)]
fn import_record(
    record: &ConversationRecord,
    template: &Result<String>,
    options: &ImportOptions,
    ctx: &ImportContext<'_>,
    renderer: &dyn TemplateRenderer,
    state: Option<&ImportState>,
    identities: &mut NoteIdentityIndex,
    written_attachments: &mut HashSet<String>,
) -> Result<RecordOutcome> {
    let template = template.as_ref().map_err(|e| anyhow!("{:#}", e))?;
    ensure_vault_folder(ctx.target, ctx.vault_path, &options.notes_directory)?;

    let recorded_path = state.and_then(|s| s.get(&record.import_key)).map(|item| item.note_path.as_str());
    let destination = resolve_note_destination(
        ctx,
        &options.notes_directory,
        &record.title,
        &record.conversation_id,
        recorded_path,
        identities,
    )?;

    if let NoteDestination::Existing(path) = &destination {
        if !options.overwrite_on_reimport {
            return Ok(RecordOutcome::Skipped(path.clone()));
        }
        if state.is_some_and(|s| s.is_unchanged(record)) {
            return Ok(RecordOutcome::Skipped(path.clone()));
        }
    }

    let enriched = merge_conversation_attachments(record, options, ctx, written_attachments)?;
    let markdown = renderer
        .render(template, &enriched)
        .map_err(ImportError::from)
        .with_context(|| format!("Failed to render {}", record.import_key))?;

    let path = destination.path();
    if let NoteDestination::New(path) = &destination {
        ensure_vault_folder(ctx.target, ctx.vault_path, &ctx.vault_path.dirname(path))?;
    }
    ctx.target
        .write_text(path, &markdown)
        .with_context(|| format!("Failed to write note {}", path))?;
    if matches!(destination, NoteDestination::New(_)) {
        identities.insert(&record.conversation_id, path);
    }

    Ok(RecordOutcome::Imported(path.to_string()))
}
