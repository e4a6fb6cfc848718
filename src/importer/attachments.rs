use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use tracing::debug;

use super::ImportContext;
use super::notes::{ensure_unique_file_path, ensure_vault_folder, normalize_vault_path};
use super::options::ImportOptions;
use crate::models::{ConversationAttachment, ConversationRecord};
use crate::utils::{build_attachment_file_name, is_image_mime_type, split_extension};

/// Vault link for a copied attachment: embedded for images, a plain link otherwise
pub fn attachment_link(vault_path: &str, mime_type: Option<&str>) -> String {
    if is_image_mime_type(mime_type) {
        format!("![[{}]]", vault_path)
    } else {
        format!("[[{}]]", vault_path)
    }
}

/// Copy each resolved attachment into the vault and return an enriched copy of `record`
///
/// Attachments without a source path are left untouched. An id seen twice within the
/// conversation is copied once and linked twice. An occupied destination is replaced when
/// overwriting is enabled and numbered (`-2`, `-3`, ...) otherwise.
///
/// `written` holds every destination written so far in the run. Those files are never
/// replaced, even when overwriting: the next numbered name not written this run is used.
pub fn merge_conversation_attachments(
    record: &ConversationRecord,
    options: &ImportOptions,
    ctx: &ImportContext<'_>,
    written: &mut HashSet<String>,
) -> Result<ConversationRecord> {
    let attachments_root = normalize_vault_path(ctx.vault_path, &options.attachments_directory);
    let mut copied_by_id: HashMap<String, String> = HashMap::new();
    let mut enriched = record.clone();

    for attachment in enriched.messages.iter_mut().flat_map(|m| m.attachments.iter_mut()) {
        let Some(source_path) = attachment.source_path.clone() else {
            continue;
        };

        let vault_path = match copied_by_id.get(&attachment.id) {
            Some(path) => path.clone(),
            None => {
                let path = copy_attachment(attachment, &source_path, &attachments_root, options, ctx, written)?;
                copied_by_id.insert(attachment.id.clone(), path.clone());
                path
            }
        };

        attachment.link = Some(attachment_link(&vault_path, attachment.mime_type.as_deref()));
        attachment.vault_path = Some(vault_path);
    }

    Ok(enriched)
}

fn copy_attachment(
    attachment: &ConversationAttachment,
    source_path: &str,
    attachments_root: &str,
    options: &ImportOptions,
    ctx: &ImportContext<'_>,
    written: &mut HashSet<String>,
) -> Result<String> {
    let file_name = build_attachment_file_name(attachment.name.as_deref(), source_path, &attachment.id);
    let initial = if attachments_root.is_empty() {
        file_name
    } else {
        ctx.vault_path.join(&[attachments_root, &file_name])
    };

    let destination = if options.overwrite_on_reimport {
        first_unwritten_path(&initial, written)
    } else {
        ensure_unique_file_path(ctx.target, &initial)?
    };

    let data = ctx
        .source
        .read_binary(source_path)
        .with_context(|| format!("Failed to read attachment {}", source_path))?;
    ensure_vault_folder(ctx.target, ctx.vault_path, &ctx.vault_path.dirname(&destination))?;
    ctx.target
        .write_binary(&destination, &data)
        .with_context(|| format!("Failed to write attachment {}", destination))?;

    debug!("Copied attachment {} -> {}", attachment.id, destination);
    written.insert(destination.clone());
    Ok(ctx.vault_path.normalize(&destination))
}

/// `initial`, or its first numbered variant that this run has not written yet
fn first_unwritten_path(initial: &str, written: &HashSet<String>) -> String {
    if !written.contains(initial) {
        return initial.to_string();
    }
    let (base, ext) = split_extension(initial);
    (2..)
        .map(|suffix| format!("{}-{}{}", base, suffix, ext))
        .find(|candidate| !written.contains(candidate))
        .unwrap_or_default()
}
