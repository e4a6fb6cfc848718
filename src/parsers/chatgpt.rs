use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ParseOptions;
use super::heuristics::{is_thought_duration_line, is_tool_call_payload};
use crate::indexer::AttachmentPathResolver;
use crate::models::{
    ChatGptConversation, ChatGptMappingNode, ChatGptMessage, ContentKind, ConversationAttachment,
    ConversationMessage, ConversationRecord, ConversationRole,
};
use crate::utils::epoch_seconds_to_iso;

pub const CHATGPT_SOURCE: &str = "chatgpt";

/// Parse the elements of a ChatGPT `conversations.json` array into canonical records
///
/// Only the active branch of each conversation graph is kept: the chain of `parent` links from
/// `current_node` back to the root. Conversations without a usable `current_node` fall back to
/// every node in the mapping.
///
/// Elements that are not conversation objects are logged and skipped. Conversations without an
/// id, repeated ids (first occurrence wins) and conversations left with no messages after
/// filtering are dropped silently.
pub fn parse_chatgpt_conversations(
    conversations: &[Value],
    options: &ParseOptions,
    resolver: &mut dyn AttachmentPathResolver,
) -> Vec<ConversationRecord> {
    let mut seen_keys = HashSet::new();
    let mut records = Vec::new();
    let mut malformed = 0usize;

    for (index, raw) in conversations.iter().enumerate() {
        let conversation = match ChatGptConversation::deserialize(raw) {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!("Skipping malformed ChatGPT conversation at index {}: {}", index, e);
                malformed += 1;
                continue;
            }
        };

        let Some(conversation_id) = conversation.native_id() else {
            debug!("Skipping ChatGPT conversation without an id at index {}", index);
            continue;
        };

        let mut record = ConversationRecord::new(
            CHATGPT_SOURCE,
            conversation_id,
            conversation.title.as_deref(),
            Vec::new(),
        );
        if !seen_keys.insert(record.import_key.clone()) {
            continue;
        }

        record.messages = select_path_nodes(&conversation, conversation_id)
            .into_iter()
            .filter_map(|node| map_message(node, options, resolver))
            .filter(ConversationMessage::has_payload)
            .collect();
        if record.messages.is_empty() {
            continue;
        }

        record.created_at = conversation.create_time.and_then(epoch_seconds_to_iso);
        record.updated_at = conversation.update_time.and_then(epoch_seconds_to_iso);
        records.push(record);
    }

    debug!(
        "Parsed {} ChatGPT conversations ({} of {} input elements malformed)",
        records.len(),
        malformed,
        conversations.len()
    );
    records
}

/// Nodes on the active path, root first
fn select_path_nodes<'a>(
    conversation: &'a ChatGptConversation,
    conversation_id: &str,
) -> Vec<&'a ChatGptMappingNode> {
    let mapping = &conversation.mapping;
    let Some(current) = conversation.current_node.as_deref().filter(|id| mapping.contains_key(*id))
    else {
        return mapping.values().collect();
    };

    let mut visited = HashSet::new();
    let mut ordered = Vec::new();
    let mut node_id = Some(current);

    while let Some(id) = node_id {
        if !visited.insert(id) {
            warn!("Cyclic parent chain at node {} in conversation {}", id, conversation_id);
            break;
        }
        let Some(node) = mapping.get(id) else {
            break;
        };
        ordered.push(node);
        node_id = node.parent.as_deref().filter(|parent| !parent.is_empty());
    }

    ordered.reverse();
    ordered
}

fn map_message(
    node: &ChatGptMappingNode,
    options: &ParseOptions,
    resolver: &mut dyn AttachmentPathResolver,
) -> Option<ConversationMessage> {
    let message = node.message.as_ref()?;
    let id = message.id.as_deref().filter(|id| !id.is_empty())?;

    let role = message.role().unwrap_or("unknown");
    if role == "system" && !options.include_system_messages {
        return None;
    }

    let kind = ContentKind::from_tag(message.content_type());
    if kind.is_skipped() {
        return None;
    }
    if message.is_visually_hidden() && !options.include_hidden_messages {
        return None;
    }
    if options.exclude_reasoning && kind.is_reasoning() {
        return None;
    }
    if options.exclude_tool_calls && is_tool_call_payload(text_fields(message)) {
        return None;
    }

    let content = extract_message_text(kind, message.content.as_ref());
    if options.exclude_thought_durations && is_thought_duration_line(&content) {
        return None;
    }

    let attachments = message
        .metadata
        .iter()
        .flat_map(|metadata| metadata.attachments.iter())
        .filter_map(|attachment| {
            let id = attachment.id.as_deref().filter(|id| !id.is_empty())?;
            Some(ConversationAttachment {
                id: id.to_string(),
                name: attachment.name.clone(),
                mime_type: attachment.mime_type.clone(),
                source_path: resolver.resolve(id),
                size_bytes: attachment.size,
                ..Default::default()
            })
        })
        .collect();

    Some(ConversationMessage {
        id: id.to_string(),
        role: ConversationRole::from_export_role(role),
        created_at: message.create_time.and_then(epoch_seconds_to_iso),
        content,
        content_type: message.content_type().map(str::to_string),
        attachments,
    })
}

/// Every string the payload carries as text, whatever its content type
fn text_fields(message: &ChatGptMessage) -> Vec<&str> {
    let Some(content) = message.content.as_ref() else {
        return Vec::new();
    };

    let mut fields: Vec<&str> = content
        .get("parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    fields.extend(["text", "content"].iter().filter_map(|key| content.get(*key).and_then(Value::as_str)));
    fields
}

fn string_field(content: &Value, key: &str) -> String {
    content.get(key).and_then(Value::as_str).map(|s| s.trim().to_string()).unwrap_or_default()
}

fn extract_message_text(kind: ContentKind, content: Option<&Value>) -> String {
    let Some(content) = content else {
        return String::new();
    };

    match kind {
        ContentKind::Text | ContentKind::MultimodalText => content
            .get("parts")
            .and_then(Value::as_array)
            .map(|parts| {
                parts.iter().filter_map(Value::as_str).collect::<Vec<_>>().join("\n\n").trim().to_string()
            })
            .unwrap_or_default(),
        ContentKind::Code | ContentKind::ExecutionOutput => string_field(content, "text"),
        ContentKind::ReasoningRecap => string_field(content, "content"),
        ContentKind::Thoughts | ContentKind::UserEditableContext | ContentKind::Unknown => pretty_json(content),
    }
}

fn pretty_json(content: &Value) -> String {
    serde_json::to_string_pretty(content).unwrap_or_default()
}
