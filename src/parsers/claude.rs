use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ParseOptions;
use crate::models::{
    ClaudeConversation, ClaudeMessage, ConversationMessage, ConversationRecord, ConversationRole,
};
use crate::utils::normalize_timestamp;

pub const CLAUDE_SOURCE: &str = "claude";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Thinking,
    Text,
    Other,
}

impl BlockKind {
    fn from_type(block_type: Option<&str>) -> Self {
        match block_type {
            Some("thinking") => Self::Thinking,
            None | Some("") | Some("text") => Self::Text,
            Some(_) => Self::Other,
        }
    }
}

fn map_role(sender: Option<&str>) -> ConversationRole {
    match sender {
        Some("human") => ConversationRole::User,
        Some("assistant") => ConversationRole::Assistant,
        Some("system") => ConversationRole::System,
        _ => ConversationRole::Unknown,
    }
}

/// Parse the elements of a Claude `conversations.json` array into canonical records
///
/// Claude messages never carry attachments in the canonical record.
pub fn parse_claude_conversations(
    conversations: &[Value],
    options: &ParseOptions,
) -> Vec<ConversationRecord> {
    let mut seen_keys = HashSet::new();
    let mut records = Vec::new();

    for (index, raw) in conversations.iter().enumerate() {
        let conversation = match ClaudeConversation::deserialize(raw) {
            Ok(conversation) => conversation,
            Err(e) => {
                warn!("Skipping malformed Claude conversation at index {}: {}", index, e);
                continue;
            }
        };

        let Some(conversation_id) = conversation.uuid.as_deref().filter(|id| !id.is_empty()) else {
            debug!("Skipping Claude conversation without a uuid at index {}", index);
            continue;
        };

        let mut record = ConversationRecord::new(
            CLAUDE_SOURCE,
            conversation_id,
            conversation.name.as_deref(),
            Vec::new(),
        );
        if !seen_keys.insert(record.import_key.clone()) {
            continue;
        }

        record.messages = conversation
            .chat_messages
            .iter()
            .filter_map(|message| map_message(message, options))
            .filter(|message| !message.content.is_empty())
            .collect();
        if record.messages.is_empty() {
            continue;
        }

        record.created_at = normalize_timestamp(conversation.created_at.as_deref());
        record.updated_at = normalize_timestamp(conversation.updated_at.as_deref());
        records.push(record);
    }

    debug!("Parsed {} Claude conversations from {} input elements", records.len(), conversations.len());
    records
}

fn map_message(message: &ClaudeMessage, options: &ParseOptions) -> Option<ConversationMessage> {
    let id = message.uuid.as_deref().filter(|id| !id.is_empty())?;
    let role = map_role(message.sender.as_deref());
    if role == ConversationRole::System && !options.include_system_messages {
        return None;
    }

    Some(ConversationMessage {
        id: id.to_string(),
        role,
        created_at: normalize_timestamp(message.created_at.as_deref()),
        content: extract_message_text(message, options),
        content_type: message
            .content
            .as_ref()
            .and_then(|blocks| blocks.first())
            .and_then(|block| block.block_type.clone()),
        attachments: Vec::new(),
    })
}

fn trimmed(value: Option<&str>) -> &str {
    value.map(str::trim).unwrap_or_default()
}

/// Joins content blocks with blank lines, putting the thinking separator wherever the stream
/// switches between thinking and text. Falls back to the flat `text` field.
fn extract_message_text(message: &ClaudeMessage, options: &ParseOptions) -> String {
    if let Some(blocks) = &message.content {
        let mut parts: Vec<&str> = Vec::new();
        let mut last_kind: Option<BlockKind> = None;

        for block in blocks {
            let kind = BlockKind::from_type(block.block_type.as_deref());

            if kind == BlockKind::Thinking {
                if options.exclude_thinking {
                    continue;
                }
                let text = match trimmed(block.thinking.as_deref()) {
                    "" => trimmed(block.text.as_deref()),
                    thinking => thinking,
                };
                if text.is_empty() {
                    continue;
                }
                if last_kind.is_some_and(|last| last != BlockKind::Thinking) {
                    parts.push(&options.thinking_separator);
                }
                parts.push(text);
                last_kind = Some(BlockKind::Thinking);
                continue;
            }

            let text = trimmed(block.text.as_deref());
            if text.is_empty() {
                continue;
            }
            if kind == BlockKind::Text && last_kind.is_some_and(|last| last != BlockKind::Text) {
                parts.push(&options.thinking_separator);
            }
            parts.push(text);
            // Tool blocks and other kinds reset the switch tracking
            last_kind = (kind == BlockKind::Text).then_some(BlockKind::Text);
        }

        if !parts.is_empty() {
            return parts.join("\n\n").trim().to_string();
        }
    }

    trimmed(message.text.as_deref()).to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn conversation(uuid: &str, messages: Value) -> Value {
        json!({
            "uuid": uuid,
            "name": "Claude chat",
            "created_at": "2024-05-01T09:00:00.000000+00:00",
            "updated_at": "2024-05-01T09:30:00Z",
            "chat_messages": messages
        })
    }

    fn parse(conversations: &[Value], options: &ParseOptions) -> Vec<ConversationRecord> {
        parse_claude_conversations(conversations, options)
    }

    #[test]
    fn test_basic_conversation() {
        let conv = conversation(
            "c1",
            json!([
                {"uuid": "m1", "sender": "human", "text": " hi ", "created_at": "2024-05-01T09:00:01Z"},
                {"uuid": "m2", "sender": "assistant", "text": "hello"}
            ]),
        );
        let records = parse(&[conv], &ParseOptions::default());
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.import_key, "claude:c1");
        assert_eq!(record.source, "claude");
        assert_eq!(record.created_at.as_deref(), Some("2024-05-01T09:00:00.000Z"));
        assert_eq!(record.updated_at.as_deref(), Some("2024-05-01T09:30:00.000Z"));
        assert_eq!(record.messages[0].role, ConversationRole::User);
        assert_eq!(record.messages[0].content, "hi");
        assert_eq!(record.messages[0].created_at.as_deref(), Some("2024-05-01T09:00:01.000Z"));
        assert_eq!(record.messages[1].role, ConversationRole::Assistant);
        assert!(record.messages.iter().all(|m| m.attachments.is_empty()));
    }

    #[test]
    fn test_role_mapping() {
        assert_eq!(map_role(Some("human")), ConversationRole::User);
        assert_eq!(map_role(Some("system")), ConversationRole::System);
        assert_eq!(map_role(Some("bot")), ConversationRole::Unknown);
        assert_eq!(map_role(None), ConversationRole::Unknown);
    }

    #[test]
    fn test_thinking_blocks_merge_with_separator() {
        let conv = conversation(
            "c1",
            json!([{
                "uuid": "m1",
                "sender": "assistant",
                "text": "fallback",
                "content": [
                    {"type": "thinking", "thinking": "Let me think."},
                    {"type": "thinking", "thinking": "More thought."},
                    {"type": "text", "text": "Answer."},
                    {"type": "thinking", "thinking": "Afterthought."}
                ]
            }]),
        );
        let record = &parse(std::slice::from_ref(&conv), &ParseOptions::default())[0];
        assert_eq!(
            record.messages[0].content,
            "Let me think.\n\nMore thought.\n\n---\n\nAnswer.\n\n---\n\nAfterthought."
        );
        assert_eq!(record.messages[0].content_type.as_deref(), Some("thinking"));

        let custom = ParseOptions { thinking_separator: "***".to_string(), ..ParseOptions::default() };
        let record = &parse(std::slice::from_ref(&conv), &custom)[0];
        assert!(record.messages[0].content.contains("\n\n***\n\nAnswer."));

        let excluded = ParseOptions { exclude_thinking: true, ..ParseOptions::default() };
        let record = &parse(&[conv], &excluded)[0];
        assert_eq!(record.messages[0].content, "Answer.");
    }

    #[test]
    fn test_thinking_falls_back_to_text_field() {
        let conv = conversation(
            "c1",
            json!([{
                "uuid": "m1",
                "sender": "assistant",
                "content": [{"type": "thinking", "text": "in text field"}, {"text": "untyped"}]
            }]),
        );
        let record = &parse(&[conv], &ParseOptions::default())[0];
        assert_eq!(record.messages[0].content, "in text field\n\n---\n\nuntyped");
    }

    #[test]
    fn test_other_blocks_reset_switch_tracking() {
        let conv = conversation(
            "c1",
            json!([{
                "uuid": "m1",
                "sender": "assistant",
                "content": [
                    {"type": "thinking", "thinking": "t"},
                    {"type": "tool_use", "text": "tool"},
                    {"type": "text", "text": "answer"}
                ]
            }]),
        );
        let record = &parse(&[conv], &ParseOptions::default())[0];
        assert_eq!(record.messages[0].content, "t\n\ntool\n\nanswer");
    }

    #[test]
    fn test_empty_blocks_fall_back_to_flat_text() {
        let conv = conversation(
            "c1",
            json!([{"uuid": "m1", "sender": "human", "text": "flat", "content": [{"type": "text", "text": "  "}]}]),
        );
        let record = &parse(&[conv], &ParseOptions::default())[0];
        assert_eq!(record.messages[0].content, "flat");
    }

    #[test]
    fn test_system_messages_and_empty_messages() {
        let conv = conversation(
            "c1",
            json!([
                {"uuid": "m0", "sender": "system", "text": "rules"},
                {"uuid": "m1", "sender": "human", "text": "   "},
                {"uuid": "m2", "sender": "human", "text": "real"},
                {"sender": "human", "text": "no uuid"}
            ]),
        );
        let default = parse(std::slice::from_ref(&conv), &ParseOptions::default());
        assert_eq!(default[0].messages.len(), 1);

        let options = ParseOptions { include_system_messages: true, ..ParseOptions::default() };
        let inclusive = parse(&[conv], &options);
        assert_eq!(inclusive[0].messages.len(), 2);
        assert_eq!(inclusive[0].messages[0].role, ConversationRole::System);
    }

    #[test]
    fn test_dedupe_and_drop() {
        let first = conversation("c1", json!([{"uuid": "m1", "sender": "human", "text": "first"}]));
        let second = conversation("c1", json!([{"uuid": "m1", "sender": "human", "text": "second"}]));
        let empty = conversation("c2", json!([]));
        let records = parse(&[first, second, empty, json!(null)], &ParseOptions::default());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].messages[0].content, "first");
    }

    #[test]
    fn test_unparseable_timestamp_passes_through() {
        let mut conv = conversation("c1", json!([{"uuid": "m1", "sender": "human", "text": "x"}]));
        conv["updated_at"] = json!("sometime");
        let record = &parse(&[conv], &ParseOptions::default())[0];
        assert_eq!(record.updated_at.as_deref(), Some("sometime"));
    }
}
