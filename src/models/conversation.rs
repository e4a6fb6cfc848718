use serde::{Deserialize, Serialize};

pub const UNTITLED_CONVERSATION: &str = "Untitled conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationRole {
    User,
    Assistant,
    System,
    Tool,
    Unknown,
}

impl ConversationRole {
    /// Map a format-native role string; anything outside the closed set is `Unknown`
    pub fn from_export_role(role: &str) -> Self {
        match role {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            "tool" => Self::Tool,
            _ => Self::Unknown,
        }
    }
}

/// An attachment referenced by a message.
///
/// `vault_path` and `link` stay `None` in parser output. They are filled in only on the copy of
/// the record produced by the reconciler's attachment merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAttachment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault_path: Option<String>,
    #[serde(default, rename = "obsidianLink", skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationMessage {
    pub id: String,
    pub role: ConversationRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default)]
    pub attachments: Vec<ConversationAttachment>,
}

impl ConversationMessage {
    /// Parsers never retain a message for which this is false
    pub fn has_payload(&self) -> bool {
        !self.content.is_empty() || !self.attachments.is_empty()
    }
}

/// Format-independent conversation consumed by the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub source: String,
    pub conversation_id: String,
    pub import_key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    pub messages: Vec<ConversationMessage>,
}

impl ConversationRecord {
    pub fn new(
        source: &str,
        conversation_id: &str,
        title: Option<&str>,
        messages: Vec<ConversationMessage>,
    ) -> Self {
        Self {
            source: source.to_string(),
            conversation_id: conversation_id.to_string(),
            import_key: build_import_key(source, conversation_id),
            title: normalize_title(title),
            created_at: None,
            updated_at: None,
            messages,
        }
    }

    pub fn attachments(&self) -> impl Iterator<Item = &ConversationAttachment> {
        self.messages.iter().flat_map(|m| m.attachments.iter())
    }
}

pub fn build_import_key(source: &str, conversation_id: &str) -> String {
    format!("{}:{}", source, conversation_id)
}

/// Trimmed title, or the untitled placeholder when missing or blank
pub fn normalize_title(title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => UNTITLED_CONVERSATION.to_string(),
    }
}
