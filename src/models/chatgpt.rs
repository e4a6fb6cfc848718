//! Raw shapes of the ChatGPT `conversations.json` export (tree-graph format).

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatGptConversation {
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub conversation_id: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_epoch_seconds")]
    pub create_time: Option<f64>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_epoch_seconds")]
    pub update_time: Option<f64>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub current_node: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_map")]
    pub mapping: BTreeMap<String, ChatGptMappingNode>,
}

impl ChatGptConversation {
    /// `id` when present and non-empty, else `conversation_id`
    pub fn native_id(&self) -> Option<&str> {
        [self.id.as_deref(), self.conversation_id.as_deref()]
            .into_iter()
            .flatten()
            .find(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatGptMappingNode {
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_vec")]
    pub children: Vec<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_option")]
    pub message: Option<ChatGptMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatGptAuthor {
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatGptMessage {
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_option")]
    pub author: Option<ChatGptAuthor>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_epoch_seconds")]
    pub create_time: Option<f64>,
    /// Kept raw: the payload shape depends on `content_type`
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_option")]
    pub metadata: Option<ChatGptMessageMetadata>,
}

impl ChatGptMessage {
    pub fn role(&self) -> Option<&str> {
        self.author.as_ref().and_then(|a| a.role.as_deref())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.get("content_type")).and_then(Value::as_str)
    }

    pub fn is_visually_hidden(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.is_visually_hidden_from_conversation)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatGptMessageMetadata {
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_vec")]
    pub attachments: Vec<ChatGptAttachment>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_truthy")]
    pub is_visually_hidden_from_conversation: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatGptAttachment {
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_string")]
    pub mime_type: Option<String>,
    #[serde(default, deserialize_with = "crate::parsers::deserializers::deserialize_lenient_u64")]
    pub size: Option<u64>,
}

/// Known `content.content_type` tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    MultimodalText,
    Code,
    ExecutionOutput,
    ReasoningRecap,
    Thoughts,
    /// Injected by the export editor ("custom instructions" context)
    UserEditableContext,
    Unknown,
}

impl ContentKind {
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("text") => Self::Text,
            Some("multimodal_text") => Self::MultimodalText,
            Some("code") => Self::Code,
            Some("execution_output") => Self::ExecutionOutput,
            Some("reasoning_recap") => Self::ReasoningRecap,
            Some("thoughts") => Self::Thoughts,
            Some("user_editable_context") => Self::UserEditableContext,
            _ => Self::Unknown,
        }
    }

    /// Content types never imported, regardless of options
    pub fn is_skipped(self) -> bool {
        matches!(self, Self::UserEditableContext)
    }

    /// Model reasoning rather than a reply
    pub fn is_reasoning(self) -> bool {
        matches!(self, Self::Thoughts | Self::ReasoningRecap)
    }
}
