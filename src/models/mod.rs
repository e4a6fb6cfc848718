//! Data models for AI chat exports and the canonical conversation record.
//!
//! - [`ConversationRecord`], [`ConversationMessage`], [`ConversationAttachment`] - the
//!   format-independent shapes handed to the reconciler
//! - [`chatgpt`] - raw tree-graph export shapes
//! - [`claude`] - raw flat-list export shapes
//!
//! Raw shapes use the lenient deserializers in `parsers::deserializers` so that one odd field
//! does not discard a whole conversation.

pub mod chatgpt;
pub mod claude;
pub mod conversation;

pub use chatgpt::{
    ChatGptAttachment, ChatGptConversation, ChatGptMappingNode, ChatGptMessage, ContentKind,
};
pub use claude::{ClaudeContentBlock, ClaudeConversation, ClaudeMessage};
pub use conversation::{
    ConversationAttachment, ConversationMessage, ConversationRecord, ConversationRole,
    UNTITLED_CONVERSATION, build_import_key, normalize_title,
};
