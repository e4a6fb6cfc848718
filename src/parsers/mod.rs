//! Parsers from export JSON to canonical [`ConversationRecord`](crate::models::ConversationRecord)s
//!
//! # Error Handling Strategy
//!
//! This module follows a **graceful degradation** approach:
//!
//! - **Malformed conversations**: array elements that are not conversation objects are logged
//!   and skipped, so one bad element never discards the rest of the export.
//!
//! - **Malformed fields**: individual fields of an unexpected type fall back to their defaults
//!   through the lenient deserializers in [`deserializers`].
//!
//! - **Silent drops**: conversations without an id, repeated ids and conversations with no
//!   retained messages are dropped without a warning; they are expected in real exports.
//!
//! Parsing never fails as a whole. Deciding whether the input is an array at all is the job of
//! the import entry points.

pub mod chatgpt;
pub mod claude;
pub mod deserializers;
pub mod heuristics;

use serde::{Deserialize, Serialize};

pub use chatgpt::{CHATGPT_SOURCE, parse_chatgpt_conversations};
pub use claude::{CLAUDE_SOURCE, parse_claude_conversations};

pub const DEFAULT_THINKING_SEPARATOR: &str = "---";

/// Message filters shared by both export formats
///
/// `include_hidden_messages`, `exclude_reasoning`, `exclude_tool_calls` and
/// `exclude_thought_durations` only affect ChatGPT exports; `exclude_thinking` and
/// `thinking_separator` only affect Claude exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    pub include_system_messages: bool,
    pub include_hidden_messages: bool,
    pub exclude_reasoning: bool,
    pub exclude_tool_calls: bool,
    pub exclude_thought_durations: bool,
    pub exclude_thinking: bool,
    pub thinking_separator: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_system_messages: false,
            include_hidden_messages: false,
            exclude_reasoning: false,
            exclude_tool_calls: false,
            exclude_thought_durations: false,
            exclude_thinking: false,
            thinking_separator: DEFAULT_THINKING_SEPARATOR.to_string(),
        }
    }
}
