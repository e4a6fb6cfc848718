//! Markdown rendering of conversation records.
//!
//! The template sees a single variable, `conversation`: the record serialized in camelCase.
//! Each attachment's rendered link is exposed as `obsidianLink`.

pub mod template;

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::ConversationRecord;

pub use template::{Template, role_title};

/// Front-matter key the reconciler matches on when looking for an existing note
pub const IDENTITY_KEY: &str = "ai_conversation_id";

pub const DEFAULT_MARKDOWN_TEMPLATE: &str = r#"---
ai_source: "{{ conversation.source }}"
ai_conversation_id: "{{ conversation.conversationId }}"
ai_import_key: "{{ conversation.importKey }}"
created_at: "{{ conversation.createdAt or '' }}"
updated_at: "{{ conversation.updatedAt or '' }}"
---

# {{ conversation.title }}

{% for message in conversation.messages %}
{% if message.createdAt %}
## {{ message.role | roleTitle }} ({{ message.createdAt }})
{% else %}
## {{ message.role | roleTitle }}
{% endif %}

{{ message.content | trim }}
{% if message.attachments.length > 0 %}

### Attachments
{% for attachment in message.attachments %}
{% if attachment.obsidianLink %}
- {{ attachment.obsidianLink }}
{% else %}
- `{{ attachment.id }}`
{% endif %}
{% endfor %}
{% endif %}

{% endfor %}
"#;

static BLANK_LINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").unwrap_or_else(|_| unreachable!()));

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Unclosed {{% {tag} %}} block")]
    UnclosedTag { tag: String },

    #[error("Unexpected {{% {tag} %}}")]
    UnexpectedTag { tag: String },

    #[error("Unknown tag: {tag}")]
    UnknownTag { tag: String },

    #[error("Unknown filter: {name}")]
    UnknownFilter { name: String },

    #[error("Invalid expression `{expr}`: {reason}")]
    InvalidExpression { expr: String, reason: String },

    #[error("Failed to build template context: {0}")]
    Context(#[from] serde_json::Error),
}

/// Turns a record into note text
pub trait TemplateRenderer {
    fn render(&self, template: &str, record: &ConversationRecord) -> Result<String, TemplateError>;
}

/// Renders with [`Template`] and normalizes blank lines
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownTemplateRenderer;

impl TemplateRenderer for MarkdownTemplateRenderer {
    fn render(&self, template: &str, record: &ConversationRecord) -> Result<String, TemplateError> {
        let compiled = Template::compile(template)?;
        let mut context = Map::new();
        context.insert("conversation".to_string(), serde_json::to_value(record)?);
        Ok(normalize_output(&compiled.render(&Value::Object(context))))
    }
}

/// Render `record` with [`DEFAULT_MARKDOWN_TEMPLATE`]
pub fn render_conversation_markdown(record: &ConversationRecord) -> Result<String, TemplateError> {
    MarkdownTemplateRenderer.render(DEFAULT_MARKDOWN_TEMPLATE, record)
}

/// Collapse runs of blank lines and end with exactly one newline
pub fn normalize_output(rendered: &str) -> String {
    let collapsed = BLANK_LINE_RUNS.replace_all(rendered, "\n\n");
    format!("{}\n", collapsed.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConversationAttachment, ConversationMessage, ConversationRole};

    fn message(id: &str, role: ConversationRole, content: &str) -> ConversationMessage {
        ConversationMessage {
            id: id.to_string(),
            role,
            created_at: None,
            content: content.to_string(),
            content_type: None,
            attachments: Vec::new(),
        }
    }

    fn sample_record() -> ConversationRecord {
        let mut assistant = message("m2", ConversationRole::Assistant, "world");
        assistant.attachments = vec![
            ConversationAttachment {
                id: "f1".to_string(),
                link: Some("[[files/a.txt]]".to_string()),
                ..Default::default()
            },
            ConversationAttachment { id: "file-bbb".to_string(), ..Default::default() },
        ];
        let mut user = message("m1", ConversationRole::User, "  hello  ");
        user.created_at = Some("2026-01-01T00:00:00.000Z".to_string());

        let mut record = ConversationRecord::new("chatgpt", "c1", Some("Sample chat"), vec![user, assistant]);
        record.created_at = Some("2026-01-01T00:00:00.000Z".to_string());
        record
    }

    #[test]
    fn test_default_template_renders_identity_block() {
        let output = render_conversation_markdown(&sample_record()).unwrap();
        assert!(output.starts_with("---\nai_source: \"chatgpt\"\nai_conversation_id: \"c1\"\n"));
        assert!(output.contains("ai_import_key: \"chatgpt:c1\""));
        assert!(output.contains("created_at: \"2026-01-01T00:00:00.000Z\""));
        assert!(output.contains("updated_at: \"\""));
        assert!(output.contains("# Sample chat"));
    }

    #[test]
    fn test_default_template_renders_messages_and_attachments() {
        let output = render_conversation_markdown(&sample_record()).unwrap();
        assert!(output.contains("## User (2026-01-01T00:00:00.000Z)\n\nhello\n"));
        assert!(output.contains("## Assistant\n\nworld\n"));
        assert!(output.contains("### Attachments\n- [[files/a.txt]]\n- `file-bbb`\n"));
    }

    #[test]
    fn test_output_normalization() {
        let output = render_conversation_markdown(&sample_record()).unwrap();
        assert!(!output.contains("\n\n\n"));
        assert!(output.ends_with("`file-bbb`\n"));
        assert_eq!(normalize_output("a\n\n\n\nb  \n\n"), "a\n\nb\n");
    }

    #[test]
    fn test_custom_template() {
        let template = "{{ conversation.title | upper }}: {{ conversation.messages.length }}";
        let output = MarkdownTemplateRenderer.render(template, &sample_record()).unwrap();
        assert_eq!(output, "SAMPLE CHAT: 2\n");
    }

    #[test]
    fn test_template_error_message() {
        let err = MarkdownTemplateRenderer.render("{% if x %}", &sample_record()).unwrap_err();
        assert_eq!(err.to_string(), "Unclosed {% if %} block");
    }
}
