//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};
use tempfile::TempDir;

/// Builder for an unpacked export directory
pub struct ExportDirBuilder {
    temp_dir: TempDir,
}

impl ExportDirBuilder {
    /// Create a new builder with an empty export directory
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `conversations.json` verbatim
    pub fn with_conversations_json(self, content: &str) -> Self {
        fs::write(self.temp_dir.path().join("conversations.json"), content)
            .expect("Failed to write conversations.json");
        self
    }

    pub fn with_conversations(self, conversations: &[Value]) -> Self {
        let content = serde_json::to_string_pretty(conversations).expect("Failed to serialize conversations");
        self.with_conversations_json(&content)
    }

    /// Add a file at `relative` (parent directories are created)
    pub fn with_file(self, relative: &str, data: &[u8]) -> Self {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(path, data).expect("Failed to write export file");
        self
    }

    /// Build and return the temp directory (consumes self)
    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for ExportDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one ChatGPT conversation; messages are chained parent to child in order
pub struct ChatGptConversationBuilder {
    id: String,
    title: String,
    create_time: f64,
    update_time: f64,
    nodes: Vec<Value>,
}

impl ChatGptConversationBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            title: "Test chat".to_string(),
            create_time: 1_700_000_000.0,
            update_time: 1_700_000_100.0,
            nodes: Vec::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn update_time(mut self, update_time: f64) -> Self {
        self.update_time = update_time;
        self
    }

    pub fn message(self, role: &str, text: &str) -> Self {
        self.message_with_attachments(role, text, Vec::new())
    }

    /// `attachments` are `(id, name, mime_type)` triples
    pub fn message_with_attachments(mut self, role: &str, text: &str, attachments: Vec<(&str, &str, &str)>) -> Self {
        let index = self.nodes.len() + 1;
        let attachments: Vec<Value> = attachments
            .into_iter()
            .map(|(id, name, mime)| json!({"id": id, "name": name, "mime_type": mime}))
            .collect();
        self.nodes.push(json!({
            "id": format!("n{}", index),
            "parent": if index == 1 { Value::Null } else { json!(format!("n{}", index - 1)) },
            "children": [],
            "message": {
                "id": format!("{}-m{}", self.id, index),
                "author": {"role": role},
                "create_time": self.create_time + index as f64,
                "content": {"content_type": "text", "parts": [text]},
                "metadata": {"attachments": attachments}
            }
        }));
        self
    }

    pub fn build(self) -> Value {
        let current = self.nodes.last().and_then(|n| n["id"].as_str()).map(str::to_string);
        let mapping: serde_json::Map<String, Value> = self
            .nodes
            .into_iter()
            .map(|node| (node["id"].as_str().unwrap_or_default().to_string(), node))
            .collect();
        json!({
            "id": self.id,
            "title": self.title,
            "create_time": self.create_time,
            "update_time": self.update_time,
            "current_node": current,
            "mapping": mapping
        })
    }
}

/// Builder for one Claude conversation
pub struct ClaudeConversationBuilder {
    uuid: String,
    name: String,
    messages: Vec<Value>,
}

impl ClaudeConversationBuilder {
    pub fn new(uuid: &str) -> Self {
        Self { uuid: uuid.to_string(), name: "Claude chat".to_string(), messages: Vec::new() }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// `sender` is `human` or `assistant`
    pub fn text(mut self, sender: &str, text: &str) -> Self {
        let index = self.messages.len() + 1;
        self.messages.push(json!({
            "uuid": format!("{}-m{}", self.uuid, index),
            "sender": sender,
            "text": text,
            "created_at": format!("2024-05-01T10:00:{:02}Z", index)
        }));
        self
    }

    /// Assistant message with a thinking block followed by a text block
    pub fn thinking_reply(mut self, thinking: &str, text: &str) -> Self {
        let index = self.messages.len() + 1;
        self.messages.push(json!({
            "uuid": format!("{}-m{}", self.uuid, index),
            "sender": "assistant",
            "content": [
                {"type": "thinking", "thinking": thinking},
                {"type": "text", "text": text}
            ]
        }));
        self
    }

    pub fn build(self) -> Value {
        json!({
            "uuid": self.uuid,
            "name": self.name,
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-01T10:30:00Z",
            "chat_messages": self.messages
        })
    }
}

/// An empty vault directory
pub fn vault_dir() -> TempDir {
    TempDir::new().expect("Failed to create vault dir")
}

pub fn read_note(vault: &Path, relative: &str) -> String {
    fs::read_to_string(vault.join(relative)).unwrap_or_else(|e| panic!("Failed to read {}: {}", relative, e))
}

/// Every `.md` file under `vault`, relative and `/`-separated, sorted
pub fn markdown_files(vault: &Path) -> Vec<String> {
    let mut files = Vec::new();
    collect_files(vault, vault, &mut files);
    files.retain(|f| f.ends_with(".md"));
    files.sort();
    files
}

/// Every file under `dir`, relative to `vault`, sorted
pub fn files_under(vault: &Path, dir: &str) -> Vec<String> {
    let mut files = Vec::new();
    collect_files(vault, &vault.join(dir), &mut files);
    files.sort();
    files
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path: PathBuf = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out);
        } else if let Ok(relative) = path.strip_prefix(root) {
            let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
            out.push(parts.join("/"));
        }
    }
}

/// A small but realistic ChatGPT export with one resolvable and one missing attachment
pub fn realistic_chatgpt_export() -> TempDir {
    ExportDirBuilder::new()
        .with_conversations(&[
            ChatGptConversationBuilder::new("conv-aaaa1111")
                .title("Trip planning")
                .message_with_attachments("user", "Where is this?", vec![
                    ("file-aaa", "photo.jpg", "image/jpeg"),
                    ("file-bbb", "itinerary.pdf", "application/pdf"),
                ])
                .message("assistant", "Looks like Kyoto.")
                .build(),
            ChatGptConversationBuilder::new("conv-bbbb2222")
                .title("Rust help")
                .message("user", "What is a lifetime?")
                .message("assistant", "A region of code where a reference is valid.")
                .build(),
        ])
        .with_file("file-aaa-photo.jpg", b"\xFF\xD8jpeg")
        .build()
}
