//! AI History Importer - Turn ChatGPT and Claude data exports into Markdown notes
//!
//! This library parses unpacked AI-assistant exports into a format-independent conversation
//! record and reconciles those records into a note vault. It supports:
//!
//! - Parsing ChatGPT's tree-shaped `conversations.json` (active branch only)
//! - Parsing Claude's flat message lists, including thinking blocks
//! - Locating exported attachment files and copying them next to the notes
//! - Re-importing without duplicates: existing notes are matched by path, by the identity
//!   metadata they carry, or by the persisted import state
//!
//! # Example
//!
//! ```no_run
//! use ai_history_importer::importer::{ExportImportOptions, ImportContext, import_chatgpt_export};
//! use ai_history_importer::io::{FsExportPath, FsExportSource, FsVault, PosixVaultPath};
//! use ai_history_importer::rendering::MarkdownTemplateRenderer;
//!
//! let vault = FsVault::new("/Users/alice/Notes");
//! let ctx = ImportContext {
//!     source: &FsExportSource,
//!     export_path: &FsExportPath,
//!     target: &vault,
//!     vault_path: &PosixVaultPath,
//! };
//! let options = ExportImportOptions::new("/Users/alice/Downloads/chatgpt-export");
//! let result = import_chatgpt_export(&options, &ctx, &MarkdownTemplateRenderer, None)?;
//! println!("Imported {} conversations", result.imported);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod importer;
pub mod indexer;
pub mod io;
pub mod models;
pub mod parsers;
pub mod rendering;
pub mod utils;

// Re-export commonly used types
pub use error::ImportError;
pub use importer::{
    ExportImportOptions, ImportContext, ImportOptions, ImportResult, ImportState,
    import_chatgpt_export, import_claude_export, import_conversation_records,
};
pub use models::{ConversationAttachment, ConversationMessage, ConversationRecord, ConversationRole};
pub use parsers::{ParseOptions, parse_chatgpt_conversations, parse_claude_conversations};
pub use rendering::{MarkdownTemplateRenderer, TemplateRenderer};
