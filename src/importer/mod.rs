//! Reconciling canonical records into a note vault
//!
//! # Error Handling Strategy
//!
//! - **Fatal**: an empty export directory or a conversations file that is not a JSON array stops
//!   the run before anything is written ([`crate::error::ImportError`]).
//! - **Per conversation**: attachment copies, note writes and template failures are caught per
//!   record and reported in [`ImportResult::errors`]; the run moves on.
//! - **Silent**: unresolved attachments stay unlinked and render as bare ids.
//!
//! Records are processed strictly one at a time in input order, so a later conversation sees
//! every note and attachment written by an earlier one.

pub mod attachments;
pub mod export;
pub mod notes;
pub mod options;
pub mod reconciler;
pub mod state;

use crate::io::{ExportPathApi, ExportSource, ImportTarget, VaultPathApi};

pub use attachments::{attachment_link, merge_conversation_attachments};
pub use export::{
    CONVERSATIONS_FILE, import_chatgpt_export, import_claude_export, parse_chatgpt_export,
    parse_claude_export, read_conversations_file, validate_export_dir,
};
pub use notes::{NoteDestination, NoteIdentityIndex, extract_conversation_id, resolve_note_destination};
pub use options::{
    DEFAULT_ATTACHMENTS_DIRECTORY, DEFAULT_NOTES_ROOT, ExportImportOptions, ImportOptions,
    ImportResult,
};
pub use reconciler::{import_conversation_records, load_template};
pub use state::{ImportState, ImportStateItem, STATE_DIR_NAME, STATE_FILE_NAME};

/// The adapters one import run works against
#[derive(Clone, Copy)]
pub struct ImportContext<'a> {
    pub source: &'a dyn ExportSource,
    pub export_path: &'a dyn ExportPathApi,
    pub target: &'a dyn ImportTarget,
    pub vault_path: &'a dyn VaultPathApi,
}
