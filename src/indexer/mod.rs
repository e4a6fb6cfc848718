//! Attachment indexing for unpacked exports
//!
//! # Error Handling Strategy
//!
//! - **Root directory**: failing to list the export root is an error; without it nothing can be
//!   resolved.
//! - **Sub-directories**: unreadable sub-directories are logged and skipped, so one bad folder
//!   only leaves its own attachments unlinked.
//! - **Unresolved attachments**: not an error. The attachment stays in the record without a
//!   source path and is rendered as a bare identifier.

pub mod attachments;

pub use attachments::{
    AttachmentIndexEntry, AttachmentPathResolver, DEFAULT_ATTACHMENT_SCAN_DEPTH,
    IndexedAttachmentResolver, build_attachment_index, matches_attachment_id,
};
