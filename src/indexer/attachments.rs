use std::collections::HashMap;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::io::ExportSource;

/// Default number of directory levels scanned below the export root
pub const DEFAULT_ATTACHMENT_SCAN_DEPTH: usize = 6;

/// Dependency-manager caches that can end up inside an unpacked export
const SKIPPED_DIRECTORIES: &[&str] = &["node_modules", ".pnpm-store"];

/// Alternate-data-stream markers left behind when a zip is extracted on Windows/WSL
const ZONE_IDENTIFIER_SUFFIX: &str = ":Zone.Identifier";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentIndexEntry {
    pub name: String,
    pub path: String,
}

/// Enumerate files under `export_dir`, at most `max_depth` directory levels deep
///
/// Depth 0 lists only the files directly in `export_dir`. Traversal uses an explicit stack, so
/// deep or wide trees never grow the call stack.
///
/// # Errors
///
/// Returns an error if `export_dir` itself cannot be listed. Sub-directories that cannot be
/// listed are logged and skipped.
pub fn build_attachment_index(
    source: &dyn ExportSource,
    export_dir: &str,
    max_depth: usize,
) -> Result<Vec<AttachmentIndexEntry>> {
    let mut files = Vec::new();
    let mut stack: Vec<(String, usize)> = vec![(export_dir.to_string(), 0)];

    while let Some((dir, depth)) = stack.pop() {
        if depth > max_depth {
            continue;
        }

        let entries = if depth == 0 {
            source
                .list_dir(&dir)
                .with_context(|| format!("Failed to list export directory: {}", dir))?
        } else {
            match source.list_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Skipping unreadable export directory {}: {}", dir, e);
                    continue;
                }
            }
        };

        for entry in entries {
            if SKIPPED_DIRECTORIES.contains(&entry.name.as_str()) {
                continue;
            }
            if entry.is_directory {
                stack.push((entry.path, depth + 1));
                continue;
            }
            if !entry.is_file || entry.name.ends_with(ZONE_IDENTIFIER_SUFFIX) {
                continue;
            }
            files.push(AttachmentIndexEntry { name: entry.name, path: entry.path });
        }
    }

    debug!("Indexed {} export files under {} (depth {})", files.len(), export_dir, max_depth);
    Ok(files)
}

/// `true` if `file_name` starts with `attachment_id` and the id is followed by nothing, `-`
/// or `.`
///
/// The boundary check keeps `file-ab` from matching `file-abc.png`.
pub fn matches_attachment_id(file_name: &str, attachment_id: &str) -> bool {
    !attachment_id.is_empty()
        && file_name.starts_with(attachment_id)
        && matches!(file_name.as_bytes().get(attachment_id.len()), None | Some(b'-') | Some(b'.'))
}

/// Maps an attachment id to a file path inside the export
pub trait AttachmentPathResolver {
    fn resolve(&mut self, attachment_id: &str) -> Option<String>;
}

impl<F> AttachmentPathResolver for F
where
    F: FnMut(&str) -> Option<String>,
{
    fn resolve(&mut self, attachment_id: &str) -> Option<String> {
        self(attachment_id)
    }
}

/// Resolver over an attachment index, memoizing hits and misses for one import run
#[derive(Debug, Default)]
pub struct IndexedAttachmentResolver {
    files: Vec<AttachmentIndexEntry>,
    cache: HashMap<String, Option<String>>,
    scans: usize,
}

impl IndexedAttachmentResolver {
    pub fn new(files: Vec<AttachmentIndexEntry>) -> Self {
        Self { files, cache: HashMap::new(), scans: 0 }
    }

    pub fn indexed_files(&self) -> usize {
        self.files.len()
    }

    /// Number of linear scans performed (cache misses)
    pub fn scans(&self) -> usize {
        self.scans
    }
}

impl AttachmentPathResolver for IndexedAttachmentResolver {
    fn resolve(&mut self, attachment_id: &str) -> Option<String> {
        if let Some(cached) = self.cache.get(attachment_id) {
            return cached.clone();
        }

        self.scans += 1;
        let found = self
            .files
            .iter()
            .find(|entry| matches_attachment_id(&entry.name, attachment_id))
            .map(|entry| entry.path.clone());
        self.cache.insert(attachment_id.to_string(), found.clone());
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryExportSource;

    fn nested_source() -> MemoryExportSource {
        MemoryExportSource::new()
            .with_text("/export/conversations.json", "[]")
            .with_binary("/export/file-root.png", &[0])
            .with_binary("/export/a/file-one.png", &[1])
            .with_binary("/export/a/b/file-two.png", &[2])
            .with_binary("/export/a/b/c/file-three.png", &[3])
    }

    fn names(entries: &[AttachmentIndexEntry]) -> Vec<&str> {
        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    #[test]
    fn test_index_depth_zero_lists_root_only() {
        let index = build_attachment_index(&nested_source(), "/export", 0).unwrap();
        assert_eq!(names(&index), vec!["conversations.json", "file-root.png"]);
    }

    #[test]
    fn test_index_respects_each_depth() {
        let source = nested_source();
        for (depth, expected) in [(1, 3), (2, 4), (3, 5), (6, 5)] {
            let index = build_attachment_index(&source, "/export", depth).unwrap();
            assert_eq!(index.len(), expected, "depth {}", depth);
        }
    }

    #[test]
    fn test_index_skips_housekeeping_entries() {
        let source = MemoryExportSource::new()
            .with_binary("/export/file-a.png", &[1])
            .with_binary("/export/file-a.png:Zone.Identifier", &[0])
            .with_binary("/export/node_modules/file-b.png", &[2]);
        let index = build_attachment_index(&source, "/export", 6).unwrap();
        assert_eq!(names(&index), vec!["file-a.png"]);
    }

    #[test]
    fn test_index_missing_root_is_error() {
        let source = MemoryExportSource::new();
        let err = build_attachment_index(&source, "/missing", 6).unwrap_err();
        assert!(err.to_string().contains("Failed to list export directory"));
    }

    #[test]
    fn test_matches_attachment_id_boundaries() {
        assert!(matches_attachment_id("file-aaa", "file-aaa"));
        assert!(matches_attachment_id("file-aaa-photo.jpg", "file-aaa"));
        assert!(matches_attachment_id("file-aaa.jpg", "file-aaa"));
        assert!(!matches_attachment_id("file-aaab.jpg", "file-aaa"));
        assert!(!matches_attachment_id("file-aa", "file-aaa"));
        assert!(!matches_attachment_id("anything.jpg", ""));
    }

    #[test]
    fn test_resolver_prefix_disambiguation() {
        let mut resolver = IndexedAttachmentResolver::new(vec![
            AttachmentIndexEntry { name: "file-abc123.png".into(), path: "/export/file-abc123.png".into() },
            AttachmentIndexEntry { name: "file-abc-photo.png".into(), path: "/export/file-abc-photo.png".into() },
        ]);
        assert_eq!(resolver.resolve("file-abc").as_deref(), Some("/export/file-abc-photo.png"));
        assert_eq!(resolver.resolve("file-abc123").as_deref(), Some("/export/file-abc123.png"));
    }

    #[test]
    fn test_resolver_caches_hits_and_misses() {
        let mut resolver = IndexedAttachmentResolver::new(vec![AttachmentIndexEntry {
            name: "file-aaa-photo.jpg".into(),
            path: "/export/file-aaa-photo.jpg".into(),
        }]);
        assert!(resolver.resolve("file-aaa").is_some());
        assert!(resolver.resolve("file-aaa").is_some());
        assert!(resolver.resolve("file-bbb").is_none());
        assert!(resolver.resolve("file-bbb").is_none());
        assert_eq!(resolver.scans(), 2);
    }

    #[test]
    fn test_closure_resolver() {
        let mut resolver = |id: &str| (id == "x").then(|| "/export/x.png".to_string());
        assert_eq!(AttachmentPathResolver::resolve(&mut resolver, "x").as_deref(), Some("/export/x.png"));
        assert!(AttachmentPathResolver::resolve(&mut resolver, "y").is_none());
    }
}
