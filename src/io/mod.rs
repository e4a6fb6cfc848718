//! Adapters between the importer and the outside world.
//!
//! The export side is read-only; the vault ("target store") is mutated only by the reconciler.
//! Both are traits so the reconciler can run against the filesystem ([`fs`]) or entirely in
//! memory ([`memory`]).
//!
//! Vault paths are always `/`-separated and relative to the vault root. Export paths are
//! whatever the [`ExportSource`] understands (OS paths for the filesystem adapter).

pub mod fs;
pub mod memory;

use crate::error::Result;

pub use fs::{FsExportPath, FsExportSource, FsVault};
pub use memory::{MemoryExportSource, MemoryFile, MemoryVault, SlashExportPath};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub is_directory: bool,
    pub is_file: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteFile {
    pub path: String,
}

/// Read-only view of an unpacked export
pub trait ExportSource {
    fn read_text(&self, path: &str) -> Result<String>;
    fn read_binary(&self, path: &str) -> Result<Vec<u8>>;
    fn list_dir(&self, path: &str) -> Result<Vec<DirectoryEntry>>;
    fn exists(&self, path: &str) -> Result<bool>;
}

pub trait ExportPathApi {
    fn join(&self, parts: &[&str]) -> String;
}

/// The note store being imported into
pub trait ImportTarget {
    fn list_markdown_files(&self) -> Result<Vec<NoteFile>>;
    fn read_text(&self, path: &str) -> Result<String>;
    /// Create or replace
    fn write_text(&self, path: &str, content: &str) -> Result<()>;
    fn write_binary(&self, path: &str, data: &[u8]) -> Result<()>;
    /// Must tolerate an already existing folder
    fn create_folder(&self, path: &str) -> Result<()>;
    fn exists(&self, path: &str) -> Result<bool>;
}

pub trait VaultPathApi {
    fn join(&self, parts: &[&str]) -> String;
    fn dirname(&self, path: &str) -> String;
    /// Collapse repeated separators and strip a trailing separator
    fn normalize(&self, path: &str) -> String;
}

/// `/`-separated vault paths
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixVaultPath;

impl VaultPathApi for PosixVaultPath {
    fn join(&self, parts: &[&str]) -> String {
        let joined = parts.iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join("/");
        collapse_separators(&joined)
    }

    fn dirname(&self, path: &str) -> String {
        let normalized = collapse_separators(path);
        match normalized.rfind('/') {
            Some(index) if index > 0 => normalized[..index].to_string(),
            _ => String::new(),
        }
    }

    fn normalize(&self, path: &str) -> String {
        let collapsed = collapse_separators(&path.replace('\\', "/"));
        match collapsed.strip_suffix('/') {
            Some(stripped) if !stripped.is_empty() => stripped.to_string(),
            _ => collapsed,
        }
    }
}

fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut last_was_slash = false;
    for ch in path.chars() {
        if ch == '/' {
            if !last_was_slash {
                out.push(ch);
            }
            last_was_slash = true;
        } else {
            out.push(ch);
            last_was_slash = false;
        }
    }
    out
}
