//! In-memory adapters, used by tests and by embedders that stage imports before flushing.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::io;

use super::{DirectoryEntry, ExportPathApi, ExportSource, ImportTarget, NoteFile};
use crate::error::{ImportError, Result};

/// An export tree held in memory. Adding a file registers every parent directory.
#[derive(Debug, Clone, Default)]
pub struct MemoryExportSource {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeMap<String, Vec<DirectoryEntry>>,
}

impl MemoryExportSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, path: &str, content: &str) -> Self {
        self.add_file(path, content.as_bytes().to_vec());
        self
    }

    pub fn with_binary(mut self, path: &str, data: &[u8]) -> Self {
        self.add_file(path, data.to_vec());
        self
    }

    pub fn add_file(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(path.to_string(), data);
        self.register(path, false);
    }

    fn register(&mut self, path: &str, is_directory: bool) {
        let Some(index) = path.rfind('/') else {
            return;
        };
        let parent = &path[..index];
        if parent.is_empty() {
            return;
        }
        let name = &path[index + 1..];
        let entries = self.dirs.entry(parent.to_string()).or_default();
        if entries.iter().any(|e| e.name == name) {
            return;
        }
        entries.push(DirectoryEntry {
            name: name.to_string(),
            path: path.to_string(),
            is_directory,
            is_file: !is_directory,
        });
        let parent = parent.to_string();
        self.register(&parent, true);
    }
}

impl ExportSource for MemoryExportSource {
    fn read_text(&self, path: &str) -> Result<String> {
        let data = self.read_binary(path)?;
        String::from_utf8(data).map_err(|e| ImportError::Io {
            path: path.to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, e),
        })
    }

    fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| ImportError::NotFound { path: path.to_string() })
    }

    fn list_dir(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        self.dirs.get(path).cloned().ok_or_else(|| ImportError::NotFound { path: path.to_string() })
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.contains_key(path) || self.dirs.contains_key(path))
    }
}

/// Joins with `/`, for use with [`MemoryExportSource`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SlashExportPath;

impl ExportPathApi for SlashExportPath {
    fn join(&self, parts: &[&str]) -> String {
        let joined = parts.iter().filter(|p| !p.is_empty()).copied().collect::<Vec<_>>().join("/");
        let mut out = String::with_capacity(joined.len());
        for ch in joined.chars() {
            if ch == '/' && out.ends_with('/') {
                continue;
            }
            out.push(ch);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryFile {
    Text(String),
    Binary(Vec<u8>),
}

/// A vault held in memory
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: RefCell<BTreeMap<String, MemoryFile>>,
    folders: RefCell<BTreeSet<String>>,
    failing_prefixes: RefCell<Vec<String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_text(&self, path: &str, content: &str) {
        self.files.borrow_mut().insert(path.to_string(), MemoryFile::Text(content.to_string()));
    }

    /// Make every write under `prefix` fail with an I/O error
    pub fn fail_writes_under(&self, prefix: &str) {
        self.failing_prefixes.borrow_mut().push(prefix.to_string());
    }

    pub fn text(&self, path: &str) -> Option<String> {
        match self.files.borrow().get(path) {
            Some(MemoryFile::Text(content)) => Some(content.clone()),
            _ => None,
        }
    }

    pub fn binary(&self, path: &str) -> Option<Vec<u8>> {
        match self.files.borrow().get(path) {
            Some(MemoryFile::Binary(data)) => Some(data.clone()),
            _ => None,
        }
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }

    pub fn markdown_paths(&self) -> Vec<String> {
        self.file_paths().into_iter().filter(|p| p.ends_with(".md")).collect()
    }

    pub fn has_folder(&self, path: &str) -> bool {
        self.folders.borrow().contains(path)
    }

    fn check_writable(&self, path: &str) -> Result<()> {
        if self.failing_prefixes.borrow().iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Err(ImportError::Io {
                path: path.to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "write rejected"),
            });
        }
        Ok(())
    }
}

impl ImportTarget for MemoryVault {
    fn list_markdown_files(&self) -> Result<Vec<NoteFile>> {
        Ok(self.markdown_paths().into_iter().map(|path| NoteFile { path }).collect())
    }

    fn read_text(&self, path: &str) -> Result<String> {
        self.text(path).ok_or_else(|| ImportError::NotFound { path: path.to_string() })
    }

    fn write_text(&self, path: &str, content: &str) -> Result<()> {
        self.check_writable(path)?;
        self.insert_text(path, content);
        Ok(())
    }

    fn write_binary(&self, path: &str, data: &[u8]) -> Result<()> {
        self.check_writable(path)?;
        self.files.borrow_mut().insert(path.to_string(), MemoryFile::Binary(data.to_vec()));
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        self.folders.borrow_mut().insert(path.to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.borrow().contains_key(path) || self.folders.borrow().contains(path))
    }
}
