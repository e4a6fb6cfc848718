use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use super::{DirectoryEntry, ExportPathApi, ExportSource, ImportTarget, NoteFile};
use crate::error::{ImportError, Result};

/// Reads an unpacked export straight from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FsExportSource;

impl ExportSource for FsExportSource {
    fn read_text(&self, path: &str) -> Result<String> {
        fs::read_to_string(path).map_err(|e| ImportError::from_io(path, e))
    }

    fn read_binary(&self, path: &str) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| ImportError::from_io(path, e))
    }

    /// Symlinks are reported as neither file nor directory, so the attachment scan never
    /// follows them out of the export tree
    fn list_dir(&self, path: &str) -> Result<Vec<DirectoryEntry>> {
        let entries = fs::read_dir(path).map_err(|e| ImportError::from_io(path, e))?;
        let mut listing = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ImportError::from_io(path, e))?;
            let file_type = entry.file_type().map_err(|e| ImportError::from_io(path, e))?;
            listing.push(DirectoryEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path().to_string_lossy().into_owned(),
                is_directory: file_type.is_dir(),
                is_file: file_type.is_file(),
            });
        }
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Path::new(path).try_exists().map_err(|e| ImportError::from_io(path, e))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FsExportPath;

impl ExportPathApi for FsExportPath {
    fn join(&self, parts: &[&str]) -> String {
        let mut path = PathBuf::new();
        for part in parts.iter().filter(|p| !p.is_empty()) {
            path.push(part);
        }
        path.to_string_lossy().into_owned()
    }
}

/// A vault rooted at a directory on disk
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a vault-relative path onto the root, rejecting anything that could escape it
    fn resolve(&self, vault_path: &str) -> Result<PathBuf> {
        let relative = Path::new(vault_path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_) | Component::RootDir))
        {
            return Err(ImportError::Io {
                path: vault_path.to_string(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "path escapes the vault root"),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl ImportTarget for FsVault {
    fn list_markdown_files(&self) -> Result<Vec<NoteFile>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable vault entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if entry.path().extension().is_none_or(|ext| ext != "md") {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(NoteFile { path });
        }

        Ok(files)
    }

    fn read_text(&self, path: &str) -> Result<String> {
        fs::read_to_string(self.resolve(path)?).map_err(|e| ImportError::from_io(path, e))
    }

    fn write_text(&self, path: &str, content: &str) -> Result<()> {
        fs::write(self.resolve(path)?, content).map_err(|e| ImportError::from_io(path, e))
    }

    fn write_binary(&self, path: &str, data: &[u8]) -> Result<()> {
        fs::write(self.resolve(path)?, data).map_err(|e| ImportError::from_io(path, e))
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.resolve(path)?).map_err(|e| ImportError::from_io(path, e))
    }

    fn exists(&self, path: &str) -> Result<bool> {
        self.resolve(path)?.try_exists().map_err(|e| ImportError::from_io(path, e))
    }
}
