//! Directory-backed document store.
//!
//! # Responsibility
//! - Map `DocumentId`s to `*.md` files under one root directory.
//! - Walk the tree for listing while skipping hidden directories.
//!
//! # Invariants
//! - Ids never escape the root: absolute paths and `..` are rejected.
//! - Ids always use `/` separators regardless of platform.

use super::document_store::{DocumentStore, StoreError, StoreResult};
use crate::model::document::DocumentId;
use log::{debug, warn};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

const DOCUMENT_EXTENSION: &str = "md";

/// Store over a vault directory of markdown files.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Opens a store rooted at an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(StoreError::Io {
                id: DocumentId::new(root.display().to_string()),
                source: std::io::Error::new(ErrorKind::NotFound, "vault root is not a directory"),
            });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps an absolute or root-relative filesystem path back to an id.
    ///
    /// Returns `None` for non-markdown files, hidden paths or paths outside
    /// the root.
    pub fn id_for_path(&self, path: &Path) -> Option<DocumentId> {
        let relative = match path.strip_prefix(&self.root) {
            Ok(relative) => relative,
            Err(_) if path.is_relative() => path,
            Err(_) => return None,
        };
        if relative.extension().and_then(|ext| ext.to_str()) != Some(DOCUMENT_EXTENSION) {
            return None;
        }
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str()?;
                    if part.starts_with('.') {
                        return None;
                    }
                    parts.push(part);
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(DocumentId::new(parts.join("/")))
    }

    fn path_for(&self, id: &DocumentId) -> StoreResult<PathBuf> {
        let value = id.as_str();
        let relative = Path::new(value);
        let valid = !value.trim().is_empty()
            && value.ends_with(".md")
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(StoreError::InvalidId(value.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl DocumentStore for FsDocumentStore {
    fn list(&self) -> StoreResult<Vec<DocumentId>> {
        let mut ids = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("event=store_list module=repo status=skip error={err}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(id) = self.id_for_path(entry.path()) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn read(&self, id: &DocumentId) -> StoreResult<String> {
        let path = self.path_for(id)?;
        std::fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound(id.clone()),
            _ => StoreError::Io {
                id: id.clone(),
                source: err,
            },
        })
    }

    fn write(&self, id: &DocumentId, raw: &str) -> StoreResult<()> {
        let path = self.path_for(id)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| StoreError::Io {
                id: id.clone(),
                source: err,
            })?;
        }
        std::fs::write(&path, raw).map_err(|err| StoreError::Io {
            id: id.clone(),
            source: err,
        })?;
        debug!(
            "event=store_write module=repo status=ok id={} bytes={}",
            id,
            raw.len()
        );
        Ok(())
    }

    fn exists(&self, id: &DocumentId) -> StoreResult<bool> {
        Ok(self.path_for(id)?.is_file())
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
