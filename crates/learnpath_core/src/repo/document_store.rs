//! Document store contract.
//!
//! # Responsibility
//! - Define the read/write/list/resolve API the tracker consumes.
//! - Provide name resolution shared by every store implementation.
//!
//! # Invariants
//! - `list` returns ids in ascending order.
//! - `resolve_by_name` is exact and case-sensitive; ties go to the first id.
//! - Each `write` replaces the whole document text in one call.

use crate::model::document::{Document, DocumentId};
use crate::model::reference::{link_target, Resolution};
use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure.
#[derive(Debug)]
pub enum StoreError {
    /// No document exists under this id.
    NotFound(DocumentId),
    /// Filesystem failure while reading, writing or listing.
    Io {
        id: DocumentId,
        source: std::io::Error,
    },
    /// Write refused by the store.
    WriteRejected(DocumentId),
    /// Id is not a relative `.md` path inside the store.
    InvalidId(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "document not found: {id}"),
            Self::Io { id, source } => write!(f, "document i/o failed for {id}: {source}"),
            Self::WriteRejected(id) => write!(f, "document write rejected: {id}"),
            Self::InvalidId(value) => write!(f, "invalid document id: `{value}`"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::NotFound(_) => None,
            Self::WriteRejected(_) => None,
            Self::InvalidId(_) => None,
        }
    }
}

/// Repository interface over the document corpus.
pub trait DocumentStore {
    /// Lists every document id, sorted ascending.
    fn list(&self) -> StoreResult<Vec<DocumentId>>;
    /// Reads the full text of one document.
    fn read(&self, id: &DocumentId) -> StoreResult<String>;
    /// Replaces the full text of one document, creating it when absent.
    fn write(&self, id: &DocumentId, raw: &str) -> StoreResult<()>;
    /// Returns whether a document exists under `id`.
    fn exists(&self, id: &DocumentId) -> StoreResult<bool>;

    /// Resolves a reference (`[[Name]]`, `Name`, `Folder/Name`) to a document.
    ///
    /// Matches the file stem or the extension-less relative path exactly.
    /// Each call lists the store; use [`resolve_in`] to resolve many
    /// references against one listing.
    fn resolve_by_name(&self, reference: &str) -> StoreResult<Resolution> {
        Ok(resolve_in(&self.list()?, reference))
    }

    /// Loads every document accepted by `predicate`.
    ///
    /// Documents removed between listing and reading are skipped.
    fn list_matching<P>(&self, mut predicate: P) -> StoreResult<Vec<Document>>
    where
        Self: Sized,
        P: FnMut(&Document) -> bool,
    {
        let mut documents = Vec::new();
        for id in self.list()? {
            let raw = match self.read(&id) {
                Ok(raw) => raw,
                Err(StoreError::NotFound(missing)) => {
                    warn!("event=store_list module=repo status=skip reason=vanished id={missing}");
                    continue;
                }
                Err(err) => return Err(err),
            };
            let document = Document::new(id, raw);
            if predicate(&document) {
                documents.push(document);
            }
        }
        Ok(documents)
    }
}

/// Resolves `reference` against an already listed set of ids.
///
/// Same matching rules as [`DocumentStore::resolve_by_name`].
pub fn resolve_in(ids: &[DocumentId], reference: &str) -> Resolution {
    let target = link_target(reference);
    if target.is_empty() {
        return Resolution::Dangling(String::new());
    }
    match ids
        .iter()
        .find(|id| id.name() == target || id.path_stem() == target)
    {
        Some(id) => Resolution::Resolved(id.clone()),
        None => Resolution::Dangling(target.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_in_matches_stem_or_relative_path() {
        let ids = vec![
            DocumentId::new("Subtopics/S3.md"),
            DocumentId::new("Topics/AWS.md"),
        ];
        assert_eq!(
            resolve_in(&ids, "[[AWS]]"),
            Resolution::Resolved(DocumentId::new("Topics/AWS.md"))
        );
        assert_eq!(
            resolve_in(&ids, "Subtopics/S3"),
            Resolution::Resolved(DocumentId::new("Subtopics/S3.md"))
        );
        assert_eq!(
            resolve_in(&ids, "[[aws]]"),
            Resolution::Dangling("aws".to_string())
        );
        assert_eq!(resolve_in(&ids, "[[]]"), Resolution::Dangling(String::new()));
    }
}
