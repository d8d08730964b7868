//! In-memory document store.
//!
//! # Responsibility
//! - Back tests and embedding hosts with a map of id -> text.
//! - Record every successful write as a change notification.
//! - Allow targeted write failures to exercise partial propagation.
//!
//! # Invariants
//! - `insert` seeds documents without recording a change.
//! - Rejected writes leave the stored text untouched.

use super::document_store::{DocumentStore, StoreError, StoreResult};
use crate::model::document::DocumentId;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

/// Single-threaded store keeping documents in memory.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RefCell<BTreeMap<DocumentId, String>>,
    rejected: RefCell<BTreeSet<DocumentId>>,
    changes: RefCell<Vec<DocumentId>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds one document without emitting a change.
    pub fn insert(&self, id: impl Into<String>, raw: impl Into<String>) -> DocumentId {
        let id = DocumentId::new(id);
        self.documents.borrow_mut().insert(id.clone(), raw.into());
        id
    }

    /// Returns the current text of one document.
    pub fn get(&self, id: &DocumentId) -> Option<String> {
        self.documents.borrow().get(id).cloned()
    }

    /// Makes every following write to `id` fail.
    pub fn reject_writes_to(&self, id: &DocumentId) {
        self.rejected.borrow_mut().insert(id.clone());
    }

    /// Lifts a previous `reject_writes_to`.
    pub fn accept_writes_to(&self, id: &DocumentId) {
        self.rejected.borrow_mut().remove(id);
    }

    /// Drains the ids written since the last call, oldest first.
    pub fn take_changes(&self) -> Vec<DocumentId> {
        std::mem::take(&mut *self.changes.borrow_mut())
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn list(&self) -> StoreResult<Vec<DocumentId>> {
        Ok(self.documents.borrow().keys().cloned().collect())
    }

    fn read(&self, id: &DocumentId) -> StoreResult<String> {
        self.get(id).ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn write(&self, id: &DocumentId, raw: &str) -> StoreResult<()> {
        if self.rejected.borrow().contains(id) {
            return Err(StoreError::WriteRejected(id.clone()));
        }
        self.documents
            .borrow_mut()
            .insert(id.clone(), raw.to_string());
        self.changes.borrow_mut().push(id.clone());
        Ok(())
    }

    fn exists(&self, id: &DocumentId) -> StoreResult<bool> {
        Ok(self.documents.borrow().contains_key(id))
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryDocumentStore;
    use crate::model::reference::Resolution;
    use crate::repo::document_store::{DocumentStore, StoreError};

    #[test]
    fn resolves_by_exact_stem_or_path() {
        let store = InMemoryDocumentStore::new();
        let s3 = store.insert("Subtopics/S3.md", "");
        store.insert("Archive/s3.md", "");

        assert_eq!(
            store.resolve_by_name("[[S3]]").expect("resolve"),
            Resolution::Resolved(s3.clone())
        );
        assert_eq!(
            store.resolve_by_name("Subtopics/S3").expect("resolve"),
            Resolution::Resolved(s3)
        );
        assert_eq!(
            store.resolve_by_name("[[Networking]]").expect("resolve"),
            Resolution::Dangling("Networking".to_string())
        );
    }

    #[test]
    fn rejected_writes_keep_previous_text_and_skip_journal() {
        let store = InMemoryDocumentStore::new();
        let id = store.insert("AWS.md", "before");
        store.reject_writes_to(&id);

        let err = store.write(&id, "after").expect_err("write must fail");
        assert!(matches!(err, StoreError::WriteRejected(_)));
        assert_eq!(store.get(&id).as_deref(), Some("before"));
        assert!(store.take_changes().is_empty());

        store.accept_writes_to(&id);
        store.write(&id, "after").expect("write succeeds");
        assert_eq!(store.take_changes(), vec![id]);
    }
}
