//! Document store abstractions and implementations.
//!
//! # Responsibility
//! - Define the store contract consumed by tracker services.
//! - Isolate filesystem details from propagation and aggregation logic.
//!
//! # Invariants
//! - Store APIs report semantic errors (`NotFound`) in addition to I/O errors.
//! - Dangling names resolve to `Resolution::Dangling`, not to an error.

pub mod document_store;
pub mod fs_store;
pub mod memory_store;

pub use document_store::{resolve_in, DocumentStore, StoreError, StoreResult};
pub use fs_store::FsDocumentStore;
pub use memory_store::InMemoryDocumentStore;
