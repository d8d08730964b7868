//! Domain model for the two-level topic/subtopic document graph.
//!
//! # Responsibility
//! - Define document identity and the typed view over metadata fields.
//! - Define reference syntax helpers shared by resolver and renderers.
//!
//! # Invariants
//! - Every document is identified by a stable `DocumentId` (relative path).
//! - The hierarchy is exactly two levels: topic -> subtopic.

pub mod document;
pub mod reference;
