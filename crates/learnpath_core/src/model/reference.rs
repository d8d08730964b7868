//! Textual cross-document references.
//!
//! # Responsibility
//! - Strip `[[...]]` link syntax from reference strings.
//! - Reduce a link to the target name used for store lookups.
//!
//! # Invariants
//! - `extract_name` is total and only removes one wrapping `[[` `]]` pair.
//! - A dangling reference is a valid permanent state, never an error.

use super::document::DocumentId;

const LINK_OPEN: &str = "[[";
const LINK_CLOSE: &str = "]]";

/// Outcome of looking a reference up in a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Reference points at an existing document.
    Resolved(DocumentId),
    /// No document carries this name; holds the looked-up target.
    Dangling(String),
}

impl Resolution {
    pub fn document_id(&self) -> Option<&DocumentId> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Dangling(_) => None,
        }
    }

    pub fn is_dangling(&self) -> bool {
        matches!(self, Self::Dangling(_))
    }
}

/// Strips a wrapping `[[` `]]` pair; any other input is returned unchanged.
pub fn extract_name(reference: &str) -> &str {
    reference
        .strip_prefix(LINK_OPEN)
        .and_then(|inner| inner.strip_suffix(LINK_CLOSE))
        .unwrap_or(reference)
}

/// Name a reference points at, without alias (`|`) or heading (`#`, `^`) suffix.
pub fn link_target(reference: &str) -> &str {
    let name = extract_name(reference.trim());
    let end = name.find(['|', '#', '^']).unwrap_or(name.len());
    name[..end].trim()
}

/// Renders `name` as a `[[name]]` link.
pub fn to_link(name: &str) -> String {
    format!("{LINK_OPEN}{}{LINK_CLOSE}", extract_name(name))
}
