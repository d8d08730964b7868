//! Markdown body patching.
//!
//! # Responsibility
//! - Replace heading-delimited sections rendered by the tracker.
//! - Keep the subtopic status line in sync with its completion flag.
//!
//! # Invariants
//! - Bodies missing the expected heading or line are returned unchanged.

pub mod section;
pub mod status_line;

pub use section::{rebuild_checklist, replace_section, ChecklistMark};
pub use status_line::{rewrite_status_line, status_text};
