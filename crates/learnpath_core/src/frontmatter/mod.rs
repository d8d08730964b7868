//! Metadata block codec.
//!
//! # Responsibility
//! - Detect the `---` delimited metadata block at the top of a document.
//! - Read and patch individual fields without a full YAML parser.
//!
//! # Invariants
//! - Untouched text serializes byte-identical to its source.
//! - Malformed or missing blocks degrade to `None` instead of errors.

pub mod document;
pub mod field;

pub use document::ParsedDocument;
pub use field::{
    append_to_list_field, get_field, scan_fields, upsert_field, FieldEntry, FieldShape,
    FieldValue,
};
