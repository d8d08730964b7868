//! Document identity and typed metadata projection.
//!
//! # Responsibility
//! - Define `DocumentId` and the raw `Document` record read from a store.
//! - Project schema-less metadata into `Topic`/`Subtopic` sum types.
//!
//! # Invariants
//! - `DocumentId` is a `/`-separated path relative to the store root.
//! - A document's name is its file stem; references match on it.
//! - Classification never fails: unknown or missing `type` is `Other`.

use crate::frontmatter::{get_field, ParsedDocument};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::{Display, Formatter};

/// Metadata key holding the document kind.
pub const FIELD_TYPE: &str = "type";
/// Topic: ordered subtopic references.
pub const FIELD_SUBTOPICS: &str = "subtopics";
/// Topic: completion ratio formatted to two decimals.
pub const FIELD_PROGRESS: &str = "progress";
/// Topic: number of completed subtopics.
pub const FIELD_COMPLETED_SUBTOPICS: &str = "completed_subtopics";
/// Topic: length of the subtopic list.
pub const FIELD_TOTAL_SUBTOPICS: &str = "total_subtopics";
/// Subtopic: reference to the owning topic.
pub const FIELD_PARENT: &str = "parent";
/// Subtopic: completion flag.
pub const FIELD_COMPLETED: &str = "completed";
/// Subtopic: date the completion flag was last set.
pub const FIELD_COMPLETION_DATE: &str = "completion_date";

const TYPE_TOPIC: &str = "topic";
const TYPE_SUBTOPIC: &str = "subtopic";
const DOCUMENT_EXTENSION: &str = ".md";

/// Stable document identifier: path relative to the store root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds the id for a document named `name` inside `folder`.
    pub fn in_folder(folder: &str, name: &str) -> Self {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            Self(format!("{name}{DOCUMENT_EXTENSION}"))
        } else {
            Self(format!("{folder}/{name}{DOCUMENT_EXTENSION}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative path without the document extension.
    pub fn path_stem(&self) -> &str {
        self.0.strip_suffix(DOCUMENT_EXTENSION).unwrap_or(&self.0)
    }

    /// File stem used for reference resolution.
    pub fn name(&self) -> &str {
        let stem = self.path_stem();
        stem.rsplit('/').next().unwrap_or(stem)
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw document as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub raw: String,
}

impl Document {
    pub fn new(id: DocumentId, raw: impl Into<String>) -> Self {
        Self {
            id,
            raw: raw.into(),
        }
    }

    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Splits off the metadata block, if any.
    pub fn parse(&self) -> Option<ParsedDocument> {
        ParsedDocument::parse(&self.raw)
    }

    /// Classifies the document; documents without metadata are `Other`.
    pub fn kind(&self) -> DocumentKind {
        self.parse()
            .map_or(DocumentKind::Other, |parsed| {
                DocumentKind::from_block(parsed.block())
            })
    }
}

/// Topic metadata as currently persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopicMeta {
    /// Raw reference strings, in list order, duplicates kept.
    pub subtopics: Vec<String>,
    pub progress: Option<f64>,
    pub completed_subtopics: Option<u32>,
    pub total_subtopics: Option<u32>,
}

/// Subtopic metadata as currently persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubtopicMeta {
    /// Raw parent reference, e.g. `[[AWS]]`.
    pub parent: Option<String>,
    /// Missing or non-boolean values read as `false`.
    pub completed: bool,
    pub completion_date: Option<NaiveDate>,
}

/// Typed view over a document's `type` field.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentKind {
    Topic(TopicMeta),
    Subtopic(SubtopicMeta),
    Other,
}

impl DocumentKind {
    /// Reads the kind and its fields from a raw metadata block.
    pub fn from_block(block: &str) -> Self {
        let kind = get_field(block, FIELD_TYPE).map(|entry| entry.as_text());
        match kind.as_deref() {
            Some(TYPE_TOPIC) => Self::Topic(TopicMeta {
                subtopics: get_field(block, FIELD_SUBTOPICS)
                    .map(|entry| entry.as_list())
                    .unwrap_or_default(),
                progress: get_field(block, FIELD_PROGRESS).and_then(|entry| entry.as_f64()),
                completed_subtopics: get_field(block, FIELD_COMPLETED_SUBTOPICS)
                    .and_then(|entry| entry.as_u32()),
                total_subtopics: get_field(block, FIELD_TOTAL_SUBTOPICS)
                    .and_then(|entry| entry.as_u32()),
            }),
            Some(TYPE_SUBTOPIC) => Self::Subtopic(SubtopicMeta {
                parent: get_field(block, FIELD_PARENT)
                    .map(|entry| entry.as_text())
                    .filter(|value| !value.is_empty()),
                completed: read_completed(block),
                completion_date: get_field(block, FIELD_COMPLETION_DATE)
                    .and_then(|entry| entry.as_date()),
            }),
            _ => Self::Other,
        }
    }

    /// Stable label used in logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Topic(_) => TYPE_TOPIC,
            Self::Subtopic(_) => TYPE_SUBTOPIC,
            Self::Other => "other",
        }
    }
}

/// Reads the `completed` flag regardless of the document's kind.
pub fn read_completed(block: &str) -> bool {
    get_field(block, FIELD_COMPLETED)
        .and_then(|entry| entry.as_bool())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::{Document, DocumentId, DocumentKind};

    #[test]
    fn document_id_exposes_name_and_stem() {
        let id = DocumentId::new("Learning/Topics/AWS.md");
        assert_eq!(id.name(), "AWS");
        assert_eq!(id.path_stem(), "Learning/Topics/AWS");
        assert_eq!(DocumentId::in_folder("Topics/", "AWS").as_str(), "Topics/AWS.md");
        assert_eq!(DocumentId::in_folder("", "AWS").as_str(), "AWS.md");
    }

    #[test]
    fn classifies_topic_with_fields() {
        let doc = Document::new(
            DocumentId::new("AWS.md"),
            "---\ntype: topic\nsubtopics: [[[S3]], [[EC2]]]\nprogress: 0.50\ncompleted_subtopics: 1\ntotal_subtopics: 2\n---\n",
        );
        let DocumentKind::Topic(topic) = doc.kind() else {
            panic!("expected topic");
        };
        assert_eq!(topic.subtopics, vec!["[[S3]]", "[[EC2]]"]);
        assert_eq!(topic.progress, Some(0.5));
        assert_eq!(topic.completed_subtopics, Some(1));
        assert_eq!(topic.total_subtopics, Some(2));
    }

    #[test]
    fn classifies_subtopic_and_defaults_completed() {
        let doc = Document::new(
            DocumentId::new("S3.md"),
            "---\ntype: \"subtopic\"\nparent: \"[[AWS]]\"\ncompleted: maybe\n---\n",
        );
        let DocumentKind::Subtopic(subtopic) = doc.kind() else {
            panic!("expected subtopic");
        };
        assert_eq!(subtopic.parent.as_deref(), Some("[[AWS]]"));
        assert!(!subtopic.completed);
        assert_eq!(subtopic.completion_date, None);
    }

    #[test]
    fn missing_metadata_or_type_is_other() {
        let plain = Document::new(DocumentId::new("Note.md"), "# Just a note\n");
        assert_eq!(plain.kind(), DocumentKind::Other);
        let untyped = Document::new(DocumentId::new("Note.md"), "---\ntags: [x]\n---\n");
        assert_eq!(untyped.kind(), DocumentKind::Other);
    }
}
