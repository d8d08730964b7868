//! Topic and subtopic creation from built-in templates.
//!
//! # Responsibility
//! - Write new documents with fully initialized metadata.
//! - Link a new subtopic into its topic and refresh the topic.
//!
//! # Invariants
//! - Existing documents are never overwritten.
//! - New topics start with zeroed aggregates.

use super::error::{TrackerError, TrackerResult};
use super::progress_service::ProgressService;
use crate::config::TrackerSettings;
use crate::frontmatter::{append_to_list_field, ParsedDocument};
use crate::markdown::status_text;
use crate::model::document::{DocumentId, DocumentKind, FIELD_SUBTOPICS};
use crate::model::reference::{to_link, Resolution};
use crate::repo::{DocumentStore, StoreError};
use log::info;

const FORBIDDEN_NAME_CHARS: [char; 7] = ['/', '\\', '[', ']', '|', '#', '^'];

pub struct TemplateService<'a, S: DocumentStore> {
    store: &'a S,
    settings: &'a TrackerSettings,
}

impl<'a, S: DocumentStore> TemplateService<'a, S> {
    pub fn new(store: &'a S, settings: &'a TrackerSettings) -> Self {
        Self { store, settings }
    }

    /// Creates topic `name` in the topic folder.
    pub fn create_topic(&self, name: &str) -> TrackerResult<DocumentId> {
        let name = validate_name(name)?;
        let id = DocumentId::in_folder(&self.settings.topic_folder, name);
        self.ensure_absent(&id)?;
        self.store.write(&id, &topic_template(name, self.settings))?;
        info!("event=topic_create module=template status=ok topic={id}");
        Ok(id)
    }

    /// Creates subtopic `name` under topic `topic_name`.
    ///
    /// The subtopic is written first, then appended to the topic's list and
    /// the topic is refreshed.
    ///
    /// # Errors
    /// - `Store(NotFound)` when no document is named `topic_name`.
    /// - `NotTopic` when that document is not a topic.
    pub fn create_subtopic(&self, topic_name: &str, name: &str) -> TrackerResult<DocumentId> {
        let name = validate_name(name)?;
        let topic_id = match self.store.resolve_by_name(topic_name)? {
            Resolution::Resolved(id) => id,
            Resolution::Dangling(missing) => {
                return Err(StoreError::NotFound(DocumentId::in_folder(
                    &self.settings.topic_folder,
                    &missing,
                ))
                .into())
            }
        };
        let topic_raw = self.store.read(&topic_id)?;
        let Some(topic) = ParsedDocument::parse(&topic_raw)
            .filter(|parsed| matches!(DocumentKind::from_block(parsed.block()), DocumentKind::Topic(_)))
        else {
            return Err(TrackerError::NotTopic(topic_id));
        };

        let id = DocumentId::in_folder(&self.settings.subtopic_folder, name);
        self.ensure_absent(&id)?;
        self.store
            .write(&id, &subtopic_template(name, topic_id.name()))?;

        let block = append_to_list_field(topic.block(), FIELD_SUBTOPICS, &to_link(name));
        if block != topic.block() {
            self.store
                .write(&topic_id, &topic.with_block(block).serialize())?;
        }
        ProgressService::new(self.store, self.settings).refresh_topic(&topic_id)?;
        info!(
            "event=subtopic_create module=template status=ok subtopic={} topic={}",
            id, topic_id
        );
        Ok(id)
    }

    fn ensure_absent(&self, id: &DocumentId) -> TrackerResult<()> {
        if self.store.exists(id)? {
            return Err(TrackerError::DocumentExists(id.clone()));
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> TrackerResult<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains(FORBIDDEN_NAME_CHARS) {
        return Err(TrackerError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

fn topic_template(name: &str, settings: &TrackerSettings) -> String {
    format!(
        "---\ntype: topic\nsubtopics: []\nprogress: 0.00\ncompleted_subtopics: 0\ntotal_subtopics: 0\n---\n# {name}\n\n## {}\n\n0% complete\n\n## {}\n\n## Notes\n",
        settings.progress_heading, settings.subtopics_heading
    )
}

fn subtopic_template(name: &str, topic_name: &str) -> String {
    format!(
        "---\ntype: subtopic\nparent: \"{}\"\ncompleted: false\ncompletion_date:\n---\n# {name}\n\nStatus: {}\n\n## Notes\n",
        to_link(topic_name),
        status_text(false)
    )
}

#[cfg(test)]
mod tests {
    use super::validate_name;
    use crate::service::error::TrackerError;

    #[test]
    fn names_are_trimmed_and_checked() {
        assert_eq!(validate_name("  S3 Buckets ").expect("valid name"), "S3 Buckets");
        for bad in ["", "   ", "a/b", "a\\b", "[[x]]", "a|b", "a#b", "a^b"] {
            assert!(matches!(validate_name(bad), Err(TrackerError::InvalidName(_))));
        }
    }
}
