//! Store-backed progress aggregation.
//!
//! # Responsibility
//! - Resolve a topic's subtopic list against the store.
//! - Recompute and persist a topic's aggregate in one write.
//! - Toggle a subtopic's completion in one write.
//!
//! # Invariants
//! - A topic whose stored text already matches its computed state is never
//!   written.
//! - Every document is written with a single `write` call holding the full
//!   new text.
//! - One refresh lists the store at most once; references resolve against
//!   that listing.

use super::error::{TrackerError, TrackerResult};
use super::progress::{
    apply_topic_state, compute_topic_state, toggle_subtopic_completion, SubtopicResolution,
    SubtopicStatus, TopicState,
};
use crate::config::TrackerSettings;
use crate::frontmatter::{get_field, ParsedDocument};
use crate::model::document::{
    read_completed, Document, DocumentId, DocumentKind, TopicMeta, FIELD_COMPLETION_DATE,
};
use crate::model::reference::Resolution;
use crate::repo::{resolve_in, DocumentStore, StoreError};
use chrono::NaiveDate;
use log::{debug, info};
use std::collections::HashMap;

/// Result of one topic refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicRefresh {
    pub topic: DocumentId,
    pub state: TopicState,
    /// Whether the topic document was rewritten.
    pub changed: bool,
}

/// Live view of a topic computed from its subtopics.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicSnapshot {
    pub id: DocumentId,
    pub meta: TopicMeta,
    pub resolutions: Vec<SubtopicResolution>,
    pub state: TopicState,
}

/// Aggregation use-cases over one document store.
pub struct ProgressService<'a, S: DocumentStore> {
    store: &'a S,
    settings: &'a TrackerSettings,
}

impl<'a, S: DocumentStore> ProgressService<'a, S> {
    pub fn new(store: &'a S, settings: &'a TrackerSettings) -> Self {
        Self { store, settings }
    }

    /// Resolves every listed reference, in list order.
    ///
    /// Duplicate references are looked up once.
    pub fn resolve_subtopics(&self, topic: &TopicMeta) -> TrackerResult<Vec<SubtopicResolution>> {
        if topic.subtopics.is_empty() {
            return Ok(Vec::new());
        }
        self.resolve_subtopics_in(&self.store.list()?, topic)
    }

    /// Like [`Self::resolve_subtopics`], against an existing store listing.
    pub fn resolve_subtopics_in(
        &self,
        ids: &[DocumentId],
        topic: &TopicMeta,
    ) -> TrackerResult<Vec<SubtopicResolution>> {
        let mut seen: HashMap<&str, SubtopicResolution> = HashMap::new();
        let mut resolutions = Vec::with_capacity(topic.subtopics.len());
        for reference in &topic.subtopics {
            if let Some(known) = seen.get(reference.as_str()) {
                resolutions.push(known.clone());
                continue;
            }
            let resolution = self.resolve_entry(ids, reference)?;
            seen.insert(reference.as_str(), resolution.clone());
            resolutions.push(resolution);
        }
        Ok(resolutions)
    }

    /// Computes the live state of topic `id`.
    ///
    /// # Errors
    /// - `NotTopic` when `id` has no topic metadata.
    pub fn snapshot(&self, id: &DocumentId) -> TrackerResult<TopicSnapshot> {
        let Some((_, meta)) = self.load_topic(id)? else {
            return Err(TrackerError::NotTopic(id.clone()));
        };
        let resolutions = self.resolve_subtopics(&meta)?;
        Ok(build_snapshot(id.clone(), meta, resolutions))
    }

    /// Computes the live state of an already loaded topic document.
    ///
    /// # Errors
    /// - `NotTopic` when `document` has no topic metadata.
    pub fn snapshot_document(
        &self,
        ids: &[DocumentId],
        document: &Document,
    ) -> TrackerResult<TopicSnapshot> {
        let DocumentKind::Topic(meta) = document.kind() else {
            return Err(TrackerError::NotTopic(document.id.clone()));
        };
        let resolutions = self.resolve_subtopics_in(ids, &meta)?;
        Ok(build_snapshot(document.id.clone(), meta, resolutions))
    }

    /// Recomputes topic `id` and writes it back when its text changes.
    ///
    /// Returns `Ok(None)` when `id` has no metadata or is not a topic.
    pub fn refresh_topic(&self, id: &DocumentId) -> TrackerResult<Option<TopicRefresh>> {
        self.refresh(id, None)
    }

    /// Like [`Self::refresh_topic`], against an existing store listing.
    pub fn refresh_topic_in(
        &self,
        ids: &[DocumentId],
        id: &DocumentId,
    ) -> TrackerResult<Option<TopicRefresh>> {
        self.refresh(id, Some(ids))
    }

    fn refresh(
        &self,
        id: &DocumentId,
        ids: Option<&[DocumentId]>,
    ) -> TrackerResult<Option<TopicRefresh>> {
        let Some((parsed, meta)) = self.load_topic(id)? else {
            debug!("event=topic_refresh module=progress status=skip reason=not_topic topic={id}");
            return Ok(None);
        };
        let resolutions = match ids {
            Some(ids) => self.resolve_subtopics_in(ids, &meta)?,
            None => self.resolve_subtopics(&meta)?,
        };
        let state = compute_topic_state(&meta, &resolutions);

        let changed = match apply_topic_state(&parsed, &state, &resolutions, self.settings) {
            Some(updated) => {
                self.store.write(id, &updated.serialize())?;
                true
            }
            None => false,
        };
        info!(
            "event=topic_refresh module=progress status=ok topic={} completed={} total={} changed={}",
            id, state.completed_count, state.total_count, changed
        );
        Ok(Some(TopicRefresh {
            topic: id.clone(),
            state,
            changed,
        }))
    }

    /// Flips the completion flag of subtopic `id` and persists it.
    ///
    /// Returns the new flag value. The parent topic is not touched.
    pub fn toggle_subtopic(&self, id: &DocumentId, today: NaiveDate) -> TrackerResult<bool> {
        let raw = self.store.read(id)?;
        let Some(parsed) = ParsedDocument::parse(&raw) else {
            return Err(TrackerError::NotSubtopic(id.clone()));
        };
        if !matches!(DocumentKind::from_block(parsed.block()), DocumentKind::Subtopic(_)) {
            return Err(TrackerError::NotSubtopic(id.clone()));
        }

        let toggled = toggle_subtopic_completion(
            &parsed,
            today,
            self.settings.clear_completion_date_on_reopen,
        );
        self.store.write(id, &toggled.document.serialize())?;
        info!(
            "event=subtopic_toggle module=progress status=ok subtopic={} completed={}",
            id, toggled.completed
        );
        Ok(toggled.completed)
    }

    fn load_topic(&self, id: &DocumentId) -> TrackerResult<Option<(ParsedDocument, TopicMeta)>> {
        let raw = self.store.read(id)?;
        let Some(parsed) = ParsedDocument::parse(&raw) else {
            return Ok(None);
        };
        match DocumentKind::from_block(parsed.block()) {
            DocumentKind::Topic(meta) => Ok(Some((parsed, meta))),
            _ => Ok(None),
        }
    }

    fn resolve_entry(
        &self,
        ids: &[DocumentId],
        reference: &str,
    ) -> TrackerResult<SubtopicResolution> {
        let id = match resolve_in(ids, reference) {
            Resolution::Resolved(id) => id,
            Resolution::Dangling(_) => return Ok(SubtopicResolution::dangling(reference)),
        };
        let raw = match self.store.read(&id) {
            Ok(raw) => raw,
            Err(StoreError::NotFound(_)) => return Ok(SubtopicResolution::dangling(reference)),
            Err(err) => return Err(err.into()),
        };
        let (status, completion_date) = match ParsedDocument::parse(&raw) {
            Some(parsed) => {
                let status = if read_completed(parsed.block()) {
                    SubtopicStatus::Completed
                } else {
                    SubtopicStatus::Pending
                };
                let date = get_field(parsed.block(), FIELD_COMPLETION_DATE)
                    .and_then(|entry| entry.as_date());
                (status, date)
            }
            None => (SubtopicStatus::Pending, None),
        };
        Ok(SubtopicResolution {
            reference: reference.to_string(),
            target: Some(id),
            status,
            completion_date,
        })
    }
}

fn build_snapshot(
    id: DocumentId,
    meta: TopicMeta,
    resolutions: Vec<SubtopicResolution>,
) -> TopicSnapshot {
    let state = compute_topic_state(&meta, &resolutions);
    TopicSnapshot {
        id,
        meta,
        resolutions,
        state,
    }
}
