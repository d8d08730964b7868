//! Read-only progress views for UI hosts.
//!
//! # Responsibility
//! - List every topic with its live progress.
//! - Render a plain-text report for one topic or subtopic.
//!
//! # Invariants
//! - Never writes to the store.
//! - Values come from current subtopic state, not from stored aggregates.

use super::error::{TrackerError, TrackerResult};
use super::progress::{SubtopicStatus, TopicState};
use super::progress_service::{ProgressService, TopicSnapshot};
use crate::config::TrackerSettings;
use crate::frontmatter::ParsedDocument;
use crate::markdown::status_text;
use crate::model::document::{DocumentId, DocumentKind, SubtopicMeta};
use crate::model::reference::extract_name;
use crate::repo::DocumentStore;
use serde::Serialize;
use std::fmt::Write;

/// Topic row exposed to UI hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicProgress {
    pub id: DocumentId,
    pub name: String,
    pub progress: f64,
    pub completed_count: u32,
    pub total_count: u32,
}

impl TopicProgress {
    fn state(&self) -> TopicState {
        TopicState {
            progress: self.progress,
            completed_count: self.completed_count,
            total_count: self.total_count,
        }
    }

    pub fn percent(&self) -> u32 {
        self.state().percent()
    }

    /// Same text a refresh writes into the `progress` field.
    pub fn progress_text(&self) -> String {
        self.state().progress_text()
    }
}

pub struct ReportService<'a, S: DocumentStore> {
    store: &'a S,
    progress: ProgressService<'a, S>,
}

impl<'a, S: DocumentStore> ReportService<'a, S> {
    pub fn new(store: &'a S, settings: &'a TrackerSettings) -> Self {
        Self {
            store,
            progress: ProgressService::new(store, settings),
        }
    }

    /// Lists all topics sorted by id.
    ///
    /// Each topic is read once; topics removed while listing are skipped.
    pub fn topics_with_progress(&self) -> TrackerResult<Vec<TopicProgress>> {
        let topics = self
            .store
            .list_matching(|document| matches!(document.kind(), DocumentKind::Topic(_)))?;
        let ids = self.store.list()?;
        let mut rows = Vec::with_capacity(topics.len());
        for topic in topics {
            let snapshot = self.progress.snapshot_document(&ids, &topic)?;
            rows.push(TopicProgress {
                name: topic.id.name().to_string(),
                progress: snapshot.state.progress,
                completed_count: snapshot.state.completed_count,
                total_count: snapshot.state.total_count,
                id: topic.id,
            });
        }
        Ok(rows)
    }

    /// Renders a text summary of topic or subtopic `id`.
    ///
    /// # Errors
    /// - `NotTopic` when `id` is neither a topic nor a subtopic.
    pub fn generate_report(&self, id: &DocumentId) -> TrackerResult<String> {
        let raw = self.store.read(id)?;
        let kind = ParsedDocument::parse(&raw)
            .map_or(DocumentKind::Other, |parsed| {
                DocumentKind::from_block(parsed.block())
            });
        match kind {
            DocumentKind::Topic(_) => Ok(render_topic(&self.progress.snapshot(id)?)),
            DocumentKind::Subtopic(meta) => Ok(render_subtopic(id, &meta)),
            DocumentKind::Other => Err(TrackerError::NotTopic(id.clone())),
        }
    }
}

fn render_topic(snapshot: &TopicSnapshot) -> String {
    let state = &snapshot.state;
    let mut out = String::new();
    let _ = writeln!(out, "Topic: {}", snapshot.id.name());
    let _ = writeln!(
        out,
        "Progress: {}% ({} of {} subtopics completed)",
        state.percent(),
        state.completed_count,
        state.total_count
    );
    if snapshot.resolutions.is_empty() {
        let _ = writeln!(out, "No subtopics listed.");
        return out;
    }
    out.push('\n');
    for resolution in &snapshot.resolutions {
        let name = extract_name(&resolution.reference);
        let glyph = resolution.status.mark().glyph();
        match (resolution.status, resolution.completion_date) {
            (SubtopicStatus::Dangling, _) => {
                let _ = writeln!(out, "{glyph} {name} (Missing)");
            }
            (SubtopicStatus::Completed, Some(date)) => {
                let _ = writeln!(out, "{glyph} {name} (completed {date})");
            }
            _ => {
                let _ = writeln!(out, "{glyph} {name}");
            }
        }
    }
    out
}

fn render_subtopic(id: &DocumentId, meta: &SubtopicMeta) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Subtopic: {}", id.name());
    let _ = writeln!(out, "Status: {}", status_text(meta.completed));
    let parent = meta.parent.as_deref().map_or("(none)", extract_name);
    let _ = writeln!(out, "Parent: {parent}");
    if let Some(date) = meta.completion_date {
        let _ = writeln!(out, "Completed on: {date}");
    }
    out
}
