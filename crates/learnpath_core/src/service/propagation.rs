//! Change propagation.
//!
//! # Responsibility
//! - Classify a changed document and route it to the right aggregation step.
//! - Drive the toggle command (subtopic write, then parent refresh).
//! - Rescan every topic on demand.
//!
//! # Invariants
//! - At most one parent hop: refreshing a topic never touches another topic.
//! - Re-entrant notifications for a just-written topic end in a no-op refresh.
//! - Missing metadata and dangling parents are ignored, never errors.
//! - A notification lists the store once; a rescan lists it twice in total.

use super::error::TrackerResult;
use super::progress_service::{ProgressService, TopicRefresh};
use crate::config::TrackerSettings;
use crate::frontmatter::ParsedDocument;
use crate::model::document::{DocumentId, DocumentKind};
use crate::model::reference::Resolution;
use crate::repo::{resolve_in, DocumentStore, StoreError};
use chrono::NaiveDate;
use log::{debug, info, warn};

/// Why a change notification led to no update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Document disappeared before it could be read.
    DocumentMissing,
    /// No parsable metadata block.
    MissingMetadata,
    /// `type` is absent or neither topic nor subtopic.
    Untracked,
    /// Subtopic without a `parent` value.
    NoParent,
    /// Parent reference does not resolve; holds the looked-up name.
    DanglingParent(String),
}

/// Routing decision for one changed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropagationStep {
    /// The document is a topic: refresh it.
    UpdateSelf(DocumentId),
    /// The document is a subtopic: refresh its parent.
    UpdateParent {
        subtopic: DocumentId,
        parent: DocumentId,
    },
    Ignore(IgnoreReason),
}

/// Outcome of the toggle command.
#[derive(Debug, Clone, PartialEq)]
pub struct ToggleOutcome {
    pub subtopic: DocumentId,
    /// New completion flag.
    pub completed: bool,
    /// Parent refresh, `None` when the parent was ignored.
    pub parent: Option<TopicRefresh>,
}

/// Totals of a full rescan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RescanSummary {
    /// Topics whose text was rewritten.
    pub updated: Vec<DocumentId>,
    /// Number of topics already up to date.
    pub unchanged: usize,
    /// Topics whose refresh failed, with the error message.
    pub failures: Vec<(DocumentId, String)>,
}

/// Routes change notifications into topic refreshes.
pub struct ChangePropagator<'a, S: DocumentStore> {
    store: &'a S,
    progress: ProgressService<'a, S>,
}

impl<'a, S: DocumentStore> ChangePropagator<'a, S> {
    pub fn new(store: &'a S, settings: &'a TrackerSettings) -> Self {
        Self {
            store,
            progress: ProgressService::new(store, settings),
        }
    }

    /// Decides what a change to `id` requires.
    pub fn classify(&self, id: &DocumentId) -> TrackerResult<PropagationStep> {
        self.classify_in(&self.store.list()?, id)
    }

    /// Like [`Self::classify`], resolving the parent against `ids`.
    pub fn classify_in(
        &self,
        ids: &[DocumentId],
        id: &DocumentId,
    ) -> TrackerResult<PropagationStep> {
        let raw = match self.store.read(id) {
            Ok(raw) => raw,
            Err(StoreError::NotFound(_)) => {
                return Ok(PropagationStep::Ignore(IgnoreReason::DocumentMissing))
            }
            Err(err) => return Err(err.into()),
        };
        let Some(parsed) = ParsedDocument::parse(&raw) else {
            return Ok(PropagationStep::Ignore(IgnoreReason::MissingMetadata));
        };
        match DocumentKind::from_block(parsed.block()) {
            DocumentKind::Topic(_) => Ok(PropagationStep::UpdateSelf(id.clone())),
            DocumentKind::Subtopic(meta) => {
                let Some(parent) = meta.parent else {
                    return Ok(PropagationStep::Ignore(IgnoreReason::NoParent));
                };
                match resolve_in(ids, &parent) {
                    Resolution::Resolved(parent) => Ok(PropagationStep::UpdateParent {
                        subtopic: id.clone(),
                        parent,
                    }),
                    Resolution::Dangling(name) => {
                        Ok(PropagationStep::Ignore(IgnoreReason::DanglingParent(name)))
                    }
                }
            }
            DocumentKind::Other => Ok(PropagationStep::Ignore(IgnoreReason::Untracked)),
        }
    }

    /// Handles a "document changed" notification for `id`.
    ///
    /// Returns the refresh that ran, or `None` when the change was ignored.
    pub fn on_changed(&self, id: &DocumentId) -> TrackerResult<Option<TopicRefresh>> {
        let ids = self.store.list()?;
        let step = self.classify_in(&ids, id)?;
        debug!("event=document_changed module=propagation status=start id={id} step={step:?}");
        match step {
            PropagationStep::UpdateSelf(topic) => self.progress.refresh_topic_in(&ids, &topic),
            PropagationStep::UpdateParent { parent, .. } => {
                self.progress.refresh_topic_in(&ids, &parent)
            }
            PropagationStep::Ignore(reason) => {
                debug!(
                    "event=document_changed module=propagation status=skip id={id} reason={reason:?}"
                );
                Ok(None)
            }
        }
    }

    /// Toggles subtopic `id`, then refreshes its parent.
    ///
    /// A failed parent write leaves the subtopic toggled; the parent catches
    /// up on the next notification or rescan.
    pub fn toggle_completion(&self, id: &DocumentId, today: NaiveDate) -> TrackerResult<ToggleOutcome> {
        let completed = self.progress.toggle_subtopic(id, today)?;
        let parent = match self.on_changed(id) {
            Ok(parent) => parent,
            Err(err) => {
                warn!(
                    "event=subtopic_toggle module=propagation status=error subtopic={id} stage=parent error={err}"
                );
                return Err(err);
            }
        };
        Ok(ToggleOutcome {
            subtopic: id.clone(),
            completed,
            parent,
        })
    }

    /// Refreshes every topic in the store.
    ///
    /// A failing topic is recorded and does not stop the remaining ones.
    pub fn rescan_all(&self) -> TrackerResult<RescanSummary> {
        let topics = self
            .store
            .list_matching(|document| matches!(document.kind(), DocumentKind::Topic(_)))?;
        let ids = self.store.list()?;
        let mut summary = RescanSummary::default();
        for topic in topics {
            match self.progress.refresh_topic_in(&ids, &topic.id) {
                Ok(Some(refresh)) if refresh.changed => summary.updated.push(refresh.topic),
                Ok(_) => summary.unchanged += 1,
                Err(err) => {
                    warn!(
                        "event=rescan module=propagation status=error topic={} error={}",
                        topic.id, err
                    );
                    summary.failures.push((topic.id, err.to_string()));
                }
            }
        }
        info!(
            "event=rescan module=propagation status=ok updated={} unchanged={} failed={}",
            summary.updated.len(),
            summary.unchanged,
            summary.failures.len()
        );
        Ok(summary)
    }
}
