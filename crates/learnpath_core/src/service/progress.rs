//! Pure progress aggregation.
//!
//! # Responsibility
//! - Compute a topic's derived counts and ratio from its subtopic states.
//! - Apply a computed state to a topic document (fields, progress section,
//!   checklist).
//! - Flip a subtopic's completion flag.
//!
//! # Invariants
//! - `total_count` equals the subtopic list length, dangling entries included.
//! - Dangling entries never count as completed.
//! - `apply_topic_state` returns `None` when the document already matches.

use crate::config::TrackerSettings;
use crate::frontmatter::{get_field, upsert_field, FieldValue, ParsedDocument};
use crate::markdown::{rebuild_checklist, replace_section, rewrite_status_line, ChecklistMark};
use crate::model::document::{
    read_completed, DocumentId, TopicMeta, FIELD_COMPLETED, FIELD_COMPLETED_SUBTOPICS,
    FIELD_COMPLETION_DATE, FIELD_PROGRESS, FIELD_TOTAL_SUBTOPICS,
};
use chrono::NaiveDate;

/// Aggregate values persisted on a topic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopicState {
    /// Ratio in `0.0..=1.0`.
    pub progress: f64,
    pub completed_count: u32,
    pub total_count: u32,
}

impl TopicState {
    /// `round(progress * 100)`, ties away from zero.
    pub fn percent(&self) -> u32 {
        self.hundredths()
    }

    /// Value written into the `progress` field.
    ///
    /// Shares the rounding of `percent` so `0.13` pairs with `13%`.
    pub fn progress_text(&self) -> String {
        let hundredths = self.hundredths();
        format!("{}.{:02}", hundredths / 100, hundredths % 100)
    }

    fn hundredths(&self) -> u32 {
        (self.progress.clamp(0.0, 1.0) * 100.0).round() as u32
    }

    /// Content of the progress section.
    pub fn progress_section(&self) -> String {
        format!("{}% complete", self.percent())
    }
}

/// Completion state of one listed subtopic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtopicStatus {
    Completed,
    Pending,
    /// Reference does not resolve to any document.
    Dangling,
}

impl SubtopicStatus {
    pub fn mark(self) -> ChecklistMark {
        match self {
            Self::Completed => ChecklistMark::Done,
            Self::Pending => ChecklistMark::Open,
            Self::Dangling => ChecklistMark::Missing,
        }
    }
}

/// One entry of a topic's subtopic list after lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtopicResolution {
    /// Reference exactly as listed on the topic.
    pub reference: String,
    /// Resolved document, `None` when dangling.
    pub target: Option<DocumentId>,
    pub status: SubtopicStatus,
    pub completion_date: Option<NaiveDate>,
}

impl SubtopicResolution {
    pub fn dangling(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            target: None,
            status: SubtopicStatus::Dangling,
            completion_date: None,
        }
    }
}

/// Computes the aggregate for `topic` from one resolution per list entry.
pub fn compute_topic_state(topic: &TopicMeta, resolutions: &[SubtopicResolution]) -> TopicState {
    let total_count = topic.subtopics.len() as u32;
    let completed_count = resolutions
        .iter()
        .filter(|resolution| resolution.status == SubtopicStatus::Completed)
        .count() as u32;
    let progress = if total_count > 0 {
        f64::from(completed_count) / f64::from(total_count)
    } else {
        0.0
    };
    TopicState {
        progress,
        completed_count,
        total_count,
    }
}

/// Writes `state` into a topic document.
///
/// Updates the three aggregate fields, the progress section and the subtopic
/// checklist. Returns `None` when the result is identical to `parsed`.
pub fn apply_topic_state(
    parsed: &ParsedDocument,
    state: &TopicState,
    resolutions: &[SubtopicResolution],
    settings: &TrackerSettings,
) -> Option<ParsedDocument> {
    let mut block = upsert_field(
        parsed.block(),
        FIELD_PROGRESS,
        &FieldValue::Text(state.progress_text()),
    );
    block = upsert_field(
        &block,
        FIELD_COMPLETED_SUBTOPICS,
        &FieldValue::Text(state.completed_count.to_string()),
    );
    block = upsert_field(
        &block,
        FIELD_TOTAL_SUBTOPICS,
        &FieldValue::Text(state.total_count.to_string()),
    );

    let body = replace_section(
        parsed.body(),
        &settings.progress_heading,
        &state.progress_section(),
    );
    let items: Vec<String> = resolutions
        .iter()
        .map(|resolution| resolution.reference.clone())
        .collect();
    let body = rebuild_checklist(&body, &settings.subtopics_heading, &items, |item| {
        resolutions
            .iter()
            .find(|resolution| resolution.reference == item)
            .map_or(ChecklistMark::Missing, |resolution| resolution.status.mark())
    });

    if block == parsed.block() && body == parsed.body() {
        return None;
    }
    Some(parsed.clone().with_block(block).with_body(body))
}

/// Subtopic document after a completion toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggledSubtopic {
    pub document: ParsedDocument,
    /// New value of the `completed` flag.
    pub completed: bool,
}

/// Flips `completed`, stamps `completion_date` when it becomes true and
/// rewrites the body status line when present.
///
/// Reopening keeps the previous date unless `clear_date_on_reopen` is set,
/// in which case an existing `completion_date` is emptied.
pub fn toggle_subtopic_completion(
    parsed: &ParsedDocument,
    today: NaiveDate,
    clear_date_on_reopen: bool,
) -> ToggledSubtopic {
    let completed = !read_completed(parsed.block());
    let mut block = upsert_field(parsed.block(), FIELD_COMPLETED, &FieldValue::Bool(completed));
    if completed {
        block = upsert_field(&block, FIELD_COMPLETION_DATE, &FieldValue::Date(today));
    } else if clear_date_on_reopen && get_field(&block, FIELD_COMPLETION_DATE).is_some() {
        block = upsert_field(&block, FIELD_COMPLETION_DATE, &FieldValue::Text(String::new()));
    }
    let body = rewrite_status_line(parsed.body(), completed);

    ToggledSubtopic {
        document: parsed.clone().with_block(block).with_body(body),
        completed,
    }
}
