//! Tracker use-case services.
//!
//! # Responsibility
//! - Turn store reads and writes into progress use-cases.
//! - Keep UI/FFI layers decoupled from document text details.

pub mod error;
pub mod progress;
pub mod progress_service;
pub mod propagation;
pub mod report;
pub mod template;

pub use error::{TrackerError, TrackerResult};
pub use progress::{
    apply_topic_state, compute_topic_state, toggle_subtopic_completion, SubtopicResolution,
    SubtopicStatus, ToggledSubtopic, TopicState,
};
pub use progress_service::{ProgressService, TopicRefresh, TopicSnapshot};
pub use propagation::{
    ChangePropagator, IgnoreReason, PropagationStep, RescanSummary, ToggleOutcome,
};
pub use report::{ReportService, TopicProgress};
pub use template::TemplateService;
