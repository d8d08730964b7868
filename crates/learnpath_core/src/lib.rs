//! Core engine for LearnPath progress tracking.
//! This crate is the single source of truth for document and progress invariants.

pub mod config;
pub mod frontmatter;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{
    load_settings, parse_settings, LogSettings, SettingsError, TrackerSettings,
    SETTINGS_FILE_NAME,
};
pub use frontmatter::{FieldValue, ParsedDocument};
pub use logging::{default_log_level, init_logging, logging_status, LoggingTargets};
pub use model::document::{Document, DocumentId, DocumentKind, SubtopicMeta, TopicMeta};
pub use model::reference::{extract_name, Resolution};
pub use repo::{DocumentStore, FsDocumentStore, InMemoryDocumentStore, StoreError, StoreResult};
pub use service::{
    ChangePropagator, IgnoreReason, ProgressService, PropagationStep, ReportService,
    RescanSummary, TemplateService, ToggleOutcome, TopicProgress, TopicRefresh, TrackerError,
    TrackerResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
