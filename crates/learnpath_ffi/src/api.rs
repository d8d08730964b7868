//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose vault-level progress use-cases to Dart via FRB.
//! - Hold the currently opened vault root and its settings.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Every use-case returns an envelope with `ok` and a readable `message`.
//! - Document ids cross the boundary as `/`-separated vault-relative paths.

use learnpath_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, load_settings,
    logging_status,
    ChangePropagator, DocumentId, FsDocumentStore, LogSettings, ReportService, TemplateService,
    TopicProgress, TrackerSettings, SETTINGS_FILE_NAME,
};
use log::info;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

static ACTIVE_VAULT: Mutex<Option<VaultContext>> = Mutex::new(None);

#[derive(Debug, Clone)]
struct VaultContext {
    root: PathBuf,
    settings: TrackerSettings,
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may create the log directory.
/// - Safe to call repeatedly with the same arguments (idempotent).
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return "log_dir cannot be empty".to_string();
    }
    let settings = LogSettings {
        level,
        dir: Some(PathBuf::from(trimmed)),
        stderr: false,
    };
    match init_logging_inner(&settings) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Affected document id, when the action targets one.
    pub document_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl VaultActionResponse {
    fn success(message: impl Into<String>, document_id: Option<String>) -> Self {
        Self {
            ok: true,
            document_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            document_id: None,
            message: message.into(),
        }
    }
}

/// One topic row for progress bars and tabs.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicProgressItem {
    pub id: String,
    pub name: String,
    /// Ratio in `0.0..=1.0`.
    pub progress: f64,
    pub completed_count: u32,
    pub total_count: u32,
}

/// Topic list response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicsResponse {
    pub ok: bool,
    /// Topics sorted by id; empty on failure.
    pub items: Vec<TopicProgressItem>,
    pub message: String,
}

/// Report response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResponse {
    pub ok: bool,
    /// Plain-text report; empty on failure.
    pub report: String,
    pub message: String,
}

/// Opens a vault directory and loads its `learnpath.toml`, if any.
///
/// A `[logging]` section with a `dir` or `stderr = true` starts logging
/// unless the host already called `init_logging`.
///
/// # FFI contract
/// - Sync call; reads the settings file.
/// - Replaces any previously opened vault.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn open_vault(root: String) -> VaultActionResponse {
    let root = PathBuf::from(root.trim());
    if let Err(err) = FsDocumentStore::open(root.as_path()) {
        return VaultActionResponse::failure(format!("open_vault failed: {err}"));
    }
    let settings = match load_settings(&root.join(SETTINGS_FILE_NAME)) {
        Ok(settings) => settings,
        Err(err) => return VaultActionResponse::failure(format!("open_vault failed: {err}")),
    };
    if let Err(err) = apply_vault_logging(&settings.logging) {
        return VaultActionResponse::failure(format!("open_vault failed: {err}"));
    }
    let Ok(mut active) = ACTIVE_VAULT.lock() else {
        return VaultActionResponse::failure("open_vault failed: vault state unavailable");
    };
    info!(
        "event=vault_open module=ffi status=ok root={}",
        root.display()
    );
    *active = Some(VaultContext { root, settings });
    VaultActionResponse::success("Vault opened.", None)
}

/// Lists topics with live progress.
///
/// # FFI contract
/// - Sync call, reads every document in the vault.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn topics_with_progress() -> TopicsResponse {
    let result = with_vault(|store, settings| {
        ReportService::new(store, settings)
            .topics_with_progress()
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(rows) => {
            let message = format!("Found {} topic(s).", rows.len());
            TopicsResponse {
                ok: true,
                items: rows.into_iter().map(to_topic_item).collect(),
                message,
            }
        }
        Err(err) => TopicsResponse {
            ok: false,
            items: Vec::new(),
            message: format!("topics_with_progress failed: {err}"),
        },
    }
}

/// Toggles a subtopic's completion and refreshes its parent topic.
///
/// # FFI contract
/// - Sync call, up to two document writes.
/// - Never panics; a failed parent write is reported but the subtopic stays toggled.
#[flutter_rust_bridge::frb(sync)]
pub fn toggle_subtopic_completion(document_id: String) -> VaultActionResponse {
    let today = chrono::Local::now().date_naive();
    let result = with_vault(|store, settings| {
        let id = normalize_id(store, &document_id);
        ChangePropagator::new(store, settings)
            .toggle_completion(&id, today)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(outcome) => {
            let message = if outcome.completed {
                "Subtopic completed."
            } else {
                "Subtopic reopened."
            };
            VaultActionResponse::success(message, Some(outcome.subtopic.to_string()))
        }
        Err(err) => {
            VaultActionResponse::failure(format!("toggle_subtopic_completion failed: {err}"))
        }
    }
}

/// Renders a read-only text report for a topic or subtopic.
///
/// # FFI contract
/// - Sync call, read-only.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn generate_report(document_id: String) -> ReportResponse {
    let result = with_vault(|store, settings| {
        let id = normalize_id(store, &document_id);
        ReportService::new(store, settings)
            .generate_report(&id)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(report) => ReportResponse {
            ok: true,
            report,
            message: "Report generated.".to_string(),
        },
        Err(err) => ReportResponse {
            ok: false,
            report: String::new(),
            message: format!("generate_report failed: {err}"),
        },
    }
}

/// Creates a topic document from the built-in template.
#[flutter_rust_bridge::frb(sync)]
pub fn create_topic(name: String) -> VaultActionResponse {
    let result = with_vault(|store, settings| {
        TemplateService::new(store, settings)
            .create_topic(&name)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(id) => VaultActionResponse::success("Topic created.", Some(id.to_string())),
        Err(err) => VaultActionResponse::failure(format!("create_topic failed: {err}")),
    }
}

/// Creates a subtopic under an existing topic and links it into the topic.
#[flutter_rust_bridge::frb(sync)]
pub fn create_subtopic(topic_name: String, name: String) -> VaultActionResponse {
    let result = with_vault(|store, settings| {
        TemplateService::new(store, settings)
            .create_subtopic(&topic_name, &name)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(id) => VaultActionResponse::success("Subtopic created.", Some(id.to_string())),
        Err(err) => VaultActionResponse::failure(format!("create_subtopic failed: {err}")),
    }
}

/// Feeds a "document changed" notification from the host's file watcher.
///
/// `document_id` may be a vault-relative id or an absolute file path.
///
/// # FFI contract
/// - Sync call, at most one document write.
/// - Ignored changes still report `ok = true`.
#[flutter_rust_bridge::frb(sync)]
pub fn notify_document_changed(document_id: String) -> VaultActionResponse {
    let result = with_vault(|store, settings| {
        let id = normalize_id(store, &document_id);
        ChangePropagator::new(store, settings)
            .on_changed(&id)
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(Some(refresh)) => {
            let message = if refresh.changed {
                "Topic updated."
            } else {
                "Topic already up to date."
            };
            VaultActionResponse::success(message, Some(refresh.topic.to_string()))
        }
        Ok(None) => VaultActionResponse::success("Change ignored.", None),
        Err(err) => VaultActionResponse::failure(format!("notify_document_changed failed: {err}")),
    }
}

/// Recomputes every topic in the vault.
#[flutter_rust_bridge::frb(sync)]
pub fn rescan_vault() -> VaultActionResponse {
    let result = with_vault(|store, settings| {
        ChangePropagator::new(store, settings)
            .rescan_all()
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(summary) if summary.failures.is_empty() => VaultActionResponse::success(
            format!(
                "Rescan finished: {} updated, {} unchanged.",
                summary.updated.len(),
                summary.unchanged
            ),
            None,
        ),
        Ok(summary) => VaultActionResponse::failure(format!(
            "Rescan finished with {} failure(s); first: {} ({})",
            summary.failures.len(),
            summary.failures[0].0,
            summary.failures[0].1
        )),
        Err(err) => VaultActionResponse::failure(format!("rescan_vault failed: {err}")),
    }
}

fn with_vault<T>(
    f: impl FnOnce(&FsDocumentStore, &TrackerSettings) -> Result<T, String>,
) -> Result<T, String> {
    let context = {
        let active = ACTIVE_VAULT
            .lock()
            .map_err(|_| "vault state unavailable".to_string())?;
        active
            .clone()
            .ok_or_else(|| "no vault is open; call open_vault first".to_string())?
    };
    let store = FsDocumentStore::open(context.root.as_path()).map_err(|err| err.to_string())?;
    f(&store, &context.settings)
}

/// Returns whether vault settings started the logger.
fn apply_vault_logging(settings: &LogSettings) -> Result<bool, String> {
    if settings.dir.is_none() && !settings.stderr {
        return Ok(false);
    }
    if let Some(active) = logging_status() {
        info!(
            "event=vault_logging module=ffi status=skip reason=already_active level={}",
            active.level
        );
        return Ok(false);
    }
    init_logging_inner(settings)?;
    Ok(true)
}

fn normalize_id(store: &FsDocumentStore, raw: &str) -> DocumentId {
    let trimmed = raw.trim();
    let path = Path::new(trimmed);
    if path.is_absolute() {
        if let Some(id) = store.id_for_path(path) {
            return id;
        }
    }
    DocumentId::new(trimmed.replace('\\', "/"))
}

fn to_topic_item(row: TopicProgress) -> TopicProgressItem {
    TopicProgressItem {
        id: row.id.to_string(),
        name: row.name,
        progress: row.progress,
        completed_count: row.completed_count,
        total_count: row.total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        apply_vault_logging, core_version, create_subtopic, create_topic, generate_report,
        init_logging, notify_document_changed, open_vault, rescan_vault,
        toggle_subtopic_completion, topics_with_progress,
    };
    use learnpath_core::{logging_status, LogSettings};

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/learnpath-logs".to_string());
        assert!(error.contains("unsupported"));
    }

    #[test]
    fn open_vault_rejects_missing_directory() {
        let response = open_vault("/definitely/not/a/vault".to_string());
        assert!(!response.ok);
        assert!(response.message.starts_with("open_vault failed"));
    }

    #[test]
    fn vault_flow_creates_toggles_and_reports() {
        let dir = tempfile::tempdir().expect("temp vault");
        let root = dir.path().to_str().expect("utf-8 path").to_string();
        assert!(open_vault(root).ok);

        let topic = create_topic("AWS".to_string());
        assert!(topic.ok, "{}", topic.message);
        assert_eq!(topic.document_id.as_deref(), Some("Topics/AWS.md"));
        assert!(create_subtopic("AWS".to_string(), "S3".to_string()).ok);
        assert!(create_subtopic("AWS".to_string(), "EC2".to_string()).ok);
        assert!(!create_subtopic("AWS".to_string(), "S3".to_string()).ok);

        let toggled = toggle_subtopic_completion("Subtopics/S3.md".to_string());
        assert!(toggled.ok, "{}", toggled.message);
        assert_eq!(toggled.message, "Subtopic completed.");

        let topics = topics_with_progress();
        assert!(topics.ok);
        assert_eq!(topics.items.len(), 1);
        assert_eq!(topics.items[0].completed_count, 1);
        assert_eq!(topics.items[0].total_count, 2);
        assert_eq!(topics.items[0].progress, 0.5);

        let report = generate_report("Topics/AWS.md".to_string());
        assert!(report.ok);
        assert!(report.report.starts_with("Topic: AWS\nProgress: 50%"));

        let absolute = dir.path().join("Subtopics").join("S3.md");
        let changed = notify_document_changed(absolute.to_string_lossy().into_owned());
        assert!(changed.ok);
        assert_eq!(changed.message, "Topic already up to date.");

        let rescan = rescan_vault();
        assert!(rescan.ok);
        assert_eq!(rescan.message, "Rescan finished: 0 updated, 1 unchanged.");

        let missing = toggle_subtopic_completion("Subtopics/None.md".to_string());
        assert!(!missing.ok);
    }

    #[test]
    fn vault_logging_settings_start_logger_once() {
        assert_eq!(apply_vault_logging(&LogSettings::default()), Ok(false));

        let dir = tempfile::tempdir().expect("temp log dir");
        let settings = LogSettings {
            level: "info".to_string(),
            dir: Some(dir.path().to_path_buf()),
            stderr: false,
        };
        assert_eq!(apply_vault_logging(&settings), Ok(true));
        let active = logging_status().expect("logging active");
        assert_eq!(active.log_dir.as_deref(), Some(dir.path()));

        assert_eq!(apply_vault_logging(&settings), Ok(false));
    }
}
