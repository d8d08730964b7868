//! Tracker settings.
//!
//! # Responsibility
//! - Define user-tunable folders, headings and policies.
//! - Load settings from an optional TOML file with defaults for every key.
//!
//! # Invariants
//! - A missing settings file yields `TrackerSettings::default()`.
//! - Loaded settings are validated before use.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Component, Path, PathBuf};

/// Default settings file name inside a vault root.
pub const SETTINGS_FILE_NAME: &str = "learnpath.toml";

/// Settings consumed by the tracker services.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerSettings {
    /// Folder for new topic documents, relative to the vault root.
    pub topic_folder: String,
    /// Folder for new subtopic documents, relative to the vault root.
    pub subtopic_folder: String,
    /// Heading whose section shows `<percent>% complete`.
    pub progress_heading: String,
    /// Heading whose section lists the subtopic checklist.
    pub subtopics_heading: String,
    /// Clears `completion_date` when a subtopic is reopened.
    pub clear_completion_date_on_reopen: bool,
    pub logging: LogSettings,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            topic_folder: "Topics".to_string(),
            subtopic_folder: "Subtopics".to_string(),
            progress_heading: "Progress".to_string(),
            subtopics_heading: "Subtopics".to_string(),
            clear_completion_date_on_reopen: false,
            logging: LogSettings::default(),
        }
    }
}

/// Logging section of the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// One of `trace|debug|info|warn|error`.
    pub level: String,
    /// Absolute directory for rolling log files. File logging is off when unset.
    pub dir: Option<PathBuf>,
    /// Mirror log records to stderr.
    pub stderr: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
            stderr: false,
        }
    }
}

/// Settings load/validation error.
#[derive(Debug)]
pub enum SettingsError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read settings `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid settings file: {err}"),
            Self::Invalid(message) => write!(f, "invalid settings: {message}"),
        }
    }
}

impl Error for SettingsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for SettingsError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

impl TrackerSettings {
    /// Checks folder and heading values.
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (key, value) in [
            ("progress_heading", &self.progress_heading),
            ("subtopics_heading", &self.subtopics_heading),
        ] {
            if value.trim().is_empty() {
                return Err(SettingsError::Invalid(format!("`{key}` must not be blank")));
            }
        }
        for (key, value) in [
            ("topic_folder", &self.topic_folder),
            ("subtopic_folder", &self.subtopic_folder),
        ] {
            let path = Path::new(value.as_str());
            if value.trim().is_empty()
                || !path
                    .components()
                    .all(|component| matches!(component, Component::Normal(_)))
            {
                return Err(SettingsError::Invalid(format!(
                    "`{key}` must be a relative folder inside the vault, got `{value}`"
                )));
            }
        }
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(SettingsError::Invalid(format!(
                    "`logging.dir` must be absolute, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Parses and validates settings from TOML text.
pub fn parse_settings(text: &str) -> Result<TrackerSettings, SettingsError> {
    let settings: TrackerSettings = toml::from_str(text)?;
    settings.validate()?;
    Ok(settings)
}

/// Loads settings from `path`, falling back to defaults when it does not exist.
pub fn load_settings(path: &Path) -> Result<TrackerSettings, SettingsError> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_settings(&text),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(TrackerSettings::default()),
        Err(err) => Err(SettingsError::Io {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{load_settings, parse_settings, SettingsError, TrackerSettings};
    use std::path::Path;

    #[test]
    fn empty_file_yields_defaults() {
        let settings = parse_settings("").expect("empty settings parse");
        assert_eq!(settings, TrackerSettings::default());
        assert_eq!(settings.topic_folder, "Topics");
        assert!(!settings.clear_completion_date_on_reopen);
    }

    #[test]
    fn overrides_keys_and_logging_table() {
        let settings = parse_settings(
            "subtopic_folder = \"Learning/Units\"\nclear_completion_date_on_reopen = true\n\n[logging]\nlevel = \"warn\"\nstderr = true\n",
        )
        .expect("settings parse");
        assert_eq!(settings.subtopic_folder, "Learning/Units");
        assert!(settings.clear_completion_date_on_reopen);
        assert_eq!(settings.logging.level, "warn");
        assert!(settings.logging.stderr);
        assert_eq!(settings.progress_heading, "Progress");
    }

    #[test]
    fn rejects_escaping_folders_and_unknown_keys() {
        let err = parse_settings("topic_folder = \"../outside\"").expect_err("must reject");
        assert!(matches!(err, SettingsError::Invalid(_)));

        let err = parse_settings("progress_heading = \"  \"").expect_err("must reject");
        assert!(matches!(err, SettingsError::Invalid(_)));

        let err = parse_settings("unknown = 1").expect_err("must reject");
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = load_settings(Path::new("/definitely/not/here/learnpath.toml"))
            .expect("missing file is not an error");
        assert_eq!(settings, TrackerSettings::default());
    }
}
