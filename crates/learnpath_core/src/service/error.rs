use crate::model::document::DocumentId;
use crate::repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Service error for tracker use-cases.
#[derive(Debug)]
pub enum TrackerError {
    /// Store-layer failure.
    Store(StoreError),
    /// Target document has no subtopic metadata.
    NotSubtopic(DocumentId),
    /// Target document has no topic metadata.
    NotTopic(DocumentId),
    /// A new document would overwrite an existing one.
    DocumentExists(DocumentId),
    /// Name cannot be used as a document name.
    InvalidName(String),
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::NotSubtopic(id) => write!(f, "document is not a subtopic: {id}"),
            Self::NotTopic(id) => write!(f, "document is not a topic: {id}"),
            Self::DocumentExists(id) => write!(f, "document already exists: {id}"),
            Self::InvalidName(name) => write!(f, "invalid document name: `{name}`"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for TrackerError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
