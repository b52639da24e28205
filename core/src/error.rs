use thiserror::Error;

/// Failures callers are expected to tell apart.
///
/// These travel inside `anyhow::Error`; match on them with
/// `err.downcast_ref::<FormaError>()`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormaError {
    #[error("stored data under '{key}' is corrupt: {source}")]
    CorruptData {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("a sync is already running")]
    SyncInProgress,

    #[error("not signed in")]
    NotSignedIn,

    #[error("AI response did not contain a JSON object")]
    NoJsonObject,

    #[error("failed to parse AI response: {0}")]
    MalformedProgram(#[source] serde_json::Error),

    #[error("profile is incomplete: missing {0}")]
    IncompleteProfile(&'static str),

    #[error("complete at least one set before finishing")]
    NoCompletedSets,

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl FormaError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}
