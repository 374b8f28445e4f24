use thiserror::Error;

/// Errors surfaced by the tracking core.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed usage document: {0}")]
    MalformedDocument(String),

    #[error("foreground resolution failed: {0}")]
    Resolver(String),

    #[error("tracker state lock poisoned")]
    LockPoisoned,

    #[error("sampler thread panicked")]
    SamplerPanicked,
}

impl TrackerError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
