use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Errors raised by [`crate::KeyValueStore`] implementations and the records
/// persisted through them.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error for key {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
}

/// A preference value outside the supported option lists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PreferenceError {
    #[error("unknown region {0:?}")]
    UnknownRegion(String),

    #[error("unknown niche {0:?}")]
    UnknownNiche(String),
}
