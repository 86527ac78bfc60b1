//! Errors raised while loading quest definitions.
//!
//! Runtime routing misses are not errors; they come back as `false` from the
//! signal entry points and are only logged.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuestError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML quest definition: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON quest definition: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Quest definition has a blank id")]
    MissingQuestId,

    #[error("Unsupported quest file format: {0:?}")]
    UnsupportedFormat(PathBuf),
}

impl QuestError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
