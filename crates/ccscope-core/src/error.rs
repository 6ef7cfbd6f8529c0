//! Process-level and write-path errors.
//!
//! Fragment-level problems (missing, unreadable or malformed files) are never
//! raised; they travel as `error` strings on [`crate::ConfigFragment`].

use std::path::PathBuf;

use thiserror::Error;

use crate::scope::Scope;

/// Errors that abort an invocation or a single settings write
#[derive(Debug, Error)]
pub enum InspectError {
    /// The home directory could not be determined
    #[error("cannot determine home directory")]
    HomeNotFound,

    /// The requested project directory does not exist
    #[error("project directory not found: {}", path.display())]
    ProjectNotFound { path: PathBuf },

    /// A project-scoped write was requested without a project directory
    #[error("scope {scope} requires a project directory")]
    NoProject { scope: Scope },

    /// The managed scope is read-only
    #[error("scope {scope} is not writable")]
    ReadOnlyScope { scope: Scope },

    /// Empty or otherwise unusable settings key
    #[error("invalid settings key: {key:?}")]
    InvalidKey { key: String },

    /// Target file exists but is not a JSON object
    #[error("cannot edit {}: {message}", path.display())]
    MalformedTarget { path: PathBuf, message: String },

    /// Filesystem failure on a write path
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InspectError>;
