//! Error types shared by the registry, catalog and shell.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the on-disk stores (service records, settings).
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("settings file {path}: {message}")]
    Settings { path: PathBuf, message: String },
}

impl StorageError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Everything a shell operation can fail with.
///
/// Every variant is recoverable: the shell turns them into notices instead of
/// tearing down the window.
#[derive(Error, Debug)]
pub enum ShellError {
    /// A required form field was empty.
    #[error("required field '{0}' is empty")]
    Validation(&'static str),

    #[error("there is already a configured service of the type {0}")]
    DuplicateSingleInstance(String),

    #[error("no service with id {0}")]
    NotFound(String),

    #[error("unknown service type {0}")]
    UnknownServiceType(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("service catalog error: {0}")]
    Catalog(String),

    #[error("{0} is currently not supported")]
    UnsupportedPlatform(String),

    #[error(transparent)]
    View(#[from] crate::controller::ContextError),
}

pub type ShellResult<T> = Result<T, ShellError>;
