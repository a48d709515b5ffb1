use std::path::PathBuf;

use thiserror::Error;

/// Error surface for the daemon runtime, health-check config, and HTTP server.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("persistence error: {0}")]
    Persist(#[from] vhub_core::PersistError),

    #[error("render error: {0}")]
    Render(#[from] vhub_renderer::RenderError),

    /// Health-check configuration missing or malformed. Fatal for the poller only.
    #[error("invalid health-check config at {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("daemon runtime error: {0}")]
    Runtime(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
