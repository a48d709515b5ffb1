//! Error types for vhub-renderer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from rendering the dashboard or the CSV export.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Filesystem error while loading override templates.
    #[error("template io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
}
