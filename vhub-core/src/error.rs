//! Error types for vhub-core.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Location of a node in the region → environment → app tree.
///
/// Carried by [`StoreError`] to name the first missing (or clashing) segment.
/// Only used for messages; callers branch on the error variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodePath {
    Region {
        region: String,
    },
    Environment {
        region: String,
        environment: String,
    },
    App {
        region: String,
        environment: String,
        app: String,
    },
}

impl NodePath {
    pub fn region(region: &str) -> Self {
        Self::Region {
            region: region.to_owned(),
        }
    }

    pub fn environment(region: &str, environment: &str) -> Self {
        Self::Environment {
            region: region.to_owned(),
            environment: environment.to_owned(),
        }
    }

    pub fn app(region: &str, environment: &str, app: &str) -> Self {
        Self::App {
            region: region.to_owned(),
            environment: environment.to_owned(),
            app: app.to_owned(),
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePath::Region { region } => write!(f, "region '{region}'"),
            NodePath::Environment {
                region,
                environment,
            } => write!(f, "environment '{region}/{environment}'"),
            NodePath::App {
                region,
                environment,
                app,
            } => write!(f, "app '{region}/{environment}/{app}'"),
        }
    }
}

/// Expected, recoverable outcomes of store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A segment of the path does not exist.
    #[error("{0} not found")]
    NotFound(NodePath),

    /// A create targeted a name that already exists among its siblings.
    #[error("{0} already exists")]
    Conflict(NodePath),

    /// Name is empty, blank, or contains `/`.
    #[error("invalid name '{0}'")]
    InvalidName(String),

    /// The request carried nothing to apply.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

/// Failures of the durable save/load protocol.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Read, write, or rename failure at a specific file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but does not hold a valid encoding.
    #[error("failed to decode registry at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the in-memory tree failed.
    #[error("failed to encode registry: {0}")]
    Encode(#[from] serde_json::Error),

    /// Neither the primary nor the backup copy could be loaded.
    #[error("primary copy unusable ({primary}); backup copy unusable ({backup})")]
    Unrecoverable {
        primary: Box<PersistError>,
        backup: Box<PersistError>,
    },
}

/// Convenience constructor for [`PersistError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> PersistError {
    PersistError::Io {
        path: path.into(),
        source,
    }
}
