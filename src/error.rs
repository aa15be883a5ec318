//! Pipeline error types.
//!
//! Errors split into two classes:
//! - **recoverable**: a missing source, an unreadable file, a malformed
//!   deferred payload. The render boundary logs these and emits nothing.
//! - **fatal**: style compilation failures, cache write failures, cyclic
//!   source aliases. These always reach the caller.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type used throughout the pipeline.
pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source not found: `{}`", .0.display())]
    SourceNotFound(PathBuf),

    #[error("failed to compile `{}`: {message}", path.display())]
    Compile { path: PathBuf, message: String },

    #[error("failed to write cache file `{}`", path.display())]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("collection alias `{0}` refers to itself")]
    AliasCycle(String),

    #[error("IO error when reading `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid asset payload: {0}")]
    Decode(String),
}

impl PipelineError {
    /// Whether the render boundary may swallow this error.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SourceNotFound(_) | Self::Io { .. } | Self::Decode(_)
        )
    }

    pub fn compile(path: &Path, message: impl Into<String>) -> Self {
        Self::Compile {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Map a read failure, turning `NotFound` into [`PipelineError::SourceNotFound`].
    pub fn read(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::SourceNotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}
