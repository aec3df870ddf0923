use std::path::{Path, PathBuf};

/// Convenience result type used across the crate.
pub type DcpResult<T> = Result<T, DcpError>;

/// Top-level error taxonomy used by writer APIs.
#[derive(thiserror::Error, Debug)]
pub enum DcpError {
    /// Invalid caller-provided configuration or input data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A caller broke an API contract (out-of-range reel, unvalidated fake write, ...).
    #[error("internal contract violation: {0}")]
    Contract(String),

    /// The filesystem ran out of space while writing `path`.
    #[error("no space left on device while writing '{}'", path.display())]
    DiskFull {
        /// File that was being written.
        path: PathBuf,
    },

    /// Any other I/O failure.
    #[error("I/O error: {context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DcpError {
    /// Build a [`DcpError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DcpError::Contract`] value.
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Build a [`DcpError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Classify an I/O error raised while touching `path`.
    ///
    /// Out-of-space conditions become [`DcpError::DiskFull`] so callers can report them precisely.
    pub fn io(path: &Path, context: impl Into<String>, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::StorageFull {
            return Self::DiskFull {
                path: path.to_path_buf(),
            };
        }
        Self::Io {
            context: format!("{} '{}'", context.into(), path.display()),
            source,
        }
    }

    /// Return `true` for [`DcpError::DiskFull`].
    pub fn is_disk_full(&self) -> bool {
        matches!(self, Self::DiskFull { .. })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
