//! Error types.

use thiserror::Error;

/// Result alias for resolver management operations.
pub type Result<T> = std::result::Result<T, ManagerError>;

/// Errors returned by resolver management operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Filesystem I/O failed (typically `PermissionDenied` under `/etc/unbound/`).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings failed validation before any file was written.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The daemon's configuration checker rejected the generated file.
    ///
    /// The rejected file is left on disk for inspection.
    #[error("configuration rejected by checker: {details}")]
    ConfigRejected {
        /// Diagnostic output from the checker.
        details: String,
    },

    /// A zone file or backup required by the operation does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The missing path.
        path: String,
    },

    /// A persisted settings file could not be parsed.
    #[error("malformed settings file: {0}")]
    MalformedSettings(#[from] serde_json::Error),
}

impl ManagerError {
    /// Returns `true` if the underlying I/O error is `PermissionDenied`.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied)
    }
}
