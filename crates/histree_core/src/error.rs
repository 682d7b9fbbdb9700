//! Error types for HisTree core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in HisTree core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The path text is malformed (empty or contains a doubled separator).
    #[error("invalid path: {message}")]
    InvalidPath {
        /// Description of what is wrong with the path.
        message: String,
    },

    /// No node exists at the given path and creation was not requested.
    #[error("no such path: {path}")]
    NoSuchPath {
        /// The path that failed to resolve.
        path: String,
    },

    /// The node name is empty, contains a separator, or starts with a
    /// reserved prefix.
    #[error("invalid node name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// A child of that name already exists under the target parent.
    #[error("database already exists: {name}")]
    AlreadyExists {
        /// The colliding name.
        name: String,
    },

    /// A database handle was required but the node's metadata slot is
    /// empty or holds a different kind of resource.
    #[error("no database attached at {path}")]
    NoDatabase {
        /// Path of the node that was expected to carry a database.
        path: String,
    },

    /// A required action parameter was not supplied.
    #[error("missing required parameter: {name}")]
    MissingParameter {
        /// Name of the absent parameter.
        name: String,
    },
}

impl CoreError {
    /// Creates an invalid path error.
    pub fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath {
            message: message.into(),
        }
    }

    /// Creates a no-such-path error.
    pub fn no_such_path(path: impl Into<String>) -> Self {
        Self::NoSuchPath { path: path.into() }
    }

    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Creates an already-exists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists { name: name.into() }
    }

    /// Creates a no-database error.
    pub fn no_database(path: impl Into<String>) -> Self {
        Self::NoDatabase { path: path.into() }
    }

    /// Creates a missing-parameter error.
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }
}
