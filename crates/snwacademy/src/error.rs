//! Error types for snwacademy.
//!
//! The first group of variants is the domain taxonomy surfaced to views
//! (fetch, validation, auth, mutation, not-found). The rest are the
//! infrastructure failures underneath them.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for snwacademy operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Domain Errors ===
    /// Reading formations from the store failed.
    #[error("failed to fetch formations: {message}")]
    Fetch {
        /// Description of what went wrong.
        message: String,
    },

    /// A required field was blank.
    #[error("{field} is required")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The caller has no valid session, or the credentials were rejected.
    #[error("not authenticated: {reason}")]
    Auth {
        /// Why authentication failed.
        reason: String,
    },

    /// An insert or delete against the store failed.
    #[error("failed to {action} formation: {message}")]
    Mutation {
        /// The mutation that was attempted.
        action: &'static str,
        /// Description of what went wrong.
        message: String,
    },

    /// No formation exists with the given id.
    #[error("formation not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for snwacademy operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a fetch error from any displayable cause.
    #[must_use]
    pub fn fetch(cause: impl std::fmt::Display) -> Self {
        Self::Fetch {
            message: cause.to_string(),
        }
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(reason: impl Into<String>) -> Self {
        Self::Auth {
            reason: reason.into(),
        }
    }

    /// Create a mutation error for the given action.
    #[must_use]
    pub fn mutation(action: &'static str, cause: impl std::fmt::Display) -> Self {
        Self::Mutation {
            action,
            message: cause.to_string(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error should send the user back to the login route.
    #[must_use]
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Check if this error was raised by client-side validation.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
