//! Shared error types for the services crate.

use thiserror::Error;

use storage::sqlite::SqliteInitError;

/// Rejections raised by form validation, before any collaborator is called.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("name is required")]
    EmptyName,

    #[error("email is required")]
    EmptyEmail,

    #[error("password is required")]
    EmptySecret,

    #[error("password must be at least {min} characters")]
    SecretTooShort { min: usize },

    #[error("passwords do not match")]
    SecretMismatch,
}

/// Errors emitted by account backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccountError {
    #[error("an account with this email already exists")]
    AlreadyExists,

    #[error("account service unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by `SessionManager`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    AccountExists,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Account(#[from] AccountError),
}

/// Errors emitted by event sinks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackingError {
    #[error("event tracking is not configured")]
    Disabled,

    #[error("event tracking request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
