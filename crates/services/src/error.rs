//! Shared error types for the services crate.

use thiserror::Error;

use hub_core::model::{Category, ProgressError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Missing or unreachable backend configuration. Fatal at startup.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("backend configuration is incomplete: {missing} is not set")]
    Incomplete { missing: &'static str },
    #[error("configuration endpoint answered with status {status}")]
    Unavailable { status: u16 },
    #[error("configuration endpoint returned malformed data: {0}")]
    Malformed(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Authentication failures shown to the user.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("sign-in with provider failed: {0}")]
    OAuth(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("no curriculum page is active")]
    NoActiveCategory,
    #[error("{0} progress was never loaded for the signed-in user")]
    NotLoaded(Category),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AdminService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminError {
    #[error("admin role required")]
    Forbidden,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("the selected file is empty")]
    EmptyFile,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while building export documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    #[error("unknown export format: {0}")]
    UnknownFormat(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
