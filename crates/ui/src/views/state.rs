use services::{AdminError, ProgressServiceError};
use thiserror::Error;

/// Failures while preparing a page; the router shows them on the error screen.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ViewError {
    #[error("you need to sign in to see this page")]
    NotSignedIn,

    #[error("could not load progress: {0}")]
    Progress(String),

    #[error("could not load the intern overview: {0}")]
    Admin(String),
}

impl ViewError {
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl From<ProgressServiceError> for ViewError {
    fn from(err: ProgressServiceError) -> Self {
        match err {
            ProgressServiceError::NotSignedIn => ViewError::NotSignedIn,
            other => ViewError::Progress(other.to_string()),
        }
    }
}

impl From<AdminError> for ViewError {
    fn from(err: AdminError) -> Self {
        ViewError::Admin(err.to_string())
    }
}
