use thiserror::Error;

use crate::model::{ParseCategoryError, ParseIdError, ProgressError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Category(#[from] ParseCategoryError),
    #[error(transparent)]
    Id(#[from] ParseIdError),
}
