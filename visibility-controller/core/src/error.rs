use std::time::Duration;
use thiserror::Error;

/// Describes why a single resource could not be reviewed.
///
/// Review errors are always scoped to one resource; the previously cached subjects for that
/// resource are retained.
#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("resource {0} is unknown to the policy system")]
    Unknown(String),

    #[error("review failed: {0}")]
    Failed(#[source] anyhow::Error),

    #[error("review timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("resource source unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListError {
    #[error("a user must be provided")]
    MissingUser,
}
