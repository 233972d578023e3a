pub use anyhow::{anyhow, bail, format_err, Context, Error, Result};
pub use log::{debug, error, info, trace, warn};

/// Failure kinds of the build and publishing core.
///
/// These travel inside [`Error`] like any other error, callers that need to
/// react to a specific kind use [`ArchiveError::of`] to look through context
/// layers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    #[error("invalid state transition: {0}")]
    InvalidTransition(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("duplicate version: {0}")]
    DuplicateVersion(String),
    #[error("builder unhealthy: {0}")]
    BuilderUnhealthy(String),
    #[error("dependency unsatisfied: {0}")]
    DependencyUnsatisfied(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ArchiveError {
    pub fn of(err: &Error) -> Option<&ArchiveError> {
        err.downcast_ref::<ArchiveError>()
    }

    pub fn is_conflict(err: &Error) -> bool {
        matches!(Self::of(err), Some(ArchiveError::Conflict(_)))
    }

    /// The machine readable name used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ArchiveError::InvalidTransition(_) => "invalid-transition",
            ArchiveError::Conflict(_) => "conflict",
            ArchiveError::DuplicateVersion(_) => "duplicate-version",
            ArchiveError::BuilderUnhealthy(_) => "builder-unhealthy",
            ArchiveError::DependencyUnsatisfied(_) => "dependency-unsatisfied",
            ArchiveError::Timeout(_) => "timeout",
            ArchiveError::NotFound(_) => "not-found",
            ArchiveError::InvalidInput(_) => "invalid-input",
        }
    }

    pub fn from_kind(kind: &str, message: String) -> Option<ArchiveError> {
        let err = match kind {
            "invalid-transition" => ArchiveError::InvalidTransition(message),
            "conflict" => ArchiveError::Conflict(message),
            "duplicate-version" => ArchiveError::DuplicateVersion(message),
            "builder-unhealthy" => ArchiveError::BuilderUnhealthy(message),
            "dependency-unsatisfied" => ArchiveError::DependencyUnsatisfied(message),
            "timeout" => ArchiveError::Timeout(message),
            "not-found" => ArchiveError::NotFound(message),
            "invalid-input" => ArchiveError::InvalidInput(message),
            _ => return None,
        };
        Some(err)
    }

    /// The inner message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            ArchiveError::InvalidTransition(m)
            | ArchiveError::Conflict(m)
            | ArchiveError::DuplicateVersion(m)
            | ArchiveError::BuilderUnhealthy(m)
            | ArchiveError::DependencyUnsatisfied(m)
            | ArchiveError::Timeout(m)
            | ArchiveError::NotFound(m)
            | ArchiveError::InvalidInput(m) => m,
        }
    }

    pub fn invalid_transition<S: Into<String>>(msg: S) -> Error {
        ArchiveError::InvalidTransition(msg.into()).into()
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Error {
        ArchiveError::Conflict(msg.into()).into()
    }

    pub fn duplicate_version<S: Into<String>>(msg: S) -> Error {
        ArchiveError::DuplicateVersion(msg.into()).into()
    }

    pub fn builder_unhealthy<S: Into<String>>(msg: S) -> Error {
        ArchiveError::BuilderUnhealthy(msg.into()).into()
    }

    pub fn timeout<S: Into<String>>(msg: S) -> Error {
        ArchiveError::Timeout(msg.into()).into()
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        ArchiveError::NotFound(msg.into()).into()
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Error {
        ArchiveError::InvalidInput(msg.into()).into()
    }
}
