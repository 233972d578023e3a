use crate::errors::*;
use serde::{Deserialize, Serialize};

/// Body of every non-2xx response of the api.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub kind: String,
    pub message: String,
}

impl ApiError {
    pub fn internal<S: Into<String>>(message: S) -> ApiError {
        ApiError {
            kind: "internal".to_string(),
            message: message.into(),
        }
    }

    pub fn into_error(self) -> Error {
        match ArchiveError::from_kind(&self.kind, self.message.clone()) {
            Some(err) => err.into(),
            None => anyhow!("{} ({})", self.message, self.kind),
        }
    }
}

impl From<&ArchiveError> for ApiError {
    fn from(err: &ArchiveError) -> ApiError {
        ApiError {
            kind: err.kind().to_string(),
            message: err.message().to_string(),
        }
    }
}
