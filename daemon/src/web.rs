pub use actix_web::web::{scope, Data, Json, JsonConfig, Path, Query, ServiceConfig};
use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use pocketd_common::api::v1::ApiError;
use pocketd_common::errors::{self, ArchiveError};
use std::fmt;

#[derive(Debug)]
pub struct Error {
    err: errors::Error,
}

pub type Result<T> = ::std::result::Result<T, Error>;

impl Error {
    fn kind(&self) -> Option<&ArchiveError> {
        ArchiveError::of(&self.err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, w: &mut fmt::Formatter) -> fmt::Result {
        write!(w, "{:#}", self.err)
    }
}

impl actix_web::error::ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            Some(ArchiveError::InvalidTransition(_))
            | Some(ArchiveError::Conflict(_))
            | Some(ArchiveError::DuplicateVersion(_))
            | Some(ArchiveError::BuilderUnhealthy(_)) => StatusCode::CONFLICT,
            Some(ArchiveError::NotFound(_)) => StatusCode::NOT_FOUND,
            Some(ArchiveError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            Some(ArchiveError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Some(ArchiveError::DependencyUnsatisfied(_)) | None => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self.kind() {
            Some(err) => ApiError::from(err),
            None => ApiError::internal(format!("{:#}", self.err)),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl From<errors::Error> for Error {
    fn from(err: errors::Error) -> Error {
        if ArchiveError::of(&err).is_some() {
            errors::debug!("Request rejected: {err:#}");
        } else {
            errors::error!("Error occurred in http handler: {err:#}");
        }
        Error { err }
    }
}

impl From<diesel::r2d2::PoolError> for Error {
    fn from(err: diesel::r2d2::PoolError) -> Error {
        Error::from(errors::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;

    #[test]
    fn test_status_codes() {
        let status = |err: errors::Error| Error::from(err).status_code();
        assert_eq!(
            status(ArchiveError::invalid_transition("PUBLISHED -> PENDING")),
            StatusCode::CONFLICT
        );
        assert_eq!(status(ArchiveError::conflict("lost")), StatusCode::CONFLICT);
        assert_eq!(
            status(ArchiveError::not_found("build 9")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status(ArchiveError::invalid_input("bad version")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(errors::anyhow!("disk full")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_kind_survives_context() {
        use pocketd_common::errors::Context;
        let err = Err::<(), _>(ArchiveError::duplicate_version("hello 1.0"))
            .context("Failed to create source release")
            .unwrap_err();
        assert_eq!(Error::from(err).status_code(), StatusCode::CONFLICT);
    }
}
