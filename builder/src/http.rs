use crate::agent::Agent;
use actix_web::http::StatusCode;
use actix_web::{get, post, web, HttpResponse, Responder, ResponseError};
use pocketd_common::api::builder::{AbortRequest, DispatchRequest};
use pocketd_common::api::v1::ApiError;
use pocketd_common::errors::{self, debug, ArchiveError};
use std::fmt;

#[derive(Debug)]
pub struct Error {
    err: errors::Error,
}

impl fmt::Display for Error {
    fn fmt(&self, w: &mut fmt::Formatter) -> fmt::Result {
        write!(w, "{:#}", self.err)
    }
}

impl From<errors::Error> for Error {
    fn from(err: errors::Error) -> Error {
        Error { err }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match ArchiveError::of(&self.err) {
            Some(ArchiveError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match ArchiveError::of(&self.err) {
            Some(err) => ApiError::from(err),
            None => ApiError::internal(format!("{:#}", self.err)),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

#[post("/dispatch")]
pub async fn dispatch(
    agent: web::Data<Agent>,
    request: web::Json<DispatchRequest>,
) -> impl Responder {
    let agent = agent.into_inner();
    HttpResponse::Ok().json(agent.dispatch(request.into_inner()))
}

#[get("/status")]
pub async fn status(agent: web::Data<Agent>) -> impl Responder {
    HttpResponse::Ok().json(agent.status())
}

#[get("/result/{build_id}")]
pub async fn result(
    agent: web::Data<Agent>,
    build_id: web::Path<i32>,
) -> Result<impl Responder, Error> {
    let result = agent.take_result(build_id.into_inner())?;
    Ok(HttpResponse::Ok().json(result))
}

#[post("/abort")]
pub async fn abort(agent: web::Data<Agent>, request: web::Json<AbortRequest>) -> impl Responder {
    if !agent.abort(request.build_id) {
        debug!("Ignoring abort of build {}, it is not running here", request.build_id);
    }
    HttpResponse::NoContent().finish()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/builder/v1")
            .service(dispatch)
            .service(status)
            .service(result)
            .service(abort),
    );
}
