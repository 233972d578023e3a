use crate::config::Config;
use crate::db::Pool;
use crate::models::{BinaryPackageRelease, Build, Ticket};
use crate::scheduler::{dispatch, Scheduler};
use crate::web;
use actix_web::{get, post, HttpResponse, Responder};
use chrono::Utc;
use pocketd_common::api::v1::{BuildFilter, DispatchManualRequest, RescoreRequest, SetManualRequest};
use pocketd_common::errors::*;

fn load_build(id: i32, pool: &Pool) -> Result<pocketd_common::api::v1::Build> {
    let mut connection = pool.get()?;
    Build::get_id(id, &mut connection)?.into_api(&mut connection)
}

fn load_ticket(build_id: i32, pool: &Pool) -> Result<pocketd_common::api::v1::QueuedBuild> {
    let mut connection = pool.get()?;
    let ticket = Ticket::get_for_build(build_id, &mut connection)?
        .ok_or_else(|| ArchiveError::not_found(format!("no queue entry for build {build_id}")))?;
    ticket.into_api(&mut connection)
}

#[get("")]
pub async fn get_builds(
    pool: web::Data<Pool>,
    filter: web::Query<BuildFilter>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let records = Build::list(&filter, &mut connection)?
        .into_iter()
        .map(|build| build.into_api(&mut connection))
        .collect::<Result<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(records))
}

#[get("/{id}")]
pub async fn get_build(pool: web::Data<Pool>, id: web::Path<i32>) -> web::Result<impl Responder> {
    let record = load_build(id.into_inner(), &pool)?;
    Ok(HttpResponse::Ok().json(record))
}

/// The retained tail of the build log, the full log lives in the file store
#[get("/{id}/log")]
pub async fn get_build_log(
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let build = Build::get_id(id.into_inner(), &mut connection)?;
    let tail = build
        .log_tail
        .ok_or_else(|| ArchiveError::not_found(format!("no log for build {}", build.id)))?;

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .append_header(("X-Content-Type-Options", "nosniff"))
        .append_header(("Content-Security-Policy", "default-src 'none'"))
        .body(tail))
}

#[get("/{id}/binaries")]
pub async fn get_build_binaries(
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let build = Build::get_id(id.into_inner(), &mut connection)?;
    let records = BinaryPackageRelease::list_for_build(build.id, &mut connection)?
        .into_iter()
        .map(|binary| binary.into_api(&mut connection))
        .collect::<Result<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(records))
}

#[post("/{id}/cancel")]
pub async fn cancel_build(
    pool: web::Data<Pool>,
    scheduler: web::Data<Scheduler>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    let id = id.into_inner();
    scheduler.cancel(id)?;
    Ok(HttpResponse::Ok().json(load_build(id, &pool)?))
}

#[post("/{id}/requeue")]
pub async fn requeue_build(
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    let id = id.into_inner();
    {
        let mut connection = pool.get()?;
        dispatch::retry(id, Utc::now().naive_utc(), &cfg.scheduler, &mut connection)?;
    }
    Ok(HttpResponse::Ok().json(load_build(id, &pool)?))
}

#[post("/{id}/dispatch")]
pub async fn dispatch_build(
    pool: web::Data<Pool>,
    scheduler: web::Data<Scheduler>,
    id: web::Path<i32>,
    request: web::Json<DispatchManualRequest>,
) -> web::Result<impl Responder> {
    let id = id.into_inner();
    if !scheduler.dispatch_manual(id, request.builder_id).await? {
        warn!("Builder {} did not take build {}, it is back in the queue", request.builder_id, id);
    }
    Ok(HttpResponse::Ok().json(load_build(id, &pool)?))
}

#[post("/{id}/rescore")]
pub async fn rescore_build(
    pool: web::Data<Pool>,
    id: web::Path<i32>,
    request: web::Json<RescoreRequest>,
) -> web::Result<impl Responder> {
    let id = id.into_inner();
    {
        let mut connection = pool.get()?;
        dispatch::rescore(id, request.score, &mut connection)?;
    }
    Ok(HttpResponse::Ok().json(load_ticket(id, &pool)?))
}

#[post("/{id}/manual")]
pub async fn set_build_manual(
    pool: web::Data<Pool>,
    id: web::Path<i32>,
    request: web::Json<SetManualRequest>,
) -> web::Result<impl Responder> {
    let id = id.into_inner();
    {
        let mut connection = pool.get()?;
        dispatch::set_manual(id, request.manual, &mut connection)?;
    }
    Ok(HttpResponse::Ok().json(load_ticket(id, &pool)?))
}
