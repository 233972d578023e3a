use crate::catalog;
use crate::config::Config;
use crate::db::Pool;
use crate::models::SourcePackageRelease;
use crate::web;
use actix_web::{get, post, HttpResponse, Responder};
use chrono::Utc;
use pocketd_common::api::v1::CreateSourceReleaseRequest;

#[post("")]
pub async fn create_source_release(
    cfg: web::Data<Config>,
    pool: web::Data<Pool>,
    request: web::Json<CreateSourceReleaseRequest>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let created = catalog::create_source_release(
        &request,
        Utc::now().naive_utc(),
        &cfg.scheduler,
        &mut connection,
    )?;

    if created.created {
        Ok(HttpResponse::Created().json(created))
    } else {
        Ok(HttpResponse::Ok().json(created))
    }
}

#[get("/{id}")]
pub async fn get_source_release(
    pool: web::Data<Pool>,
    id: web::Path<i32>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let record = SourcePackageRelease::get_id(id.into_inner(), &mut connection)?
        .into_api(&mut connection)?;
    Ok(HttpResponse::Ok().json(record))
}
