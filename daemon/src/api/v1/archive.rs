use crate::catalog;
use crate::db::Pool;
use crate::models::{Archive, Distribution, DistroArchSeries, DistroSeries};
use crate::web;
use actix_web::{get, post, HttpResponse, Responder};
use chrono::Utc;
use pocketd_common::api::v1::{
    self as api, CreateArchiveRequest, CreateDistributionRequest, CreateDistroArchSeriesRequest,
    CreateDistroSeriesRequest, SetChrootRequest,
};
use pocketd_common::errors::*;

#[get("")]
pub async fn get_distributions(pool: web::Data<Pool>) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let records = Distribution::list(&mut connection)?
        .into_iter()
        .map(|d| d.into_api(&mut connection))
        .collect::<Result<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(records))
}

#[post("")]
pub async fn create_distribution(
    pool: web::Data<Pool>,
    request: web::Json<CreateDistributionRequest>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let distribution =
        catalog::create_distribution(&request.name, Utc::now().naive_utc(), &mut connection)?;
    let record = distribution.into_api(&mut connection)?;
    Ok(HttpResponse::Created().json(record))
}

#[get("")]
pub async fn get_archives(pool: web::Data<Pool>) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let records = Archive::list(&mut connection)?
        .into_iter()
        .map(api::Archive::from)
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(records))
}

#[get("/{id}")]
pub async fn get_archive(pool: web::Data<Pool>, id: web::Path<i32>) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let archive = Archive::get_id(id.into_inner(), &mut connection)?;
    Ok(HttpResponse::Ok().json(api::Archive::from(archive)))
}

#[post("")]
pub async fn create_archive(
    pool: web::Data<Pool>,
    request: web::Json<CreateArchiveRequest>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let archive = catalog::create_archive(
        request.distribution_id,
        &request.owner,
        &request.name,
        Utc::now().naive_utc(),
        &mut connection,
    )?;
    Ok(HttpResponse::Created().json(api::Archive::from(archive)))
}

#[get("")]
pub async fn get_series(pool: web::Data<Pool>) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let records = DistroSeries::list(&mut connection)?
        .into_iter()
        .map(api::DistroSeries::from)
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(records))
}

#[post("")]
pub async fn create_series(
    pool: web::Data<Pool>,
    request: web::Json<CreateDistroSeriesRequest>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let series = catalog::create_series(
        request.distribution_id,
        &request.name,
        &request.version,
        &mut connection,
    )?;
    Ok(HttpResponse::Created().json(api::DistroSeries::from(series)))
}

#[get("")]
pub async fn get_arch_series(pool: web::Data<Pool>) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let records = DistroArchSeries::list(&mut connection)?
        .into_iter()
        .map(|das| das.into_api(&mut connection))
        .collect::<Result<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(records))
}

#[post("")]
pub async fn create_arch_series(
    pool: web::Data<Pool>,
    request: web::Json<CreateDistroArchSeriesRequest>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let arch_series = catalog::create_arch_series(
        request.distro_series_id,
        &request.architecture_tag,
        &request.processor_family,
        request.chroot.as_ref(),
        Utc::now().naive_utc(),
        &mut connection,
    )?;
    let record = arch_series.into_api(&mut connection)?;
    Ok(HttpResponse::Created().json(record))
}

#[post("/{id}/chroot")]
pub async fn set_chroot(
    pool: web::Data<Pool>,
    id: web::Path<i32>,
    request: web::Json<SetChrootRequest>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let arch_series = catalog::set_chroot(
        id.into_inner(),
        &request.chroot,
        Utc::now().naive_utc(),
        &mut connection,
    )?;
    let record = arch_series.into_api(&mut connection)?;
    Ok(HttpResponse::Ok().json(record))
}
