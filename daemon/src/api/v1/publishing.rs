use crate::db::Pool;
use crate::publishing::{self, Publisher};
use crate::web;
use actix_web::{get, post, HttpResponse, Responder};
use pocketd_common::api::v1::{
    ListPublishedQuery, OverrideRequest, PublicationKind, PublicationRef, ScheduleRemovalRequest,
};

fn reference(path: web::Path<(PublicationKind, i32)>) -> PublicationRef {
    let (kind, id) = path.into_inner();
    PublicationRef { kind, id }
}

#[get("")]
pub async fn get_published(
    pool: web::Data<Pool>,
    query: web::Query<ListPublishedQuery>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let records = publishing::list_published(&query, &mut connection)?;
    Ok(HttpResponse::Ok().json(records))
}

#[get("/{kind}/{id}")]
pub async fn get_publication(
    pool: web::Data<Pool>,
    path: web::Path<(PublicationKind, i32)>,
) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let record = publishing::get(reference(path), &mut connection)?;
    Ok(HttpResponse::Ok().json(record))
}

#[post("/{kind}/{id}/publish")]
pub async fn publish_record(
    publisher: web::Data<Publisher>,
    path: web::Path<(PublicationKind, i32)>,
) -> web::Result<impl Responder> {
    let record = publisher.publish(reference(path))?;
    Ok(HttpResponse::Ok().json(record))
}

#[post("/{kind}/{id}/remove")]
pub async fn schedule_removal(
    publisher: web::Data<Publisher>,
    path: web::Path<(PublicationKind, i32)>,
    request: web::Json<ScheduleRemovalRequest>,
) -> web::Result<impl Responder> {
    let record = publisher.schedule_removal(reference(path), request.deletion_date)?;
    Ok(HttpResponse::Ok().json(record))
}

#[post("/{kind}/{id}/withdraw")]
pub async fn withdraw_record(
    publisher: web::Data<Publisher>,
    path: web::Path<(PublicationKind, i32)>,
    request: web::Json<ScheduleRemovalRequest>,
) -> web::Result<impl Responder> {
    let record = publisher.withdraw(reference(path), request.deletion_date)?;
    Ok(HttpResponse::Ok().json(record))
}

#[post("/{kind}/{id}/lift-embargo")]
pub async fn lift_embargo(
    publisher: web::Data<Publisher>,
    path: web::Path<(PublicationKind, i32)>,
) -> web::Result<impl Responder> {
    let record = publisher.lift_embargo(reference(path))?;
    Ok(HttpResponse::Ok().json(record))
}

#[post("/{kind}/{id}/override")]
pub async fn override_publication(
    publisher: web::Data<Publisher>,
    path: web::Path<(PublicationKind, i32)>,
    request: web::Json<OverrideRequest>,
) -> web::Result<impl Responder> {
    let record = publisher.override_record(reference(path), &request)?;
    Ok(HttpResponse::Ok().json(record))
}
