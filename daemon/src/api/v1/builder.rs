use crate::db::Pool;
use crate::models::{Builder, NewBuilder};
use crate::web;
use actix_web::{get, post, HttpResponse, Responder};
use pocketd_common::api::v1::{RegisterBuilderRequest, SetFlagRequest};
use pocketd_common::errors::*;
use url::Url;

fn load_builder(id: i32, pool: &Pool) -> Result<pocketd_common::api::v1::Builder> {
    let mut connection = pool.get()?;
    Builder::get_id(id, &mut connection)?.into_api(&mut connection)
}

#[get("")]
pub async fn get_builders(pool: web::Data<Pool>) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let records = Builder::list(&mut connection)?
        .into_iter()
        .map(|builder| builder.into_api(&mut connection))
        .collect::<Result<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(records))
}

#[get("/{id}")]
pub async fn get_builder(pool: web::Data<Pool>, id: web::Path<i32>) -> web::Result<impl Responder> {
    Ok(HttpResponse::Ok().json(load_builder(id.into_inner(), &pool)?))
}

#[post("")]
pub async fn register_builder(
    pool: web::Data<Pool>,
    request: web::Json<RegisterBuilderRequest>,
) -> web::Result<impl Responder> {
    let request = request.into_inner();
    if request.name.is_empty() || request.processor_family.is_empty() {
        return Err(ArchiveError::invalid_input("builder name and processor family are required").into());
    }
    Url::parse(&request.url)
        .map_err(|err| ArchiveError::invalid_input(format!("invalid builder url {:?}: {err}", request.url)))?;

    let id = {
        let mut connection = pool.get()?;
        NewBuilder {
            name: request.name,
            url: request.url,
            processor_family: request.processor_family,
            trusted: request.trusted,
        }
        .upsert(&mut connection)?
    };
    Ok(HttpResponse::Ok().json(load_builder(id, &pool)?))
}

#[post("/{id}/reset")]
pub async fn reset_builder(pool: web::Data<Pool>, id: web::Path<i32>) -> web::Result<impl Responder> {
    let id = id.into_inner();
    {
        let mut connection = pool.get()?;
        Builder::get_id(id, &mut connection)?;
        Builder::reset(id, &mut connection)?;
    }
    Ok(HttpResponse::Ok().json(load_builder(id, &pool)?))
}

#[post("/{id}/manual")]
pub async fn set_builder_manual(
    pool: web::Data<Pool>,
    id: web::Path<i32>,
    request: web::Json<SetFlagRequest>,
) -> web::Result<impl Responder> {
    let id = id.into_inner();
    {
        let mut connection = pool.get()?;
        Builder::get_id(id, &mut connection)?;
        Builder::set_manual(id, request.value, &mut connection)?;
    }
    Ok(HttpResponse::Ok().json(load_builder(id, &pool)?))
}

#[post("/{id}/trusted")]
pub async fn set_builder_trusted(
    pool: web::Data<Pool>,
    id: web::Path<i32>,
    request: web::Json<SetFlagRequest>,
) -> web::Result<impl Responder> {
    let id = id.into_inner();
    {
        let mut connection = pool.get()?;
        Builder::get_id(id, &mut connection)?;
        Builder::set_trusted(id, request.value, &mut connection)?;
    }
    Ok(HttpResponse::Ok().json(load_builder(id, &pool)?))
}
