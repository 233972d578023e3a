use crate::db::Pool;
use crate::models::Ticket;
use crate::scheduler::Scheduler;
use crate::web;
use actix_web::{get, post, HttpResponse, Responder};
use pocketd_common::errors::*;

#[get("")]
pub async fn get_queue(pool: web::Data<Pool>) -> web::Result<impl Responder> {
    let mut connection = pool.get()?;
    let records = Ticket::list(&mut connection)?
        .into_iter()
        .map(|ticket| ticket.into_api(&mut connection))
        .collect::<Result<Vec<_>>>()?;
    Ok(HttpResponse::Ok().json(records))
}

/// Runs a scheduler pass right away instead of waiting for the next tick
#[post("/run")]
pub async fn run_scheduler(scheduler: web::Data<Scheduler>) -> web::Result<impl Responder> {
    let summary = scheduler.pass().await?;
    info!("Scheduler pass requested over api: {:?}", summary);
    Ok(HttpResponse::NoContent().finish())
}
