extern crate diesel;
extern crate diesel_migrations;

use crate::config::Config;
use crate::publishing::{librarian, Publisher};
use crate::scheduler::{HttpProtocol, Scheduler};
use actix_web::middleware::Logger;
use actix_web::web::Data;
use actix_web::dev::Server;
use actix_web::{middleware, App, HttpServer};
use pocketd_common::errors::*;
use std::net::SocketAddr;
use std::sync::Arc;

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod models;
pub mod publishing;
pub mod scheduler;
pub mod schema;
pub mod versions;
pub mod web;

/// Everything the http handlers share
#[derive(Clone)]
pub struct State {
    pub pool: db::Pool,
    pub config: Config,
    pub scheduler: Arc<Scheduler>,
    pub publisher: Arc<Publisher>,
}

impl State {
    pub fn new(pool: db::Pool, config: Config) -> Result<State> {
        let protocol = Arc::new(HttpProtocol::new(config.scheduler.builder_timeout())?);
        let scheduler = Arc::new(Scheduler::new(
            pool.clone(),
            protocol,
            config.scheduler.clone(),
        ));
        let store = librarian::from_config(&config.publisher)?;
        let publisher = Arc::new(Publisher::new(
            pool.clone(),
            store,
            config.publisher.clone(),
            config.scheduler.clone(),
        ));
        Ok(State {
            pool,
            config,
            scheduler,
            publisher,
        })
    }

    pub fn spawn_background_tasks(&self) {
        tokio::spawn(self.scheduler.clone().run());
        tokio::spawn(self.publisher.clone().run());
    }
}

pub fn configure(state: &State, cfg: &mut web::ServiceConfig) {
    let json = web::JsonConfig::default().limit(state.config.post_body_size_limit);

    cfg.app_data(Data::new(state.pool.clone()))
        .app_data(Data::new(state.config.clone()))
        .app_data(Data::from(state.scheduler.clone()))
        .app_data(Data::from(state.publisher.clone()))
        .app_data(json)
        .service(
            web::scope("/api/v1/distributions")
                .service(api::v1::get_distributions)
                .service(api::v1::create_distribution),
        )
        .service(
            web::scope("/api/v1/archives")
                .service(api::v1::get_archives)
                .service(api::v1::get_archive)
                .service(api::v1::create_archive),
        )
        .service(
            web::scope("/api/v1/series")
                .service(api::v1::get_series)
                .service(api::v1::create_series),
        )
        .service(
            web::scope("/api/v1/arch-series")
                .service(api::v1::get_arch_series)
                .service(api::v1::create_arch_series)
                .service(api::v1::set_chroot),
        )
        .service(
            web::scope("/api/v1/sources")
                .service(api::v1::create_source_release)
                .service(api::v1::get_source_release),
        )
        .service(
            web::scope("/api/v1/builds")
                .service(api::v1::get_builds)
                .service(api::v1::get_build)
                .service(api::v1::get_build_log)
                .service(api::v1::get_build_binaries)
                .service(api::v1::cancel_build)
                .service(api::v1::requeue_build)
                .service(api::v1::dispatch_build)
                .service(api::v1::rescore_build)
                .service(api::v1::set_build_manual),
        )
        .service(
            web::scope("/api/v1/queue")
                .service(api::v1::get_queue)
                .service(api::v1::run_scheduler),
        )
        .service(
            web::scope("/api/v1/builders")
                .service(api::v1::get_builders)
                .service(api::v1::get_builder)
                .service(api::v1::register_builder)
                .service(api::v1::reset_builder)
                .service(api::v1::set_builder_manual)
                .service(api::v1::set_builder_trusted),
        )
        .service(web::scope("/api/v1/published").service(api::v1::get_published))
        .service(
            web::scope("/api/v1/publications")
                .service(api::v1::get_publication)
                .service(api::v1::publish_record)
                .service(api::v1::schedule_removal)
                .service(api::v1::withdraw_record)
                .service(api::v1::lift_embargo)
                .service(api::v1::override_publication),
        );
}

/// Binds the api server, the returned server is not running yet
pub fn build_server(state: State) -> Result<(Server, SocketAddr)> {
    let bind_addr = state.config.bind_addr.clone();
    let server = HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(Logger::default())
            .wrap(middleware::Compress::default())
            .configure(move |cfg| configure(&state, cfg))
    })
    .bind(&bind_addr)
    .with_context(|| anyhow!("Failed to bind to {:?}", bind_addr))?;

    let address = server
        .addrs()
        .first()
        .copied()
        .ok_or_else(|| format_err!("Server is not bound to any address"))?;
    Ok((server.run(), address))
}

pub async fn run_config(config: Config) -> Result<()> {
    let pool = db::setup_pool(&config.database)?;
    let state = State::new(pool, config)?;
    state.spawn_background_tasks();

    let (server, address) = build_server(state)?;
    info!("Listening on {}", address);
    server.await?;
    Ok(())
}
