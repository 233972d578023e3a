use pocketd_common::config::{
    self, ConfigFile, PublisherConfig, SchedulerConfig, DEFAULT_BIND_ADDR, DEFAULT_DATABASE,
    DEFAULT_POST_BODY_SIZE_LIMIT,
};
use pocketd_common::errors::*;
use std::env;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database: String,
    pub post_body_size_limit: usize,
    pub scheduler: SchedulerConfig,
    pub publisher: PublisherConfig,
}

pub fn load(path: Option<&Path>) -> Result<Config> {
    let config = config::load(path)?;
    from_file(config)
}

pub fn from_file(config: ConfigFile) -> Result<Config> {
    let bind_addr = if let Ok(addr) = env::var("HTTP_ADDR") {
        addr
    } else if let Some(addr) = config.http.bind_addr {
        addr
    } else {
        DEFAULT_BIND_ADDR.to_string()
    };

    let database = if let Ok(path) = env::var("POCKETD_DATABASE") {
        path
    } else if let Some(path) = config.database.path {
        path
    } else {
        DEFAULT_DATABASE.to_string()
    };

    if config.scheduler.max_retries() < 0 {
        bail!("scheduler.max_retries can't be negative");
    }

    Ok(Config {
        bind_addr,
        database,
        post_body_size_limit: config
            .http
            .post_body_size_limit
            .unwrap_or(DEFAULT_POST_BODY_SIZE_LIMIT),
        scheduler: config.scheduler,
        publisher: config.publisher,
    })
}
