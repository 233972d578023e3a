use crate::agent::Agent;
use crate::args::{Args, SubCommand};
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use env_logger::Env;
use pocketd_common::api::builder::BuildResult;
use pocketd_common::api::v1::{BuilderRestApi, RegisterBuilderRequest};
use pocketd_common::api::Client;
use pocketd_common::errors::*;
use std::fs;
use std::io::{self, Write};
use tokio::sync::Notify;

pub mod agent;
pub mod args;
pub mod config;
pub mod files;
pub mod http;
pub mod job;
pub mod proc;

async fn serve(config: config::Config) -> Result<()> {
    let bind_addr = config.bind_addr.clone();
    let agent = Agent::new(config);

    info!("Waiting for dispatches on {}", bind_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::from(agent.clone()))
            .configure(http::configure)
    })
    .bind(&bind_addr)?
    .run()
    .await?;
    Ok(())
}

async fn build_once(config: &config::Config, build: args::Build) -> Result<BuildResult> {
    let buf = fs::read(&build.request)
        .with_context(|| anyhow!("Failed to read dispatch request: {:?}", build.request))?;
    let request = serde_json::from_slice(&buf).context("Failed to parse dispatch request")?;

    match job::run(config, &request, Default::default(), &Notify::new()).await? {
        job::Completion::Finished(result) => Ok(result),
        job::Completion::Aborted => bail!("Build was aborted"),
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = match args.verbose {
        0 => "actix_web=debug,info",
        1 => "pocketd_builder=debug,pocketd_common=debug,info",
        2 => "debug",
        _ => "trace",
    };

    env_logger::init_from_env(Env::default().default_filter_or(logging));

    let config = config::load(&args).context("Failed to load config file")?;

    match args.subcommand {
        SubCommand::Serve => serve(config).await?,
        // this is only really for debugging backends
        SubCommand::Build(build) => {
            let result = build_once(&config, build).await?;
            let json = serde_json::to_string_pretty(&result)?;
            let mut stdout = io::stdout();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
        SubCommand::Register(register) => {
            let processor_family = config
                .processor_family
                .clone()
                .ok_or_else(|| format_err!("No processor family configured"))?;
            let system_config = pocketd_common::config::load(None::<String>)
                .context("Failed to load system config")?;
            let client = Client::new(system_config, register.endpoint)?;
            let builder = client
                .register_builder(&RegisterBuilderRequest {
                    name: register.name,
                    url: register.url,
                    processor_family,
                    trusted: register.trusted,
                })
                .await?;
            info!("Registered as builder #{} ({:?})", builder.id, builder.name);
        }
        SubCommand::CheckConfig => {
            println!("{:#?}", config);
        }
    }

    Ok(())
}
