mod args;

use crate::args::Args;
use clap::Parser;
use env_logger::Env;
use pocketd::config;
use pocketd::db;
use pocketd_common::errors::*;

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging = match args.verbose {
        0 => "actix_web=debug,info",
        1 => "actix_web=debug,pocketd=debug,pocketd_common=debug,info",
        2 => "debug",
        3 => "pocketd=trace,pocketd_common=trace,debug",
        _ => "trace",
    };

    env_logger::init_from_env(Env::default().default_filter_or(logging));

    dotenvy::dotenv().ok();
    let config = config::load(args.config.as_deref())?;
    if args.check_config {
        println!("{:#?}", config);
    } else if args.migrate {
        db::setup(&config.database)?;
        info!("Database {:?} is up to date", config.database);
    } else {
        pocketd::run_config(config).await?;
    }
    Ok(())
}
