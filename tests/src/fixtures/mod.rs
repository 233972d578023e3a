pub mod builder;
pub mod server;

use crate::fixtures::builder::FakeBuilder;
use crate::fixtures::server::{IsolatedServer, ServerHolder};
use pocketd::{db, State};
use pocketd_common::api::Client;
use pocketd_common::config::ConfigFile;
use pocketd_common::errors::info;
use rstest::fixture;
use tempfile::TempDir;

#[fixture]
pub fn config_file() -> ConfigFile {
    let mut config = ConfigFile::default();
    config.http.bind_addr = Some("127.0.0.1:0".to_string());
    config.scheduler.builder_timeout = Some(5);
    config.scheduler.retry_cooldown = Some(0);
    config
}

fn spawn_server(mut config_file: ConfigFile) -> IsolatedServer {
    let _ = env_logger::builder().is_test(true).try_init();
    let tmp_dir = TempDir::new().unwrap();
    let database_path = tmp_dir.path().join("pocketd.db");
    config_file.database.path = Some(database_path.to_str().unwrap().to_string());

    let config = pocketd::config::from_file(config_file.clone()).unwrap();
    let pool = db::setup_pool(&config.database).unwrap();
    let state = State::new(pool, config).unwrap();

    let mut server = ServerHolder::new(state.clone()).unwrap();
    server.start().unwrap();

    let endpoint = format!("http://{}", server.address);
    info!("Setting up client for {:?}", endpoint);
    let client = Client::new(config_file, Some(endpoint)).unwrap();

    IsolatedServer::new(server, tmp_dir, state, client)
}

#[fixture]
pub fn isolated_server(config_file: ConfigFile) -> IsolatedServer {
    spawn_server(config_file)
}

/// Same as [`isolated_server`], but publisher passes publish pending records
#[fixture]
pub fn auto_publishing_server(mut config_file: ConfigFile) -> IsolatedServer {
    config_file.publisher.auto_publish = true;
    spawn_server(config_file)
}

#[fixture]
pub fn fake_builder() -> FakeBuilder {
    FakeBuilder::start().unwrap()
}
