use actix_web::dev::{Server, ServerHandle};
use pocketd::State;
use pocketd_common::api::Client;
use pocketd_common::errors::*;
use std::net::{SocketAddr, TcpStream};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Waits until something accepts connections on `address`
pub fn wait_for_listener(address: SocketAddr) -> Result<()> {
    for _ in 0..100 {
        if TcpStream::connect(address).is_ok() {
            return Ok(());
        }

        thread::sleep(Duration::from_millis(100));
    }

    bail!("Nothing is listening on {}", address)
}

pub struct ServerHolder {
    server: Option<Server>,
    server_handle: Mutex<Option<ServerHandle>>,
    pub address: SocketAddr,
}

impl ServerHolder {
    pub fn new(state: State) -> Result<Self> {
        let (server, address) = pocketd::build_server(state)?;

        Ok(Self {
            server: Some(server),
            server_handle: Mutex::default(),
            address,
        })
    }

    pub fn start(&mut self) -> Result<()> {
        if let Some(server) = self.server.take() {
            let handle = server.handle();
            self.server_handle = Mutex::new(Some(handle));

            tokio::spawn(server);
            wait_for_listener(self.address)
        } else {
            bail!("can't start the server more than once")
        }
    }
}

impl Drop for ServerHolder {
    fn drop(&mut self) {
        if let Some(server_handle) = self.server_handle.lock().unwrap().as_ref() {
            #[allow(clippy::let_underscore_future)]
            let _ = server_handle.stop(true);
        }
    }
}

pub struct IsolatedServer {
    _server: ServerHolder,
    // removed last, the server still has the database open
    _tmp_dir: TempDir,
    /// The scheduler and publisher behind the server, the background loops
    /// are not running so tests drive passes themselves
    pub state: State,
    pub client: Client,
}

impl IsolatedServer {
    pub fn new(server: ServerHolder, tmp_dir: TempDir, state: State, client: Client) -> Self {
        Self {
            _server: server,
            _tmp_dir: tmp_dir,
            state,
            client,
        }
    }
}
