use crate::errors::*;
pub use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

pub fn client() -> Result<Client> {
    Client::builder()
        .read_timeout(Duration::from_secs(60))
        .build()
        .map_err(Error::from)
}

/// A client for talking to builders, every request is bounded by `timeout`.
pub fn client_with_timeout(timeout: Duration) -> Result<Client> {
    Client::builder()
        .connect_timeout(timeout)
        .timeout(timeout)
        .build()
        .map_err(Error::from)
}
