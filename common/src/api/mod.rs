pub mod builder;
pub mod v1;

use crate::config::{ConfigFile, DEFAULT_ENDPOINT};
use crate::errors::*;
use crate::http;
use async_trait::async_trait;
use std::borrow::Cow;
use url::Url;

pub struct Client {
    endpoint: Url,
    client: http::Client,
}

impl Client {
    pub fn new(config: ConfigFile, endpoint: Option<String>) -> Result<Client> {
        let endpoint = endpoint
            .or(config.http.endpoint)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self::with_endpoint(&endpoint, http::client()?)
    }

    pub fn with_endpoint(endpoint: &str, client: http::Client) -> Result<Client> {
        let mut endpoint = endpoint
            .parse::<Url>()
            .with_context(|| anyhow!("Failed to parse endpoint as url: {:?}", endpoint))?;

        // If the url ends with a slash, remove it
        endpoint
            .path_segments_mut()
            .map_err(|_| anyhow!("Given endpoint url cannot be base"))?
            .pop_if_empty();

        debug!("Setting pocketd endpoint to {:?}", endpoint.as_str());
        Ok(Client { endpoint, client })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url_join(&self, route: &str) -> Url {
        let mut url = self.endpoint.clone();
        // the constructor already verified this url can be a base
        if let Ok(mut path) = url.path_segments_mut() {
            for segment in route.split('/') {
                path.push(segment);
            }
        }
        url
    }

    pub fn get(&self, path: Cow<'static, str>) -> http::RequestBuilder {
        self.client.get(self.url_join(&path))
    }

    pub fn post(&self, path: Cow<'static, str>) -> http::RequestBuilder {
        self.client.post(self.url_join(&path))
    }

    pub fn delete(&self, path: Cow<'static, str>) -> http::RequestBuilder {
        self.client.delete(self.url_join(&path))
    }
}

/// Turns error responses of the api back into typed errors.
#[async_trait]
pub trait CheckedResponse: Sized {
    async fn checked(self) -> Result<Self>;
}

#[async_trait]
impl CheckedResponse for http::Response {
    async fn checked(self) -> Result<Self> {
        let status = self.status();
        if status.is_success() {
            return Ok(self);
        }

        let body = self.text().await.unwrap_or_default();
        if let Ok(api) = serde_json::from_str::<v1::ApiError>(&body) {
            Err(api.into_error())
        } else {
            bail!("Server responded with {}: {:?}", status, body)
        }
    }
}
