use async_trait::async_trait;
use pocketd_common::config::PublisherConfig;
use pocketd_common::errors::*;
use pocketd_common::http;
use std::sync::Arc;
use url::Url;

/// The external store holding the bytes behind file references
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn delete(&self, sha256: &str) -> Result<()>;
}

pub struct HttpFileStore {
    client: http::Client,
    base: Url,
}

impl HttpFileStore {
    pub fn new(base: &str) -> Result<HttpFileStore> {
        let mut base = Url::parse(base).with_context(|| anyhow!("Invalid librarian url: {base:?}"))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = http::client()?;
        Ok(HttpFileStore { client, base })
    }

    fn url(&self, sha256: &str) -> Result<Url> {
        let url = self.base.join(sha256)?;
        Ok(url)
    }
}

#[async_trait]
impl FileStore for HttpFileStore {
    async fn delete(&self, sha256: &str) -> Result<()> {
        let response = self.client.delete(self.url(sha256)?).send().await?;
        let status = response.status();
        // already gone is as good as deleted
        if status.is_success() || status == http::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            bail!("Librarian refused to delete {}: {}", sha256, status)
        }
    }
}

/// Used when no librarian is configured
pub struct LoggingFileStore;

#[async_trait]
impl FileStore for LoggingFileStore {
    async fn delete(&self, sha256: &str) -> Result<()> {
        info!("File {} is no longer referenced, not deleting (no librarian configured)", sha256);
        Ok(())
    }
}

pub fn from_config(config: &PublisherConfig) -> Result<Arc<dyn FileStore>> {
    if let Some(url) = &config.librarian {
        Ok(Arc::new(HttpFileStore::new(url)?))
    } else {
        Ok(Arc::new(LoggingFileStore))
    }
}
