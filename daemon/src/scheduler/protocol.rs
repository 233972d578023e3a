use crate::models::Builder;
use async_trait::async_trait;
use pocketd_common::api::builder::*;
use pocketd_common::api::CheckedResponse;
use pocketd_common::errors::*;
use pocketd_common::http;
use std::time::Duration;
use url::Url;

/// How the scheduler talks to a builder agent.
///
/// Calls carry no timeout of their own, the scheduler bounds every one of
/// them.
#[async_trait]
pub trait BuilderProtocol: Send + Sync {
    async fn dispatch(&self, builder: &Builder, req: &DispatchRequest) -> Result<DispatchResponse>;

    async fn status(&self, builder: &Builder) -> Result<BuilderStatus>;

    async fn fetch_result(&self, builder: &Builder, build_id: i32) -> Result<BuildResult>;

    async fn abort(&self, builder: &Builder, build_id: i32) -> Result<()>;
}

pub struct HttpProtocol {
    client: http::Client,
}

impl HttpProtocol {
    pub fn new(timeout: Duration) -> Result<HttpProtocol> {
        let client = http::client_with_timeout(timeout)?;
        Ok(HttpProtocol { client })
    }

    fn url(builder: &Builder, path: &str) -> Result<Url> {
        let base = Url::parse(&builder.url)
            .with_context(|| anyhow!("Invalid url for builder {:?}", builder.name))?;
        let url = base.join(&format!("builder/v1/{path}"))?;
        Ok(url)
    }
}

#[async_trait]
impl BuilderProtocol for HttpProtocol {
    async fn dispatch(&self, builder: &Builder, req: &DispatchRequest) -> Result<DispatchResponse> {
        let response = self
            .client
            .post(Self::url(builder, "dispatch")?)
            .json(req)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;
        Ok(response)
    }

    async fn status(&self, builder: &Builder) -> Result<BuilderStatus> {
        let status = self
            .client
            .get(Self::url(builder, "status")?)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;
        Ok(status)
    }

    async fn fetch_result(&self, builder: &Builder, build_id: i32) -> Result<BuildResult> {
        let result = self
            .client
            .get(Self::url(builder, &format!("result/{build_id}"))?)
            .send()
            .await?
            .checked()
            .await?
            .json()
            .await?;
        Ok(result)
    }

    async fn abort(&self, builder: &Builder, build_id: i32) -> Result<()> {
        self.client
            .post(Self::url(builder, "abort")?)
            .json(&AbortRequest { build_id })
            .send()
            .await?
            .checked()
            .await?;
        Ok(())
    }
}
