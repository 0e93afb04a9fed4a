use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{CacheError, FetchError};

/// Where asset bytes come from.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the full payload behind `url`. Non-success responses are errors.
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError>;
}

/// Create a reqwest Client with the provided configuration.
///
/// Only the connect phase is bounded here; the whole-request timeout is
/// enforced by the download worker.
pub fn create_client(config: &FetchConfig) -> Result<Client, CacheError> {
    let mut client_builder = Client::builder()
        .pool_max_idle_per_host(5) // Allow multiple connections to same host
        .user_agent(&config.user_agent)
        .redirect(reqwest::redirect::Policy::limited(10));

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    client_builder.build().map_err(CacheError::from)
}

/// Plain HTTPS GET against the asset store
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, CacheError> {
        Ok(Self::new(create_client(config)?))
    }
}

#[async_trait]
impl AssetSource for HttpSource {
    async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let payload = response.bytes().await?;
        debug!(url = %url, bytes = payload.len(), "Fetched asset payload");
        Ok(payload)
    }
}
