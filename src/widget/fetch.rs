use async_trait::async_trait;
use log::trace;
use reqwest::{header, Client as AsyncClient, Url};

use crate::{error::Result, model::snapshot::PlaybackSnapshot};

/// Anything the widget can poll for a fresh snapshot. [HttpSnapshotSource] polls the proxy endpoint.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<PlaybackSnapshot>;
}

/// Polls a proxy endpoint over HTTP with caching disabled.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    url: Url,
    http_client: AsyncClient,
}

impl HttpSnapshotSource {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            http_client: AsyncClient::new(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<PlaybackSnapshot> {
        let response = self
            .http_client
            .get(self.url.clone())
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .send()
            .await?
            .error_for_status()?;

        let snapshot = response.json().await?;
        trace!("Fetched snapshot: {:?}", snapshot);

        Ok(snapshot)
    }
}
