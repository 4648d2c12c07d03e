use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::models::error::{QueueError, Result};
use crate::models::location_point::{LocationBatch, LocationPoint};

pub const LOCATION_PATH: &str = "/api/location";

/// Remote side of a flush.
#[async_trait]
pub trait LocationSink: Send + Sync {
    /// Delivers one batch. Only a 2xx response counts as success.
    async fn send(&self, points: &[LocationPoint]) -> Result<()>;
}

#[async_trait]
impl<T: LocationSink + ?Sized> LocationSink for std::sync::Arc<T> {
    async fn send(&self, points: &[LocationPoint]) -> Result<()> {
        (**self).send(points).await
    }
}

pub struct HttpLocationSink {
    client: reqwest::Client,
    url: String,
}

impl HttpLocationSink {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueueError::Network(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            url: format!("{}{}", base_url.trim_end_matches('/'), LOCATION_PATH),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LocationSink for HttpLocationSink {
    async fn send(&self, points: &[LocationPoint]) -> Result<()> {
        let response = self.client
            .post(&self.url)
            .json(&LocationBatch { points })
            .send()
            .await?;

        let status = response.status();
        debug!(url = %self.url, %status, points = points.len(), "location batch sent");
        if !status.is_success() {
            return Err(QueueError::Status(status.as_u16()));
        }
        Ok(())
    }
}
