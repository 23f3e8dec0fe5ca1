//! Indexer node client.

use ipni_publisher_core::{AnnounceMessage, ANNOUNCE_CONTENT_TYPE};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;

use crate::error::{PublisherError, Result};
use crate::telemetry::{millis, Outcome, Timer};

/// Sends announce messages to `PUT <indexer>/ingest/announce`.
#[derive(Debug, Clone)]
pub struct IndexerClient {
    http: reqwest::Client,
    url: String,
}

impl IndexerClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Announce a new head. Only `204 No Content` counts as success.
    pub async fn announce(&self, message: &AnnounceMessage) -> Result<()> {
        let body = message.encode()?;
        let timer = Timer::announcement();
        tracing::info!(url = %self.url, cid = %message.cid, "notifying indexer");

        let resp = match self
            .http
            .put(&self.url)
            .header(CONTENT_TYPE, ANNOUNCE_CONTENT_TYPE)
            .body(body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                timer.finish(Outcome::Failure);
                return Err(PublisherError::Http {
                    endpoint: format!("PUT {}", self.url),
                    source: e,
                });
            }
        };

        let status = resp.status();
        if status != StatusCode::NO_CONTENT {
            timer.finish(Outcome::Failure);
            let body = resp.text().await.unwrap_or_default();
            return Err(PublisherError::Announce {
                status: status.as_u16(),
                body,
            });
        }

        let elapsed = timer.finish(Outcome::Success);
        tracing::info!(cid = %message.cid, elapsed_ms = millis(elapsed), "indexer notified");
        Ok(())
    }
}
