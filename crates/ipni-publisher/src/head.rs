//! Chain head resolution.
//!
//! The previous link of a new advertisement is the last advertisement built
//! earlier in the same batch, or failing that, the published chain head.

use std::sync::Arc;

use async_trait::async_trait;
use ipni_publisher_core::{parse_head_document, Cid, HEAD_KEY};
use ipni_publisher_store::{ObjectStore, ObjectStoreExt};
use reqwest::StatusCode;

use crate::error::{PublisherError, Result};
use crate::telemetry::{millis, Outcome, Timer};

/// Source of the currently published chain head.
#[async_trait]
pub trait HeadFetcher: Send + Sync {
    /// The published head, or `None` when nothing has been published yet.
    ///
    /// # Errors
    ///
    /// Any failure other than "not found" aborts the batch.
    async fn fetch_head(&self) -> Result<Option<Cid>>;
}

/// The previous link for the next advertisement: `local` when this batch
/// already produced one, the published head otherwise.
pub async fn resolve_previous(local: Option<Cid>, fetcher: &dyn HeadFetcher) -> Result<Option<Cid>> {
    match local {
        Some(cid) => Ok(Some(cid)),
        None => fetcher.fetch_head().await,
    }
}

/// Fetches `GET <head_url>/head` over HTTP.
///
/// 200 parses the head document, 403 and 404 mean no head (S3 answers 403
/// for missing keys on a bucket without list permission), anything else is
/// an error carrying the status and body.
#[derive(Debug, Clone)]
pub struct HttpHeadFetcher {
    http: reqwest::Client,
    url: String,
}

impl HttpHeadFetcher {
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl HeadFetcher for HttpHeadFetcher {
    async fn fetch_head(&self) -> Result<Option<Cid>> {
        let endpoint = format!("GET {}", self.url);
        let timer = Timer::head_fetch();

        let resp = match self.http.get(&self.url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                timer.finish(Outcome::Failure);
                tracing::error!(url = %self.url, error = %e, "downloading previous head failed");
                return Err(PublisherError::Http {
                    endpoint,
                    source: e,
                });
            }
        };

        let status = resp.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
            let elapsed = timer.finish(Outcome::NotFound);
            tracing::info!(
                status = status.as_u16(),
                elapsed_ms = millis(elapsed),
                "no previous head published"
            );
            return Ok(None);
        }

        if status != StatusCode::OK {
            timer.finish(Outcome::Failure);
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                body = %body,
                "downloading previous head failed with status code {}",
                status.as_u16()
            );
            return Err(PublisherError::HeadFetch {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = match resp.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                timer.finish(Outcome::Failure);
                return Err(PublisherError::Http {
                    endpoint,
                    source: e,
                });
            }
        };
        let head = match parse_head_document(&bytes) {
            Ok(head) => head,
            Err(e) => {
                timer.finish(Outcome::Failure);
                tracing::error!(error = %e, "previous head document is malformed");
                return Err(e.into());
            }
        };
        let elapsed = timer.finish(Outcome::Success);
        tracing::info!(head = %head, elapsed_ms = millis(elapsed), "fetched previous head");
        Ok(Some(head))
    }
}

/// Reads the head document straight from the object store.
#[derive(Clone)]
pub struct StoreHeadFetcher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl StoreHeadFetcher {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl HeadFetcher for StoreHeadFetcher {
    async fn fetch_head(&self) -> Result<Option<Cid>> {
        let Some(object) = self.store.get_optional(&self.bucket, HEAD_KEY).await? else {
            tracing::info!(bucket = %self.bucket, "no previous head stored");
            return Ok(None);
        };
        let head = parse_head_document(&object.bytes)?;
        tracing::info!(head = %head, "loaded previous head from store");
        Ok(Some(head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipni_publisher_core::{codec, derive_cid, ChainHead, PeerIdentity};
    use ipni_publisher_store::MemoryStore;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct CountingFetcher {
        head: Option<Cid>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HeadFetcher for CountingFetcher {
        async fn fetch_head(&self) -> Result<Option<Cid>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.head)
        }
    }

    #[tokio::test]
    async fn test_local_wins_without_fetch() {
        let local = derive_cid(codec::DAG_JSON, b"local");
        let fetcher = CountingFetcher {
            head: Some(derive_cid(codec::DAG_JSON, b"remote")),
            calls: AtomicUsize::new(0),
        };

        let previous = resolve_previous(Some(local), &fetcher).await.unwrap();
        assert_eq!(previous, Some(local));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);

        let previous = resolve_previous(None, &fetcher).await.unwrap();
        assert_eq!(previous, fetcher.head);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_store_fetcher() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let fetcher = StoreHeadFetcher::new(store.clone(), "ads");
        assert_eq!(fetcher.fetch_head().await.unwrap(), None);

        let cid = derive_cid(codec::DAG_JSON, b"ad");
        let head = ChainHead::sign(cid, &PeerIdentity::from_seed(&[1; 32]).unwrap()).unwrap();
        store
            .put_json("ads", HEAD_KEY, head.encode().unwrap())
            .await
            .unwrap();
        assert_eq!(fetcher.fetch_head().await.unwrap(), Some(cid));
    }

    #[tokio::test]
    async fn test_store_fetcher_rejects_garbage() {
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        store.put_json("ads", HEAD_KEY, b"[]".to_vec()).await.unwrap();
        let fetcher = StoreHeadFetcher::new(store, "ads");
        assert!(matches!(fetcher.fetch_head().await, Err(PublisherError::Core(_))));
    }

    async fn serve_head(body: impl Into<String>) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/head"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_malformed_head_document_counts_as_failure() {
        let server = serve_head("not json").await;
        let fetcher = HttpHeadFetcher::new(reqwest::Client::new(), format!("{}/head", server.uri()));

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let result = {
            let _guard = metrics::set_default_local_recorder(&recorder);
            fetcher.fetch_head().await
        };

        assert!(matches!(result, Err(PublisherError::Core(_))));
        let rendered = handle.render();
        assert!(rendered.contains("http_head_cid_fetches_total{outcome=\"failure\"} 1"));
        assert!(!rendered.contains("outcome=\"success\""));
    }

    #[tokio::test]
    async fn test_parsed_head_document_counts_as_success() {
        let cid = derive_cid(codec::DAG_JSON, b"ad");
        let body = format!(r#"{{"head":{{"/":"{}"}}}}"#, cid);
        let server = serve_head(body).await;
        let fetcher = HttpHeadFetcher::new(reqwest::Client::new(), format!("{}/head", server.uri()));

        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let result = {
            let _guard = metrics::set_default_local_recorder(&recorder);
            fetcher.fetch_head().await
        };

        assert_eq!(result.unwrap(), Some(cid));
        let rendered = handle.render();
        assert!(rendered.contains("http_head_cid_fetches_total{outcome=\"success\"} 1"));
        assert!(!rendered.contains("outcome=\"failure\""));
    }
}
