use crate::error::{NetworkError, NetworkResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Measures a single round trip.
#[async_trait]
pub trait LatencyProbe: Send + Sync {
    async fn measure(&self) -> NetworkResult<Duration>;
}

/// HEAD request against a small resource, cache busted with `?t=<ms>`.
///
/// Any HTTP response counts as a completed round trip; only transport
/// failures are errors.
pub struct HttpProbe {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(url: &str, timeout: Duration) -> NetworkResult<Self> {
        let url = Url::parse(url)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn cache_busted_url(&self) -> Url {
        let mut url = self.url.clone();
        url.query_pairs_mut()
            .append_pair("t", &Utc::now().timestamp_millis().to_string());
        url
    }
}

#[async_trait]
impl LatencyProbe for HttpProbe {
    async fn measure(&self) -> NetworkResult<Duration> {
        let url = self.cache_busted_url();
        let started = Instant::now();

        let response = self
            .client
            .head(url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NetworkError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    NetworkError::Http(e)
                }
            })?;

        let elapsed = started.elapsed();
        debug!(url = %url, status = %response.status(), elapsed_ms = elapsed.as_millis() as u64, "probe finished");
        Ok(elapsed)
    }
}
