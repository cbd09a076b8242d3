// src/ingest/retriever.rs
//! Relay-based feed retrieval with round-robin rotation, a per-feed relay cache
//! and bounded retries. One `Retriever` lives for exactly one aggregation run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::error::{ConfigError, FetchError};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;
pub const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml";

/// Raw answer from a relay.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: u16,
    pub body: String,
}

impl RelayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP seam: production uses reqwest, tests inject scripted transports.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RelayResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("building relay http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RelayResponse> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, FEED_ACCEPT)
            .send()
            .await
            .context("relay http get()")?;
        let status = resp.status().as_u16();
        let body = resp.text().await.context("relay http .text()")?;
        Ok(RelayResponse { status, body })
    }
}

#[derive(Default)]
struct RelayState {
    next: usize,
    cache: HashMap<String, String>,
}

pub struct Retriever {
    transport: Arc<dyn Transport>,
    relays: Vec<String>,
    max_retries: u32,
    state: Mutex<RelayState>,
}

impl Retriever {
    pub fn new(
        relays: Vec<String>,
        max_retries: u32,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ConfigError> {
        let relays: Vec<String> = relays
            .into_iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect();
        if relays.is_empty() {
            return Err(ConfigError::NoRelays);
        }
        if max_retries == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "max_retries",
                reason: "must be at least 1".into(),
            });
        }
        Ok(Self {
            transport,
            relays,
            max_retries,
            state: Mutex::new(RelayState::default()),
        })
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Relay URL for `feed_url`: cached one if present, otherwise the current
    /// relay in rotation (which advances the index and fills the cache).
    pub fn relay_url_for(&self, feed_url: &str) -> String {
        let mut st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(hit) = st.cache.get(feed_url) {
            return hit.clone();
        }
        let prefix = &self.relays[st.next];
        let relay_url = format!("{prefix}{}", urlencoding::encode(feed_url));
        st.next = (st.next + 1) % self.relays.len();
        st.cache.insert(feed_url.to_string(), relay_url.clone());
        relay_url
    }

    fn invalidate(&self, feed_url: &str) {
        let mut st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        st.cache.remove(feed_url);
    }

    pub fn cached_relay(&self, feed_url: &str) -> Option<String> {
        let st = self.state.lock().unwrap_or_else(|p| p.into_inner());
        st.cache.get(feed_url).cloned()
    }

    /// Fetch the raw feed body, trying up to `max_retries` relay attempts.
    pub async fn fetch_feed(&self, url: &str) -> Result<String, FetchError> {
        for attempt in 1..=self.max_retries {
            let relay_url = self.relay_url_for(url);
            match self.transport.get(&relay_url).await {
                Ok(resp) if resp.is_success() => {
                    tracing::debug!(target: "ingest", %url, attempt, "feed fetched");
                    return Ok(resp.body);
                }
                Ok(resp) => {
                    tracing::warn!(
                        target: "ingest",
                        %url, attempt, status = resp.status,
                        "relay answered with non-success status"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        target: "ingest",
                        %url, attempt, error = ?e,
                        "relay request failed"
                    );
                }
            }
            counter!("ingest_fetch_attempts_failed_total").increment(1);
            self.invalidate(url);
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts: self.max_retries,
        })
    }
}
