// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use news_aggregator::ingest::retriever::{RelayResponse, Transport};

pub const RELAY: &str = "https://relay.test/?u=";

/// In-memory relay: answers per target feed URL, records every call.
#[derive(Default)]
pub struct FakeRelay {
    routes: HashMap<String, (u16, String)>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, feed_url: &str, status: u16, body: impl Into<String>) -> Self {
        self.routes.insert(feed_url.to_string(), (status, body.into()));
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls_for(&self, feed_url: &str) -> usize {
        let encoded = urlencoding::encode(feed_url).into_owned();
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.ends_with(&encoded))
            .count()
    }
}

#[async_trait]
impl Transport for FakeRelay {
    async fn get(&self, url: &str) -> Result<RelayResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        let target = url
            .split_once("?u=")
            .map(|(_, t)| t)
            .unwrap_or(url);
        let target = urlencoding::decode(target)?.into_owned();
        let (status, body) = self
            .routes
            .get(&target)
            .cloned()
            .unwrap_or((404, String::new()));
        Ok(RelayResponse { status, body })
    }
}

/// Minimal RSS document; `items` are (title, link, rfc2822 date).
pub fn rss(items: &[(&str, &str, &str)]) -> String {
    let mut out =
        String::from("<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>T</title>");
    for (title, link, date) in items {
        out.push_str(&format!(
            "<item><title>{title}</title><link>{link}</link><pubDate>{date}</pubDate></item>"
        ));
    }
    out.push_str("</channel></rss>");
    out
}

pub fn hours_ago(h: i64) -> String {
    (chrono::Utc::now() - chrono::Duration::hours(h)).to_rfc2822()
}
