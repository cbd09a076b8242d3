//! News aggregator — HTTP entrypoint.
//! Serves the aggregated, grouped headlines as JSON (`/news`) and text (`/news/text`).

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use news_aggregator::api::{create_router, AppState};
use news_aggregator::config::AppConfig;
use news_aggregator::metrics::Metrics;
use news_aggregator::Aggregator;

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    news_aggregator::init_tracing();

    let cfg = AppConfig::load_default().context("loading aggregator config")?;
    let aggregator = Aggregator::from_config(&cfg)?;
    tracing::info!(
        feeds = aggregator.sources.feeds.len(),
        keywords = aggregator.sources.keywords.len(),
        blacklist = aggregator.sources.blacklist.len(),
        relays = aggregator.retriever.relays.len(),
        "aggregator ready"
    );

    let metrics = Metrics::init()?;
    let state = AppState {
        aggregator: Arc::new(aggregator),
    };
    let app = create_router(state).merge(metrics.router());

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await.context("http server")?;
    Ok(())
}
