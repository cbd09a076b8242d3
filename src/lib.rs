// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod grouping;
pub mod ingest;
pub mod matcher;
pub mod metrics;
pub mod rank;
pub mod report;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::error::{ConfigError, FetchError};
pub use crate::ingest::types::{
    AggregateReport, FeedSource, GroupedResult, KeywordRule, NewsGroup, NewsItem,
};
pub use crate::ingest::Aggregator;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "news_aggregator=info,warn";

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter; `LOG_FORMAT=json` switches to JSON lines. Logs go to stderr so the
/// text report on stdout stays clean.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = wants_json(std::env::var("LOG_FORMAT").ok().as_deref());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

fn wants_json(log_format: Option<&str>) -> bool {
    log_format.is_some_and(|v| v.trim().eq_ignore_ascii_case("json"))
}
