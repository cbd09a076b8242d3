// src/ingest/mod.rs
pub mod parser;
pub mod retriever;
pub mod types;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio::task::JoinSet;

use crate::config::sources::SourceSet;
use crate::config::{AppConfig, RetrieverConfig, Settings};
use crate::error::ConfigError;
use crate::grouping::group_by_keyword;
use crate::ingest::retriever::{ReqwestTransport, Retriever, Transport};
use crate::ingest::types::{AggregateReport, FeedSource, NewsItem};
use crate::matcher::{filter_by_recency, Matcher};
use crate::rank::{dedupe, sort_by_recency};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Total items parsed from feeds.");
        describe_counter!(
            "ingest_kept_total",
            "Items kept after filtering and deduplication."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Items dropped by blacklist, keywords or the time window."
        );
        describe_counter!("ingest_dedup_total", "Items removed as duplicates.");
        describe_counter!(
            "ingest_provider_errors_total",
            "Feeds that exhausted every relay attempt."
        );
        describe_counter!(
            "ingest_fetch_attempts_failed_total",
            "Individual relay attempts that failed."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the aggregation pipeline last ran."
        );
    });
}

/// Strip markup, collapse whitespace, trim. Input is already entity-decoded
/// text, so a literal `&lt;` survives as-is.
pub fn clean_text(s: &str) -> String {
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?s)<[^>]*>").unwrap());
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());

    let stripped = re_tags.replace_all(s, "");
    re_ws.replace_all(&stripped, " ").trim().to_string()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fetch every feed concurrently through `retriever` and parse the bodies.
/// Returns per-feed results in feed order; `None` marks a feed that failed.
pub async fn fetch_all(
    retriever: Arc<Retriever>,
    feeds: &[FeedSource],
    now_ms: i64,
) -> Vec<Option<Vec<NewsItem>>> {
    let mut set = JoinSet::new();
    for (idx, feed) in feeds.iter().enumerate() {
        let retriever = Arc::clone(&retriever);
        let feed = feed.clone();
        set.spawn(async move {
            let res = retriever.fetch_feed(&feed.url).await;
            let items = match res {
                Ok(raw) => Some(parser::parse_feed(&raw, &feed.name, now_ms)),
                Err(e) => {
                    tracing::warn!(target: "ingest", error = %e, feed = %feed.name, "feed skipped");
                    counter!("ingest_provider_errors_total").increment(1);
                    None
                }
            };
            (idx, items)
        });
    }

    let mut out: Vec<Option<Vec<NewsItem>>> = vec![None; feeds.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, items)) => out[idx] = items,
            Err(e) => {
                tracing::warn!(target: "ingest", error = %e, "feed task did not complete");
                counter!("ingest_provider_errors_total").increment(1);
            }
        }
    }
    out
}

/// Pure post-fetch pipeline: keyword/blacklist filter, time window, dedup,
/// ranking and grouping. `fetched` must be in feed order.
pub fn process(
    fetched: Vec<NewsItem>,
    sources: &SourceSet,
    settings: &Settings,
    now_ms: i64,
) -> AggregateReport {
    let fetched_items = fetched.len();
    let matcher = Matcher::new(settings.match_mode(), &sources.keywords, &sources.blacklist);

    let (by_keyword, keyword_dropped) = matcher.filter_by_keywords(fetched);
    let before_window = by_keyword.len();
    let recent = filter_by_recency(by_keyword, settings.time_filter_hours, now_ms);
    let filtered_out = keyword_dropped + (before_window - recent.len());

    let (mut all_news, duplicates) = dedupe(recent);
    sort_by_recency(&mut all_news);

    let groups = group_by_keyword(&all_news, &matcher, settings.max_news_per_group);

    AggregateReport {
        total: all_news.len(),
        groups,
        all_news,
        feeds_total: sources.feeds.len(),
        feeds_failed: 0,
        fetched_items,
        filtered_out,
        duplicates,
    }
}

/// Run one aggregation with a fresh `Retriever` built from `retriever_cfg`.
pub async fn run_once(
    sources: &SourceSet,
    settings: &Settings,
    retriever_cfg: &RetrieverConfig,
    transport: Arc<dyn Transport>,
) -> Result<AggregateReport, ConfigError> {
    ensure_metrics_described();
    settings.validate()?;
    let retriever = Arc::new(Retriever::new(
        retriever_cfg.relays.clone(),
        retriever_cfg.max_retries,
        transport,
    )?);

    let feeds: Vec<FeedSource> = sources.feeds.iter().filter(|f| f.active).cloned().collect();
    if feeds.is_empty() {
        tracing::warn!(target: "ingest", "no active feeds configured");
    }

    let now_ms = now_millis();
    let results = fetch_all(retriever, &feeds, now_ms).await;
    let feeds_failed = results.iter().filter(|r| r.is_none()).count();
    let fetched: Vec<NewsItem> = results.into_iter().flatten().flatten().collect();

    let active = SourceSet {
        feeds,
        keywords: sources.keywords.clone(),
        blacklist: sources.blacklist.clone(),
    };
    let mut report = process(fetched, &active, settings, now_ms);
    report.feeds_failed = feeds_failed;

    // Telemetry
    counter!("ingest_kept_total").increment(report.total as u64);
    counter!("ingest_filtered_total").increment(report.filtered_out as u64);
    counter!("ingest_dedup_total").increment(report.duplicates as u64);
    gauge!("ingest_pipeline_last_run_ts").set((now_ms / 1000) as f64);

    tracing::info!(
        target: "ingest",
        feeds = report.feeds_total,
        failed = report.feeds_failed,
        fetched = report.fetched_items,
        kept = report.total,
        filtered = report.filtered_out,
        dedup = report.duplicates,
        groups = report.groups.len(),
        "aggregation run finished"
    );
    Ok(report)
}

/// Configuration plus transport; every `run` builds a fresh retriever.
pub struct Aggregator {
    pub sources: SourceSet,
    pub settings: Settings,
    pub retriever: RetrieverConfig,
    transport: Arc<dyn Transport>,
}

impl Aggregator {
    pub fn new(
        sources: SourceSet,
        settings: Settings,
        retriever: RetrieverConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            sources,
            settings,
            retriever,
            transport,
        }
    }

    /// Load config + sources and wire the reqwest transport.
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let sources = cfg.load_sources()?;
        let transport = ReqwestTransport::new(cfg.retriever.timeout_secs)?;
        Ok(Self::new(
            sources,
            cfg.settings.clone(),
            cfg.retriever.clone(),
            Arc::new(transport),
        ))
    }

    pub async fn run(&self) -> Result<AggregateReport, ConfigError> {
        run_once(
            &self.sources,
            &self.settings,
            &self.retriever,
            Arc::clone(&self.transport),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::KeywordRule;

    fn item(title: &str, link: &str, ts: i64) -> NewsItem {
        NewsItem {
            title: title.into(),
            link: link.into(),
            published_display: String::new(),
            description: String::new(),
            source: "S".into(),
            timestamp_millis: ts,
        }
    }

    #[test]
    fn clean_text_strips_tags_and_collapses_ws() {
        assert_eq!(clean_text("  <p>Hello &\n\t<b>world</b></p> "), "Hello & world");
        assert_eq!(clean_text("M&amp;A &lt;b&gt;"), "M&amp;A &lt;b&gt;");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn process_filters_dedups_ranks_groups() {
        let now = 1_000_000_000_000;
        let hour = 3_600_000;
        let sources = SourceSet {
            feeds: vec![],
            keywords: vec![KeywordRule {
                keyword: "ECB".into(),
                active: true,
                group: Some("Central Banks".into()),
            }],
            blacklist: vec!["sponsored".into()],
        };
        let fetched = vec![
            item("ECB holds", "https://a.test/1?x", now - hour),
            item("ECB cuts rates", "https://a.test/2", now - 10),
            item("ecb holds ", "https://a.test/1", now - 5),
            item("ECB sponsored post", "https://a.test/3", now),
            item("ECB old news", "https://a.test/4", now - 72 * hour),
            item("Unrelated story", "https://a.test/5", now),
        ];
        let r = process(fetched, &sources, &Settings::default(), now);
        let titles: Vec<_> = r.all_news.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["ECB cuts rates", "ECB holds"]);
        assert_eq!(r.total, 2);
        assert_eq!(r.duplicates, 1);
        assert_eq!(r.filtered_out, 3);
        assert_eq!(r.groups.names(), vec!["Central Banks"]);
    }
}
