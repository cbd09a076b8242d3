// src/ingest/types.rs
use serde::{Deserialize, Serialize};

/// A configured feed. Only `active` feeds are fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// Keyword rule; when `group` is `None` the keyword names its own group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordRule {
    pub keyword: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub group: Option<String>,
}

impl KeywordRule {
    pub fn group_name(&self) -> &str {
        match self.group.as_deref() {
            Some(g) if !g.trim().is_empty() => g,
            _ => &self.keyword,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    /// `dd/mm/yyyy, HH:MM:SS` in local time; empty when the feed date was unusable.
    pub published_display: String,
    pub description: String,
    pub source: String,
    /// Unix millis. Falls back to ingestion time; `0` means "no timestamp".
    pub timestamp_millis: i64,
}

/// One named bucket of ranked items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsGroup {
    pub name: String,
    pub items: Vec<NewsItem>,
}

/// Groups in presentation order (locale-aware by name).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupedResult {
    pub groups: Vec<NewsGroup>,
}

impl GroupedResult {
    pub fn get(&self, name: &str) -> Option<&[NewsItem]> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.items.as_slice())
    }

    pub fn names(&self) -> Vec<&str> {
        self.groups.iter().map(|g| g.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

/// Everything one aggregation run hands to presentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregateReport {
    pub groups: GroupedResult,
    pub all_news: Vec<NewsItem>,
    pub total: usize,
    pub feeds_total: usize,
    pub feeds_failed: usize,
    pub fetched_items: usize,
    pub filtered_out: usize,
    pub duplicates: usize,
}

impl AggregateReport {
    /// Advisory line for status displays.
    pub fn status_message(&self) -> String {
        let mut msg = format!(
            "Loaded {} unique news items from {} sources",
            self.total, self.feeds_total
        );
        if self.feeds_failed > 0 {
            msg.push_str(&format!(" ({} unavailable)", self.feeds_failed));
        }
        msg
    }
}
