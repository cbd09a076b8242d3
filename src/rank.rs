// src/rank.rs
use std::collections::HashSet;

use crate::ingest::types::NewsItem;

/// Link without its query string, plus the trimmed lower-cased title.
pub fn dedup_key(item: &NewsItem) -> String {
    let link = item.link.split('?').next().unwrap_or_default();
    format!("{}|{}", link, item.title.trim().to_lowercase())
}

/// First occurrence wins. Returns (kept, dropped_count).
pub fn dedupe(items: Vec<NewsItem>) -> (Vec<NewsItem>, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut keep = Vec::with_capacity(items.len());
    let mut dropped = 0usize;
    for it in items {
        if seen.insert(dedup_key(&it)) {
            keep.push(it);
        } else {
            dropped += 1;
        }
    }
    (keep, dropped)
}

/// Most recent first; equal timestamps keep their input order.
pub fn sort_by_recency(items: &mut [NewsItem]) {
    items.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis));
}

pub fn dedupe_and_sort(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let (mut kept, _) = dedupe(items);
    sort_by_recency(&mut kept);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn key_strips_query_and_normalizes_title() {
        let a = item("  ECB Cuts ", "https://x.test/a?utm=1", 1);
        assert_eq!(dedup_key(&a), "https://x.test/a|ecb cuts");
    }

    #[test]
    fn first_duplicate_wins() {
        let (kept, dropped) = dedupe(vec![
            item("ECB cuts", "https://x.test/a?src=rss", 1),
            item("ecb cuts ", "https://x.test/a", 5),
            item("ECB cuts", "https://x.test/b", 3),
        ]);
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].timestamp_millis, 1);
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let out = dedupe_and_sort(vec![
            item("a", "https://x.test/a", 10),
            item("b", "https://x.test/b", 30),
            item("c", "https://x.test/c", 10),
            item("d", "https://x.test/d", 20),
        ]);
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "d", "a", "c"]);
        assert_eq!(dedupe_and_sort(out.clone()), out);
    }
}
