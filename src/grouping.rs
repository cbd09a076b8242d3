// src/grouping.rs
//! Partition ranked items into keyword groups.

use std::cmp::Ordering;
use std::collections::HashMap;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::ingest::types::{GroupedResult, NewsGroup, NewsItem};
use crate::matcher::Matcher;

pub const DEFAULT_MAX_NEWS_PER_GROUP: usize = 5;

/// Primary collation key: accents stripped, case folded.
fn collation_key(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

// Case pattern of the letters; `false` (lowercase) sorts first.
fn case_key(s: &str) -> Vec<bool> {
    s.chars()
        .filter(|c| c.is_alphabetic())
        .map(char::is_uppercase)
        .collect()
}

/// Display-locale ordering of group names: "Àzioni" < "banche" < "Zeta".
/// Levels as in Italian collation: base letters, then accents (unaccented
/// first), then case (lowercase first); code points settle whatever is left.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| case_key(a).cmp(&case_key(b)))
        .then_with(|| a.cmp(b))
}

/// Items must already be ranked; each group keeps its first `max_per_group`.
pub fn group_by_keyword(
    items: &[NewsItem],
    matcher: &Matcher,
    max_per_group: usize,
) -> GroupedResult {
    let mut buckets: HashMap<String, Vec<NewsItem>> = HashMap::new();

    for it in items {
        for name in matcher.matching_groups(&it.title) {
            buckets.entry(name.to_string()).or_default().push(it.clone());
        }
    }

    let mut groups: Vec<NewsGroup> = buckets
        .into_iter()
        .map(|(name, mut items)| {
            items.truncate(max_per_group);
            NewsGroup { name, items }
        })
        .collect();
    groups.sort_by(|a, b| locale_cmp(&a.name, &b.name));

    GroupedResult { groups }
}
