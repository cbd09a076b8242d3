// src/config/sources.rs
//! CSV source lists:
//! - `fonti.csv`     `name,url,active`
//! - `keyword.csv`   `keyword,active,group`
//! - `blacklist.csv` one term per line
//!
//! First line is a header. Inactive rows are dropped, malformed rows are
//! skipped with a warning and counted.

use std::fs;
use std::path::Path;

use crate::config::parse_flag;
use crate::error::ConfigError;
use crate::ingest::types::{FeedSource, KeywordRule};

/// Everything one run consumes from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    pub feeds: Vec<FeedSource>,
    pub keywords: Vec<KeywordRule>,
    pub blacklist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Data rows (header dropped, blank lines ignored) with 1-based line numbers.
fn data_rows(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .trim_start_matches('\u{feff}')
        .lines()
        .enumerate()
        .skip(1)
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
}

fn fields(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

fn is_http_url(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://")) && s.len() > "https://".len()
}

pub fn parse_feeds_csv(content: &str, origin: &str) -> Loaded<FeedSource> {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (line_no, line) in data_rows(content) {
        let f = fields(line);
        let parsed = match f.as_slice() {
            [name, url, active, ..] if !name.is_empty() && is_http_url(url) => {
                parse_flag(active).map(|active| FeedSource {
                    name: name.to_string(),
                    url: url.to_string(),
                    active,
                })
            }
            _ => None,
        };
        match parsed {
            Some(feed) if feed.active => records.push(feed),
            Some(_) => {}
            None => {
                skipped += 1;
                tracing::warn!(
                    file = origin,
                    line = line_no,
                    row = line,
                    "skipping malformed feed row"
                );
            }
        }
    }
    Loaded { records, skipped }
}

pub fn parse_keywords_csv(content: &str, origin: &str) -> Loaded<KeywordRule> {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (line_no, line) in data_rows(content) {
        let f = fields(line);
        let parsed = match f.as_slice() {
            [keyword, active, rest @ ..] if !keyword.is_empty() => {
                parse_flag(active).map(|active| KeywordRule {
                    keyword: keyword.to_string(),
                    active,
                    group: rest
                        .first()
                        .filter(|g| !g.is_empty())
                        .map(|g| g.to_string()),
                })
            }
            _ => None,
        };
        match parsed {
            Some(rule) if rule.active => records.push(rule),
            Some(_) => {}
            None => {
                skipped += 1;
                tracing::warn!(
                    file = origin,
                    line = line_no,
                    row = line,
                    "skipping malformed keyword row"
                );
            }
        }
    }
    Loaded { records, skipped }
}

pub fn parse_blacklist_csv(content: &str) -> Vec<String> {
    clean_terms(data_rows(content).map(|(_, l)| l.to_string()).collect())
}

/// Trim, drop empties, dedup.
pub fn clean_terms(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_string());
        }
    }
    set.into_iter().collect()
}

pub fn load_feeds_csv(path: &Path) -> Result<Loaded<FeedSource>, ConfigError> {
    let loaded = parse_feeds_csv(&read(path)?, &path.display().to_string());
    tracing::info!(
        path = %path.display(),
        active = loaded.records.len(),
        skipped = loaded.skipped,
        "feeds loaded"
    );
    Ok(loaded)
}

pub fn load_keywords_csv(path: &Path) -> Result<Loaded<KeywordRule>, ConfigError> {
    let loaded = parse_keywords_csv(&read(path)?, &path.display().to_string());
    tracing::info!(
        path = %path.display(),
        active = loaded.records.len(),
        skipped = loaded.skipped,
        "keywords loaded"
    );
    Ok(loaded)
}

/// A missing blacklist is not fatal: warn and carry on with none.
pub fn load_blacklist_csv(path: &Path) -> Vec<String> {
    match read(path) {
        Ok(content) => parse_blacklist_csv(&content),
        Err(e) => {
            tracing::warn!(error = %e, "blacklist not found; continuing without one");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feeds_skip_inactive_and_malformed() {
        let csv = "name,url,active\r\n\
                   Sole 24 Ore, https://a.test/rss ,true\r\n\
                   Old,https://b.test/rss,false\r\n\
                   ,https://c.test/rss,1\r\n\
                   Broken,not-a-url,true\r\n\
                   \r\n\
                   Milano Finanza,https://d.test/rss,1\r\n";
        let l = parse_feeds_csv(csv, "fonti.csv");
        let names: Vec<_> = l.records.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Sole 24 Ore", "Milano Finanza"]);
        assert_eq!(l.records[0].url, "https://a.test/rss");
        assert_eq!(l.skipped, 2);
    }

    #[test]
    fn keywords_group_is_optional() {
        let csv = "keyword,active,group\n\
                   ECB,true,Central Banks\nFed,1,\nOil,true\nGold,false,Metals\n,true,X\n";
        let l = parse_keywords_csv(csv, "keyword.csv");
        assert_eq!(l.records.len(), 3);
        assert_eq!(l.records[0].group_name(), "Central Banks");
        assert_eq!(l.records[1].group, None);
        assert_eq!(l.records[2].group_name(), "Oil");
        assert_eq!(l.skipped, 1);
    }

    #[test]
    fn blacklist_header_and_blanks() {
        let csv = "term\n oroscopo \n\nsponsored\noroscopo\n";
        assert_eq!(
            parse_blacklist_csv(csv),
            vec!["oroscopo".to_string(), "sponsored".to_string()]
        );
    }
}
