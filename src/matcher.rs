// src/matcher.rs
//! Keyword matching, blacklist exclusion and the recency window.
//! Only titles are searched; descriptions never take part in matching.

use regex::Regex;

use crate::ingest::types::{KeywordRule, NewsItem};

pub const DEFAULT_TIME_FILTER_HOURS: u64 = 48;
const HOUR_MS: i64 = 3_600_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Whole word, case-insensitive.
    #[default]
    Exact,
    /// Substring, case-insensitive.
    Partial,
}

impl MatchMode {
    pub fn from_exact(exact: bool) -> Self {
        if exact {
            MatchMode::Exact
        } else {
            MatchMode::Partial
        }
    }
}

fn word_regex(keyword: &str) -> Option<Regex> {
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword))).ok()
}

/// One-off match; compiles the word regex on every call. Use `Matcher` in loops.
pub fn match_keyword(text: &str, keyword: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Exact => match word_regex(keyword) {
            Some(re) => re.is_match(text),
            None => contains_ci(text, keyword),
        },
        MatchMode::Partial => contains_ci(text, keyword),
    }
}

fn contains_ci(text: &str, needle: &str) -> bool {
    text.to_lowercase().contains(&needle.to_lowercase())
}

#[derive(Debug, Clone)]
struct CompiledRule {
    keyword_lower: String,
    group: String,
    word: Option<Regex>,
}

/// Active keyword rules and blacklist, prepared once per run.
#[derive(Debug, Clone)]
pub struct Matcher {
    mode: MatchMode,
    rules: Vec<CompiledRule>,
    blacklist: Vec<String>,
}

impl Matcher {
    pub fn new(mode: MatchMode, rules: &[KeywordRule], blacklist: &[String]) -> Self {
        let rules = rules
            .iter()
            .filter(|r| r.active && !r.keyword.trim().is_empty())
            .map(|r| {
                let keyword = r.keyword.trim();
                let word = match mode {
                    MatchMode::Exact => word_regex(keyword),
                    MatchMode::Partial => None,
                };
                if mode == MatchMode::Exact && word.is_none() {
                    tracing::warn!(keyword, "keyword regex rejected; using substring match");
                }
                CompiledRule {
                    keyword_lower: keyword.to_lowercase(),
                    group: r.group_name().trim().to_string(),
                    word,
                }
            })
            .collect();

        let blacklist = blacklist
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            mode,
            rules,
            blacklist,
        }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn has_keywords(&self) -> bool {
        !self.rules.is_empty()
    }

    pub fn is_blacklisted(&self, title: &str) -> bool {
        if self.blacklist.is_empty() {
            return false;
        }
        let lower = title.to_lowercase();
        self.blacklist.iter().any(|t| lower.contains(t.as_str()))
    }

    fn rule_matches(rule: &CompiledRule, title: &str, title_lower: &str) -> bool {
        match &rule.word {
            Some(re) => re.is_match(title),
            None => title_lower.contains(rule.keyword_lower.as_str()),
        }
    }

    pub fn any_keyword(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.rules
            .iter()
            .any(|r| Self::rule_matches(r, title, &lower))
    }

    /// Distinct group names matched by `title`, in rule order.
    pub fn matching_groups(&self, title: &str) -> Vec<&str> {
        let lower = title.to_lowercase();
        let mut out: Vec<&str> = Vec::new();
        for r in &self.rules {
            if Self::rule_matches(r, title, &lower) && !out.contains(&r.group.as_str()) {
                out.push(r.group.as_str());
            }
        }
        out
    }

    /// Blacklist first, then keywords. No active keywords means everything not
    /// blacklisted passes. Returns (kept, dropped_count).
    pub fn filter_by_keywords(&self, items: Vec<NewsItem>) -> (Vec<NewsItem>, usize) {
        let before = items.len();
        let kept: Vec<NewsItem> = items
            .into_iter()
            .filter(|it| !self.is_blacklisted(&it.title))
            .filter(|it| !self.has_keywords() || self.any_keyword(&it.title))
            .collect();
        let dropped = before - kept.len();
        (kept, dropped)
    }
}

/// Keep items published within `window_hours` of `now_ms`. Items without a
/// timestamp (`0`) always survive.
pub fn filter_by_recency(items: Vec<NewsItem>, window_hours: u64, now_ms: i64) -> Vec<NewsItem> {
    let limit = i64::try_from(window_hours)
        .unwrap_or(i64::MAX)
        .saturating_mul(HOUR_MS);
    items
        .into_iter()
        .filter(|it| {
            it.timestamp_millis == 0 || now_ms.saturating_sub(it.timestamp_millis) <= limit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(k: &str, g: Option<&str>) -> KeywordRule {
        KeywordRule {
            keyword: k.into(),
            active: true,
            group: g.map(Into::into),
        }
    }

    fn item(title: &str, ts: i64) -> NewsItem {
        NewsItem {
            title: title.into(),
            link: format!("https://n.test/{}", title.len()),
            published_display: String::new(),
            description: String::new(),
            source: "T".into(),
            timestamp_millis: ts,
        }
    }

    #[test]
    fn exact_is_whole_word() {
        assert!(match_keyword("Fed raises rates", "Fed", MatchMode::Exact));
        assert!(!match_keyword("Federal holiday", "Fed", MatchMode::Exact));
        assert!(match_keyword("the fed speaks", "Fed", MatchMode::Exact));
    }

    #[test]
    fn exact_escapes_regex_chars() {
        assert!(match_keyword("Rally in (US) stocks", "(US)", MatchMode::Partial));
        assert!(match_keyword("Tesla Q3.2 numbers", "Q3.2", MatchMode::Exact));
        assert!(!match_keyword("Tesla Q3x2 numbers", "Q3.2", MatchMode::Exact));
    }

    #[test]
    fn partial_is_substring() {
        assert!(match_keyword("Intesa Sanpaolo profits rise", "intesa", MatchMode::Partial));
        assert!(match_keyword("intesa", "intesa", MatchMode::Partial));
        assert!(match_keyword("Federal holiday", "fed", MatchMode::Partial));
    }

    #[test]
    fn inactive_rules_are_ignored() {
        let mut r = rule("ECB", None);
        r.active = false;
        let m = Matcher::new(MatchMode::Exact, &[r], &[]);
        assert!(!m.has_keywords());
        let (kept, dropped) = m.filter_by_keywords(vec![item("anything", 1)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 0);
    }

    #[test]
    fn blacklist_applies_without_keywords() {
        let m = Matcher::new(MatchMode::Exact, &[], &["Oroscopo".into(), "  ".into()]);
        let (kept, dropped) =
            m.filter_by_keywords(vec![item("oroscopo di oggi", 1), item("ECB", 1)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "ECB");
        assert_eq!(dropped, 1);
    }

    #[test]
    fn matching_groups_dedups_names_in_rule_order() {
        let m = Matcher::new(
            MatchMode::Exact,
            &[rule("ECB", Some("Banks")), rule("BCE", Some("Banks")), rule("rates", None)],
            &[],
        );
        assert_eq!(m.matching_groups("ECB and BCE move rates"), vec!["Banks", "rates"]);
    }

    #[test]
    fn recency_window_and_undated() {
        let now = 100 * HOUR_MS;
        let out = filter_by_recency(
            vec![item("a", now - 48 * HOUR_MS), item("b", now - 48 * HOUR_MS - 1), item("c", 0)],
            48,
            now,
        );
        let titles: Vec<_> = out.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "c"]);
    }
}
