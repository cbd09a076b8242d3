// src/config/mod.rs
//! Runtime configuration: `config/aggregator.toml` (or `$NEWS_CONFIG_PATH`),
//! env overrides for the filter settings, and the CSV source lists.

pub mod sources;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::grouping::DEFAULT_MAX_NEWS_PER_GROUP;
use crate::ingest::retriever::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS};
use crate::ingest::types::{FeedSource, KeywordRule};
use crate::matcher::{MatchMode, DEFAULT_TIME_FILTER_HOURS};

pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";
pub const ENV_CONFIG_PATH: &str = "NEWS_CONFIG_PATH";

pub const ENV_TIME_FILTER_HOURS: &str = "TIME_FILTER_HOURS";
pub const ENV_EXACT_MATCH: &str = "EXACT_MATCH";
pub const ENV_MAX_NEWS_PER_GROUP: &str = "MAX_NEWS_PER_GROUP";

pub const DEFAULT_RELAY: &str = "https://cors-anywhere.run/";

fn default_time_filter_hours() -> u64 {
    DEFAULT_TIME_FILTER_HOURS
}
fn default_exact_match() -> bool {
    true
}
fn default_max_news_per_group() -> usize {
    DEFAULT_MAX_NEWS_PER_GROUP
}
fn default_relays() -> Vec<String> {
    vec![DEFAULT_RELAY.to_string()]
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Filter/grouping knobs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_time_filter_hours")]
    pub time_filter_hours: u64,
    #[serde(default = "default_exact_match")]
    pub exact_match: bool,
    #[serde(default = "default_max_news_per_group")]
    pub max_news_per_group: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            time_filter_hours: DEFAULT_TIME_FILTER_HOURS,
            exact_match: true,
            max_news_per_group: DEFAULT_MAX_NEWS_PER_GROUP,
        }
    }
}

impl Settings {
    pub fn match_mode(&self) -> MatchMode {
        MatchMode::from_exact(self.exact_match)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_news_per_group == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "max_news_per_group",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Apply `TIME_FILTER_HOURS` / `EXACT_MATCH` / `MAX_NEWS_PER_GROUP` when set
    /// and parseable; bad values are logged and ignored.
    pub fn apply_env(&mut self) {
        if let Some(v) = parse_env(ENV_TIME_FILTER_HOURS, |s| s.parse::<u64>().ok()) {
            self.time_filter_hours = v;
        }
        if let Some(v) = parse_env(ENV_EXACT_MATCH, parse_flag) {
            self.exact_match = v;
        }
        if let Some(v) = parse_env(ENV_MAX_NEWS_PER_GROUP, |s| s.parse::<usize>().ok()) {
            self.max_news_per_group = v;
        }
    }
}

fn parse_env<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::warn!(var = name, value = %raw, "ignoring unparsable env override");
    }
    parsed
}

/// `true`/`1`/`yes` (any case) are on; `false`/`0`/`no` are off.
pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrieverConfig {
    #[serde(default = "default_relays")]
    pub relays: Vec<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            relays: default_relays(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where the CSV lists live. Relative paths resolve against the config file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourcePaths {
    #[serde(default)]
    pub feeds: Option<PathBuf>,
    #[serde(default)]
    pub keywords: Option<PathBuf>,
    #[serde(default)]
    pub blacklist: Option<PathBuf>,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            feeds: Some(PathBuf::from("fonti.csv")),
            keywords: Some(PathBuf::from("keyword.csv")),
            blacklist: Some(PathBuf::from("blacklist.csv")),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub retriever: RetrieverConfig,
    #[serde(default)]
    pub sources: SourcePaths,
    /// Inline lists; when present they replace the matching CSV file.
    #[serde(default)]
    pub feeds: Option<Vec<FeedSource>>,
    #[serde(default)]
    pub keywords: Option<Vec<KeywordRule>>,
    #[serde(default)]
    pub blacklist: Option<Vec<String>>,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl AppConfig {
    pub fn from_toml_str(s: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut cfg = Self::from_toml_str(&content, &path.display().to_string())?;
        cfg.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(cfg)
    }

    /// 1) `$NEWS_CONFIG_PATH` (must exist)
    /// 2) `config/aggregator.toml`
    /// 3) built-in defaults with CSVs under `config/`
    ///
    /// Env overrides are applied last in every case.
    pub fn load_default() -> Result<Self, ConfigError> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(ConfigError::Read {
                    path: pb.display().to_string(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "NEWS_CONFIG_PATH points to non-existent path",
                    ),
                });
            }
            Self::load_from(&pb)?
        } else {
            let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_p.exists() {
                Self::load_from(&default_p)?
            } else {
                tracing::info!("no {DEFAULT_CONFIG_PATH}; using built-in defaults");
                Self {
                    base_dir: PathBuf::from("config"),
                    ..Self::default()
                }
            }
        };
        cfg.settings.apply_env();
        Ok(cfg)
    }

    pub fn resolve(&self, p: &Path) -> PathBuf {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    /// Build the typed source set, reading CSVs where no inline list was given.
    pub fn load_sources(&self) -> Result<sources::SourceSet, ConfigError> {
        let feeds = match (&self.feeds, &self.sources.feeds) {
            (Some(inline), _) => inline.iter().filter(|f| f.active).cloned().collect(),
            (None, Some(p)) => sources::load_feeds_csv(&self.resolve(p))?.records,
            (None, None) => {
                return Err(ConfigError::InvalidSetting {
                    name: "sources.feeds",
                    reason: "no feed list configured".into(),
                })
            }
        };
        let keywords = match (&self.keywords, &self.sources.keywords) {
            (Some(inline), _) => inline.iter().filter(|k| k.active).cloned().collect(),
            (None, Some(p)) => sources::load_keywords_csv(&self.resolve(p))?.records,
            (None, None) => Vec::new(),
        };
        let blacklist = match (&self.blacklist, &self.sources.blacklist) {
            (Some(inline), _) => sources::clean_terms(inline.clone()),
            (None, Some(p)) => sources::load_blacklist_csv(&self.resolve(p)),
            (None, None) => Vec::new(),
        };
        Ok(sources::SourceSet {
            feeds,
            keywords,
            blacklist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = AppConfig::from_toml_str("", "inline").unwrap();
        assert_eq!(cfg.settings, Settings::default());
        assert_eq!(cfg.retriever.relays, vec![DEFAULT_RELAY.to_string()]);
        assert_eq!(cfg.retriever.max_retries, 3);
        assert!(cfg.settings.exact_match);
        assert_eq!(cfg.settings.time_filter_hours, 48);
        assert_eq!(cfg.settings.max_news_per_group, 5);
    }

    #[test]
    fn inline_lists_parse() {
        let s = r#"
blacklist = ["oroscopo"]

[settings]
exact_match = false

[[feeds]]
name = "A"
url = "https://a.test/rss"

[[keywords]]
keyword = "ECB"
group = "Central Banks"
"#;
        let cfg = AppConfig::from_toml_str(s, "inline").unwrap();
        assert_eq!(cfg.settings.match_mode(), MatchMode::Partial);
        let set = cfg.load_sources().unwrap();
        assert_eq!(set.feeds.len(), 1);
        assert!(set.feeds[0].active);
        assert_eq!(set.keywords[0].group_name(), "Central Banks");
        assert_eq!(set.blacklist, vec!["oroscopo".to_string()]);
    }

    #[test]
    fn zero_cap_is_rejected() {
        let s = Settings {
            max_news_per_group: 0,
            ..Settings::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn flags() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
