// src/error.rs
use thiserror::Error;

/// Configuration-level failures. Fatal to a run and raised before any fetch.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no relay endpoints configured")]
    NoRelays,

    #[error("invalid setting `{name}`: {reason}")]
    InvalidSetting { name: &'static str, reason: String },

    #[error("reading {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {path}: {message}")]
    Parse { path: String, message: String },
}

/// Per-feed retrieval failure after every attempt was used up.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not fetch {url} after {attempts} attempts")]
    Exhausted { url: String, attempts: u32 },
}
