use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("invalid symbol {0:?}")]
    InvalidSymbol(String),

    #[error("series has {dates} dates but {closes} closes")]
    ColumnMismatch { dates: usize, closes: usize },

    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("duplicate date {0} in series")]
    DuplicateDate(String),
}

#[derive(Error, Debug)]
pub enum CacheError {
    /// The file exists but its contents can't be turned back into a snapshot.
    /// Callers treat this exactly like a missing cache.
    #[error("corrupt cache at {}: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("cache I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ProviderError {
    /// Rate limiting, a timeout, or an empty answer for every symbol.
    #[error("market data provider unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Unavailable(format!("request timed out: {}", err))
        } else if err.status().map(|s| s.as_u16() == 429).unwrap_or(false) {
            ProviderError::Unavailable("rate limited (HTTP 429)".to_string())
        } else {
            ProviderError::Http(err)
        }
    }
}

#[derive(Error, Debug)]
pub enum WatchlistError {
    #[error(transparent)]
    InvalidSymbol(#[from] ModelError),

    #[error("watchlist I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}
