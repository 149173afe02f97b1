use crate::cache::DEFAULT_MAX_AGE;
use crate::error::{ConfigError, WatchlistError};
use crate::models::{Symbol, Watchlist};
use crate::provider::{HistoryWindow, DEFAULT_TIMEOUT};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_SYMBOLS: [&str; 5] = ["AAPL", "GOOGL", "TSLA", "MSFT", "AMZN"];
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

const APP_DIR: &str = "stock-watch";
const WATCHLIST_HEADER: &str = "# Stock Watchlist\n# One symbol per line, in display order\n";

#[derive(Clone, Debug)]
pub struct Settings {
    pub cache_path: PathBuf,
    pub watchlist_path: PathBuf,
    pub log_path: PathBuf,
    pub max_age: Duration,
    pub refresh_interval: Duration,
    pub window: HistoryWindow,
    pub request_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR);
        let config_dir = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
            .unwrap_or_else(std::env::temp_dir)
            .join(APP_DIR);

        Settings {
            cache_path: cache_dir.join("snapshot.json"),
            watchlist_path: config_dir.join("watchlist.conf"),
            log_path: cache_dir.join("stock-watch.log"),
            max_age: DEFAULT_MAX_AGE,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            window: HistoryWindow::default(),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` knows about.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut settings = Settings::default();

        if let Some(path) = lookup("STOCK_WATCH_CACHE") {
            settings.cache_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("STOCK_WATCH_WATCHLIST") {
            settings.watchlist_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("STOCK_WATCH_LOG") {
            settings.log_path = PathBuf::from(path);
        }
        if let Some(secs) = parse_var(&lookup, "STOCK_WATCH_MAX_AGE_SECS")? {
            settings.max_age = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "STOCK_WATCH_REFRESH_SECS")? {
            settings.refresh_interval = Duration::from_secs(secs.max(1));
        }
        if let Some(days) = parse_var(&lookup, "STOCK_WATCH_HISTORY_DAYS")? {
            let days = u32::try_from(days).map_err(|_| ConfigError::InvalidValue {
                key: "STOCK_WATCH_HISTORY_DAYS",
                value: days.to_string(),
            })?;
            settings.window = HistoryWindow::days(days.max(1));
        }
        if let Some(secs) = parse_var(&lookup, "STOCK_WATCH_TIMEOUT_SECS")? {
            settings.request_timeout = Duration::from_secs(secs.max(1));
        }

        Ok(settings)
    }
}

fn parse_var(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<u64>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

/// Reads the watchlist file, seeding it with the default symbols on first run.
/// Lines that aren't valid symbols are skipped.
pub fn load_watchlist(path: &Path) -> Result<Watchlist, WatchlistError> {
    if !path.exists() {
        let defaults = Watchlist::from_symbols(DEFAULT_SYMBOLS.iter().filter_map(|s| Symbol::parse(s).ok()));
        save_watchlist(path, &defaults)?;
        info!(path = %path.display(), "created default watchlist");
        return Ok(defaults);
    }

    let reader = BufReader::new(File::open(path)?);
    let mut symbols = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Symbol::parse(line) {
            Ok(symbol) => symbols.push(symbol),
            Err(err) => warn!(path = %path.display(), error = %err, "skipping watchlist line"),
        }
    }

    Ok(Watchlist::from_symbols(symbols))
}

pub fn save_watchlist(path: &Path, watchlist: &Watchlist) -> Result<(), WatchlistError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut file = File::create(path)?;
    write!(file, "{}", WATCHLIST_HEADER)?;
    for symbol in watchlist.iter() {
        writeln!(file, "{}", symbol)?;
    }
    Ok(())
}
