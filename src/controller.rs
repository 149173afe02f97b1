//! Decides between the cached snapshot and the remote provider.
//!
//! ```text
//! refresh(force)
//!   ├─ !force && cache valid && load ok ──────────────► Cached
//!   └─ fetch all watchlist symbols
//!        ├─ non-empty ──► save, merge into table ────► Fetched
//!        └─ error / all empty
//!             ├─ cache file exists && load ok ───────► Stale
//!             └─ otherwise ──────────────────────────► Empty
//! ```
//!
//! Nothing here is fatal and nothing retries; the next tick or keypress tries again.

use crate::cache::{CacheStore, DEFAULT_MAX_AGE};
use crate::error::{ProviderError, WatchlistError};
use crate::models::{Snapshot, Symbol, Watchlist};
use crate::provider::{HistoryWindow, QuoteProvider};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    /// Provider failed; an expired snapshot is being shown instead.
    StaleDataServed,
    /// Provider failed and there was nothing cached to fall back on.
    NoDataAvailable,
}

/// Result of one refresh, one variant per way it can end.
#[derive(Clone, Debug, PartialEq)]
pub enum Refresh {
    /// Snapshot was within `max_age`; the provider was not called.
    Cached(Snapshot),
    /// Provider answered; the snapshot was written to the cache.
    Fetched(Snapshot),
    /// Provider failed; this is the last cached snapshot, however old.
    Stale(Snapshot),
    /// Provider failed and no usable cache exists.
    Empty,
}

impl Refresh {
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Refresh::Cached(_) | Refresh::Fetched(_) => None,
            Refresh::Stale(_) => Some(Notice::StaleDataServed),
            Refresh::Empty => Some(Notice::NoDataAvailable),
        }
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Refresh::Cached(s) | Refresh::Fetched(s) | Refresh::Stale(s) => Some(s),
            Refresh::Empty => None,
        }
    }

    pub fn into_snapshot(self) -> Snapshot {
        match self {
            Refresh::Cached(s) | Refresh::Fetched(s) | Refresh::Stale(s) => s,
            Refresh::Empty => Snapshot::new(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Refresh::Cached(_) => "cached",
            Refresh::Fetched(_) => "fetched",
            Refresh::Stale(_) => "stale",
            Refresh::Empty => "empty",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RefreshSettings {
    pub max_age: Duration,
    pub window: HistoryWindow,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            window: HistoryWindow::default(),
        }
    }
}

pub struct RefreshController<P> {
    provider: P,
    cache: CacheStore,
    watchlist: Watchlist,
    table: Snapshot,
    settings: RefreshSettings,
}

impl<P: QuoteProvider> RefreshController<P> {
    pub fn new(provider: P, cache: CacheStore, watchlist: Watchlist, settings: RefreshSettings) -> Self {
        Self {
            provider,
            cache,
            watchlist,
            table: Snapshot::new(),
            settings,
        }
    }

    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    /// Everything seen this session: the latest refresh overlaid on earlier ones.
    /// Cleared when a refresh ends with nothing to show.
    pub fn table(&self) -> &Snapshot {
        &self.table
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn refresh(&mut self, force: bool) -> Refresh {
        let outcome = self.run_refresh(force);
        match outcome.snapshot() {
            Some(snapshot) => self.table.merge_from(snapshot),
            None => self.table = Snapshot::new(),
        }
        info!(
            outcome = outcome.label(),
            force,
            symbols = outcome.snapshot().map(Snapshot::len).unwrap_or(0),
            "refresh finished"
        );
        outcome
    }

    /// Adds a symbol and force-refreshes so it shows up right away.
    /// `Ok(None)` means it was already on the watchlist and nothing was fetched.
    pub fn add_symbol(&mut self, raw: &str) -> Result<Option<Refresh>, WatchlistError> {
        let symbol = Symbol::parse(raw)?;
        if !self.watchlist.add(symbol.clone()) {
            return Ok(None);
        }
        info!(%symbol, "added to watchlist");
        Ok(Some(self.refresh(true)))
    }

    fn run_refresh(&mut self, force: bool) -> Refresh {
        if !force && self.cache.is_valid(self.settings.max_age) {
            match self.cache.load() {
                Ok(snapshot) => return Refresh::Cached(snapshot),
                Err(err) => warn!(error = %err, "valid cache unreadable, fetching instead"),
            }
        }

        match self.fetch() {
            Ok(snapshot) => {
                if let Err(err) = self.cache.save(&snapshot) {
                    warn!(error = %err, "could not persist snapshot");
                }
                Refresh::Fetched(snapshot)
            }
            Err(err) => {
                warn!(error = %err, "remote fetch failed, falling back to cache");
                self.fallback()
            }
        }
    }

    fn fetch(&self) -> Result<Snapshot, ProviderError> {
        let mut snapshot = self
            .provider
            .fetch_history(self.watchlist.as_slice(), self.settings.window)?;
        snapshot.retain_non_empty();
        if snapshot.is_empty() {
            return Err(ProviderError::Unavailable("empty response for every symbol".to_string()));
        }
        Ok(snapshot)
    }

    fn fallback(&self) -> Refresh {
        if !self.cache.exists() {
            return Refresh::Empty;
        }
        match self.cache.load() {
            Ok(snapshot) => Refresh::Stale(snapshot),
            Err(err) => {
                warn!(error = %err, "no usable cache to fall back on");
                Refresh::Empty
            }
        }
    }
}
