//! Stock watchlist with a percentage-change trend chart.
//!
//! Prices come from Yahoo Finance and are kept in a single snapshot file so the
//! watchlist still has something to show when the provider rate-limits us.

pub mod app;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod models;
pub mod provider;
pub mod trend;
pub mod ui;
pub mod worker;

pub use cache::CacheStore;
pub use controller::{Notice, Refresh, RefreshController, RefreshSettings};
pub use models::{PricePoint, PriceSeries, Snapshot, Symbol, Watchlist};
pub use provider::{HistoryWindow, QuoteProvider, YahooProvider};
