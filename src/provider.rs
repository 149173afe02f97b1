//! Remote market data.
//!
//! `QuoteProvider` is the seam the controller is written against. `YahooProvider` asks
//! Yahoo's spark endpoint for every symbol in one request.

use crate::error::ProviderError;
use crate::models::{PricePoint, PriceSeries, Snapshot, Symbol};
use chrono::DateTime;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const HOSTS: [&str; 2] = ["query2.finance.yahoo.com", "query1.finance.yahoo.com"];
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Trailing window of daily closes to request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HistoryWindow {
    pub days: u32,
}

impl HistoryWindow {
    pub fn days(days: u32) -> Self {
        Self { days }
    }

    /// Yahoo range parameter, e.g. `5d`.
    pub fn range(&self) -> String {
        format!("{}d", self.days)
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::days(5)
    }
}

pub trait QuoteProvider {
    /// Daily closes for `symbols` over `window`. Symbols the provider knows nothing
    /// about are left out of the result rather than returned empty.
    fn fetch_history(&self, symbols: &[Symbol], window: HistoryWindow) -> Result<Snapshot, ProviderError>;
}

pub struct YahooProvider {
    client: Client,
}

impl YahooProvider {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Http)?;
        Ok(Self { client })
    }

    fn fetch_from(&self, host: &str, symbols: &str, window: HistoryWindow) -> Result<Value, ProviderError> {
        let url = format!("https://{}/v7/finance/spark", host);
        let range = window.range();
        debug!(%url, %symbols, %range, "requesting price history");

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", symbols), ("range", range.as_str()), ("interval", "1d")])
            .send()?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::Unavailable(format!("{} rate limited the request", host)));
        }
        let response = response.error_for_status()?;
        Ok(response.json::<Value>()?)
    }
}

impl QuoteProvider for YahooProvider {
    fn fetch_history(&self, symbols: &[Symbol], window: HistoryWindow) -> Result<Snapshot, ProviderError> {
        if symbols.is_empty() {
            return Ok(Snapshot::new());
        }
        let joined = symbols.iter().map(Symbol::as_str).collect::<Vec<_>>().join(",");

        let mut last_err = ProviderError::Unavailable("no hosts tried".to_string());
        for host in HOSTS {
            match self.fetch_from(host, &joined, window) {
                Ok(body) => return parse_spark(&body),
                Err(err) => {
                    warn!(host, error = %err, "price history request failed");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}

/// Pulls `{symbol, timestamp[], close[]}` out of a v7 spark response.
///
/// Timestamps are shifted by the exchange's `gmtoffset` before taking the date, so a
/// 09:30 New York bar lands on its own trading day. Null closes are skipped.
pub fn parse_spark(body: &Value) -> Result<Snapshot, ProviderError> {
    if !body["spark"]["error"].is_null() {
        let description = body["spark"]["error"]["description"]
            .as_str()
            .unwrap_or("unknown error");
        return Err(ProviderError::Unavailable(description.to_string()));
    }
    let results = body["spark"]["result"]
        .as_array()
        .ok_or_else(|| ProviderError::InvalidResponse("missing spark.result".to_string()))?;

    let mut snapshot = Snapshot::new();
    for result in results {
        let Some(symbol) = result["symbol"].as_str().and_then(|s| Symbol::parse(s).ok()) else {
            continue;
        };
        let Some(response) = result["response"].get(0) else {
            continue;
        };

        let offset = response["meta"]["gmtoffset"].as_i64().unwrap_or(0);
        let timestamps = response["timestamp"].as_array().cloned().unwrap_or_default();
        let closes = response["indicators"]["quote"][0]["close"]
            .as_array()
            .cloned()
            .unwrap_or_default();

        let points = timestamps.iter().zip(closes.iter()).filter_map(|(ts, close)| {
            let date = DateTime::from_timestamp(ts.as_i64()? + offset, 0)?.date_naive();
            Some(PricePoint { date, close: close.as_f64()? })
        });
        let series = PriceSeries::from_points(points);
        if !series.is_empty() {
            snapshot.insert(symbol, series);
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spark_body() -> Value {
        json!({
            "spark": {
                "result": [
                    {
                        "symbol": "AAPL",
                        "response": [{
                            "meta": { "gmtoffset": -14400 },
                            "timestamp": [1709562600, 1709649000, 1709735400],
                            "indicators": { "quote": [{ "close": [175.1, null, 169.12] }] }
                        }]
                    },
                    {
                        "symbol": "NOPE",
                        "response": [{
                            "meta": { "gmtoffset": -14400 },
                            "timestamp": [],
                            "indicators": { "quote": [{ "close": [] }] }
                        }]
                    }
                ],
                "error": null
            }
        })
    }

    #[test]
    fn parses_dates_in_exchange_time_and_skips_nulls() {
        let snapshot = parse_spark(&spark_body()).unwrap();
        let series = snapshot.get(&Symbol::parse("AAPL").unwrap()).unwrap();

        let dates: Vec<String> = series.iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-03-04", "2024-03-06"]);
        assert_eq!(series.last_close(), Some(169.12));
    }

    #[test]
    fn symbols_without_data_are_omitted() {
        let snapshot = parse_spark(&spark_body()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains(&Symbol::parse("NOPE").unwrap()));
    }

    #[test]
    fn provider_error_object_means_unavailable() {
        let body = json!({
            "spark": { "result": null, "error": { "code": "Too Many Requests", "description": "slow down" } }
        });
        assert!(matches!(parse_spark(&body), Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn missing_result_is_an_invalid_response() {
        let body = json!({ "finance": { "result": null } });
        assert!(matches!(parse_spark(&body), Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn window_renders_as_yahoo_range() {
        assert_eq!(HistoryWindow::default().range(), "5d");
        assert_eq!(HistoryWindow::days(30).range(), "30d");
    }
}
