use crate::error::ModelError;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
const MAX_SYMBOL_LEN: usize = 12;

/// Ticker symbol as Yahoo spells it, e.g. `AAPL`, `BRK-B`, `2330.TW`, `USDTWD=X`, `^GSPC`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(String);

impl Symbol {
    /// Trims and uppercases user input. Rejects anything Yahoo would never accept.
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let symbol = raw.trim().to_ascii_uppercase();
        let valid = !symbol.is_empty()
            && symbol.len() <= MAX_SYMBOL_LEN
            && symbol
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '=' | '^'));
        if valid {
            Ok(Symbol(symbol))
        } else {
            Err(ModelError::InvalidSymbol(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes for one symbol, ascending by date, one point per date.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Normalizes provider data: sorts by date and keeps the last point seen for a date.
    pub fn from_points(points: impl IntoIterator<Item = PricePoint>) -> Self {
        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for p in points {
            by_date.insert(p.date, p.close);
        }
        Self {
            points: by_date
                .into_iter()
                .map(|(date, close)| PricePoint { date, close })
                .collect(),
        }
    }

    /// Strict column builder for stored data. Anything malformed is an error, not a repair.
    pub fn try_from_columns(dates: &[String], closes: &[f64]) -> Result<Self, ModelError> {
        if dates.len() != closes.len() {
            return Err(ModelError::ColumnMismatch {
                dates: dates.len(),
                closes: closes.len(),
            });
        }

        let mut seen = HashSet::new();
        let mut points = Vec::with_capacity(dates.len());
        for (raw, &close) in dates.iter().zip(closes) {
            let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|_| ModelError::InvalidDate(raw.clone()))?;
            if !seen.insert(date) {
                return Err(ModelError::DuplicateDate(raw.clone()));
            }
            points.push(PricePoint { date, close });
        }
        points.sort_by_key(|p| p.date);

        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&PricePoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.last().map(|p| p.close)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PricePoint> {
        self.points.iter()
    }

    /// Column form used by the cache file: (`Date`, `Close`).
    pub fn to_columns(&self) -> (Vec<String>, Vec<f64>) {
        self.points
            .iter()
            .map(|p| (p.date.format(DATE_FORMAT).to_string(), p.close))
            .unzip()
    }
}

/// Per-symbol price series persisted and served together.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    series: BTreeMap<Symbol, PriceSeries>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: Symbol, series: PriceSeries) {
        self.series.insert(symbol, series);
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.series.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &PriceSeries)> {
        self.series.iter()
    }

    pub fn retain_non_empty(&mut self) {
        self.series.retain(|_, s| !s.is_empty());
    }

    /// Overlays `other` onto this snapshot; entries missing from `other` are kept.
    pub fn merge_from(&mut self, other: &Snapshot) {
        for (symbol, series) in other.iter() {
            self.series.insert(symbol.clone(), series.clone());
        }
    }
}

impl FromIterator<(Symbol, PriceSeries)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (Symbol, PriceSeries)>>(iter: I) -> Self {
        Self {
            series: iter.into_iter().collect(),
        }
    }
}

/// Tracked symbols in display order. Grows only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Watchlist {
    symbols: Vec<Symbol>,
}

impl Watchlist {
    pub fn from_symbols(symbols: impl IntoIterator<Item = Symbol>) -> Self {
        let mut seen = HashSet::new();
        let symbols = symbols
            .into_iter()
            .filter(|s| seen.insert(s.clone()))
            .collect();
        Self { symbols }
    }

    /// Returns false if the symbol was already tracked.
    pub fn add(&mut self, symbol: Symbol) -> bool {
        if self.contains(&symbol) {
            return false;
        }
        self.symbols.push(symbol);
        true
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.symbols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn symbol_parse_normalizes_case_and_whitespace() {
        assert_eq!(Symbol::parse("  nflx ").unwrap().as_str(), "NFLX");
        assert_eq!(Symbol::parse("brk-b").unwrap().as_str(), "BRK-B");
        assert_eq!(Symbol::parse("usdtwd=x").unwrap().as_str(), "USDTWD=X");
    }

    #[test]
    fn symbol_parse_rejects_garbage() {
        assert!(Symbol::parse("").is_err());
        assert!(Symbol::parse("   ").is_err());
        assert!(Symbol::parse("AA PL").is_err());
        assert!(Symbol::parse("AAPL;rm").is_err());
        assert!(Symbol::parse("ABCDEFGHIJKLM").is_err());
        assert!(Symbol::parse("ß").is_err());
        assert!(Symbol::parse("ﬀ").is_err());
    }

    #[test]
    fn from_points_sorts_and_keeps_last_duplicate() {
        let series = PriceSeries::from_points(vec![
            PricePoint { date: date("2024-03-05"), close: 3.0 },
            PricePoint { date: date("2024-03-04"), close: 1.0 },
            PricePoint { date: date("2024-03-05"), close: 4.0 },
        ]);
        let closes: Vec<f64> = series.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![1.0, 4.0]);
        assert_eq!(series.last_close(), Some(4.0));
    }

    #[test]
    fn try_from_columns_rejects_malformed_columns() {
        let dates = vec!["2024-03-04".to_string(), "2024-03-04".to_string()];
        assert_eq!(
            PriceSeries::try_from_columns(&dates, &[1.0, 2.0]),
            Err(ModelError::DuplicateDate("2024-03-04".to_string()))
        );
        assert!(matches!(
            PriceSeries::try_from_columns(&dates[..1], &[1.0, 2.0]),
            Err(ModelError::ColumnMismatch { dates: 1, closes: 2 })
        ));
        assert!(matches!(
            PriceSeries::try_from_columns(&["03/04/2024".to_string()], &[1.0]),
            Err(ModelError::InvalidDate(_))
        ));
    }

    #[test]
    fn columns_survive_the_trip_through_strings() {
        let series = PriceSeries::from_points(vec![
            PricePoint { date: date("2024-03-04"), close: 170.12 },
            PricePoint { date: date("2024-03-05"), close: 171.5 },
        ]);
        let (dates, closes) = series.to_columns();
        assert_eq!(dates, vec!["2024-03-04", "2024-03-05"]);
        assert_eq!(PriceSeries::try_from_columns(&dates, &closes).unwrap(), series);
    }

    #[test]
    fn merge_keeps_entries_missing_from_the_update() {
        let aapl = Symbol::parse("AAPL").unwrap();
        let msft = Symbol::parse("MSFT").unwrap();
        let one = PriceSeries::from_points(vec![PricePoint { date: date("2024-03-04"), close: 1.0 }]);
        let two = PriceSeries::from_points(vec![PricePoint { date: date("2024-03-05"), close: 2.0 }]);

        let mut table: Snapshot = vec![(aapl.clone(), one.clone()), (msft.clone(), one.clone())]
            .into_iter()
            .collect();
        let update: Snapshot = vec![(aapl.clone(), two.clone())].into_iter().collect();
        table.merge_from(&update);

        assert_eq!(table.get(&aapl), Some(&two));
        assert_eq!(table.get(&msft), Some(&one));
    }

    #[test]
    fn watchlist_dedups_and_preserves_order() {
        let symbols = ["TSLA", "AAPL", "TSLA", "MSFT"]
            .iter()
            .map(|s| Symbol::parse(s).unwrap());
        let mut watchlist = Watchlist::from_symbols(symbols);
        let names: Vec<&str> = watchlist.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["TSLA", "AAPL", "MSFT"]);

        assert!(!watchlist.add(Symbol::parse("aapl").unwrap()));
        assert!(watchlist.add(Symbol::parse("NFLX").unwrap()));
        assert_eq!(watchlist.as_slice().last().unwrap().as_str(), "NFLX");
    }
}
