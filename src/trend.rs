//! Turns the refresh table into what the screen shows: one row per symbol and one
//! percent-change line per symbol.

use crate::models::{PriceSeries, Snapshot, Symbol, Watchlist};
use chrono::{Datelike, NaiveDate};

#[derive(Clone, Debug, PartialEq)]
pub struct PriceRow {
    pub symbol: Symbol,
    /// Last close, `None` when there is nothing to show for the symbol.
    pub price: Option<f64>,
}

impl PriceRow {
    pub fn text(&self) -> String {
        match self.price {
            Some(price) => format!("{} - ${:.2}", self.symbol, price),
            None => format!("{} - no data", self.symbol),
        }
    }
}

/// Rows in watchlist order. Symbols missing from the table get a no-data row.
pub fn price_rows(watchlist: &Watchlist, table: &Snapshot) -> Vec<PriceRow> {
    watchlist
        .iter()
        .map(|symbol| PriceRow {
            symbol: symbol.clone(),
            price: table.get(symbol).and_then(PriceSeries::last_close),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrendLine {
    pub symbol: Symbol,
    /// `(day number, % change since the first close)`.
    pub points: Vec<(f64, f64)>,
}

/// Day number used on the chart's x axis.
pub fn day_number(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

/// `(close - first) / first * 100` for every point. Needs at least two points and a
/// non-zero first close.
pub fn percent_change(series: &PriceSeries) -> Option<Vec<(f64, f64)>> {
    if series.len() < 2 {
        return None;
    }
    let base = series.first()?.close;
    if base == 0.0 {
        return None;
    }
    Some(
        series
            .iter()
            .map(|p| (day_number(p.date), (p.close - base) / base * 100.0))
            .collect(),
    )
}

pub fn trend_lines(watchlist: &Watchlist, table: &Snapshot) -> Vec<TrendLine> {
    watchlist
        .iter()
        .filter_map(|symbol| {
            let points = percent_change(table.get(symbol)?)?;
            Some(TrendLine {
                symbol: symbol.clone(),
                points,
            })
        })
        .collect()
}

/// `([x_min, x_max], [y_min, y_max])` covering every line and the zero baseline,
/// padded so lines don't sit on the border.
pub fn chart_bounds(lines: &[TrendLine]) -> ([f64; 2], [f64; 2]) {
    let mut x = [f64::INFINITY, f64::NEG_INFINITY];
    let mut y = [0.0_f64, 0.0_f64];
    for &(px, py) in lines.iter().flat_map(|l| l.points.iter()) {
        x = [x[0].min(px), x[1].max(px)];
        y = [y[0].min(py), y[1].max(py)];
    }
    if !x[0].is_finite() {
        x = [0.0, 1.0];
    }
    let pad = ((y[1] - y[0]) * 0.1).max(0.5);
    (x, [y[0] - pad, y[1] + pad])
}
