use crate::error::FrontierError;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Daily closes for one ticker as returned by a data source, possibly unsorted
/// and with holes.
#[derive(Clone, Debug)]
pub struct RawSeries {
    pub symbol: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Ticker-indexed price table on a common date axis. `None` marks a date on
/// which the ticker has no observation.
#[derive(Clone, Debug, Default)]
pub struct PriceTable {
    pub dates: Vec<NaiveDate>,
    pub symbols: Vec<String>,
    pub columns: Vec<Vec<Option<f64>>>,
}

/// Gap-free prices after forward-fill and coverage filtering.
/// `prices[i]` is the series for `symbols[i]`, aligned with `dates`.
#[derive(Clone, Debug)]
pub struct CleanedPrices {
    pub dates: Vec<NaiveDate>,
    pub symbols: Vec<String>,
    pub prices: Vec<Vec<f64>>,
    pub dropped: Vec<String>,
}

/// Outer-joins several series on date. Duplicate dates within a series keep the
/// last value seen; duplicate symbols keep the first series.
pub fn merge_series(series: Vec<RawSeries>) -> PriceTable {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut by_symbol: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();

    for s in series {
        let symbol = s.symbol.trim().to_uppercase();
        if !seen.insert(symbol.clone()) {
            debug!("Duplicate series for {} ignored", symbol);
            continue;
        }
        let points: BTreeMap<NaiveDate, f64> = s
            .points
            .into_iter()
            .filter(|(_, p)| p.is_finite() && *p > 0.0)
            .collect();
        by_symbol.push((symbol, points));
    }

    let dates: Vec<NaiveDate> = by_symbol
        .iter()
        .flat_map(|(_, points)| points.keys().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let columns = by_symbol
        .iter()
        .map(|(_, points)| dates.iter().map(|d| points.get(d).copied()).collect())
        .collect();

    PriceTable {
        dates,
        symbols: by_symbol.into_iter().map(|(s, _)| s).collect(),
        columns,
    }
}

fn forward_fill(column: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    column
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect()
}

/// Forward-fills every column, drops tickers whose filled coverage falls below
/// `min_coverage` of the date axis, then trims leading dates until every kept
/// ticker has a price.
pub fn clean_prices(table: &PriceTable, min_coverage: f64) -> Result<CleanedPrices, FrontierError> {
    let rows = table.dates.len();
    if rows == 0 {
        return Err(FrontierError::InsufficientData("price table has no dates".to_string()));
    }

    let threshold = rows as f64 * min_coverage;
    let mut kept_symbols = Vec::new();
    let mut kept_columns = Vec::new();
    let mut dropped = Vec::new();

    for (symbol, column) in table.symbols.iter().zip(table.columns.iter()) {
        let filled = forward_fill(column);
        let present = filled.iter().filter(|v| v.is_some()).count();
        if present as f64 >= threshold {
            kept_symbols.push(symbol.clone());
            kept_columns.push(filled);
        } else {
            info!(
                "Dropping {}: {}/{} dates covered after forward-fill",
                symbol, present, rows
            );
            dropped.push(symbol.clone());
        }
    }

    if kept_symbols.is_empty() {
        return Err(FrontierError::InsufficientData(
            "every asset was dropped for missing data".to_string(),
        ));
    }

    // After forward-fill the only remaining holes are leading ones.
    let first_full = (0..rows)
        .find(|&r| kept_columns.iter().all(|c| c[r].is_some()))
        .ok_or_else(|| FrontierError::InsufficientData("no date where all assets are priced".to_string()))?;

    if rows - first_full < 2 {
        return Err(FrontierError::InsufficientData(format!(
            "only {} aligned price rows; need at least 2",
            rows - first_full
        )));
    }

    let prices = kept_columns
        .into_iter()
        .map(|c| c[first_full..].iter().map(|v| v.unwrap_or_default()).collect())
        .collect();

    Ok(CleanedPrices {
        dates: table.dates[first_full..].to_vec(),
        symbols: kept_symbols,
        prices,
        dropped,
    })
}

impl CleanedPrices {
    pub fn num_assets(&self) -> usize {
        self.symbols.len()
    }

    /// Daily fractional returns per asset; each series is one shorter than the
    /// price series.
    pub fn daily_returns(&self) -> Vec<Vec<f64>> {
        self.prices
            .iter()
            .map(|p| p.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series(symbol: &str, points: &[(u32, f64)]) -> RawSeries {
        RawSeries {
            symbol: symbol.to_string(),
            points: points.iter().map(|&(day, p)| (d(day), p)).collect(),
        }
    }

    #[test]
    fn test_merge_outer_joins_and_sorts_dates() {
        let table = merge_series(vec![
            series("aaa", &[(3, 12.0), (1, 10.0)]),
            series("BBB", &[(2, 20.0), (3, 21.0)]),
        ]);
        assert_eq!(table.dates, vec![d(1), d(2), d(3)]);
        assert_eq!(table.symbols, vec!["AAA".to_string(), "BBB".to_string()]);
        assert_eq!(table.columns[0], vec![Some(10.0), None, Some(12.0)]);
        assert_eq!(table.columns[1], vec![None, Some(20.0), Some(21.0)]);
    }

    #[test]
    fn test_merge_ignores_duplicate_symbols_and_bad_prices() {
        let table = merge_series(vec![
            series("AAA", &[(1, 10.0), (2, f64::NAN)]),
            series("AAA", &[(1, 99.0)]),
        ]);
        assert_eq!(table.symbols.len(), 1);
        assert_eq!(table.dates, vec![d(1)]);
        assert_eq!(table.columns[0], vec![Some(10.0)]);
    }

    #[test]
    fn test_clean_forward_fills_interior_gaps() {
        let table = merge_series(vec![
            series("AAA", &[(1, 10.0), (2, 11.0), (3, 12.0), (4, 13.0)]),
            series("BBB", &[(1, 5.0), (3, 6.0), (4, 7.0)]),
        ]);
        let cleaned = clean_prices(&table, 0.95).unwrap();
        assert!(cleaned.dropped.is_empty());
        assert_eq!(cleaned.prices[1], vec![5.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_clean_drops_sparse_assets() {
        let full: Vec<(u32, f64)> = (1..=20).map(|day| (day, 100.0 + day as f64)).collect();
        // Starts on day 3: 18/20 = 90% coverage after forward-fill.
        let late: Vec<(u32, f64)> = (3..=20).map(|day| (day, 50.0)).collect();
        // Starts on day 2: 19/20 = 95% coverage, kept.
        let slightly_late: Vec<(u32, f64)> = (2..=20).map(|day| (day, 70.0)).collect();
        let table = merge_series(vec![
            series("FULL", &full),
            series("LATE", &late),
            series("EDGE", &slightly_late),
        ]);
        let cleaned = clean_prices(&table, 0.95).unwrap();
        assert_eq!(cleaned.symbols, vec!["FULL".to_string(), "EDGE".to_string()]);
        assert_eq!(cleaned.dropped, vec!["LATE".to_string()]);
        // Leading row where EDGE has no price is trimmed.
        assert_eq!(cleaned.dates.first(), Some(&d(2)));
        assert_eq!(cleaned.prices[0].len(), 19);
    }

    #[test]
    fn test_clean_fails_when_everything_dropped() {
        let table = PriceTable {
            dates: vec![d(1), d(2)],
            symbols: vec!["AAA".to_string()],
            columns: vec![vec![None, None]],
        };
        assert!(matches!(
            clean_prices(&table, 0.95),
            Err(FrontierError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_daily_returns_are_fractional() {
        let table = merge_series(vec![series("AAA", &[(1, 100.0), (2, 110.0), (3, 99.0)])]);
        let cleaned = clean_prices(&table, 0.95).unwrap();
        let returns = cleaned.daily_returns();
        assert_eq!(returns[0].len(), 2);
        assert!((returns[0][0] - 0.10).abs() < 1e-12);
        assert!((returns[0][1] + 0.10).abs() < 1e-12);
    }
}
