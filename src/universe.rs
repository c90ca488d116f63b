use serde::{Deserialize, Serialize};
use std::fmt;

/// Sector classification used for aggregate weight caps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sector {
    Technology,
    Energy,
    Consumer,
    Healthcare,
    Financials,
    Industrials,
    Etf,
    Alternatives,
}

impl Sector {
    pub const ALL: [Sector; 8] = [
        Sector::Technology,
        Sector::Energy,
        Sector::Consumer,
        Sector::Healthcare,
        Sector::Financials,
        Sector::Industrials,
        Sector::Etf,
        Sector::Alternatives,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Technology => "Technology",
            Self::Energy => "Energy",
            Self::Consumer => "Consumer",
            Self::Healthcare => "Healthcare",
            Self::Financials => "Financials",
            Self::Industrials => "Industrials",
            Self::Etf => "ETF",
            Self::Alternatives => "Alternatives",
        }
    }

    /// Position in [`Sector::ALL`], used to index per-sector accumulators.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Members of the Alternatives class are capped separately by `alt_max`.
    pub fn is_alternative(self) -> bool {
        matches!(self, Self::Alternatives)
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub symbol: String,
    pub sector: Sector,
}

/// Default basket: (ticker, sector), in the order columns are laid out.
pub const DEFAULT_ASSETS: &[(&str, Sector)] = &[
    ("AAPL", Sector::Technology),
    ("MSFT", Sector::Technology),
    ("GOOGL", Sector::Technology),
    ("NVDA", Sector::Technology),
    ("XOM", Sector::Energy),
    ("CVX", Sector::Energy),
    ("KO", Sector::Consumer),
    ("PG", Sector::Consumer),
    ("JNJ", Sector::Healthcare),
    ("PFE", Sector::Healthcare),
    ("JPM", Sector::Financials),
    ("V", Sector::Financials),
    ("MA", Sector::Industrials),
    ("CAT", Sector::Industrials),
    ("GE", Sector::Industrials),
    ("SPY", Sector::Etf),
    ("QQQ", Sector::Etf),
    ("VTI", Sector::Etf),
    ("GLD", Sector::Alternatives),
    ("BTC-USD", Sector::Alternatives),
];

/// Ordered set of assets; the order defines the weight-vector layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    assets: Vec<Asset>,
}

impl Universe {
    pub fn default_basket() -> Self {
        Self::from_pairs(DEFAULT_ASSETS)
    }

    pub fn from_pairs(pairs: &[(&str, Sector)]) -> Self {
        Self {
            assets: pairs
                .iter()
                .map(|(symbol, sector)| Asset {
                    symbol: symbol.to_string(),
                    sector: *sector,
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn symbols(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.symbol.clone()).collect()
    }

    /// Sector of each asset, in universe order.
    pub fn sectors(&self) -> Vec<Sector> {
        self.assets.iter().map(|a| a.sector).collect()
    }

    /// Restricts the universe to `symbols`, keeping the order given there.
    /// Unknown symbols are ignored.
    pub fn restrict_to(&self, symbols: &[String]) -> Self {
        let assets = symbols
            .iter()
            .filter_map(|s| {
                self.assets
                    .iter()
                    .find(|a| a.symbol.eq_ignore_ascii_case(s))
                    .cloned()
            })
            .collect();
        Self { assets }
    }

    /// Sums `weights` per sector. Only sectors present in the universe appear,
    /// in first-appearance order.
    pub fn aggregate_by_sector(&self, weights: &[f64]) -> Vec<(Sector, f64)> {
        let mut out: Vec<(Sector, f64)> = Vec::new();
        for (asset, &w) in self.assets.iter().zip(weights.iter()) {
            match out.iter_mut().find(|(s, _)| *s == asset.sector) {
                Some((_, total)) => *total += w,
                None => out.push((asset.sector, w)),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_basket_layout() {
        let universe = Universe::default_basket();
        assert_eq!(universe.len(), 20);
        assert_eq!(universe.assets()[0].symbol, "AAPL");
        let alts: Vec<&str> = universe
            .assets()
            .iter()
            .filter(|a| a.sector.is_alternative())
            .map(|a| a.symbol.as_str())
            .collect();
        assert_eq!(alts, vec!["GLD", "BTC-USD"]);
    }

    #[test]
    fn test_restrict_keeps_requested_order() {
        let universe = Universe::default_basket();
        let sub = universe.restrict_to(&["GLD".to_string(), "AAPL".to_string(), "NOPE".to_string()]);
        assert_eq!(sub.symbols(), vec!["GLD".to_string(), "AAPL".to_string()]);
        assert_eq!(sub.sectors(), vec![Sector::Alternatives, Sector::Technology]);
    }

    #[test]
    fn test_aggregate_by_sector() {
        let universe = Universe::from_pairs(&[
            ("A", Sector::Technology),
            ("B", Sector::Energy),
            ("C", Sector::Technology),
        ]);
        let agg = universe.aggregate_by_sector(&[0.2, 0.3, 0.5]);
        assert_eq!(agg.len(), 2);
        assert_eq!(agg[0].0, Sector::Technology);
        assert!((agg[0].1 - 0.7).abs() < 1e-12);
        assert_eq!(agg[1], (Sector::Energy, 0.3));
    }

    #[test]
    fn test_sector_indices_are_dense() {
        for (i, sector) in Sector::ALL.iter().enumerate() {
            assert_eq!(sector.index(), i);
        }
        assert!(Sector::Alternatives.is_alternative());
        assert!(!Sector::Etf.is_alternative());
    }
}
