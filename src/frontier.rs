use crate::error::FrontierError;
use crate::sampler::{PortfolioSample, RegimeResults};
use crate::universe::{Sector, Universe};

/// Index of the highest Sharpe ratio; ties go to the earliest sample. NaN
/// ratios never win.
pub fn max_sharpe_index(samples: &[PortfolioSample]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, s) in samples.iter().enumerate() {
        if s.sharpe_ratio.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if !(s.sharpe_ratio > top) => {}
            _ => best = Some((i, s.sharpe_ratio)),
        }
    }
    best.map(|(i, _)| i)
}

/// Max-Sharpe sample for a named regime.
pub fn select_optimal<'a>(results: &'a RegimeResults, regime: &str) -> Result<&'a PortfolioSample, FrontierError> {
    results.get(regime)?.optimal()
}

/// Sector totals of a weight vector, largest first. Sectors with no exposure
/// are left out.
pub fn sector_allocation(universe: &Universe, weights: &[f64]) -> Vec<(Sector, f64)> {
    let mut alloc: Vec<(Sector, f64)> = universe
        .aggregate_by_sector(weights)
        .into_iter()
        .filter(|(_, w)| *w > 0.0)
        .collect();
    alloc.sort_by(|a, b| b.1.total_cmp(&a.1));
    alloc
}

/// Optimal weights of every regime, one row per regime in simulation order.
/// Fails on the first regime without a feasible portfolio.
pub fn optimal_weights_table(results: &RegimeResults) -> Result<Vec<(String, Vec<f64>)>, FrontierError> {
    results
        .iter()
        .map(|r| Ok((r.regime.name.clone(), r.optimal()?.weights.clone())))
        .collect()
}

/// Upper envelope of the (volatility, return) cloud: walking from low to high
/// volatility, keeps each sample whose return beats every less risky one.
pub fn efficient_frontier(samples: &[PortfolioSample]) -> Vec<(f64, f64)> {
    let mut points: Vec<(f64, f64)> = samples
        .iter()
        .filter(|s| s.volatility.is_finite() && s.expected_return.is_finite())
        .map(|s| (s.volatility, s.expected_return))
        .collect();
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(b.1.total_cmp(&a.1)));

    let mut frontier = Vec::new();
    let mut best_return = f64::NEG_INFINITY;
    for (vol, ret) in points {
        if ret > best_return {
            best_return = ret;
            frontier.push((vol, ret));
        }
    }
    frontier
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::ConstraintRegime;
    use crate::sampler::Simulator;
    use crate::stats::MomentEstimates;

    fn sample(ret: f64, vol: f64, sharpe: f64) -> PortfolioSample {
        PortfolioSample {
            weights: vec![1.0],
            expected_return: ret,
            volatility: vol,
            sharpe_ratio: sharpe,
        }
    }

    #[test]
    fn test_max_sharpe_picks_strict_maximum() {
        let samples = vec![sample(0.1, 0.2, 0.5), sample(0.2, 0.2, 1.0), sample(0.1, 0.5, 0.2)];
        assert_eq!(max_sharpe_index(&samples), Some(1));
    }

    #[test]
    fn test_max_sharpe_ties_keep_first() {
        let samples = vec![sample(0.1, 0.2, 0.3), sample(0.2, 0.2, 0.9), sample(0.3, 0.3, 0.9)];
        assert_eq!(max_sharpe_index(&samples), Some(1));
    }

    #[test]
    fn test_max_sharpe_empty_is_none() {
        assert_eq!(max_sharpe_index(&[]), None);
    }

    #[test]
    fn test_max_sharpe_skips_leading_nan() {
        let samples = vec![sample(0.1, 0.2, f64::NAN), sample(0.1, 0.2, -0.4)];
        assert_eq!(max_sharpe_index(&samples), Some(1));
    }

    #[test]
    fn test_sector_allocation_sorted_and_sparse() {
        let universe = Universe::from_pairs(&[
            ("A", Sector::Technology),
            ("B", Sector::Energy),
            ("C", Sector::Technology),
            ("D", Sector::Alternatives),
        ]);
        let alloc = sector_allocation(&universe, &[0.1, 0.6, 0.3, 0.0]);
        assert_eq!(alloc.len(), 2);
        assert_eq!(alloc[0].0, Sector::Energy);
        assert_eq!(alloc[1].0, Sector::Technology);
        assert!((alloc[1].1 - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_efficient_frontier_is_monotone() {
        let samples = vec![
            sample(0.05, 0.10, 0.5),
            sample(0.04, 0.12, 0.3),
            sample(0.08, 0.15, 0.5),
            sample(0.07, 0.20, 0.35),
            sample(0.12, 0.25, 0.48),
        ];
        let frontier = efficient_frontier(&samples);
        assert_eq!(frontier, vec![(0.10, 0.05), (0.15, 0.08), (0.25, 0.12)]);
    }

    #[test]
    fn test_optimal_weights_table_follows_regime_order() {
        let moments = MomentEstimates::new(
            vec![0.10, 0.05, 0.20],
            vec![
                vec![0.04, 0.0, 0.0],
                vec![0.0, 0.01, 0.0],
                vec![0.0, 0.0, 0.09],
            ],
        )
        .unwrap();
        let sectors = vec![Sector::Technology, Sector::Energy, Sector::Etf];
        let regimes = vec![
            ConstraintRegime::new("loose", 1.0, 1.0, 1.0).unwrap(),
            ConstraintRegime::new("capped", 0.5, 0.5, 1.0).unwrap(),
        ];
        let results = Simulator::new(11, 100, 1000).run_all(&regimes, &moments, &sectors).unwrap();
        let table = optimal_weights_table(&results).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table[0].0, "loose");
        assert_eq!(table[1].0, "capped");
        assert!(table[1].1.iter().all(|&w| w <= 0.5));

        let best = select_optimal(&results, "loose").unwrap();
        let all = &results.get("loose").unwrap().samples;
        assert!(all.iter().all(|s| s.sharpe_ratio <= best.sharpe_ratio));
    }
}
