use crate::error::FrontierError;
use crate::frontier;
use crate::regime::ConstraintRegime;
use crate::stats::MomentEstimates;
use crate::universe::Sector;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;
use tracing::{debug, info, warn};

/// An accepted weight vector with its risk/return figures.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PortfolioSample {
    pub weights: Vec<f64>,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
}

impl PortfolioSample {
    /// Scores `weights` against `moments`. Sharpe is
    /// `(expected_return - risk_free_rate) / volatility`, and 0 when the
    /// volatility is exactly zero.
    pub fn evaluate(weights: Vec<f64>, moments: &MomentEstimates, risk_free_rate: f64) -> Self {
        let expected_return = moments.portfolio_return(&weights);
        // Rounding can push a PSD quadratic form a hair below zero. NaN passes
        // through so the selector can skip it.
        let variance = moments.portfolio_variance(&weights);
        let volatility = if variance < 0.0 { 0.0 } else { variance.sqrt() };
        let sharpe_ratio = if volatility == 0.0 {
            0.0
        } else {
            (expected_return - risk_free_rate) / volatility
        };
        Self {
            weights,
            expected_return,
            volatility,
            sharpe_ratio,
        }
    }
}

/// Accepted samples for one regime, in generation order.
#[derive(Clone, Debug, Serialize)]
pub struct SimulationResult {
    pub regime: ConstraintRegime,
    pub samples: Vec<PortfolioSample>,
    /// Draws requested for this regime.
    pub draws: usize,
    /// Draws abandoned after exhausting the attempt budget.
    pub skipped_draws: usize,
    optimal_index: Option<usize>,
}

impl SimulationResult {
    pub fn new(regime: ConstraintRegime, samples: Vec<PortfolioSample>, draws: usize, skipped_draws: usize) -> Self {
        let optimal_index = frontier::max_sharpe_index(&samples);
        Self {
            regime,
            samples,
            draws,
            skipped_draws,
            optimal_index,
        }
    }

    pub fn accepted(&self) -> usize {
        self.samples.len()
    }

    pub fn optimal_index(&self) -> Result<usize, FrontierError> {
        self.optimal_index.ok_or_else(|| FrontierError::NoFeasiblePortfolio {
            regime: self.regime.name.clone(),
        })
    }

    /// The max-Sharpe sample; an error when no draw was accepted.
    pub fn optimal(&self) -> Result<&PortfolioSample, FrontierError> {
        Ok(&self.samples[self.optimal_index()?])
    }
}

/// Regime name → result, in the order the regimes were simulated. Built once
/// by [`Simulator::run_all`] and read-only afterwards.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RegimeResults {
    entries: Vec<SimulationResult>,
}

impl RegimeResults {
    pub fn get(&self, regime: &str) -> Result<&SimulationResult, FrontierError> {
        self.entries
            .iter()
            .find(|r| r.regime.name == regime)
            .ok_or_else(|| FrontierError::UnknownRegime(regime.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimulationResult> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn regime_names(&self) -> Vec<&str> {
        self.entries.iter().map(|r| r.regime.name.as_str()).collect()
    }
}

/// Constrained Monte Carlo sampler. One seeded generator feeds every regime,
/// draw and retry in sequence, so a given seed reproduces the whole run.
pub struct Simulator {
    rng: StdRng,
    unit: Uniform<f64>,
    num_portfolios: usize,
    max_attempts: usize,
    risk_free_rate: f64,
}

impl Simulator {
    pub fn new(seed: u64, num_portfolios: usize, max_attempts: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            unit: Uniform::new(0.0, 1.0),
            num_portfolios,
            max_attempts,
            risk_free_rate: 0.0,
        }
    }

    pub fn with_risk_free_rate(mut self, rate: f64) -> Self {
        self.risk_free_rate = rate;
        self
    }

    /// `n` uniforms in [0, 1) normalized to sum to one. `None` only if every
    /// uniform came out zero.
    pub fn draw_weights(&mut self, n: usize) -> Option<Vec<f64>> {
        let mut weights: Vec<f64> = (0..n).map(|_| self.unit.sample(&mut self.rng)).collect();
        let sum: f64 = weights.iter().sum();
        if !(sum > 0.0) {
            return None;
        }
        weights.iter_mut().for_each(|w| *w /= sum);
        Some(weights)
    }

    /// Rejection-samples until `regime` is satisfied or the attempt budget
    /// runs out.
    pub fn draw_constrained(&mut self, regime: &ConstraintRegime, sectors: &[Sector]) -> Option<Vec<f64>> {
        for _ in 0..self.max_attempts {
            let Some(weights) = self.draw_weights(sectors.len()) else {
                continue;
            };
            if regime.is_satisfied_by(&weights, sectors) {
                return Some(weights);
            }
        }
        None
    }

    pub fn run_regime(
        &mut self,
        regime: &ConstraintRegime,
        moments: &MomentEstimates,
        sectors: &[Sector],
    ) -> SimulationResult {
        let mut samples = Vec::with_capacity(self.num_portfolios);
        let mut skipped = 0usize;

        for _ in 0..self.num_portfolios {
            match self.draw_constrained(regime, sectors) {
                Some(weights) => samples.push(PortfolioSample::evaluate(weights, moments, self.risk_free_rate)),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(
                "Regime {}: {} of {} draws exhausted {} attempts",
                regime.name, skipped, self.num_portfolios, self.max_attempts
            );
        }

        let result = SimulationResult::new(regime.clone(), samples, self.num_portfolios, skipped);
        match result.optimal() {
            Ok(best) => info!(
                "Regime {}: accepted {}/{} (skipped {}), max Sharpe {:.3} at E[r]={:.4}, σ={:.4}",
                regime.name,
                result.accepted(),
                self.num_portfolios,
                skipped,
                best.sharpe_ratio,
                best.expected_return,
                best.volatility
            ),
            Err(_) => warn!(
                "Regime {}: no draw satisfied the constraints within {} attempts",
                regime.name, self.max_attempts
            ),
        }
        result
    }

    /// Simulates every regime in order.
    pub fn run_all(
        &mut self,
        regimes: &[ConstraintRegime],
        moments: &MomentEstimates,
        sectors: &[Sector],
    ) -> Result<RegimeResults, FrontierError> {
        if moments.num_assets() != sectors.len() {
            return Err(FrontierError::DimensionMismatch {
                expected: moments.num_assets(),
                actual: sectors.len(),
            });
        }

        info!(
            "Simulating {} regimes x {} portfolios over {} assets",
            regimes.len(),
            self.num_portfolios,
            sectors.len()
        );

        let entries = regimes
            .iter()
            .map(|regime| self.run_regime(regime, moments, sectors))
            .collect();
        Ok(RegimeResults { entries })
    }
}
