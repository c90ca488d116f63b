use crate::config::TRADING_DAYS;
use crate::error::FrontierError;
use rayon::prelude::*;
use serde::Serialize;

/// Annualized mean returns and covariance, fixed for the rest of a run.
#[derive(Clone, Debug, Serialize)]
pub struct MomentEstimates {
    mean: Vec<f64>,
    cov: Vec<Vec<f64>>,
}

impl MomentEstimates {
    pub fn new(mean: Vec<f64>, cov: Vec<Vec<f64>>) -> Result<Self, FrontierError> {
        let n = mean.len();
        if cov.len() != n {
            return Err(FrontierError::DimensionMismatch { expected: n, actual: cov.len() });
        }
        if let Some(row) = cov.iter().find(|row| row.len() != n) {
            return Err(FrontierError::DimensionMismatch { expected: n, actual: row.len() });
        }
        Ok(Self { mean, cov })
    }

    /// Estimates moments from per-asset daily return series of equal length.
    /// Mean and sample covariance (divisor n-1) are scaled by `TRADING_DAYS`.
    pub fn from_daily_returns(returns: &[Vec<f64>]) -> Result<Self, FrontierError> {
        let n_assets = returns.len();
        if n_assets == 0 {
            return Err(FrontierError::InsufficientData("no return series".to_string()));
        }
        let n_obs = returns[0].len();
        if let Some(bad) = returns.iter().find(|r| r.len() != n_obs) {
            return Err(FrontierError::DimensionMismatch { expected: n_obs, actual: bad.len() });
        }
        if n_obs < 2 {
            return Err(FrontierError::InsufficientData(format!(
                "{} return observations; need at least 2",
                n_obs
            )));
        }

        let daily_means: Vec<f64> = returns
            .iter()
            .map(|r| r.iter().sum::<f64>() / n_obs as f64)
            .collect();

        let cov: Vec<Vec<f64>> = (0..n_assets)
            .into_par_iter()
            .map(|i| {
                (0..n_assets)
                    .map(|j| {
                        let sum: f64 = returns[i]
                            .iter()
                            .zip(returns[j].iter())
                            .map(|(a, b)| (a - daily_means[i]) * (b - daily_means[j]))
                            .sum();
                        sum / (n_obs as f64 - 1.0) * TRADING_DAYS
                    })
                    .collect()
            })
            .collect();

        let mean = daily_means.iter().map(|m| m * TRADING_DAYS).collect();
        Self::new(mean, cov)
    }

    pub fn num_assets(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn cov(&self) -> &[Vec<f64>] {
        &self.cov
    }

    /// Pearson correlation derived from the covariance. Pairs involving a
    /// zero-variance asset get 0 off the diagonal.
    pub fn correlation(&self) -> Vec<Vec<f64>> {
        let n = self.num_assets();
        let std: Vec<f64> = (0..n).map(|i| self.cov[i][i].max(0.0).sqrt()).collect();
        (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            1.0
                        } else if std[i] > 0.0 && std[j] > 0.0 {
                            (self.cov[i][j] / (std[i] * std[j])).clamp(-1.0, 1.0)
                        } else {
                            0.0
                        }
                    })
                    .collect()
            })
            .collect()
    }

    pub fn portfolio_return(&self, weights: &[f64]) -> f64 {
        weights.iter().zip(self.mean.iter()).map(|(w, r)| w * r).sum()
    }

    /// Quadratic form wᵀΣw.
    pub fn portfolio_variance(&self, weights: &[f64]) -> f64 {
        let mut var = 0.0;
        for (i, wi) in weights.iter().enumerate() {
            for (j, wj) in weights.iter().enumerate() {
                var += wi * wj * self.cov[i][j];
            }
        }
        var
    }
}
