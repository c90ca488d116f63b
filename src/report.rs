use crate::frontier::sector_allocation;
use crate::sampler::RegimeResults;
use crate::stats::MomentEstimates;
use crate::universe::{Sector, Universe};
use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Weights below this are left out of the printed allocation.
const DUST_WEIGHT: f64 = 0.001;

#[derive(Debug, Serialize)]
pub struct AssetReport {
    pub symbol: String,
    pub sector: Sector,
    pub annual_return: f64,
    pub annual_vol: f64,
}

#[derive(Debug, Serialize)]
pub struct RegimeReport {
    pub regime: String,
    pub asset_max: f64,
    pub sector_max: f64,
    pub alt_max: f64,
    pub draws: usize,
    pub accepted: usize,
    pub skipped_draws: usize,
    pub expected_return: Option<f64>,
    pub volatility: Option<f64>,
    pub sharpe_ratio: Option<f64>,
    pub weights: Vec<(String, f64)>,
    pub sector_weights: Vec<(Sector, f64)>,
}

/// Machine-readable summary of one run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub seed: u64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub observations: usize,
    pub dropped_assets: Vec<String>,
    pub assets: Vec<AssetReport>,
    pub regimes: Vec<RegimeReport>,
}

impl RunReport {
    pub fn build(
        seed: u64,
        (start, end): (NaiveDate, NaiveDate),
        observations: usize,
        dropped_assets: Vec<String>,
        universe: &Universe,
        moments: &MomentEstimates,
        results: &RegimeResults,
    ) -> Self {
        let assets = universe
            .assets()
            .iter()
            .enumerate()
            .map(|(i, a)| AssetReport {
                symbol: a.symbol.clone(),
                sector: a.sector,
                annual_return: moments.mean()[i],
                annual_vol: moments.cov()[i][i].max(0.0).sqrt(),
            })
            .collect();

        let regimes = results
            .iter()
            .map(|r| {
                let best = r.optimal().ok();
                RegimeReport {
                    regime: r.regime.name.clone(),
                    asset_max: r.regime.asset_max,
                    sector_max: r.regime.sector_max,
                    alt_max: r.regime.alt_max,
                    draws: r.draws,
                    accepted: r.accepted(),
                    skipped_draws: r.skipped_draws,
                    expected_return: best.map(|b| b.expected_return),
                    volatility: best.map(|b| b.volatility),
                    sharpe_ratio: best.map(|b| b.sharpe_ratio),
                    weights: best
                        .map(|b| universe.symbols().into_iter().zip(b.weights.iter().copied()).collect())
                        .unwrap_or_default(),
                    sector_weights: best
                        .map(|b| sector_allocation(universe, &b.weights))
                        .unwrap_or_default(),
                }
            })
            .collect();

        Self {
            seed,
            start,
            end,
            observations,
            dropped_assets,
            assets,
            regimes,
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        info!("Wrote report {}", path.display());
        Ok(())
    }
}

/// Pretty-prints the per-regime optimal portfolios to stdout.
pub fn print_summary(report: &RunReport) {
    println!("\n╔════════════════════════════════════════════════════════════╗");
    println!("║           Max-Sharpe Portfolios by Constraint Regime       ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!(
        "║  Window {} → {}  ({} daily returns, seed {})",
        report.start, report.end, report.observations, report.seed
    );
    if !report.dropped_assets.is_empty() {
        println!("║  Dropped for missing data: {}", report.dropped_assets.join(", "));
    }

    for r in &report.regimes {
        println!("╠════════════════════════════════════════════════════════════╣");
        println!(
            "║  {:<14} caps: asset {:.2} / sector {:.2} / alt {:.2}",
            r.regime, r.asset_max, r.sector_max, r.alt_max
        );
        println!(
            "║  Accepted {:>6} of {:>6} draws  (skipped {})",
            r.accepted, r.draws, r.skipped_draws
        );

        let (Some(ret), Some(vol), Some(sharpe)) = (r.expected_return, r.volatility, r.sharpe_ratio) else {
            println!("║  No feasible portfolio under these constraints.");
            continue;
        };

        println!("║  Expected Annual Return : {:>+7.2}%", ret * 100.0);
        println!("║  Expected Annual Vol    : {:>7.2}%", vol * 100.0);
        println!("║  Sharpe Ratio           : {:>7.2}", sharpe);

        let mut sorted: Vec<&(String, f64)> = r.weights.iter().filter(|(_, w)| *w > DUST_WEIGHT).collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
        for (sym, w) in sorted {
            println!("║    {:<8} {:>6.2}%", sym, w * 100.0);
        }

        let sectors = r
            .sector_weights
            .iter()
            .map(|(s, w)| format!("{} {:.1}%", s, w * 100.0))
            .collect::<Vec<_>>()
            .join(", ");
        println!("║  Sectors: {}", sectors);
    }

    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
    println!("⚠  Historical simulation only. Not financial advice.");
}
