use crate::config::{self, PriceSource, RunConfig, MIN_COVERAGE};
use crate::data;
use crate::error::FrontierError;
use crate::frontier;
use crate::prices::{clean_prices, merge_series, PriceTable};
use crate::render;
use crate::report::{self, RunReport};
use crate::sampler::Simulator;
use crate::stats::MomentEstimates;
use crate::universe::Universe;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub charts: Vec<PathBuf>,
}

async fn load_table(config: &RunConfig, universe: &Universe) -> Result<PriceTable> {
    match config.source {
        PriceSource::Yahoo => {
            let cache_dir = config::cache_dir();
            info!(
                "Loading {} tickers from Yahoo Finance ({} → {}), cache {}",
                universe.len(),
                config.start,
                config.end,
                cache_dir.display()
            );
            data::load_prices(&universe.symbols(), config.start, config.end, &cache_dir).await
        }
        PriceSource::Synthetic { days } => {
            info!("Generating {} days of synthetic prices (seed {})", days, config.seed);
            let series = data::synthetic_prices(universe, config.start, days, config.seed)?;
            Ok(merge_series(series))
        }
    }
}

/// Runs the default basket end to end.
pub async fn run(config: &RunConfig) -> Result<RunOutcome> {
    run_with_universe(config, &Universe::default_basket()).await
}

/// Loads prices, estimates moments, simulates every configured regime, then
/// reports and renders. Fails if any regime ends without a feasible portfolio.
pub async fn run_with_universe(config: &RunConfig, universe: &Universe) -> Result<RunOutcome> {
    config.validate()?;

    let table = load_table(config, universe).await?;
    let cleaned = clean_prices(&table, MIN_COVERAGE).context("Cleaning price history")?;
    if !cleaned.dropped.is_empty() {
        warn!("Dropped for insufficient data: {}", cleaned.dropped.join(", "));
    }

    let universe = universe.restrict_to(&cleaned.symbols);
    if universe.len() != cleaned.num_assets() {
        return Err(FrontierError::DimensionMismatch {
            expected: cleaned.num_assets(),
            actual: universe.len(),
        }
        .into());
    }
    let returns = cleaned.daily_returns();
    let moments = MomentEstimates::from_daily_returns(&returns)?;
    let observations = returns.first().map(Vec::len).unwrap_or_default();
    info!(
        "Estimated moments for {} assets over {} daily returns",
        universe.len(),
        observations
    );

    let mut simulator = Simulator::new(config.seed, config.num_portfolios, config.max_attempts)
        .with_risk_free_rate(config.risk_free_rate);
    let results = simulator.run_all(&config.regimes, &moments, &universe.sectors())?;
    info!("Simulated {} regimes", results.len());

    let window = match (cleaned.dates.first(), cleaned.dates.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => (config.start, config.end),
    };
    let report = RunReport::build(
        config.seed,
        window,
        observations,
        cleaned.dropped.clone(),
        &universe,
        &moments,
        &results,
    );
    report::print_summary(&report);
    if let Some(path) = &config.json_report {
        report.write_json(path)?;
    }

    for name in results.regime_names() {
        frontier::select_optimal(&results, name)?;
    }

    let charts = if config.render_charts {
        render::render_all(&config.output_dir, &universe, &moments.correlation(), &results)?
    } else {
        Vec::new()
    };

    Ok(RunOutcome { report, charts })
}
