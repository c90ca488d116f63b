mod config;
mod data;
mod error;
mod frontier;
mod pipeline;
mod prices;
mod regime;
mod render;
mod report;
mod sampler;
mod stats;
mod universe;

use clap::Parser;
use config::{PriceSource, RunConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Sharpe-Frontier: Monte Carlo max-Sharpe portfolios under allocation constraints",
    after_help = "EXAMPLES:
    # Full run on Yahoo Finance history with default settings
    cargo run --release

    # Offline run on seeded synthetic prices
    cargo run --release -- --synthetic --portfolios 2000

    # Only the constrained regimes, with a JSON report and no charts
    cargo run --release -- --regimes conservative,aggressive --no-charts --json report.json

    # Custom window and risk-free rate
    cargo run --release -- --start 2020-01-01 --end 2023-12-31 --risk-free-rate 0.04"
)]
struct Args {
    /// Seed for the portfolio sampler (and synthetic prices)
    #[arg(long, default_value_t = config::DEFAULT_SEED)]
    seed: u64,

    /// Number of portfolio draws per regime
    #[arg(long, default_value_t = config::NUM_PORTFOLIOS)]
    portfolios: usize,

    /// Rejection attempts per draw before it is skipped
    #[arg(long, default_value_t = config::MAX_ATTEMPTS)]
    max_attempts: usize,

    /// First day of price history (YYYY-MM-DD)
    #[arg(long, default_value = config::DEFAULT_START)]
    start: String,

    /// End of price history, exclusive (YYYY-MM-DD)
    #[arg(long, default_value = config::DEFAULT_END)]
    end: String,

    /// Directory for the HTML charts
    #[arg(long, default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Annual risk-free rate subtracted in the Sharpe ratio
    #[arg(long, default_value_t = 0.0)]
    risk_free_rate: f64,

    /// Comma-separated regimes to simulate, in order
    #[arg(long, default_value = "unconstrained,conservative,aggressive")]
    regimes: String,

    /// Use seeded synthetic prices instead of downloading from Yahoo Finance
    #[arg(long)]
    synthetic: bool,

    /// Trading days of synthetic history. Ignored unless --synthetic is set.
    #[arg(long, default_value_t = config::SYNTHETIC_DAYS)]
    synthetic_days: usize,

    /// Skip chart rendering
    #[arg(long)]
    no_charts: bool,

    /// Also write a JSON report to this path
    #[arg(long)]
    json: Option<PathBuf>,
}

impl Args {
    fn into_run_config(self) -> anyhow::Result<RunConfig> {
        let mut cfg = RunConfig::with_defaults();
        cfg.seed = self.seed;
        cfg.num_portfolios = self.portfolios;
        cfg.max_attempts = self.max_attempts;
        cfg.start = config::parse_date("start", &self.start)?;
        cfg.end = config::parse_date("end", &self.end)?;
        cfg.risk_free_rate = self.risk_free_rate;
        cfg.output_dir = self.output_dir;
        if self.synthetic {
            cfg.source = PriceSource::Synthetic { days: self.synthetic_days };
        }
        cfg.render_charts = !self.no_charts;
        cfg.json_report = self.json;
        cfg.regimes = regime::select_regimes(&self.regimes)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    config::init_cpu_parallelism();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sharpe_frontier=info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cfg = match Args::parse().into_run_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Invalid arguments: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match pipeline::run(&cfg).await {
        Ok(outcome) => {
            for path in &outcome.charts {
                info!("Chart: {}", path.display());
            }
            info!("Run completed: {} regimes reported.", outcome.report.regimes.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
