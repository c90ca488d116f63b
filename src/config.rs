use crate::error::FrontierError;
use crate::regime::ConstraintRegime;
use chrono::NaiveDate;
use rayon::ThreadPoolBuilder;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::{info, warn};

static RAYON_INIT: OnceLock<()> = OnceLock::new();

/// Trading days per year used for annualization.
pub const TRADING_DAYS: f64 = 252.0;
/// Random draws per constraint regime.
pub const NUM_PORTFOLIOS: usize = 10_000;
/// Rejection-sampling attempts per draw before the draw is abandoned.
pub const MAX_ATTEMPTS: usize = 1_000;
pub const DEFAULT_SEED: u64 = 33;
pub const DEFAULT_START: &str = "2019-01-01";
/// Exclusive upper bound of the price window.
pub const DEFAULT_END: &str = "2024-12-31";
/// Tickers per download request.
pub const FETCH_BATCH_SIZE: usize = 4;
/// An asset is kept only if at least this fraction of dates carry a price.
pub const MIN_COVERAGE: f64 = 0.95;
pub const DEFAULT_OUTPUT_DIR: &str = "plots";
pub const DEFAULT_CACHE_DIR: &str = ".cache";
/// Seconds a cached price response stays fresh.
pub const CACHE_TTL_SECS: u64 = 86_400;
/// Trading days generated per ticker in synthetic mode (~6 years).
pub const SYNTHETIC_DAYS: usize = 1_500;

pub fn init_cpu_parallelism() {
    RAYON_INIT.get_or_init(|| {
        let num_threads = num_cpus::get().max(1);
        match ThreadPoolBuilder::new().num_threads(num_threads).build_global() {
            Ok(_) => info!("Initialized Rayon thread pool with {} threads", num_threads),
            Err(e) => warn!(
                "Rayon thread pool already initialized or unavailable ({}). Using existing configuration.",
                e
            ),
        }
    });
}

pub fn cache_dir() -> PathBuf {
    std::env::var("SHARPE_FRONTIER_CACHE_DIR")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR))
}

pub fn batch_fetch_delay_ms() -> u64 {
    std::env::var("SHARPE_FRONTIER_BATCH_FETCH_DELAY_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|v| v.clamp(0, 5_000))
        .unwrap_or(350)
}

pub fn fetch_retry_attempts() -> usize {
    std::env::var("SHARPE_FRONTIER_RETRY_ATTEMPTS")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map(|v| v.clamp(1, 8))
        .unwrap_or(3)
}

pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, FrontierError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| FrontierError::invalid_config(field, format!("'{}' is not YYYY-MM-DD", raw.trim())))
}

/// Where prices come from for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceSource {
    Yahoo,
    Synthetic { days: usize },
}

/// Effective settings for one run, assembled from defaults and CLI flags.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub seed: u64,
    pub num_portfolios: usize,
    pub max_attempts: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub risk_free_rate: f64,
    pub output_dir: PathBuf,
    pub source: PriceSource,
    pub render_charts: bool,
    pub json_report: Option<PathBuf>,
    pub regimes: Vec<ConstraintRegime>,
}

impl RunConfig {
    pub fn with_defaults() -> Self {
        Self {
            seed: DEFAULT_SEED,
            num_portfolios: NUM_PORTFOLIOS,
            max_attempts: MAX_ATTEMPTS,
            start: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default(),
            risk_free_rate: 0.0,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            source: PriceSource::Yahoo,
            render_charts: true,
            json_report: None,
            regimes: ConstraintRegime::defaults(),
        }
    }

    pub fn validate(&self) -> Result<(), FrontierError> {
        if self.num_portfolios == 0 {
            return Err(FrontierError::invalid_config("portfolios", "must be > 0"));
        }
        if self.max_attempts == 0 {
            return Err(FrontierError::invalid_config("max_attempts", "must be > 0"));
        }
        if self.start >= self.end {
            return Err(FrontierError::invalid_config(
                "start",
                format!("start {} must precede end {}", self.start, self.end),
            ));
        }
        if !self.risk_free_rate.is_finite() {
            return Err(FrontierError::invalid_config("risk_free_rate", "must be finite"));
        }
        if self.regimes.is_empty() {
            return Err(FrontierError::invalid_config("regimes", "select at least one regime"));
        }
        for r in &self.regimes {
            ConstraintRegime::new(&r.name, r.asset_max, r.sector_max, r.alt_max)?;
        }
        if let PriceSource::Synthetic { days } = self.source {
            if days < 3 {
                return Err(FrontierError::invalid_config("synthetic_days", "need at least 3 days"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = RunConfig::with_defaults();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.start, parse_date("start", DEFAULT_START).unwrap());
        assert_eq!(cfg.end, parse_date("end", DEFAULT_END).unwrap());
        assert_eq!(cfg.seed, 33);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = RunConfig::with_defaults();
        cfg.num_portfolios = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::with_defaults();
        cfg.end = cfg.start;
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::with_defaults();
        cfg.source = PriceSource::Synthetic { days: 2 };
        assert!(cfg.validate().is_err());

        let mut cfg = RunConfig::with_defaults();
        cfg.regimes.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_caps() {
        let mut cfg = RunConfig::with_defaults();
        cfg.regimes.push(ConstraintRegime {
            name: "loose".to_string(),
            asset_max: 0.5,
            sector_max: 1.5,
            alt_max: 0.2,
        });
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("sector_max"));

        cfg.regimes.pop();
        cfg.regimes[0].alt_max = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_parse_date_reports_field() {
        let err = parse_date("end", "2024/12/31").unwrap_err();
        assert!(err.to_string().contains("end"));
    }
}
