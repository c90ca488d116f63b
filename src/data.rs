use crate::config::{batch_fetch_delay_ms, fetch_retry_attempts, CACHE_TTL_SECS, FETCH_BATCH_SIZE};
use crate::prices::{merge_series, PriceTable, RawSeries};
use crate::universe::{Sector, Universe};
use anyhow::Result;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Deserialize, Serialize, Debug)]
struct YahooChartResponse {
    chart: YahooChart,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooChart {
    result: Option<Vec<YahooResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooResult {
    timestamp: Option<Vec<i64>>,
    indicators: YahooIndicators,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooIndicators {
    quote: Vec<YahooQuote>,
    adjclose: Option<Vec<YahooAdjClose>>,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooQuote {
    close: Vec<Option<f64>>,
}

#[derive(Deserialize, Serialize, Debug)]
struct YahooAdjClose {
    adjclose: Vec<Option<f64>>,
}

fn date_to_unix(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

/// Extracts daily closes from a chart response, preferring the split/dividend
/// adjusted series when Yahoo provides one.
fn chart_to_series(symbol: &str, response: &YahooChartResponse) -> Result<RawSeries> {
    if let Some(err) = &response.chart.error {
        if !err.is_null() {
            return Err(anyhow::anyhow!("Yahoo returned an error for {}: {}", symbol, err));
        }
    }

    let result = response
        .chart
        .result
        .as_ref()
        .and_then(|r| r.first())
        .ok_or(anyhow::anyhow!("No chart result for {}", symbol))?;

    let timestamps = result.timestamp.as_deref().unwrap_or_default();

    let closes: &[Option<f64>] = match result.indicators.adjclose.as_ref().and_then(|a| a.first()) {
        Some(adj) => &adj.adjclose,
        None => {
            let quote = result
                .indicators
                .quote
                .first()
                .ok_or(anyhow::anyhow!("No quote result for {}", symbol))?;
            &quote.close
        }
    };

    let points = timestamps
        .iter()
        .zip(closes.iter())
        .filter_map(|(&ts, close)| {
            let date = DateTime::from_timestamp(ts, 0)?.date_naive();
            close.map(|c| (date, c))
        })
        .collect();

    Ok(RawSeries {
        symbol: symbol.to_uppercase(),
        points,
    })
}

/// Chart URL for the half-open window `[start, end)`; Yahoo treats period2
/// as exclusive.
fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?period1={}&period2={}&interval=1d&includeAdjustedClose=true",
        symbol,
        date_to_unix(start),
        date_to_unix(end)
    )
}

async fn fetch_from_api(
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    cache_path: &Path,
) -> Result<YahooChartResponse> {
    let url = chart_url(symbol, start, end);

    let max_attempts = fetch_retry_attempts();
    let client = reqwest::Client::new();
    let mut attempts = 0;

    loop {
        attempts += 1;
        match client
            .get(&url)
            .header("User-Agent", "Mozilla/5.0")
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await
        {
            Ok(resp) => match resp.error_for_status() {
                Ok(ok_resp) => match ok_resp.json::<YahooChartResponse>().await {
                    Ok(resp_json) => {
                        let file = std::fs::File::create(cache_path)?;
                        let writer = std::io::BufWriter::new(file);
                        serde_json::to_writer(writer, &resp_json)?;
                        return Ok(resp_json);
                    }
                    Err(e) => {
                        if attempts >= max_attempts {
                            return Err(e.into());
                        }
                        warn!("Failed to parse JSON for {} (attempt {}/{}): {}", symbol, attempts, max_attempts, e);
                    }
                },
                Err(e) => {
                    if attempts >= max_attempts {
                        return Err(e.into());
                    }
                    warn!("HTTP error for {} (attempt {}/{}): {}", symbol, attempts, max_attempts, e);
                }
            },
            Err(e) => {
                if attempts >= max_attempts {
                    return Err(e.into());
                }
                warn!("Failed to fetch data for {} (attempt {}/{}): {}", symbol, attempts, max_attempts, e);
            }
        }

        let backoff = (500_u64 * attempts as u64).min(3_000);
        tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
    }
}

fn cache_file_for(cache_dir: &Path, symbol: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
    cache_dir.join(format!("{}_{}_{}.json", symbol, start, end))
}

/// Daily adjusted closes for `symbol` over `[start, end)`. Responses are cached
/// as JSON under `cache_dir` and reused while younger than a day.
pub async fn fetch_history(symbol: &str, start: NaiveDate, end: NaiveDate, cache_dir: &Path) -> Result<RawSeries> {
    if !cache_dir.exists() {
        std::fs::create_dir_all(cache_dir)?;
    }

    let cache_file = cache_file_for(cache_dir, symbol, start, end);

    let response: YahooChartResponse = if cache_file.exists() {
        let metadata = std::fs::metadata(&cache_file)?;
        let modified = metadata.modified()?;
        let age = std::time::SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();

        if age.as_secs() < CACHE_TTL_SECS {
            info!("Loading {} from cache...", symbol);
            let file = std::fs::File::open(&cache_file)?;
            let reader = std::io::BufReader::new(file);
            serde_json::from_reader(reader)?
        } else {
            info!("Cache expired for {}, fetching...", symbol);
            fetch_from_api(symbol, start, end, &cache_file).await?
        }
    } else {
        info!("Cache miss for {}, fetching...", symbol);
        fetch_from_api(symbol, start, end, &cache_file).await?
    };

    let mut series = chart_to_series(symbol, &response)?;
    series.points.retain(|(date, _)| *date >= start && *date < end);
    Ok(series)
}

/// Downloads every ticker in batches and merges them on a common date axis.
/// Tickers that fail to download come back as empty columns, which the
/// cleaning step then drops.
pub async fn load_prices(symbols: &[String], start: NaiveDate, end: NaiveDate, cache_dir: &Path) -> Result<PriceTable> {
    let delay_ms = batch_fetch_delay_ms();
    let batches: Vec<&[String]> = symbols.chunks(FETCH_BATCH_SIZE).collect();
    let mut all_series = Vec::with_capacity(symbols.len());

    for (idx, batch) in batches.iter().enumerate() {
        info!("Fetching batch {}/{}: {:?}", idx + 1, batches.len(), batch);

        let handles: Vec<_> = batch
            .iter()
            .map(|symbol| {
                let symbol = symbol.trim().to_uppercase();
                let cache_dir = cache_dir.to_path_buf();
                tokio::spawn(async move {
                    let res = fetch_history(&symbol, start, end, &cache_dir).await;
                    (symbol, res)
                })
            })
            .collect();

        for handle in handles {
            let (symbol, res) = handle.await?;
            match res {
                Ok(series) => all_series.push(series),
                Err(e) => {
                    warn!("Price download failed for {}: {}", symbol, e);
                    all_series.push(RawSeries { symbol, points: Vec::new() });
                }
            }
        }

        if idx + 1 < batches.len() && delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        }
    }

    Ok(merge_series(all_series))
}

fn synthetic_profile(sector: Sector) -> (f64, f64) {
    // (annual drift, annual volatility)
    match sector {
        Sector::Technology => (0.22, 0.32),
        Sector::Energy => (0.08, 0.30),
        Sector::Consumer => (0.07, 0.16),
        Sector::Healthcare => (0.06, 0.19),
        Sector::Financials => (0.12, 0.25),
        Sector::Industrials => (0.11, 0.27),
        Sector::Etf => (0.13, 0.19),
        Sector::Alternatives => (0.25, 0.55),
    }
}

/// Seeded geometric random walks for every asset, starting at `start`.
/// Alternatives trade seven days a week and everything else on weekdays, so
/// the merged table has weekend holes to forward-fill as real data does.
pub fn synthetic_prices(universe: &Universe, start: NaiveDate, days: usize, seed: u64) -> Result<Vec<RawSeries>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dt = 1.0 / crate::config::TRADING_DAYS;
    let calendar: Vec<NaiveDate> = (0..)
        .map(|i| start + Duration::days(i))
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .take(days)
        .collect();
    let last = calendar.last().copied().unwrap_or(start);

    universe
        .assets()
        .iter()
        .map(|asset| {
            let (drift, vol) = synthetic_profile(asset.sector);
            let shock = Normal::new((drift - 0.5 * vol * vol) * dt, vol * dt.sqrt())
                .map_err(|e| anyhow::anyhow!("Invalid synthetic profile for {}: {}", asset.symbol, e))?;

            let dates: Vec<NaiveDate> = if asset.sector.is_alternative() {
                (0..)
                    .map(|i| start + Duration::days(i))
                    .take_while(|d| *d <= last)
                    .collect()
            } else {
                calendar.clone()
            };

            let mut price = 100.0;
            let points = dates
                .into_iter()
                .map(|date| {
                    let point = (date, price);
                    price *= f64::exp(shock.sample(&mut rng));
                    point
                })
                .collect();

            Ok(RawSeries {
                symbol: asset.symbol.clone(),
                points,
            })
        })
        .collect()
}
