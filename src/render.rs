use crate::frontier::{efficient_frontier, optimal_weights_table, sector_allocation};
use crate::sampler::RegimeResults;
use crate::universe::Universe;
use anyhow::Result;
use plotly::common::{Font, Line, Marker, Mode, Orientation};
use plotly::layout::{Axis, BarMode};
use plotly::{Bar, HeatMap, Layout, Pie, Plot, Scatter};
use std::path::{Path, PathBuf};
use tracing::info;

pub const HEATMAP_FILE: &str = "asset_correlation_heatmap.html";
pub const FRONTIER_FILE: &str = "frontier_comparison.html";
pub const WEIGHTS_FILE: &str = "side_by_side_weights.html";

fn regime_color(name: &str) -> &'static str {
    match name {
        "unconstrained" => "#00BFFF",
        "conservative" => "#8A2BE2",
        "aggressive" => "#7FFFD4",
        _ => "#FFA500",
    }
}

fn dark_layout(title: &str) -> Layout {
    Layout::new()
        .title(title)
        .paper_background_color("#111111")
        .plot_background_color("#111111")
        .font(Font::new().color("#EEEEEE"))
        .height(800)
}

fn write_plot(plot: &Plot, path: &Path) -> Result<()> {
    std::fs::write(path, plot.to_html())?;
    info!("Wrote {}", path.display());
    Ok(())
}

pub fn correlation_heatmap(symbols: &[String], correlation: &[Vec<f64>], path: &Path) -> Result<()> {
    let mut plot = Plot::new();
    plot.add_trace(HeatMap::new(symbols.to_vec(), symbols.to_vec(), correlation.to_vec()));
    plot.set_layout(
        dark_layout("Asset Correlation Heatmap (Daily Returns)")
            .x_axis(Axis::new().tick_angle(45.0))
            .width(900),
    );
    write_plot(&plot, path)
}

/// Sample clouds of every regime, their upper envelopes and max-Sharpe points.
pub fn frontier_comparison(results: &RegimeResults, path: &Path) -> Result<()> {
    let mut plot = Plot::new();

    for result in results.iter() {
        let name = result.regime.name.as_str();
        let color = regime_color(name);
        let vols: Vec<f64> = result.samples.iter().map(|s| s.volatility).collect();
        let rets: Vec<f64> = result.samples.iter().map(|s| s.expected_return).collect();

        plot.add_trace(
            Scatter::new(vols, rets)
                .mode(Mode::Markers)
                .name(result.regime.label())
                .marker(Marker::new().size(4).color(color).opacity(0.3)),
        );

        let (fx, fy): (Vec<f64>, Vec<f64>) = efficient_frontier(&result.samples).into_iter().unzip();
        plot.add_trace(
            Scatter::new(fx, fy)
                .mode(Mode::Lines)
                .name(format!("{} frontier", result.regime.label()))
                .line(Line::new().color(color).width(1.5)),
        );

        if let Ok(best) = result.optimal() {
            plot.add_trace(
                Scatter::new(vec![best.volatility], vec![best.expected_return])
                    .mode(Mode::Markers)
                    .name(format!("{} Max Sharpe", result.regime.label()))
                    .marker(
                        Marker::new()
                            .size(14)
                            .color(color)
                            .line(Line::new().color("white").width(2.0)),
                    ),
            );
        }
    }

    plot.set_layout(
        dark_layout("Efficient Frontier Comparison (Unconstrained vs Constrained)")
            .x_axis(Axis::new().title("Volatility (Risk)"))
            .y_axis(Axis::new().title("Expected Return")),
    );
    write_plot(&plot, path)
}

pub fn sector_pie(universe: &Universe, regime_label: &str, weights: &[f64], path: &Path) -> Result<()> {
    let alloc = sector_allocation(universe, weights);
    let labels: Vec<&str> = alloc.iter().map(|(s, _)| s.as_str()).collect();
    let values: Vec<f64> = alloc.iter().map(|(_, w)| *w).collect();

    let mut plot = Plot::new();
    plot.add_trace(Pie::new(values).labels(labels).name(regime_label));
    plot.set_layout(dark_layout(&format!("{} Portfolio - Sector Allocation", regime_label)).width(800));
    write_plot(&plot, path)
}

/// Horizontal grouped bars: one group per asset, one bar per regime.
pub fn weights_by_regime(symbols: &[String], table: &[(String, Vec<f64>)], path: &Path) -> Result<()> {
    let mut plot = Plot::new();
    for (regime, weights) in table {
        plot.add_trace(
            Bar::new(weights.clone(), symbols.to_vec())
                .orientation(Orientation::Horizontal)
                .name(regime)
                .marker(Marker::new().color(regime_color(regime))),
        );
    }
    plot.set_layout(
        dark_layout("Optimal Portfolio Weights by Constraint")
            .bar_mode(BarMode::Group)
            .x_axis(Axis::new().title("Weight")),
    );
    write_plot(&plot, path)
}

/// Writes the full chart set into `output_dir` and returns the files written.
pub fn render_all(
    output_dir: &Path,
    universe: &Universe,
    correlation: &[Vec<f64>],
    results: &RegimeResults,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let symbols = universe.symbols();
    let mut written = Vec::new();

    let heatmap = output_dir.join(HEATMAP_FILE);
    correlation_heatmap(&symbols, correlation, &heatmap)?;
    written.push(heatmap);

    let frontier = output_dir.join(FRONTIER_FILE);
    frontier_comparison(results, &frontier)?;
    written.push(frontier);

    for result in results.iter() {
        let best = result.optimal()?;
        let pie = output_dir.join(format!("{}_sector_pie.html", result.regime.name));
        sector_pie(universe, &result.regime.label(), &best.weights, &pie)?;
        written.push(pie);
    }

    let table = optimal_weights_table(results)?;
    let bars = output_dir.join(WEIGHTS_FILE);
    weights_by_regime(&symbols, &table, &bars)?;
    written.push(bars);

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::ConstraintRegime;
    use crate::sampler::Simulator;
    use crate::stats::MomentEstimates;
    use crate::universe::Sector;

    fn small_run() -> (Universe, MomentEstimates, RegimeResults) {
        let universe = Universe::from_pairs(&[
            ("AAA", Sector::Technology),
            ("BBB", Sector::Energy),
            ("CCC", Sector::Etf),
            ("GLD", Sector::Alternatives),
        ]);
        let moments = MomentEstimates::new(
            vec![0.12, 0.06, 0.09, 0.15],
            vec![
                vec![0.06, 0.01, 0.02, 0.0],
                vec![0.01, 0.03, 0.01, 0.0],
                vec![0.02, 0.01, 0.03, 0.0],
                vec![0.0, 0.0, 0.0, 0.10],
            ],
        )
        .unwrap();
        let regimes = vec![
            ConstraintRegime::new("unconstrained", 1.0, 1.0, 1.0).unwrap(),
            ConstraintRegime::new("aggressive", 0.5, 0.5, 0.3).unwrap(),
        ];
        let results = Simulator::new(4, 200, 1000)
            .run_all(&regimes, &moments, &universe.sectors())
            .unwrap();
        (universe, moments, results)
    }

    #[test]
    fn test_render_all_writes_every_chart() {
        let (universe, moments, results) = small_run();
        let dir = tempfile::tempdir().unwrap();
        let written = render_all(dir.path(), &universe, &moments.correlation(), &results).unwrap();

        assert_eq!(written.len(), 2 + results.len() + 1);
        for path in &written {
            let html = std::fs::read_to_string(path).unwrap();
            assert!(html.contains("plotly"), "{} should embed a plotly chart", path.display());
        }
        assert!(dir.path().join("aggressive_sector_pie.html").exists());
        assert!(dir.path().join(WEIGHTS_FILE).exists());
    }

    #[test]
    fn test_render_all_fails_on_infeasible_regime() {
        let universe = Universe::from_pairs(&[("A", Sector::Energy), ("B", Sector::Energy)]);
        let moments = MomentEstimates::new(vec![0.1, 0.1], vec![vec![0.04, 0.0], vec![0.0, 0.04]]).unwrap();
        let regime = ConstraintRegime::new("impossible", 1.0, 0.4, 1.0).unwrap();
        let results = Simulator::new(1, 5, 5)
            .run_all(&[regime], &moments, &universe.sectors())
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let err = render_all(dir.path(), &universe, &moments.correlation(), &results).unwrap_err();
        assert!(err.to_string().contains("impossible"));
    }
}
