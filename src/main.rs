mod aggregate;
mod analysis;
mod anomaly;
mod cli;
mod config;
mod error;
mod graph;
mod normalize;
mod output;
mod rank;
mod ratio;
mod source;
mod summary;
mod trend;
mod types;
mod watch;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use analysis::{AnalysisConfig, AnalysisRequest, RatioRequest, Report};
use cli::{Cli, Command, OutputFormat};
use source::{CostSource, FileSource};
use types::TimeSeries;

const ENV_LOG: &str = "COSTLENS_LOG";

fn init_logging(verbose: bool) {
    let filter = if verbose {
        "debug".to_string()
    } else {
        std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "warn".to_string())
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_env_filter(filter)
        .init();
}

fn load_series(input: &Path) -> Result<BTreeMap<String, TimeSeries>> {
    let raw = FileSource::new(input).load()?;
    let series = normalize::normalize(&raw)
        .with_context(|| format!("invalid cost data in {}", input.display()))?;
    debug!(dimensions = series.len(), "normalized cost records");
    Ok(series)
}

fn build_request(cli: &Cli, config: AnalysisConfig) -> AnalysisRequest {
    let ratio = match cli.command {
        Some(Command::Ratio {
            ref numerator,
            ref denominator,
            ..
        }) => Some(RatioRequest {
            numerator: numerator.clone(),
            denominator: denominator.clone(),
        }),
        _ => None,
    };

    AnalysisRequest {
        end_date: cli.end,
        config,
        dimension_filter: cli.dimension.clone(),
        ratio,
    }
}

fn run_report(input: &Path, request: &AnalysisRequest, format: OutputFormat) -> Result<()> {
    let series = load_series(input)?;
    let Some(report) = analysis::analyze(&series, request)? else {
        eprintln!("No cost records found.");
        return Ok(());
    };
    match format {
        OutputFormat::Json => output::print_json(&report),
        OutputFormat::Table => output::print_report(&report),
    }
    Ok(())
}

/// All dimensions passing the request's filter, summed per day.
fn filtered_total(series: &BTreeMap<String, TimeSeries>, request: &AnalysisRequest) -> TimeSeries {
    let filter = request.dimension_filter.as_deref();
    summary::combine(
        series
            .values()
            .filter(|s| analysis::matches_filter(s.dimension_key(), filter)),
    )
}

fn run_rolling(
    series: &BTreeMap<String, TimeSeries>,
    request: &AnalysisRequest,
    lag: usize,
    format: OutputFormat,
) -> Result<()> {
    let combined = filtered_total(series, request);
    let combined = match request.end_date {
        Some(end) => combined.until(end),
        None => combined,
    };

    let window = request.config.rolling_window_days;
    let points: Vec<_> = aggregate::rolling_windows(&combined, window)?.collect();
    let trend = summary::rolling_trend_change(&combined, window, lag)?;

    match format {
        OutputFormat::Json => output::print_rolling_json(&points, trend.as_ref()),
        OutputFormat::Table => output::print_rolling(&points, trend.as_ref(), window),
    }
    Ok(())
}

fn print_section(report: &Report, command: &Command, format: OutputFormat) {
    match (command, format) {
        (Command::Breakdown, OutputFormat::Json) => output::print_json(&report.breakdown),
        (Command::Breakdown, OutputFormat::Table) => output::print_breakdown(&report.breakdown),
        (Command::Trends, OutputFormat::Json) => output::print_json(&report.trends),
        (Command::Trends, OutputFormat::Table) => {
            output::print_trends(&report.trends, Some(&report.overall))
        }
        (Command::Anomalies, OutputFormat::Json) => output::print_json(&report.anomalies),
        (Command::Anomalies, OutputFormat::Table) => output::print_anomalies(&report.anomalies),
        (Command::Ratio { .. }, _) => match (&report.ratio, format) {
            (Some(r), OutputFormat::Json) => output::print_json(r),
            (Some(r), OutputFormat::Table) => output::print_ratio(r),
            (None, _) => {}
        },
        (_, OutputFormat::Json) => output::print_json(report),
        (_, OutputFormat::Table) => output::print_report(report),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let file_config = config::load_config(cli.config.as_deref())?;
    let analysis_config = cli.apply(file_config.apply(AnalysisConfig::default()));
    analysis_config.validate()?;

    let input: PathBuf = cli
        .input
        .clone()
        .or_else(|| file_config.input.clone())
        .context("no input given; pass --input or set `input` in the config file")?;

    let mode = cli.effective_command();
    let request = build_request(&cli, analysis_config);

    if let Command::Watch { interval } = mode {
        return watch::run(&input, interval, || run_report(&input, &request, cli.format));
    }

    let series = load_series(&input)?;
    info!(dimensions = series.len(), "analysing");

    if let Command::Rolling { lag, .. } = mode {
        return run_rolling(&series, &request, lag, cli.format);
    }

    let Some(report) = analysis::analyze(&series, &request)? else {
        eprintln!("No cost records found.");
        return Ok(());
    };

    if mode == Command::Plot {
        return graph::render(&filtered_total(&series, &request), &report.summary.window);
    }

    print_section(&report, &mode, cli.format);
    Ok(())
}
