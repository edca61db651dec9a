use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};

use crate::analysis::AnalysisConfig;

#[derive(Parser, Debug)]
#[command(
    name = "costlens",
    about = "Rolling averages, trends, rankings and anomaly alerts for daily cost exports"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Cost export file or directory (.json / .jsonl)
    #[arg(long, short, global = true)]
    pub input: Option<PathBuf>,

    /// Config file (default: platform config dir, costlens/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Last day of the current window (YYYY-MM-DD). Defaults to the latest day in the data
    #[arg(long, global = true)]
    pub end: Option<NaiveDate>,

    /// Only analyse dimensions whose key contains this (case-insensitive)
    #[arg(long, global = true)]
    pub dimension: Option<String>,

    /// Output format: table (default), json
    #[arg(long, global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Number of dimensions to list before folding the rest into "Other"
    #[arg(long, global = true)]
    pub top: Option<usize>,

    /// Anomaly threshold in percent
    #[arg(long, global = true)]
    pub threshold: Option<f64>,

    /// Length of the current (and previous) window in days
    #[arg(long, global = true)]
    pub current_days: Option<i64>,

    /// Length of the anomaly baseline window in days
    #[arg(long, global = true)]
    pub baseline_days: Option<i64>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Breakdown, trends, anomalies and summary (default)
    Report,
    /// Top dimensions by current-window spend
    Breakdown,
    /// Current vs. previous window per dimension
    Trends,
    /// Current window vs. baseline per dimension
    Anomalies,
    /// Trailing averages for the combined (or filtered) series
    Rolling {
        /// Trailing window length in days
        #[arg(long)]
        window: Option<i64>,
        /// Compare the latest average with the one this many days earlier
        #[arg(long, default_value = "7")]
        lag: usize,
    },
    /// Share of one set of dimensions relative to another
    Ratio {
        /// Dimensions summed into the numerator (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        numerator: Vec<String>,
        /// Dimensions summed into the denominator (comma-separated)
        #[arg(long, value_delimiter = ',', required = true)]
        denominator: Vec<String>,
        /// Highest healthy numerator/denominator ratio
        #[arg(long)]
        max: Option<f64>,
    },
    /// Bar chart of daily spend over the lookback window
    Plot,
    /// Re-run the report whenever the input changes
    Watch {
        /// Minimum seconds between refreshes (debounce)
        #[arg(long, default_value = "2")]
        interval: u64,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl Cli {
    pub fn effective_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Report)
    }

    /// Overlay command-line thresholds on top of `base`.
    pub fn apply(&self, base: AnalysisConfig) -> AnalysisConfig {
        let mut config = AnalysisConfig {
            anomaly_threshold_percent: self.threshold.unwrap_or(base.anomaly_threshold_percent),
            top_n: self.top.unwrap_or(base.top_n),
            current_window_days: self.current_days.unwrap_or(base.current_window_days),
            baseline_window_days: self.baseline_days.unwrap_or(base.baseline_window_days),
            ..base
        };
        match &self.command {
            Some(Command::Rolling {
                window: Some(w), ..
            }) => config.rolling_window_days = *w,
            Some(Command::Ratio { max: Some(m), .. }) => config.healthy_max_ratio = *m,
            _ => {}
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_report() {
        let cli = Cli::parse_from(["costlens", "--input", "costs.jsonl"]);
        assert_eq!(cli.effective_command(), Command::Report);
        assert_eq!(cli.format, OutputFormat::Table);
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from([
            "costlens",
            "--threshold",
            "40",
            "--top",
            "5",
            "ratio",
            "--numerator",
            "dev,uat",
            "--denominator",
            "prod",
            "--max",
            "0.5",
        ]);
        let config = cli.apply(AnalysisConfig::default());
        assert_eq!(config.anomaly_threshold_percent, 40.0);
        assert_eq!(config.top_n, 5);
        assert_eq!(config.healthy_max_ratio, 0.5);
        assert_eq!(config.current_window_days, 7);

        let Some(Command::Ratio { numerator, .. }) = cli.command else {
            panic!("expected ratio command");
        };
        assert_eq!(numerator, vec!["dev".to_string(), "uat".to_string()]);
    }

    #[test]
    fn test_rolling_window_flag() {
        let cli = Cli::parse_from(["costlens", "rolling", "--window", "14"]);
        assert_eq!(cli.apply(AnalysisConfig::default()).rolling_window_days, 14);
    }
}
