use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::analysis::AnalysisConfig;

/// On-disk settings. Every field is optional; unset ones keep the built-in
/// defaults of `AnalysisConfig`.
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Config {
    pub input: Option<PathBuf>,
    pub anomaly_threshold_percent: Option<f64>,
    pub healthy_max_ratio: Option<f64>,
    pub top_n: Option<usize>,
    pub current_window_days: Option<i64>,
    pub baseline_window_days: Option<i64>,
    pub rolling_window_days: Option<i64>,
}

impl Config {
    /// Overlay the values present in this file on top of `base`.
    pub fn apply(&self, base: AnalysisConfig) -> AnalysisConfig {
        AnalysisConfig {
            anomaly_threshold_percent: self
                .anomaly_threshold_percent
                .unwrap_or(base.anomaly_threshold_percent),
            healthy_max_ratio: self.healthy_max_ratio.unwrap_or(base.healthy_max_ratio),
            top_n: self.top_n.unwrap_or(base.top_n),
            current_window_days: self.current_window_days.unwrap_or(base.current_window_days),
            baseline_window_days: self
                .baseline_window_days
                .unwrap_or(base.baseline_window_days),
            rolling_window_days: self.rolling_window_days.unwrap_or(base.rolling_window_days),
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "costlens").map(|d| d.config_dir().join("config.toml"))
}

/// Load an explicitly named config file. Missing or invalid files are errors.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&data).with_context(|| format!("invalid config at {}", path.display()))
}

/// Load the config from `explicit`, or from the platform config directory.
///
/// The platform file is optional: when it is absent or unparsable the
/// defaults are used and a warning is logged.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    let Some(path) = default_config_path() else {
        return Ok(Config::default());
    };
    let Ok(data) = fs::read_to_string(&path) else {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    };

    match toml::from_str(&data) {
        Ok(config) => Ok(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "invalid config, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_overrides_only_named_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "anomaly_threshold_percent = 25.0\ntop_n = 3\ninput = \"/var/costs\"\n",
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.input, Some(PathBuf::from("/var/costs")));

        let merged = config.apply(AnalysisConfig::default());
        assert_eq!(merged.anomaly_threshold_percent, 25.0);
        assert_eq!(merged.top_n, 3);
        assert_eq!(merged.current_window_days, 7);
        assert_eq!(merged.healthy_max_ratio, 0.3);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_explicit_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "top_n = \"lots\"").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_empty_config_keeps_defaults() {
        assert_eq!(
            Config::default().apply(AnalysisConfig::default()),
            AnalysisConfig::default()
        );
    }
}
