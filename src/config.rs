use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SalesError;
use crate::query::{default_state_names, YearWindow};

const CONFIG_FILE: &str = "config.json";

/// Settings for a run. Every field has a default so a config file only
/// needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file holding the sales table
    pub database: PathBuf,
    /// Where the cleaner writes; defaults to `<input stem>_Cleaned.csv`
    /// next to the input
    pub cleaned_csv: Option<PathBuf>,
    pub chart_dir: PathBuf,
    /// When set, query results are also written here as CSV
    pub report_dir: Option<PathBuf>,
    pub start_year: i32,
    pub end_year: i32,
    /// Sub-categories per region in the profit charts
    pub top_n: usize,
    /// State abbreviation -> full name
    pub state_names: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let window = YearWindow::default();
        Self {
            database: PathBuf::from("sales.db"),
            cleaned_csv: None,
            chart_dir: PathBuf::from("charts"),
            report_dir: None,
            start_year: window.start,
            end_year: window.end,
            top_n: 5,
            state_names: default_state_names(),
        }
    }
}

impl Config {
    /// Platform config location, e.g. `~/.config/sales-report/config.json`
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "sales-report").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from an explicit file, else from the platform location when a
    /// file exists there, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                debug!("No config file found; using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: Config = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        config.validate()?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SalesError> {
        if self.start_year > self.end_year {
            return Err(SalesError::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        if self.top_n == 0 {
            return Err(SalesError::Config("top_n must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn window(&self) -> YearWindow {
        YearWindow::new(self.start_year, self.end_year)
    }

    /// Output path of the cleaner for a given input
    pub fn cleaned_csv_for(&self, input: &Path) -> PathBuf {
        if let Some(path) = &self.cleaned_csv {
            return path.clone();
        }
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sales");
        input.with_file_name(format!("{}_Cleaned.csv", stem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.window(), YearWindow::new(2012, 2015));
        assert_eq!(config.top_n, 5);
        assert_eq!(config.state_names.get("MA").map(String::as_str), Some("Massachusetts"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"database": "/tmp/walmart.db", "end_year": 2014}}"#).unwrap();
        file.flush().unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.database, PathBuf::from("/tmp/walmart.db"));
        assert_eq!(config.window(), YearWindow::new(2012, 2014));
        assert_eq!(config.chart_dir, PathBuf::from("charts"));
    }

    #[test]
    fn test_invalid_window_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"start_year": 2016, "end_year": 2012}}"#).unwrap();
        file.flush().unwrap();

        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("start_year"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/config.json"))).is_err());
    }

    #[test]
    fn test_cleaned_csv_for() {
        let config = Config::default();
        assert_eq!(
            config.cleaned_csv_for(Path::new("data/WalmartRetailSales.xlsx")),
            PathBuf::from("data/WalmartRetailSales_Cleaned.csv")
        );

        let config = Config {
            cleaned_csv: Some(PathBuf::from("out.csv")),
            ..Config::default()
        };
        assert_eq!(config.cleaned_csv_for(Path::new("in.xlsx")), PathBuf::from("out.csv"));
    }
}
