//! Run configuration.
//!
//! Loaded once at startup from an optional YAML file. Every key is optional;
//! missing keys take the defaults below.
//!
//! ```yaml
//! start_date: 2017-01-01T00:00:00
//! end_date: 2017-01-02T00:00:00
//! window_hours: 1
//! countries: [US, UK]
//! query: immigration
//! theme: IMMIGRATION
//! tone: "tone>0 tone<0.999"
//! output_dir: ./output
//! ```

use crate::error::{HarvestError, Result};
use crate::planner::QuerySpec;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.gdeltproject.org/api/v2/doc/doc";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub window_hours: i64,
    pub countries: Vec<String>,
    pub query: String,
    pub theme: Option<String>,
    pub tone: Option<String>,
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub task_concurrency: usize,
    pub fetch_concurrency: usize,
    /// Extraction worker threads; `0` means one per CPU.
    pub extract_threads: usize,
    pub output_dir: PathBuf,
    pub user_agent: String,
    /// Process only the first `max_tasks` tasks.
    pub max_tasks: Option<usize>,
}

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_date: midnight(2017, 1, 1),
            end_date: midnight(2017, 1, 2),
            window_hours: 1,
            countries: ["US", "GM", "UK", "AU", "CA", "SW", "IT", "SP", "SF", "IN", "BR"]
                .into_iter()
                .map(String::from)
                .collect(),
            query: "immigration".to_string(),
            theme: None,
            tone: Some("tone>0 tone<0.999".to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
            fetch_timeout_secs: 5,
            task_concurrency: 20,
            fetch_concurrency: 20,
            extract_threads: 0,
            output_dir: PathBuf::from("output"),
            user_agent: concat!(
                "Mozilla/5.0 (compatible; tone_harvest/",
                env!("CARGO_PKG_VERSION"),
                ")"
            )
            .to_string(),
            max_tasks: None,
        }
    }
}

impl Config {
    /// Parse a YAML document and validate it.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or use defaults when no path is given.
    #[instrument(level = "info", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            let config = Config::default();
            config.validate()?;
            return Ok(config);
        };
        let yaml = tokio::fs::read_to_string(path).await?;
        let config = Self::from_yaml(&yaml)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_date >= self.end_date {
            return Err(HarvestError::Config(format!(
                "start_date {} must be before end_date {}",
                self.start_date, self.end_date
            )));
        }
        if self.window().is_none() {
            return Err(HarvestError::Config(format!(
                "window_hours must be positive, got {}",
                self.window_hours
            )));
        }
        if self.countries.is_empty() {
            return Err(HarvestError::Config("countries must not be empty".to_string()));
        }
        if let Some(bad) = self
            .countries
            .iter()
            .find(|c| c.is_empty() || !c.chars().all(|ch| ch.is_ascii_alphanumeric()))
        {
            return Err(HarvestError::Config(format!(
                "country code {bad:?} must be alphanumeric"
            )));
        }
        if self.task_concurrency == 0 || self.fetch_concurrency == 0 {
            return Err(HarvestError::Config(
                "task_concurrency and fetch_concurrency must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Window length, when positive.
    pub fn window(&self) -> Option<TimeDelta> {
        TimeDelta::try_hours(self.window_hours).filter(|d| *d > TimeDelta::zero())
    }

    pub fn query_spec(&self) -> QuerySpec {
        QuerySpec {
            base_query: self.query.clone(),
            theme: self.theme.clone().filter(|t| !t.trim().is_empty()),
            tone: self.tone.clone().filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.countries.len(), 11);
        assert_eq!(config.window(), Some(TimeDelta::hours(1)));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "start_date: 2018-01-01T00:00:00\n\
             end_date: 2018-01-10T00:00:00\n\
             window_hours: 168\n\
             countries: [US, UK]\n\
             theme: IMMIGRATION\n",
        )
        .unwrap();
        assert_eq!(config.countries, vec!["US", "UK"]);
        assert_eq!(config.window(), Some(TimeDelta::weeks(1)));
        assert_eq!(config.query, "immigration");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.query_spec().theme.as_deref(), Some("IMMIGRATION"));
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let err = Config::from_yaml(
            "start_date: 2018-01-02T00:00:00\nend_date: 2018-01-01T00:00:00\n",
        )
        .unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));

        let err = Config::from_yaml("window_hours: 0\n").unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));

        let err = Config::from_yaml("countries: []\n").unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));

        let err = Config::from_yaml("countries: [\"../etc\"]\n").unwrap_err();
        assert!(matches!(err, HarvestError::Config(_)));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let err = Config::from_yaml("colour: blue\n").unwrap_err();
        assert!(matches!(err, HarvestError::ConfigFile(_)));
    }

    #[test]
    fn test_blank_tone_is_dropped_from_query() {
        let config = Config::from_yaml("tone: \"\"\n").unwrap();
        assert_eq!(config.query_spec().tone, None);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("harvest.yaml");
        std::fs::write(&path, "countries: [IT]\ntask_concurrency: 4\n").unwrap();

        let config = Config::load(Some(&path)).await.unwrap();
        assert_eq!(config.countries, vec!["IT"]);
        assert_eq!(config.task_concurrency, 4);

        let defaults = Config::load(None).await.unwrap();
        assert_eq!(defaults.countries.len(), 11);
    }
}
