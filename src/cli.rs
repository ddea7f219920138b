//! Command-line interface definitions.
//!
//! Everything except the optional country override lives in the YAML
//! configuration file (see [`crate::config`]).

use clap::Parser;
use std::path::PathBuf;

/// Harvest GDELT tone charts and their top articles per country and window.
///
/// # Examples
///
/// ```sh
/// # All configured countries
/// tone_harvest -c harvest.yaml
///
/// # Only Germany, writing somewhere else
/// tone_harvest -c harvest.yaml -o /data/tone GM
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Harvest only this country (FIPS code), overriding the configured list
    pub country: Option<String>,

    /// Path to the YAML configuration file
    #[arg(short, long, env = "TONE_HARVEST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output directory, overriding `output_dir` from the configuration
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_no_arguments() {
        let cli = Cli::parse_from(["tone_harvest"]);
        assert_eq!(cli.country, None);
        assert_eq!(cli.output_dir, None);
    }

    #[test]
    fn test_cli_country_override() {
        let cli = Cli::parse_from(["tone_harvest", "GM"]);
        assert_eq!(cli.country.as_deref(), Some("GM"));
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "tone_harvest",
            "-c",
            "/etc/harvest.yaml",
            "-o",
            "/tmp/out",
            "US",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/harvest.yaml")));
        assert_eq!(cli.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(cli.country.as_deref(), Some("US"));
    }
}
