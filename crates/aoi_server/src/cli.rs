//! Command-line interface handling for the AOI simulation server.
//!
//! Uses `clap` to parse options that override the configuration file.

use clap::{value_parser, Arg, Command};
use std::path::PathBuf;

/// Configuration file used when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "aoi_server.toml";

/// Command line arguments parsed from user input.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Optional override for the number of simulated players
    pub bots: Option<usize>,
    /// Stop after this many completed interest cycles
    pub cycles: Option<u64>,
}

impl CliArgs {
    /// Parses command line arguments.
    ///
    /// Invalid values make clap print usage and exit.
    pub fn parse() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    /// Builds the clap command definition.
    pub fn command() -> Command {
        Command::new("Horizon AOI Server")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Grid-based area-of-interest management driven by a simulated world")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value(DEFAULT_CONFIG_PATH),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("bots")
                    .short('n')
                    .long("bots")
                    .value_name("COUNT")
                    .help("Number of simulated players")
                    .value_parser(value_parser!(usize)),
            )
            .arg(
                Arg::new("cycles")
                    .long("cycles")
                    .value_name("COUNT")
                    .help("Exit after this many interest cycles instead of waiting for Ctrl+C")
                    .value_parser(value_parser!(u64)),
            )
    }

    fn from_matches(matches: clap::ArgMatches) -> Self {
        Self {
            config_path: matches
                .get_one::<String>("config")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH)),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            bots: matches.get_one::<usize>("bots").copied(),
            cycles: matches.get_one::<u64>("cycles").copied(),
        }
    }

    /// Parses an explicit argument list, for tests and embedding.
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::command().try_get_matches_from(args).map(Self::from_matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["aoi_server"]).unwrap();
        assert_eq!(args.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(args.log_level.is_none());
        assert!(!args.json_logs);
        assert!(args.bots.is_none());
        assert!(args.cycles.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = CliArgs::try_parse_from([
            "aoi_server",
            "-c",
            "custom.toml",
            "--log-level",
            "debug",
            "--json-logs",
            "--bots",
            "500",
            "--cycles",
            "10",
        ])
        .unwrap();

        assert_eq!(args.config_path, PathBuf::from("custom.toml"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.json_logs);
        assert_eq!(args.bots, Some(500));
        assert_eq!(args.cycles, Some(10));
    }

    #[test]
    fn test_rejects_non_numeric_bots() {
        assert!(CliArgs::try_parse_from(["aoi_server", "--bots", "many"]).is_err());
    }
}
