//! CLI arguments and subcommands for clusterwatch.
//!
//! One subcommand per program: three collectors, the report, and the
//! housekeeping commands.

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use clusterwatch::analysis::ExportFormat;
use clusterwatch::collectors::Family;
use clusterwatch::reading::Point;
use clusterwatch::sampler::MAX_INTERVAL_SECS;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(s, true).ok()
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "clusterwatch",
    about = "Cluster power, temperature and load collectors with a report tool",
    long_about = "Cluster power, temperature and load collectors with a report tool.\n\n\
                  The collectors poll the cluster stats command on a jittered interval and \
                  append normalized readings to a SQLite store. The report command reads a \
                  store back, optionally pivots and tares it, and exports a table.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level (overrides the config file)
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Be chatty (same as --log-level debug)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 78 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Flags shared by the collectors.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct CollectArgs {
    /// Base poll interval in seconds (jittered by ±5%)
    #[arg(short = 'f', long = "freq", value_parser = clap::value_parser!(u64).range(1..=MAX_INTERVAL_SECS))]
    pub freq: Option<u64>,

    /// Store file to append to
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Stop after this many cycles (debugging aid)
    #[arg(short = 'n', long = "max-cycles", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_cycles: Option<u64>,
}

/// Flags of the report command.
#[derive(ClapArgs, Debug, Clone)]
pub struct ReportArgs {
    /// Store file to read
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Output stem; the format suffix is appended
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Number of recent 24-hour periods to read (0 = all history)
    #[arg(short = 't', long = "time")]
    pub time: Option<u32>,

    /// Node number to include; repeat for several (default: all known nodes)
    #[arg(short = 'n', long = "node")]
    pub node: Vec<u32>,

    /// Measurement point
    #[arg(short = 'p', long, value_enum, default_value = "t")]
    pub point: Point,

    /// One column per node instead of one row per reading
    #[arg(long)]
    pub pivot: bool,

    /// Subtract each node's idle power (only meaningful for the total)
    #[arg(long)]
    pub bias: bool,

    /// Add a cluster-total column
    #[arg(long)]
    pub cluster: bool,

    /// Express values as percent of half the summed power ceilings
    #[arg(long)]
    pub percent: bool,

    /// Print count/mean/std/min/max per column
    #[arg(long)]
    pub summarize: bool,

    /// Shorthand for all nodes and --point t
    #[arg(long)]
    pub totals: bool,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect CPU, memory and node wattage
    Power(CollectArgs),

    /// Collect inlet and outlet air temperatures
    Heat(CollectArgs),

    /// Collect the load averages reported by `w`
    Load(CollectArgs),

    /// Read a power store and export a table
    Report(ReportArgs),

    /// Create the tables a collector appends to
    InitDb {
        /// Collector family
        #[arg(value_enum)]
        family: Family,

        /// Store file (default: the family's configured store)
        #[arg(long)]
        db: Option<PathBuf>,
    },

    /// Validate configuration, external commands and stores
    Check {
        /// Only check this family
        #[arg(long, value_enum)]
        family: Option<Family>,

        /// Also run the node listing command
        #[arg(long)]
        live: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Write a synthetic stats-command JSON blob
    GenerateTestdata {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long, default_value = "stats.json")]
        output: PathBuf,

        /// Number of nodes in the blob
        #[arg(long, default_value_t = 4)]
        nodes: u32,

        /// Hostname prefix; node numbers are appended as two digits
        #[arg(long, default_value = "node")]
        prefix: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_flags() {
        let args = Args::parse_from([
            "clusterwatch", "report", "-n", "1", "-n", "50", "-p", "t", "--pivot", "--bias",
            "--format", "parquet", "-t", "0",
        ]);
        match args.command {
            Some(Commands::Report(r)) => {
                assert_eq!(r.node, vec![1, 50]);
                assert_eq!(r.point, Point::Total);
                assert!(r.pivot && r.bias && !r.percent);
                assert_eq!(r.format, Some(ExportFormat::Parquet));
                assert_eq!(r.time, Some(0));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_collector_flags_and_global_verbose() {
        let args = Args::parse_from(["clusterwatch", "power", "-f", "60", "-n", "3", "-v"]);
        assert!(args.verbose);
        match args.command {
            Some(Commands::Power(c)) => {
                assert_eq!(c.freq, Some(60));
                assert_eq!(c.max_cycles, Some(3));
                assert_eq!(c.db, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_zero_or_oversized_interval_rejected() {
        assert!(Args::try_parse_from(["clusterwatch", "power", "-f", "0"]).is_err());
        assert!(Args::try_parse_from(["clusterwatch", "heat", "-f", "86401"]).is_err());
        assert!(Args::try_parse_from(["clusterwatch", "load", "-n", "0"]).is_err());
        assert!(Args::try_parse_from(["clusterwatch", "load", "-f", "86400"]).is_ok());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("loud"), None);
    }
}
