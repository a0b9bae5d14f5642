//! Configuration management for clusterwatch.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats. Precedence is
//! defaults < config file < CLI flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use clusterwatch::analysis::{ExportFormat, TareEntry};
use clusterwatch::collectors::{CommandTemplate, Family, NodeNaming};
use clusterwatch::sampler::SamplerConfig;

use crate::cli::{Args, CollectArgs, ConfigFormat, LogLevel, ReportArgs};

// Default configuration constants
pub const DEFAULT_INTERVAL_SECONDS: u64 = 300;
pub const DEFAULT_REPORT_STEM: &str = "facts";
pub const DEFAULT_WINDOW_DAYS: u32 = 1;

/// Default config file locations, first match wins.
pub const DEFAULT_CONFIG_PATHS: [&str; 8] = [
    "/etc/clusterwatch/config.yaml",
    "/etc/clusterwatch/config.yml",
    "/etc/clusterwatch/config.json",
    "/etc/clusterwatch/config.toml",
    "./clusterwatch.yaml",
    "./clusterwatch.yml",
    "./clusterwatch.json",
    "./clusterwatch.toml",
];

fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_node_list_command() -> Vec<String> {
    argv(&["sinfo", "-o", "%n"])
}

pub fn default_stats_command() -> Vec<String> {
    argv(&["cv-stats", "--nodes", "{nodes}", "--format", "json"])
}

pub fn default_load_command() -> Vec<String> {
    argv(&["w"])
}

/// Report defaults that may come from the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub output: Option<PathBuf>,
    pub format: Option<ExportFormat>,
    pub time_days: Option<u32>,
}

// Tables (node_naming, report, tare_table) must stay after the plain
// values for the TOML serializer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Sampling
    pub interval_seconds: Option<u64>,
    pub max_cycles: Option<u64>,

    // Stores
    pub power_db: Option<PathBuf>,
    pub heat_db: Option<PathBuf>,
    pub load_db: Option<PathBuf>,

    // External commands (argv lists, no shell)
    pub node_list_command: Option<Vec<String>>,
    pub stats_command: Option<Vec<String>>,
    pub load_command: Option<Vec<String>>,

    // Logging
    pub log_level: Option<String>,

    #[serde(default)]
    pub node_naming: NodeNaming,

    #[serde(default)]
    pub report: ReportConfig,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tare_table: Vec<TareEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_seconds: Some(DEFAULT_INTERVAL_SECONDS),
            max_cycles: None,
            power_db: Some(PathBuf::from(Family::Power.default_db())),
            heat_db: Some(PathBuf::from(Family::Heat.default_db())),
            load_db: Some(PathBuf::from(Family::Load.default_db())),
            node_list_command: Some(default_node_list_command()),
            stats_command: Some(default_stats_command()),
            load_command: Some(default_load_command()),
            log_level: Some("info".into()),
            node_naming: NodeNaming::default(),
            report: ReportConfig {
                output: Some(PathBuf::from(DEFAULT_REPORT_STEM)),
                format: Some(ExportFormat::Csv),
                time_days: Some(DEFAULT_WINDOW_DAYS),
            },
            tare_table: Vec::new(),
        }
    }
}

impl Config {
    /// Store path of a family.
    pub fn db_for(&self, family: Family) -> PathBuf {
        let configured = match family {
            Family::Power => &self.power_db,
            Family::Heat => &self.heat_db,
            Family::Load => &self.load_db,
        };
        configured
            .clone()
            .unwrap_or_else(|| PathBuf::from(family.default_db()))
    }

    pub fn node_list_template(&self) -> Result<CommandTemplate, clusterwatch::CollectError> {
        template(&self.node_list_command, default_node_list_command)
    }

    pub fn stats_template(&self) -> Result<CommandTemplate, clusterwatch::CollectError> {
        template(&self.stats_command, default_stats_command)
    }

    pub fn load_template(&self) -> Result<CommandTemplate, clusterwatch::CollectError> {
        template(&self.load_command, default_load_command)
    }
}

fn template(
    configured: &Option<Vec<String>>,
    default: fn() -> Vec<String>,
) -> Result<CommandTemplate, clusterwatch::CollectError> {
    match configured {
        Some(argv) => CommandTemplate::from_argv(argv),
        None => CommandTemplate::from_argv(&default()),
    }
}

pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    SamplerConfig {
        interval_secs: cfg.interval_seconds.unwrap_or(DEFAULT_INTERVAL_SECONDS),
        max_cycles: cfg.max_cycles,
    }
    .validate()?;

    for (key, command) in [
        ("node_list_command", &cfg.node_list_command),
        ("stats_command", &cfg.stats_command),
        ("load_command", &cfg.load_command),
    ] {
        if let Some(argv) = command {
            match argv.first() {
                None => return Err(format!("{} must not be empty", key).into()),
                Some(program) if program.trim().is_empty() => {
                    return Err(format!("{}: program name must not be blank", key).into());
                }
                Some(_) => {}
            }
        }
    }

    if let NodeNaming::Suffix { width } = cfg.node_naming {
        if !(1..=9).contains(&width) {
            return Err(format!(
                "node_naming suffix width must be between 1 and 9, got {}",
                width
            )
            .into());
        }
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::parse(level).is_none() {
            return Err(format!(
                "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                level
            )
            .into());
        }
    }

    for entry in &cfg.tare_table {
        if entry.idle_watts < 0.0 || !entry.idle_watts.is_finite() {
            return Err(format!(
                "tare_table: node {} has invalid idle_watts {}",
                entry.node, entry.idle_watts
            )
            .into());
        }
        if let Some(max) = entry.max_watts {
            if max <= 0.0 || !max.is_finite() {
                return Err(format!(
                    "tare_table: node {} has invalid max_watts {}",
                    entry.node, max
                )
                .into());
            }
        }
    }

    Ok(())
}

/// Load the config file (unless disabled) and apply global CLI overrides.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    // Log level: -v wins, then --log-level, then the file
    if args.verbose {
        config.log_level = Some("debug".into());
    } else if let Some(level) = args.log_level {
        config.log_level = Some(format!("{:?}", level).to_lowercase());
    }

    Ok(config)
}

/// Configuration loading with multiple format support.
///
/// An explicitly named file must exist; the default locations are optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(format!("config file not found: {}", p.display()).into());
            }
            p.to_path_buf()
        }
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    let content = fs::read_to_string(&path)?;
    parse_config(&path, &content)
}

/// Parse config text, picking the format from the file extension (YAML by default).
pub fn parse_config(path: &Path, content: &str) -> Result<Config, Box<dyn std::error::Error>> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            let config: Config = serde_yaml::from_str(content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Render configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

/// Effective settings of one collector run.
#[derive(Debug, Clone)]
pub struct CollectSettings {
    pub family: Family,
    pub db: PathBuf,
    pub sampler: SamplerConfig,
}

impl CollectSettings {
    /// CLI > config > defaults.
    pub fn resolve(cfg: &Config, family: Family, args: &CollectArgs) -> Self {
        Self {
            family,
            db: args.db.clone().unwrap_or_else(|| cfg.db_for(family)),
            sampler: SamplerConfig {
                interval_secs: args
                    .freq
                    .or(cfg.interval_seconds)
                    .unwrap_or(DEFAULT_INTERVAL_SECONDS),
                max_cycles: args.max_cycles.or(cfg.max_cycles),
            },
        }
    }
}

/// Effective settings of one report run.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub db: PathBuf,
    pub output: PathBuf,
    pub format: ExportFormat,
    pub window_days: u32,
}

impl ReportSettings {
    pub fn resolve(cfg: &Config, args: &ReportArgs) -> Self {
        Self {
            db: args.db.clone().unwrap_or_else(|| cfg.db_for(Family::Power)),
            output: args
                .output
                .clone()
                .or_else(|| cfg.report.output.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_STEM)),
            format: args.format.or(cfg.report.format).unwrap_or_default(),
            window_days: args
                .time
                .or(cfg.report.time_days)
                .unwrap_or(DEFAULT_WINDOW_DAYS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_effective_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_default_config_round_trips_all_formats() {
        let config = Config::default();
        for (format, ext) in [
            (ConfigFormat::Yaml, "yaml"),
            (ConfigFormat::Json, "json"),
            (ConfigFormat::Toml, "toml"),
        ] {
            let text = render_config(&config, format).unwrap();
            let parsed = parse_config(Path::new(&format!("c.{}", ext)), &text).unwrap();
            assert_eq!(parsed.interval_seconds, Some(DEFAULT_INTERVAL_SECONDS));
            assert_eq!(parsed.stats_command, Some(default_stats_command()));
            assert_eq!(parsed.node_naming, NodeNaming::Suffix { width: 2 });
        }
    }

    #[test]
    fn test_yaml_with_tare_and_naming() {
        let yaml = r#"
interval_seconds: 60
node_naming:
  policy: trailing_digits
tare_table:
  - node: 1
    idle_watts: 100
    max_watts: 650
report:
  format: parquet
"#;
        let cfg = parse_config(Path::new("c.yaml"), yaml).unwrap();
        assert_eq!(cfg.interval_seconds, Some(60));
        assert_eq!(cfg.node_naming, NodeNaming::TrailingDigits);
        assert_eq!(cfg.tare_table.len(), 1);
        assert_eq!(cfg.tare_table[0].max_watts, Some(650.0));
        assert_eq!(cfg.report.format, Some(ExportFormat::Parquet));
        // Keys absent from the file are absent, not defaulted.
        assert_eq!(cfg.stats_command, None);
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.interval_seconds = Some(0);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.interval_seconds = Some(u64::MAX);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.max_cycles = Some(0);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.stats_command = Some(vec![]);
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.tare_table = vec![TareEntry {
            node: 3,
            idle_watts: -1.0,
            max_watts: None,
        }];
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.node_naming = NodeNaming::Suffix { width: 0 };
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.log_level = Some("loud".into());
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut cfg = Config::default();
        cfg.interval_seconds = Some(120);
        let args = CollectArgs {
            freq: Some(30),
            db: None,
            max_cycles: Some(2),
        };
        let settings = CollectSettings::resolve(&cfg, Family::Heat, &args);
        assert_eq!(settings.sampler.interval_secs, 30);
        assert_eq!(settings.sampler.max_cycles, Some(2));
        assert_eq!(settings.db, PathBuf::from("temps.db"));

        let settings = CollectSettings::resolve(&cfg, Family::Power, &CollectArgs::default());
        assert_eq!(settings.sampler.interval_secs, 120);
        assert_eq!(settings.sampler.max_cycles, None);
    }
}
