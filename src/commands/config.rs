//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("clusterwatch.yaml"));

    let mut content = render_config(&config, format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# clusterwatch Configuration
# ==========================
#
# Sampling
# --------
# interval_seconds: 300        # Base pause between cycles (jittered by +/-5%)
# max_cycles: null             # Stop after N cycles (null = run until signalled)
#
# Stores
# ------
# power_db: "power.db"         # Facts of the power collector
# heat_db: "temps.db"          # Facts and air rows of the heat collector
# load_db: "webpower.db"       # Load averages
#
# External Commands
# -----------------
# Argument lists, run without a shell. "{nodes}" is replaced by the
# comma-joined node list.
# node_list_command: ["sinfo", "-o", "%n"]   # First output line is a header
# stats_command: ["cv-stats", "--nodes", "{nodes}", "--format", "json"]
# load_command: ["w"]       # Last three tokens of the first line
#
# Node Naming
# -----------
# node_naming:
#   policy: suffix             # "suffix" (last `width` chars) or "trailing_digits"
#   width: 2
#
# Report Defaults
# ---------------
# report:
#   output: "facts"            # Output path stem, extension follows the format
#   format: "csv"              # csv, feather, json, stata, parquet
#   time_days: 1               # Window in days (0 = everything)
#
# Tare Table Overrides
# --------------------
# Percent reports need max_watts for every selected node.
# tare_table:
#   - node: 1
#     idle_watts: 115.0
#     max_watts: 600.0
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
