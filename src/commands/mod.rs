//! CLI command implementations for clusterwatch.
//!
//! This module provides implementations for all CLI subcommands:
//! - `power`, `heat`, `load`: the polling collectors
//! - `report`: read, reshape and export a power store
//! - `init-db`: create a collector's tables
//! - `check`: requirement validation
//! - `config`: configuration file generation
//! - `generate-testdata`: synthetic stats blobs

pub mod check;
pub mod collect;
pub mod config;
pub mod generate;
pub mod init_db;
pub mod report;

// Re-export command functions
pub use check::command_check;
pub use collect::command_collect;
pub use config::command_config;
pub use generate::command_generate_testdata;
pub use init_db::command_init_db;
pub use report::{command_report, report_exit_code};
