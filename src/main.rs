//! clusterwatch - version 0.1.0
//!
//! Cluster power, temperature and load collectors with tracing logging.
//! This is the main entry point that resolves configuration and dispatches
//! subcommands.

mod cli;
mod commands;
mod config;
mod startup_checks;

use clap::{CommandFactory, Parser};
use tracing::{debug, error, Level};

use clusterwatch::collectors::Family;
use clusterwatch::sysexits;

use cli::{Args, Commands, LogLevel};
use commands::{
    command_check, command_collect, command_config, command_generate_testdata, command_init_db,
    command_report, report_exit_code,
};
use config::{resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with the configured log level.
///
/// Logs go to stderr; stdout is left to command output.
fn setup_logging(config: &Config) {
    let level = config
        .log_level
        .as_deref()
        .and_then(LogLevel::parse)
        .unwrap_or(LogLevel::Info);

    let max_level = match level {
        LogLevel::Off | LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if level != LogLevel::Off && tracing::subscriber::set_global_default(subscriber).is_ok() {
        debug!("Logging initialized with level: {:?}", level);
    }
}

fn print_error_and_code(context: &str, e: &dyn std::fmt::Display, code: i32) -> i32 {
    error!("{}: {}", context, e);
    eprintln!("❌ {}: {}", context, e);
    code
}

async fn run(args: Args) -> i32 {
    let config = match resolve_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration could not be loaded: {}", e);
            return sysexits::EX_CONFIG;
        }
    };

    setup_logging(&config);

    if args.check_config {
        return match validate_effective_config(&config) {
            Ok(()) => {
                println!("✅ Configuration is valid");
                sysexits::EX_OK
            }
            Err(e) => {
                eprintln!("❌ Configuration invalid: {}", e);
                sysexits::EX_CONFIG
            }
        };
    }

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        return sysexits::EX_CONFIG;
    }

    if args.show_config {
        return match show_config(&config, args.config_format) {
            Ok(()) => sysexits::EX_OK,
            Err(e) => print_error_and_code("Cannot render configuration", &e, sysexits::EX_SOFTWARE),
        };
    }

    let Some(command) = args.command else {
        let mut cmd = Args::command();
        let _ = cmd.print_help();
        println!();
        return sysexits::EX_USAGE;
    };

    match command {
        Commands::Power(a) => command_collect(Family::Power, &a, &config).await,
        Commands::Heat(a) => command_collect(Family::Heat, &a, &config).await,
        Commands::Load(a) => command_collect(Family::Load, &a, &config).await,
        Commands::Report(a) => match command_report(&a, &config) {
            Ok(()) => sysexits::EX_OK,
            Err(e) => {
                let code = report_exit_code(&e);
                error!(error = %format!("{:#}", e), code, "Report failed");
                eprintln!("❌ Report failed: {:#}", e);
                code
            }
        },
        Commands::InitDb { family, db } => match command_init_db(family, db, &config) {
            Ok(()) => sysexits::EX_OK,
            Err(e) => print_error_and_code("Cannot initialize store", &e, sysexits::EX_IOERR),
        },
        Commands::Check { family, live } => {
            if command_check(family, live, &config).await {
                sysexits::EX_OK
            } else {
                1
            }
        }
        Commands::Config {
            output,
            format,
            commented,
        } => match command_config(output, format, commented) {
            Ok(()) => sysexits::EX_OK,
            Err(e) => print_error_and_code("Cannot write configuration", &e, sysexits::EX_IOERR),
        },
        Commands::GenerateTestdata {
            output,
            nodes,
            prefix,
        } => match command_generate_testdata(output, nodes, &prefix) {
            Ok(()) => sysexits::EX_OK,
            Err(e) => print_error_and_code("Cannot write test data", &e, sysexits::EX_IOERR),
        },
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let code = run(args).await;
    std::process::exit(code);
}
