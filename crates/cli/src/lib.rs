pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use assetflow_core::config::{AppConfig, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "assetflow",
    about = "Assetflow operator CLI",
    long_about = "Operate the Assetflow approval workflow: migrations, seed catalogue, \
                  config inspection, readiness checks, and request statistics.",
    after_help = "Examples:\n  assetflow doctor --json\n  assetflow seed\n  assetflow stats"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the default asset-type catalogue (no-op when types already exist)")]
    Seed,
    #[command(about = "Inspect effective configuration values with secret redaction")]
    Config,
    #[command(about = "Validate config, database connectivity, and notifier readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Report request counts by workflow status")]
    Stats,
}

// Command output is JSON on stdout; logs go to stderr so the two never mix.
fn init_logging(config: &AppConfig) {
    use assetflow_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    if let Ok(config) = AppConfig::load(LoadOptions::default()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => {
            commands::CommandResult { exit_code: 0, output: commands::doctor::run(json) }
        }
        Command::Stats => commands::stats::run(),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
