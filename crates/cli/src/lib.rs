pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use offerdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "offerdesk",
    about = "Offerdesk margin calculation CLI",
    long_about = "Validate catalogs, calculate offer margin breakdowns, and rank recommendations.",
    after_help = "Examples:\n  offerdesk check-catalog catalogs/2025-10.toml\n  \
                  offerdesk calculate --catalog catalogs/2025-10.toml --basket basket.json\n  \
                  offerdesk config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an offerdesk.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
    #[arg(long, global = true, help = "Override the configured log format (compact|pretty|json)")]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Load a catalog file, run integrity checks and print its counts")]
    CheckCatalog {
        #[arg(help = "Catalog file (.toml or .json)")]
        path: PathBuf,
    },
    #[command(about = "Calculate the margin breakdown of a basket")]
    Calculate {
        #[arg(long = "catalog", help = "Catalog file; repeat for several versions")]
        catalogs: Vec<PathBuf>,
        #[arg(long, help = "Basket file (.toml or .json)")]
        basket: PathBuf,
    },
    #[command(about = "Calculate a basket and print ranked recommendations")]
    Recommend {
        #[arg(long = "catalog", help = "Catalog file; repeat for several versions")]
        catalogs: Vec<PathBuf>,
        #[arg(long, help = "Basket file (.toml or .json)")]
        basket: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                log_format: self.log_format,
                ..ConfigOverrides::default()
            },
        }
    }
}

/// Installs the global subscriber; output goes to stderr so stdout stays JSON.
pub fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(error) = installed {
        eprintln!("logging was already initialised: {error}");
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    // Config errors are reported by the command itself.
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match &cli.command {
        Command::CheckCatalog { path } => commands::check_catalog::run(&options, path),
        Command::Calculate { catalogs, basket } => {
            commands::calculate::run(&options, catalogs, basket)
        }
        Command::Recommend { catalogs, basket } => {
            commands::recommend::run(&options, catalogs, basket)
        }
        Command::Config => commands::config::run(&options),
    };

    debug!(
        event_name = "cli.command.completed",
        exit_code = result.exit_code,
        "command finished"
    );
    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
