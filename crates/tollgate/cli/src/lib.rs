//! Tollgate CLI - inspect deployment windows and dry-run vetoes
//!
//! This CLI gives operators a terminal interface to:
//! - Validate day/hour window expressions
//! - Evaluate a constraint file at an instant
//! - Run the full veto stack against a fixture of resources

use clap::{Parser, Subcommand};
use std::ffi::OsString;
use tollgate_veto::DynamicConfigService;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;

use commands::{veto, window};
pub use config::CliConfig;
pub use error::{CliError, CliResult};
pub use output::OutputFormat;

/// Tollgate CLI application
#[derive(Parser)]
#[command(name = "tollgate")]
#[command(about = "Tollgate - deployment windows and veto policies", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "TOLLGATE_CONFIG")]
    config: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Time-window expressions and constraints
    Window {
        #[command(subcommand)]
        command: window::WindowCommands,
    },

    /// Veto policies
    Veto {
        #[command(subcommand)]
        command: veto::VetoCommands,
    },

    /// Show configuration
    Config,
}

/// Run using the current process arguments.
pub async fn run() -> CliResult<()> {
    run_with_args(std::env::args_os()).await
}

/// Run using the provided argument iterator.
pub async fn run_with_args<I, T>(args: I) -> CliResult<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .try_init();

    // Load config
    let config = CliConfig::load(cli.config.as_deref())?;

    // Execute command
    match cli.command {
        Commands::Window { command } => window::execute(command, &config, cli.output).await,
        Commands::Veto { command } => veto::execute(command, &config, cli.output).await,
        Commands::Config => {
            match cli.output {
                OutputFormat::Json => output::print_json(&config),
                OutputFormat::Table => {
                    println!("Config file: {:?}", cli.config);
                    println!(
                        "Default timezone: {}",
                        config.default_timezone.as_deref().unwrap_or("UTC")
                    );
                    let dynamic = config.dynamic_config()?;
                    for key in dynamic.keys() {
                        if let Some(value) = dynamic.get_value(&key) {
                            println!("  {key} = {value}");
                        }
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_window_check() {
        let cli = Cli::try_parse_from([
            "tollgate",
            "--output",
            "json",
            "window",
            "check",
            "constraint.yml",
            "--at",
            "2020-03-25T10:00:00Z",
        ])
        .unwrap();
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(
            cli.command,
            Commands::Window {
                command: window::WindowCommands::Check { at: Some(_), .. }
            }
        ));
    }

    #[test]
    fn test_rejects_bad_instant() {
        assert!(Cli::try_parse_from(["tollgate", "window", "check", "c.yml", "--at", "noon"]).is_err());
    }
}
