//! Statechart CLI - check, repair and inspect statechart documents.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use statechart_ops::Config;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

mod commands;

use commands::{config as config_cmd, info, repair, validate};

/// Statechart CLI - work with statechart documents from the shell.
///
/// Documents are JSON files whose top-level object is the root statechart.
#[derive(Parser, Debug)]
#[command(
    name = "sc",
    author,
    version,
    about = "Statechart tools: validate, repair and inspect documents",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that a document is a valid statechart.
    ///
    /// Exits with status 1 and lists every violation when it is not.
    Validate {
        /// Document to check.
        file: PathBuf,

        /// Print violations as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Drop dangling transitions, move misplaced ones and prune empty regions.
    Repair {
        /// Document to repair.
        file: PathBuf,

        /// Write the repaired document here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show counts and graph shape of a document.
    Info {
        /// Document to inspect.
        file: PathBuf,

        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // SC_* overrides may come from a .env file
    let _ = dotenvy::dotenv();
    let config = Config::load()?;

    match cli.command {
        Commands::Validate { file, json } => {
            if !validate::execute(&config, &file, json)? {
                std::process::exit(1);
            }
        }

        Commands::Repair { file, output } => {
            repair::execute(&config, &file, output.as_deref(), cli.quiet)?;
        }

        Commands::Info { file, json } => {
            info::execute(&config, &file, json)?;
        }

        Commands::Config(config_cmd_inner) => {
            let mut config = config;
            match config_cmd_inner {
                ConfigCommands::Show => {
                    config_cmd::show(&config)?;
                }
                ConfigCommands::Set { key, value } => {
                    config_cmd::set(&mut config, &key, &value)?;
                }
                ConfigCommands::Get { key } => {
                    config_cmd::get(&config, &key)?;
                }
                ConfigCommands::Reset => {
                    config_cmd::reset()?;
                }
                ConfigCommands::Path => {
                    if let Some(path) = Config::config_file_path() {
                        println!("{}", path.display());
                    } else {
                        println!("(no config file path available)");
                    }
                }
            }
        }
    }

    Ok(())
}
