mod capture;
mod commands;
mod context;
mod progress;
mod share;
mod summary;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "retouch", about = "AI-assisted image editing sessions")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (TOML); defaults to <config dir>/retouch/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive editing session over the saved session
    Session(commands::session::SessionArgs),
    /// Apply a single AI edit to an image file
    Edit(commands::edit::EditArgs),
    /// Ask the model for edit suggestions for an image file
    Suggest(commands::suggest::SuggestArgs),
    /// Export the saved session image
    Export(commands::export::ExportArgs),
    /// Show the saved session
    Info(commands::info::InfoArgs),
    /// Delete the saved session
    Clear(commands::clear::ClearArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Config(args) = &cli.command {
        return commands::config::run(args);
    }

    let config = context::load_config(cli.config.as_deref())?;
    match &cli.command {
        Commands::Session(args) => commands::session::run(args, &config),
        Commands::Edit(args) => commands::edit::run(args, &config),
        Commands::Suggest(args) => commands::suggest::run(args, &config),
        Commands::Export(args) => commands::export::run(args, &config),
        Commands::Info(args) => commands::info::run(args),
        Commands::Clear(args) => commands::clear::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
