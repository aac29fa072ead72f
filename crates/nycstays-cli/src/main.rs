// crates/nycstays-cli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use nycstays_core::config::Settings;
use nycstays_core::registry::ArtifactRegistry;
use tracing_subscriber::EnvFilter;

mod commands;
use commands::artifact::{handle_artifact_command, ArtifactCommands};
use commands::clean::{handle_clean, CleanArgs};
use commands::upload::{handle_upload, UploadArgs};

/// A CLI for the NYC short-term stay listings pipeline
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clean a raw listings artifact and publish the result.
    Clean(CleanArgs),
    /// Register a local CSV file as a new artifact version.
    Upload(UploadArgs),
    /// Inspect registered artifacts.
    Artifact {
        #[command(subcommand)]
        command: ArtifactCommands,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let registry = ArtifactRegistry::open(&settings.registry_root)?;

    match cli.command {
        Commands::Clean(args) => handle_clean(&registry, args)?,
        Commands::Upload(args) => handle_upload(&registry, args)?,
        Commands::Artifact { command } => handle_artifact_command(&registry, command)?,
    }

    println!("\n✅ CLI command finished successfully.");
    Ok(())
}
