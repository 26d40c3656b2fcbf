//! Novel Cart CLI - Database migrations and catalog seeding.
//!
//! # Usage
//!
//! ```bash
//! # Apply schema migrations
//! nc-cli migrate
//!
//! # Load the catalog from YAML
//! nc-cli seed novels --file crates/cli/data/novels.yaml
//!
//! # Replace the catalog (also empties every cart)
//! nc-cli seed novels --file crates/cli/data/novels.yaml --clear
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed novels` - Insert novels from a YAML file

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nc-cli")]
#[command(author, version, about = "Novel Cart CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert novels from a YAML file
    Novels {
        /// Path to the YAML file
        #[arg(short, long, default_value = "crates/cli/data/novels.yaml")]
        file: String,

        /// Delete the existing catalog first
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Novels { file, clear } => commands::seed::novels(&file, clear).await?,
        },
    }
    Ok(())
}
