//! Shopdesk CLI - Database migrations and demo data.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! shopdesk-cli migrate
//!
//! # Load the bundled demo products and customers
//! shopdesk-cli seed
//!
//! # Load a custom seed file, checking it without touching the database
//! shopdesk-cli seed --file my-data.yaml --dry-run
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Insert demo products and customers

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopdesk-cli")]
#[command(author, version, about = "Shopdesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert demo products and customers
    Seed {
        /// YAML seed file (defaults to the bundled demo data)
        #[arg(short, long)]
        file: Option<String>,

        /// Validate the seed data without connecting to the database
        #[arg(long)]
        dry_run: bool,
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
        Commands::Seed { file, dry_run } => {
            commands::seed::run(file.as_deref(), dry_run).await?;
        }
    }
    Ok(())
}
