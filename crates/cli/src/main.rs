//! Altiplano CLI - Database migrations and inventory seeding.
//!
//! # Usage
//!
//! ```bash
//! # Run commerce database migrations
//! altiplano-cli migrate run
//!
//! # Seed the inventory ledger with demo warehouses, variants, and stock
//! altiplano-cli seed inventory
//! ```
//!
//! # Commands
//!
//! - `migrate run` - Apply pending migrations
//! - `seed inventory` - Idempotently seed warehouses/variants/stock
//!
//! # Environment Variables
//!
//! - `COMMERCE_DATABASE_URL` - `PostgreSQL` connection string

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "altiplano-cli")]
#[command(author, version, about = "Altiplano Commerce CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
}

#[derive(Subcommand)]
enum MigrateAction {
    /// Apply pending commerce migrations
    Run,
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Seed warehouses, variants, and stock levels
    Inventory,
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
        Commands::Migrate { action } => match action {
            MigrateAction::Run => commands::migrate::run().await?,
        },
        Commands::Seed { target } => match target {
            SeedTarget::Inventory => commands::seed::inventory().await?,
        },
    }
    Ok(())
}
