//! Quarry CLI
//!
//! Command-line front end over an `items` table

use clap::{Parser, Subcommand};
use quarry_core::logging_facility::{init, Profile};
use quarry_engine::{Database, DatabaseConfig};
use std::path::PathBuf;

mod commands;
mod item;

#[derive(Debug, Parser)]
#[command(name = "quarry")]
#[command(about = "Quarry - typed records over SQLite", long_about = None)]
struct Cli {
    /// Database file (overrides the config file and QUARRY_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// TOML database config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log operations to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Item operations
    Items(commands::items::ItemsArgs),
}

const DEFAULT_DB_PATH: &str = "quarry.db";

fn database_config(cli: &Cli) -> Result<DatabaseConfig, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => DatabaseConfig::load(path)?,
        None => DatabaseConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(db) = &cli.db {
        config.path = Some(db.clone());
    }
    if config.path.is_none() {
        config.path = Some(PathBuf::from(DEFAULT_DB_PATH));
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = database_config(&cli)?;
    match cli.command {
        Commands::Items(args) if args.is_explain() => commands::items::explain(args),
        Commands::Items(args) => {
            let db = Database::open(config)?;
            let result = commands::items::execute(&db, args).await;
            db.close().await;
            result
        }
    }
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    if cli.verbose {
        init(Profile::Development);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
