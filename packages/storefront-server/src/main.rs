//! Storefront CLI
//!
//! # Usage
//!
//! ```bash
//! # Serve the API with defaults (0.0.0.0:8000, ./storefront.db)
//! storefront serve
//!
//! # Serve with a config file, overriding the port
//! storefront serve --config storefront.yaml --port 9000
//!
//! # Load categories and products into the configured database
//! storefront seed --catalog catalog.yaml
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use storefront_server::seed::{seed_catalog, CatalogSeed};
use storefront_server::{init_tracing, start_server, ServerConfig};
use storefront_storage::SqliteStorefrontStore;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(about = "Storefront - online shop HTTP API", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Listen port (overrides config and environment)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Import a catalog YAML file
    Seed {
        /// Catalog file
        #[arg(long)]
        catalog: PathBuf,

        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, port } => {
            let mut config = ServerConfig::load(config.as_deref())
                .context("Failed to load configuration")?;
            if let Some(port) = port {
                config.port = port;
                config.validate()?;
            }
            init_tracing(&config.log_level);
            start_server(config).await?;
        }
        Commands::Seed { catalog, config } => {
            let config = ServerConfig::load(config.as_deref())
                .context("Failed to load configuration")?;
            init_tracing(&config.log_level);

            let seed = CatalogSeed::from_yaml_file(&catalog)
                .with_context(|| format!("Failed to read catalog {}", catalog.display()))?;
            let store = SqliteStorefrontStore::open(&config.database_path)
                .with_context(|| format!("Failed to open {}", config.database_path.display()))?;

            let report = seed_catalog(&store, &seed).await?;
            println!(
                "Seeded {} categories, {} products, {} images into {}",
                report.categories,
                report.products,
                report.images,
                config.database_path.display()
            );
        }
    }

    Ok(())
}
