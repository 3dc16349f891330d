//! Point d'entrée CLI pour parcel-etl

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use parcel_etl::EtlConfig;

mod cli;

use cli::Commands;

// Charger .env au démarrage
fn load_env() {
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Pipelines ETL parcelles et propriétés: GeoPackage, CSV/WKT, PostGIS, xlsx, cartes HTML
#[derive(Parser)]
#[command(name = "parcel-etl")]
#[command(author, version)]
#[command(about = "Exporter les parcelles GeoPackage en xlsx, importer des CSV/WKT dans PostGIS et produire des cartes HTML")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config preset name (madeira) or path to a JSON config
    #[arg(long, default_value = "madeira", global = true)]
    config: String,

    /// Write the run report as JSON to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    let config = EtlConfig::resolve(&cli.config)
        .with_context(|| format!("Failed to load config '{}'", cli.config))?;
    info!(config = %cli.config, "Configuration loaded");

    let report = cli::run(cli.command, config).await?;

    println!("Done. {}", report.summary());
    if let Some(path) = cli.report {
        report
            .save_to_file(&path)
            .with_context(|| format!("Failed to save report to {}", path.display()))?;
        info!(path = %path.display(), "Report saved");
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
