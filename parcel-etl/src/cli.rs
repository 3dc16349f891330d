//! Définition et implémentation des commandes CLI
//!
//! - `export-parcels`: GeoPackage → xlsx
//! - `map-properties`: PostGIS → carte HTML
//! - `import-csv`: CSV (WKT) → PostGIS
//! - `map-csv`: CSV (WKT) → carte HTML

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use deadpool_postgres::Pool;
use tracing::info;

use parcel_etl::config::{CrsPolicySpec, CsvSource, EtlConfig, LayerSheet};
use parcel_etl::export::pool::{create_pool, test_connection, DatabaseConfig, SslMode};
use parcel_etl::pipeline::{csv_import, csv_map, parcel_export, property_map};
use parcel_etl::RunReport;

#[derive(Subcommand)]
pub enum Commands {
    /// Export GeoPackage parcel layers to an xlsx workbook (one sheet per layer)
    ExportParcels {
        /// GeoPackage file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output workbook
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Layer to export as LAYER=SHEET (repeatable, replaces the configured layers)
        #[arg(long = "layer", value_parser = parse_layer_sheet)]
        layers: Vec<LayerSheet>,

        /// Name of the WKT column
        #[arg(long)]
        wkt_column: Option<String>,
    },

    /// Render properties stored in PostGIS as an HTML map
    MapProperties {
        /// SQL query returning scalar columns and one geometry column
        #[arg(long)]
        query: Option<String>,

        /// Geometry column of the query
        #[arg(long)]
        geometry_column: Option<String>,

        /// Output HTML file
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Import a CSV with WKT geometries into PostGIS (replaces the table)
    ImportCsv {
        #[command(flatten)]
        csv: CsvArgs,

        /// EPSG code of the CSV coordinates (declared, not transformed)
        #[arg(long)]
        source_srid: Option<u32>,

        /// EPSG code of the written table
        #[arg(long)]
        target_srid: Option<u32>,

        /// Target table (schema.table)
        #[arg(long)]
        table: Option<String>,

        #[command(flatten)]
        db: DbArgs,
    },

    /// Render a CSV with WKT geometries as an HTML map
    MapCsv {
        #[command(flatten)]
        csv: CsvArgs,

        /// EPSG code assumed when the data has none (default: 4326)
        #[arg(long)]
        srid: Option<u32>,

        /// Output HTML file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Fichier CSV source
#[derive(Args)]
pub struct CsvArgs {
    /// CSV file
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Field delimiter (défaut : ;)
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Text encoding label (défaut : utf-8)
    #[arg(long)]
    pub encoding: Option<String>,

    /// Column holding the WKT geometry
    #[arg(long)]
    pub geometry_column: Option<String>,
}

/// Connexion PostgreSQL
#[derive(Args)]
pub struct DbArgs {
    /// PostgreSQL host (défaut : env PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL port (défaut : env PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// PostgreSQL database name (défaut : env PGDATABASE / postgres)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,

    /// Full connection URL, overrides the other options (défaut : env DATABASE_URL)
    #[arg(long)]
    pub url: Option<String>,
}

fn parse_layer_sheet(s: &str) -> std::result::Result<LayerSheet, String> {
    match s.split_once('=') {
        Some((layer, sheet)) if !layer.is_empty() && !sheet.is_empty() => Ok(LayerSheet {
            layer: layer.to_string(),
            sheet: sheet.to_string(),
        }),
        _ => Err(format!("Invalid layer mapping: '{}'. Use LAYER=SHEET", s)),
    }
}

/// Exécute la commande demandée avec la configuration chargée
pub async fn run(command: Commands, mut config: EtlConfig) -> Result<RunReport> {
    match command {
        Commands::ExportParcels {
            input,
            output,
            layers,
            wkt_column,
        } => {
            let cfg = &mut config.parcel_export;
            if let Some(input) = input {
                cfg.source = input;
            }
            if let Some(output) = output {
                cfg.output = output;
            }
            if !layers.is_empty() {
                cfg.layers = layers;
            }
            if let Some(column) = wkt_column {
                cfg.wkt_column = column;
            }

            info!(source = %cfg.source.display(), output = %cfg.output.display(), "Export parcels");
            parcel_export::run(cfg).context("Parcel export failed")
        }

        Commands::MapProperties {
            query,
            geometry_column,
            output,
            db,
        } => {
            let cfg = &mut config.property_map;
            if let Some(query) = query {
                cfg.query = query;
            }
            if let Some(column) = geometry_column {
                cfg.geometry_column = column;
            }
            if let Some(output) = output {
                cfg.output = output;
            }

            let pool = connect(db).await?;
            info!(output = %cfg.output.display(), "Map properties");
            property_map::run(cfg, &pool)
                .await
                .context("Property map failed")
        }

        Commands::ImportCsv {
            csv,
            source_srid,
            target_srid,
            table,
            db,
        } => {
            let cfg = &mut config.csv_import;
            apply_csv_overrides(&mut cfg.source, csv);
            if let Some(srid) = source_srid {
                cfg.crs = CrsPolicySpec::Declare(srid);
            }
            if let Some(srid) = target_srid {
                cfg.target_crs = srid;
            }
            if let Some(table) = table {
                cfg.table = table;
            }

            let pool = connect(db).await?;
            info!(input = %cfg.source.path.display(), table = %cfg.table, "Import CSV");
            csv_import::run(cfg, &pool).await.context("CSV import failed")
        }

        Commands::MapCsv { csv, srid, output } => {
            let cfg = &mut config.csv_map;
            apply_csv_overrides(&mut cfg.source, csv);
            if let Some(srid) = srid {
                cfg.crs = CrsPolicySpec::AssumeWhenMissing(srid);
            }
            if let Some(output) = output {
                cfg.output = output;
            }

            info!(input = %cfg.source.path.display(), output = %cfg.output.display(), "Map CSV");
            csv_map::run(cfg).context("CSV map failed")
        }
    }
}

fn apply_csv_overrides(source: &mut CsvSource, args: CsvArgs) {
    if let Some(path) = args.input {
        source.path = path;
    }
    if let Some(delimiter) = args.delimiter {
        source.delimiter = delimiter;
    }
    if let Some(encoding) = args.encoding {
        source.encoding = encoding;
    }
    if let Some(column) = args.geometry_column {
        source.geometry_column = column;
    }
}

/// Ouvre le pool et vérifie la connexion
async fn connect(args: DbArgs) -> Result<Pool> {
    let mut db_config = DatabaseConfig::from_env();
    apply_database_overrides(&mut db_config, args)?;
    info!(database = %db_config.describe(), "Connecting to PostgreSQL");

    let pool = create_pool(&db_config)?;
    test_connection(&pool)
        .await
        .with_context(|| format!("Cannot connect to {}", db_config.describe()))?;
    println!("Connected to PostgreSQL");
    Ok(pool)
}

fn apply_database_overrides(config: &mut DatabaseConfig, args: DbArgs) -> Result<()> {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.dbname = database;
    }
    if let Some(user) = args.user {
        config.user = user;
    }
    if let Some(password) = args.password {
        config.password = Some(password);
    }
    if let Some(ssl) = args.ssl {
        config.ssl_mode = ssl.parse::<SslMode>().map_err(anyhow::Error::msg)?;
    }
    if let Some(url) = args.url {
        config.url = Some(url);
    }
    Ok(())
}
