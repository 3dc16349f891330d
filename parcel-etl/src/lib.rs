//! # parcel-etl
//!
//! Pipelines ETL pour les données parcellaires et foncières de Madère.
//!
//! ## Pipelines
//!
//! - **Parcel-Export**: couches GeoPackage → classeur xlsx (géométrie en WKT)
//! - **Property-Map**: requête PostGIS → carte HTML Leaflet
//! - **CSV-Import**: CSV avec WKT (PTRA08 / UTM 28N) → table PostGIS en WGS84
//! - **CSV-Map**: CSV avec WKT → carte HTML Leaflet
//!
//! ## Usage CLI
//!
//! ```bash
//! parcel-etl export-parcels
//! parcel-etl import-csv --input data/Madeira-Moodle-1.2.csv --table public.properties_data
//! parcel-etl map-properties --output map.html
//! parcel-etl map-csv --input data/Madeira-Moodle-2.0.csv
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod reproject;

pub use config::EtlConfig;
pub use error::{EtlError, Result};
pub use export::pool::{create_pool, DatabaseConfig};
pub use report::RunReport;
