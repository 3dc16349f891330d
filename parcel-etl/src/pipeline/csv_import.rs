//! CSV (WKT) → table PostGIS, mode remplacement

use std::time::Instant;

use deadpool_postgres::Pool;
use geotable::{read_delimited, CrsPolicy, Epsg, FeatureCollection};
use tracing::info;

use crate::config::CsvImportConfig;
use crate::error::Result;
use crate::export::postgres::replace_table;
use crate::report::RunReport;
use crate::reproject::reproject;

/// Lit le CSV, déclare son CRS et reprojette vers le CRS cible.
///
/// Partie sans base de données du pipeline: la collection retournée est
/// exactement ce qui sera écrit.
pub fn prepare(config: &CsvImportConfig) -> Result<FeatureCollection> {
    let options = config.source.options()?;
    let table = read_delimited(&config.source.path, &options)?;
    info!(path = %config.source.path.display(), features = table.len(), "CSV read");

    let table = table.apply_crs_policy(config.crs.into());
    reproject(&table, Epsg(config.target_crs))
}

/// CRS déclaré ou supposé des coordonnées du CSV
fn source_crs(config: &CsvImportConfig) -> Epsg {
    CrsPolicy::from(config.crs).epsg()
}

/// Remplace la table cible par le contenu du CSV
pub async fn run(config: &CsvImportConfig, pool: &Pool) -> Result<RunReport> {
    let start = Instant::now();
    let target = config.table_ref()?;

    let table = prepare(config)?;
    let written = replace_table(pool, &target, &table).await?;

    let mut report = RunReport::new("csv-import", target.to_string())
        .with_crs(Some(source_crs(config)), table.crs());
    report.records_read = table.len();
    report.records_written = usize::try_from(written).unwrap_or(usize::MAX);
    report.set_duration(start.elapsed());
    Ok(report)
}
