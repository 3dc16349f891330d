//! Requête PostGIS → carte HTML

use std::time::Instant;

use deadpool_postgres::Pool;
use tracing::info;

use crate::config::PropertyMapConfig;
use crate::error::Result;
use crate::export::map::write_map;
use crate::export::postgres::read_query;
use crate::report::RunReport;

use super::ensure_wgs84;

pub async fn run(config: &PropertyMapConfig, pool: &Pool) -> Result<RunReport> {
    let start = Instant::now();

    let properties = read_query(pool, &config.query, &config.geometry_column).await?;
    let read = properties.len();
    info!(features = read, crs = ?properties.crs(), "Properties loaded");

    let properties = properties.apply_crs_policy(config.crs.into());
    let crs_in = properties.crs();
    let properties = ensure_wgs84(properties)?;

    write_map(&config.output, &properties, &config.map)?;

    let mut report = RunReport::new("property-map", config.output.display().to_string())
        .with_crs(crs_in, properties.crs());
    report.records_read = read;
    report.records_written = properties
        .features()
        .iter()
        .filter(|f| f.geometry.is_some())
        .count();
    report.set_duration(start.elapsed());
    Ok(report)
}
