//! CSV (WKT) → carte HTML

use std::time::Instant;

use geotable::read_delimited;
use tracing::info;

use crate::config::CsvMapConfig;
use crate::error::Result;
use crate::export::map::write_map;
use crate::report::RunReport;

use super::ensure_wgs84;

pub fn run(config: &CsvMapConfig) -> Result<RunReport> {
    let start = Instant::now();
    let options = config.source.options()?;

    let table = read_delimited(&config.source.path, &options)?;
    let read = table.len();
    info!(path = %config.source.path.display(), features = read, "CSV read");

    let table = table.apply_crs_policy(config.crs.into());
    let crs_in = table.crs();
    let table = ensure_wgs84(table)?;

    write_map(&config.output, &table, &config.map)?;

    let mut report = RunReport::new("csv-map", config.output.display().to_string())
        .with_crs(crs_in, table.crs());
    report.records_read = read;
    report.records_written = table.features().iter().filter(|f| f.geometry.is_some()).count();
    report.set_duration(start.elapsed());
    Ok(report)
}
