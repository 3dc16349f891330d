//! GeoPackage → classeur xlsx (une feuille par couche, géométrie en WKT)

use std::time::Instant;

use geotable::gpkg;
use tracing::info;

use crate::config::ParcelExportConfig;
use crate::error::Result;
use crate::export::spreadsheet::{write_workbook, SheetSpec};
use crate::report::RunReport;

/// Exporte les couches configurées vers le classeur.
///
/// Toutes les couches sont lues avant l'écriture: une couche absente ou
/// invalide n'écrit aucun fichier.
pub fn run(config: &ParcelExportConfig) -> Result<RunReport> {
    let start = Instant::now();
    info!(
        source = %config.source.display(),
        layers = config.layers.len(),
        "Exporting parcel layers"
    );

    let mut tables = Vec::with_capacity(config.layers.len());
    for entry in &config.layers {
        let layer = gpkg::read_layer(&config.source, &entry.layer)?;
        let annotated = layer.with_wkt_column(&config.wkt_column)?;
        info!(
            layer = %entry.layer,
            sheet = %entry.sheet,
            features = annotated.len(),
            crs = ?annotated.crs(),
            "Layer read"
        );
        tables.push((entry.sheet.as_str(), annotated));
    }

    let sheets: Vec<SheetSpec<'_>> = tables
        .iter()
        .map(|(sheet, collection)| SheetSpec::new(sheet, collection))
        .collect();
    write_workbook(&config.output, &sheets)?;

    let records: usize = tables.iter().map(|(_, c)| c.len()).sum();
    let crs = tables.first().and_then(|(_, c)| c.crs());

    let mut report = RunReport::new("parcel-export", config.output.display().to_string())
        .with_crs(crs, crs);
    report.records_read = records;
    report.records_written = records;
    report.set_duration(start.elapsed());
    Ok(report)
}
