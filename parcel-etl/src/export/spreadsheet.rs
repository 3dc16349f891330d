//! Export vers un classeur `.xlsx`

use std::path::Path;

use geotable::{FeatureCollection, Value};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use tracing::{debug, info};

use crate::error::{EtlError, Result};

/// Une feuille du classeur: son nom et la collection à écrire
#[derive(Debug, Clone, Copy)]
pub struct SheetSpec<'a> {
    pub label: &'a str,
    pub collection: &'a FeatureCollection,
}

impl<'a> SheetSpec<'a> {
    pub fn new(label: &'a str, collection: &'a FeatureCollection) -> Self {
        Self { label, collection }
    }
}

fn write_error(path: &Path, e: XlsxError) -> EtlError {
    EtlError::Write(format!("{}: {}", path.display(), e))
}

/// Écrit un classeur avec une feuille par collection.
///
/// En-tête = colonnes scalaires dans l'ordre du schéma (la géométrie native
/// n'est pas exportée), une ligne par enregistrement. Le fichier n'est écrit
/// qu'une fois toutes les feuilles construites.
///
/// # Errors
///
/// `Write` si un nom de feuille ou une valeur est refusé, ou si le fichier ne
/// peut pas être écrit.
pub fn write_workbook(path: &Path, sheets: &[SheetSpec<'_>]) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(sheet.label)
            .map_err(|e| write_error(path, e))?;
        write_sheet(worksheet, sheet.collection, &header).map_err(|e| {
            EtlError::Write(format!("{}, sheet '{}': {}", path.display(), sheet.label, e))
        })?;
        debug!(sheet = sheet.label, rows = sheet.collection.len(), "Built sheet");
    }

    workbook.save(path).map_err(|e| write_error(path, e))?;

    info!(path = %path.display(), sheets = sheets.len(), "Wrote workbook");
    Ok(())
}

fn write_sheet(
    worksheet: &mut Worksheet,
    collection: &FeatureCollection,
    header: &Format,
) -> std::result::Result<(), XlsxError> {
    for (col, field) in collection.schema().fields.iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col)?, &field.name, header)?;
    }

    for (idx, feature) in collection.features().iter().enumerate() {
        let row = u32::try_from(idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, value) in feature.values.iter().enumerate() {
            let col = column_index(col)?;
            match value {
                Value::Null => {}
                Value::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Value::Integer(i) => {
                    worksheet.write_number(row, col, *i as f64)?;
                }
                Value::Float(v) => {
                    worksheet.write_number(row, col, *v)?;
                }
                Value::Text(s) => {
                    worksheet.write_string(row, col, s)?;
                }
            }
        }
    }
    Ok(())
}

fn column_index(col: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}
