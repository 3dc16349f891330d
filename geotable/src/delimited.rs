//! Lecture de fichiers texte délimités (CSV) avec une colonne géométrie en WKT

use std::path::Path;

use tracing::debug;

use crate::types::{Feature, FeatureCollection, Field, FieldKind, Schema, Value};
use crate::wkt::parse_wkt;
use crate::GeoTableError;

/// Options de lecture
#[derive(Debug, Clone)]
pub struct DelimitedOptions {
    /// Séparateur de champs (ASCII)
    pub delimiter: u8,

    /// Label d'encodage WHATWG (`utf-8`, `latin1`, `windows-1252`...)
    pub encoding: String,

    /// Nom de la colonne contenant le WKT
    pub geometry_column: String,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: b';',
            encoding: "utf-8".into(),
            geometry_column: "geometry".into(),
        }
    }
}

/// Lit un fichier délimité et parse sa colonne géométrie.
///
/// La collection retournée n'a pas de CRS: il doit être attribué ensuite
/// (politique de CRS ou reprojection).
///
/// # Errors
///
/// - `NotFound` si le fichier n'existe pas
/// - `ParseError` pour un encodage inconnu ou invalide, une structure tabulaire
///   incohérente, une colonne géométrie absente ou un WKT invalide
pub fn read_delimited(
    path: &Path,
    options: &DelimitedOptions,
) -> Result<FeatureCollection, GeoTableError> {
    let file_name = path.display().to_string();

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(GeoTableError::NotFound(format!("file {}", file_name)));
        }
        Err(e) => return Err(e.into()),
    };

    let encoding = encoding_rs::Encoding::for_label(options.encoding.as_bytes()).ok_or_else(
        || GeoTableError::parse_error(&file_name, format!("unknown encoding '{}'", options.encoding)),
    )?;

    // decode() retire le BOM éventuel
    let (text, _, had_errors) = encoding.decode(&bytes);
    if had_errors {
        return Err(GeoTableError::parse_error(
            &file_name,
            format!("invalid {} byte sequence", encoding.name()),
        ));
    }

    debug!(file = %file_name, bytes = bytes.len(), encoding = encoding.name(), "Decoded delimited file");

    parse_delimited(&text, options, &file_name)
}

/// Parse un contenu délimité déjà décodé
pub fn parse_delimited(
    text: &str,
    options: &DelimitedOptions,
    file_name: &str,
) -> Result<FeatureCollection, GeoTableError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| GeoTableError::parse_error(file_name, e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let geom_idx = headers
        .iter()
        .position(|h| *h == options.geometry_column)
        .ok_or_else(|| {
            GeoTableError::parse_error(
                file_name,
                format!("missing geometry column '{}'", options.geometry_column),
            )
        })?;

    let mut rows: Vec<csv::StringRecord> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| GeoTableError::parse_error(file_name, e.to_string()))?;
        rows.push(record);
    }

    // Colonnes scalaires (toutes sauf la géométrie), types inférés sur l'ensemble des lignes
    let scalar_columns: Vec<usize> = (0..headers.len()).filter(|&i| i != geom_idx).collect();
    let fields: Vec<Field> = scalar_columns
        .iter()
        .map(|&i| Field::new(headers[i].clone(), infer_kind(rows.iter().map(|r| &r[i]))))
        .collect();

    let schema = Schema::new(fields, options.geometry_column.clone());
    let mut collection = FeatureCollection::new(schema, None);

    for (row_idx, record) in rows.iter().enumerate() {
        let cell = record[geom_idx].trim();
        let geometry = if cell.is_empty() {
            None
        } else {
            // `POINT EMPTY` et consorts donnent aussi une géométrie absente
            parse_wkt(cell).map_err(|e| {
                GeoTableError::parse_error(
                    file_name,
                    format!(
                        "row {}: invalid WKT in column '{}': {}",
                        row_idx + 1,
                        options.geometry_column,
                        e
                    ),
                )
            })?
        };

        let values = scalar_columns
            .iter()
            .zip(collection.schema().fields.iter())
            .map(|(&i, field)| parse_cell(&record[i], field.kind))
            .collect();

        collection.push(Feature::new(geometry, values))?;
    }

    debug!(file = %file_name, records = collection.len(), "Parsed delimited file");
    Ok(collection)
}

/// Infère le type d'une colonne à partir de ses cellules non vides
fn infer_kind<'a>(cells: impl Iterator<Item = &'a str>) -> FieldKind {
    let mut seen = false;
    let mut all_int = true;
    let mut all_float = true;
    let mut all_bool = true;

    for cell in cells {
        let cell = cell.trim();
        if cell.is_empty() {
            continue;
        }
        seen = true;
        all_int &= cell.parse::<i64>().is_ok();
        all_float &= cell.parse::<f64>().is_ok();
        all_bool &= parse_bool(cell).is_some();
        if !all_int && !all_float && !all_bool {
            break;
        }
    }

    match (seen, all_int, all_float, all_bool) {
        (false, ..) => FieldKind::Text,
        (true, true, _, _) => FieldKind::Integer,
        (true, false, true, _) => FieldKind::Float,
        (true, false, false, true) => FieldKind::Boolean,
        _ => FieldKind::Text,
    }
}

fn parse_bool(cell: &str) -> Option<bool> {
    if cell.eq_ignore_ascii_case("true") {
        Some(true)
    } else if cell.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_cell(raw: &str, kind: FieldKind) -> Value {
    let cell = raw.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    // Les types ont été inférés sur ces mêmes cellules: le parse ne peut échouer
    // que pour Text, qui garde la valeur brute.
    match kind {
        FieldKind::Integer => cell.parse().map(Value::Integer).unwrap_or(Value::Null),
        FieldKind::Float => cell.parse().map(Value::Float).unwrap_or(Value::Null),
        FieldKind::Boolean => parse_bool(cell).map(Value::Bool).unwrap_or(Value::Null),
        FieldKind::Text => Value::Text(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Geometry, Point};

    const SAMPLE: &str = "OBJECTID;OWNER;geometry\n1;Alice;POINT(-16.91 32.66)\n2;Bob;POINT(-16.92 32.67)\n";

    #[test]
    fn test_parse_sample() {
        let collection = parse_delimited(SAMPLE, &DelimitedOptions::default(), "sample.csv").unwrap();

        assert_eq!(collection.len(), 2);
        assert_eq!(collection.crs(), None);
        assert_eq!(collection.schema().geometry_column, "geometry");
        assert_eq!(
            collection.schema().fields,
            vec![
                Field::new("OBJECTID", FieldKind::Integer),
                Field::new("OWNER", FieldKind::Text),
            ]
        );
        assert_eq!(collection.value(1, "OWNER"), Some(&Value::from("Bob")));
        assert_eq!(
            collection.features()[0].geometry,
            Some(Geometry::Point(Point::new(-16.91, 32.66)))
        );
    }

    #[test]
    fn test_kind_inference() {
        let text = "a;b;c;d;e;geometry\n1;1.5;true;x;;POINT(0 0)\n2;2;FALSE;3;;POINT(1 1)\n";
        let collection = parse_delimited(text, &DelimitedOptions::default(), "kinds.csv").unwrap();
        let kinds: Vec<FieldKind> = collection.schema().fields.iter().map(|f| f.kind).collect();

        assert_eq!(
            kinds,
            vec![
                FieldKind::Integer,
                FieldKind::Float,
                FieldKind::Boolean,
                FieldKind::Text,
                FieldKind::Text,
            ]
        );
        assert_eq!(collection.value(1, "b"), Some(&Value::Float(2.0)));
        assert_eq!(collection.value(0, "e"), Some(&Value::Null));
    }

    #[test]
    fn test_invalid_wkt_reports_row() {
        let text = "id;geometry\n1;POINT(0 0)\n2;POINT(oops)\n";
        let err = parse_delimited(text, &DelimitedOptions::default(), "bad.csv").unwrap_err();

        match err {
            GeoTableError::ParseError { file, reason } => {
                assert_eq!(file, "bad.csv");
                assert!(reason.contains("row 2"), "reason: {}", reason);
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_geometry_cell_is_null() {
        let text = "id;geometry\n1;\n";
        let collection = parse_delimited(text, &DelimitedOptions::default(), "null.csv").unwrap();
        assert!(collection.features()[0].geometry.is_none());
    }

    #[test]
    fn test_empty_wkt_is_null() {
        let text = "id;geometry\n1;POINT EMPTY\n2;MULTIPOLYGON EMPTY\n3;POINT(0 0)\n";
        let collection = parse_delimited(text, &DelimitedOptions::default(), "empty.csv").unwrap();
        assert_eq!(collection.len(), 3);
        assert!(collection.features()[0].geometry.is_none());
        assert!(collection.features()[1].geometry.is_none());
        assert!(collection.features()[2].geometry.is_some());
    }

    #[test]
    fn test_3d_wkt_rejected() {
        let text = "id;geometry\n1;POINT(0 0)\n2;POINT Z (320900 3614100 12.5)\n";
        let err = parse_delimited(text, &DelimitedOptions::default(), "3d.csv").unwrap_err();

        match err {
            GeoTableError::ParseError { reason, .. } => {
                assert!(reason.contains("row 2"), "reason: {}", reason);
                assert!(reason.contains("Z coordinates"), "reason: {}", reason);
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_geometry_column() {
        let text = "id;wkt\n1;POINT(0 0)\n";
        let err = parse_delimited(text, &DelimitedOptions::default(), "nogeom.csv").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_ragged_rows() {
        let text = "id;OWNER;geometry\n1;Alice;POINT(0 0)\n2;POINT(1 1)\n";
        let err = parse_delimited(text, &DelimitedOptions::default(), "ragged.csv").unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_custom_delimiter_and_geometry_column() {
        let options = DelimitedOptions {
            delimiter: b',',
            geometry_column: "wkt".into(),
            ..Default::default()
        };
        let text = "id,wkt\n1,\"LINESTRING(0 0,1 1)\"\n";
        let collection = parse_delimited(text, &options, "comma.csv").unwrap();
        assert!(matches!(
            collection.features()[0].geometry,
            Some(Geometry::LineString(_))
        ));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_delimited(
            Path::new("/nonexistent/dir/properties.csv"),
            &DelimitedOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, GeoTableError::NotFound(_)));
    }

    #[test]
    fn test_read_latin1_with_bom_free_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.csv");
        // "Jo\xe3o" en ISO-8859-1
        let mut bytes = b"id;OWNER;geometry\n1;Jo".to_vec();
        bytes.push(0xE3);
        bytes.extend_from_slice(b"o;POINT(0 0)\n");
        std::fs::write(&path, bytes).unwrap();

        let options = DelimitedOptions {
            encoding: "latin1".into(),
            ..Default::default()
        };
        let collection = read_delimited(&path, &options).unwrap();
        assert_eq!(collection.value(0, "OWNER"), Some(&Value::from("João")));

        let err = read_delimited(&path, &DelimitedOptions::default()).unwrap_err();
        assert!(err.is_parse());
    }

    #[test]
    fn test_read_utf8_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(SAMPLE.as_bytes());
        std::fs::write(&path, bytes).unwrap();

        let collection = read_delimited(&path, &DelimitedOptions::default()).unwrap();
        assert_eq!(collection.schema().fields[0].name, "OBJECTID");
    }

    #[test]
    fn test_unknown_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let options = DelimitedOptions {
            encoding: "klingon-8".into(),
            ..Default::default()
        };
        assert!(read_delimited(&path, &options).unwrap_err().is_parse());
    }
}
