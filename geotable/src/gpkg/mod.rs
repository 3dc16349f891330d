//! Lecture des couches vecteur d'un GeoPackage (SQLite)

pub mod blob;

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use tracing::{debug, info, warn};

use crate::types::{Epsg, Feature, FeatureCollection, Field, FieldKind, Schema, Value};
use crate::GeoTableError;

/// Description d'une couche dans `gpkg_geometry_columns`
#[derive(Debug, Clone)]
struct LayerInfo {
    geometry_column: String,
    srs_id: i64,
    /// `organization` / `organization_coordsys_id` de `gpkg_spatial_ref_sys`
    organization: Option<String>,
    coordsys_id: Option<i64>,
}

/// Colonne de la table SQLite (PRAGMA table_info)
#[derive(Debug, Clone)]
struct TableColumn {
    name: String,
    decl_type: String,
    pk: bool,
}

/// Liste les couches vecteur (`data_type = 'features'`) d'un GeoPackage
pub fn list_layers(path: &Path) -> Result<Vec<String>, GeoTableError> {
    let conn = open(path)?;
    let mut stmt = conn.prepare(
        "SELECT table_name FROM gpkg_contents WHERE data_type = 'features' ORDER BY table_name",
    )?;
    let layers = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(layers)
}

/// Lit une couche d'un GeoPackage dans son CRS natif.
///
/// La clé primaire entière (`fid`) n'est pas exposée comme attribut.
///
/// # Errors
///
/// - `NotFound` si le fichier ou la couche n'existe pas
/// - `ParseError` si le fichier n'est pas un GeoPackage ou si un blob géométrie
///   ne peut pas être décodé (la lecture échoue entièrement)
pub fn read_layer(path: &Path, layer: &str) -> Result<FeatureCollection, GeoTableError> {
    let conn = open(path)?;
    let file_name = path.display().to_string();

    let info = layer_info(&conn, layer)?
        .ok_or_else(|| GeoTableError::NotFound(format!("layer '{}' in {}", layer, file_name)))?;

    let columns = table_columns(&conn, layer)?;
    let pk_column = single_integer_pk(&columns);

    let scalar_columns: Vec<&TableColumn> = columns
        .iter()
        .filter(|c| c.name != info.geometry_column)
        .filter(|c| Some(c.name.as_str()) != pk_column)
        .collect();

    let fields: Vec<Field> = scalar_columns
        .iter()
        .map(|c| Field::new(c.name.clone(), kind_for_decl_type(&c.decl_type)))
        .collect();

    // Le srs_id est local au fichier: seul le couple organization/coordsys
    // de gpkg_spatial_ref_sys donne le code EPSG
    let crs = epsg_for(info.organization.as_deref(), info.coordsys_id);
    if crs.is_none() {
        warn!(
            layer = layer,
            srs_id = info.srs_id,
            organization = ?info.organization,
            "GeoPackage layer has no EPSG coordinate system"
        );
    }

    let row_id = pk_column.map(quote_ident).unwrap_or_else(|| "rowid".to_string());
    let mut select = vec![row_id.clone(), quote_ident(&info.geometry_column)];
    select.extend(scalar_columns.iter().map(|c| quote_ident(&c.name)));

    let sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select.join(", "),
        quote_ident(layer),
        row_id
    );
    debug!(sql = %sql, "Reading GeoPackage layer");

    let schema = Schema::new(fields, info.geometry_column.clone());
    let mut collection = FeatureCollection::new(schema, crs);

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        let fid: i64 = row.get(0)?;

        let geometry = match row.get_ref(1)? {
            ValueRef::Null => None,
            ValueRef::Blob(bytes) => blob::decode(bytes).map_err(|reason| {
                GeoTableError::parse_error(
                    &file_name,
                    format!("layer '{}', feature {}: {}", layer, fid, reason),
                )
            })?,
            other => {
                return Err(GeoTableError::parse_error(
                    &file_name,
                    format!(
                        "layer '{}', feature {}: geometry is {:?}, expected a blob",
                        layer,
                        fid,
                        other.data_type()
                    ),
                ));
            }
        };

        let mut values = Vec::with_capacity(scalar_columns.len());
        for (i, field) in collection.schema().fields.iter().enumerate() {
            values.push(to_value(row.get_ref(i + 2)?, field.kind));
        }

        collection.push(Feature::new(geometry, values))?;
    }

    info!(
        layer = layer,
        features = collection.len(),
        crs = ?collection.crs().map(|c| c.code()),
        "Read GeoPackage layer"
    );

    Ok(collection)
}

fn open(path: &Path) -> Result<Connection, GeoTableError> {
    if !path.is_file() {
        return Err(GeoTableError::NotFound(format!(
            "GeoPackage {}",
            path.display()
        )));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let has_contents = has_table(&conn, "gpkg_contents")
        .map_err(|e| GeoTableError::parse_error(path.display().to_string(), e.to_string()))?;

    if !has_contents {
        return Err(GeoTableError::parse_error(
            path.display().to_string(),
            "not a GeoPackage (missing gpkg_contents table)",
        ));
    }

    Ok(conn)
}

fn has_table(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

fn layer_info(conn: &Connection, layer: &str) -> Result<Option<LayerInfo>, GeoTableError> {
    let sql = if has_table(conn, "gpkg_spatial_ref_sys")? {
        "SELECT g.column_name, g.srs_id, s.organization, s.organization_coordsys_id
         FROM gpkg_contents c
         JOIN gpkg_geometry_columns g ON g.table_name = c.table_name
         LEFT JOIN gpkg_spatial_ref_sys s ON s.srs_id = g.srs_id
         WHERE c.table_name = ?1 AND c.data_type = 'features'"
    } else {
        "SELECT g.column_name, g.srs_id, NULL, NULL
         FROM gpkg_contents c
         JOIN gpkg_geometry_columns g ON g.table_name = c.table_name
         WHERE c.table_name = ?1 AND c.data_type = 'features'"
    };

    let info = conn
        .query_row(sql, [layer], |row| {
            Ok(LayerInfo {
                geometry_column: row.get(0)?,
                srs_id: row.get(1)?,
                organization: row.get(2)?,
                coordsys_id: row.get(3)?,
            })
        })
        .optional()?;
    Ok(info)
}

/// Code EPSG d'une entrée `gpkg_spatial_ref_sys`.
///
/// Les entrées non définies (0 / -1) et les autres organisations n'en ont pas.
fn epsg_for(organization: Option<&str>, coordsys_id: Option<i64>) -> Option<Epsg> {
    match (organization, coordsys_id) {
        (Some(org), Some(id)) if org.trim().eq_ignore_ascii_case("EPSG") && id > 0 => {
            u32::try_from(id).ok().map(Epsg)
        }
        _ => None,
    }
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<TableColumn>, GeoTableError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| {
            Ok(TableColumn {
                name: row.get("name")?,
                decl_type: row.get::<_, Option<String>>("type")?.unwrap_or_default(),
                pk: row.get::<_, i64>("pk")? > 0,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Clé primaire mono-colonne de type INTEGER (alias du rowid)
fn single_integer_pk(columns: &[TableColumn]) -> Option<&str> {
    let mut pks = columns.iter().filter(|c| c.pk);
    match (pks.next(), pks.next()) {
        (Some(pk), None) if pk.decl_type.eq_ignore_ascii_case("INTEGER") => Some(pk.name.as_str()),
        _ => None,
    }
}

/// Type de colonne selon l'affinité SQLite du type déclaré
fn kind_for_decl_type(decl_type: &str) -> FieldKind {
    let t = decl_type.to_ascii_uppercase();
    if t.starts_with("BOOL") {
        FieldKind::Boolean
    } else if t.contains("INT") {
        FieldKind::Integer
    } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
        FieldKind::Float
    } else {
        FieldKind::Text
    }
}

fn to_value(value: ValueRef<'_>, kind: FieldKind) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => match kind {
            FieldKind::Boolean => Value::Bool(i != 0),
            FieldKind::Float => Value::Float(i as f64),
            _ => Value::Integer(i),
        },
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Text(hex::encode(b)),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
