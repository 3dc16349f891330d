//! Lecture et écriture PostgreSQL/PostGIS

use std::borrow::Cow;
use std::error::Error as StdError;

use bytes::{Bytes, BytesMut};
use deadpool_postgres::{Object, Pool};
use futures::SinkExt;
use geo::Geometry;
use geotable::{Epsg, Feature, FeatureCollection, Field, FieldKind, Schema, Value};
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{CopyInSink, Row};
use tracing::{debug, info, warn};

use super::ewkb;
use crate::error::{EtlError, Result};

/// Lignes CSV pré-formatées pour COPY
#[derive(Debug)]
pub struct CopyPayload {
    pub data: Bytes,
    pub rows: u64,
}

/// Table cible `schema.table`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// Nom qualifié et quoté
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }
}

impl std::str::FromStr for TableRef {
    type Err = String;

    /// `schema.table`, ou `table` seul dans `public`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (schema, table) = s.split_once('.').unwrap_or(("public", s));
        if schema.is_empty() || table.is_empty() || table.contains('.') {
            return Err(format!("Invalid table name: '{}'. Use schema.table", s));
        }
        Ok(Self::new(schema, table))
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Quote un identifiant SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Lecture
// ---------------------------------------------------------------------------

/// Valeur `geometry` PostGIS brute (EWKB, format binaire du type)
struct RawGeometry(Vec<u8>);

impl<'a> FromSql<'a> for RawGeometry {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(RawGeometry(raw.to_vec()))
    }

    fn accepts(ty: &Type) -> bool {
        ty.name() == "geometry" || *ty == Type::BYTEA
    }
}

/// Lecture typée d'une colonne scalaire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnReader {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Text,
}

impl ColumnReader {
    fn for_type(ty: &Type) -> Option<Self> {
        if *ty == Type::BOOL {
            Some(Self::Bool)
        } else if *ty == Type::INT2 {
            Some(Self::Int2)
        } else if *ty == Type::INT4 {
            Some(Self::Int4)
        } else if *ty == Type::INT8 {
            Some(Self::Int8)
        } else if *ty == Type::FLOAT4 {
            Some(Self::Float4)
        } else if *ty == Type::FLOAT8 {
            Some(Self::Float8)
        } else if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
        {
            Some(Self::Text)
        } else {
            None
        }
    }

    fn kind(self) -> FieldKind {
        match self {
            Self::Bool => FieldKind::Boolean,
            Self::Int2 | Self::Int4 | Self::Int8 => FieldKind::Integer,
            Self::Float4 | Self::Float8 => FieldKind::Float,
            Self::Text => FieldKind::Text,
        }
    }

    fn read(self, row: &Row, idx: usize) -> std::result::Result<Value, tokio_postgres::Error> {
        let value = match self {
            Self::Bool => Value::from(row.try_get::<_, Option<bool>>(idx)?),
            Self::Int2 => Value::from(row.try_get::<_, Option<i16>>(idx)?.map(i64::from)),
            Self::Int4 => Value::from(row.try_get::<_, Option<i32>>(idx)?.map(i64::from)),
            Self::Int8 => Value::from(row.try_get::<_, Option<i64>>(idx)?),
            Self::Float4 => Value::from(row.try_get::<_, Option<f32>>(idx)?.map(f64::from)),
            Self::Float8 => Value::from(row.try_get::<_, Option<f64>>(idx)?),
            Self::Text => Value::from(row.try_get::<_, Option<String>>(idx)?),
        };
        Ok(value)
    }
}

/// Exécute une requête et charge le résultat en collection.
///
/// Le CRS est le SRID porté par les géométries (0 → pas de CRS).
///
/// # Errors
///
/// - `Connection` si aucune connexion ne peut être obtenue
/// - `Query` pour une erreur SQL, une colonne géométrie absente, un type de colonne
///   non géré (à caster en SQL) ou des SRID multiples
pub async fn read_query(
    pool: &Pool,
    sql: &str,
    geometry_column: &str,
) -> Result<FeatureCollection> {
    let client = pool.get().await?;
    debug!(sql = %sql, "Preparing query");

    let stmt = client
        .prepare(sql)
        .await
        .map_err(|e| EtlError::Query(format!("Failed to prepare query: {}", e)))?;

    let columns = stmt.columns();
    let geom_idx = columns
        .iter()
        .position(|c| c.name() == geometry_column)
        .ok_or_else(|| {
            EtlError::Query(format!(
                "geometry column '{}' not found in query result",
                geometry_column
            ))
        })?;
    if !RawGeometry::accepts(columns[geom_idx].type_()) {
        return Err(EtlError::Query(format!(
            "column '{}' has type {}, expected geometry",
            geometry_column,
            columns[geom_idx].type_()
        )));
    }

    let mut readers = Vec::new();
    let mut fields = Vec::new();
    for (idx, column) in columns.iter().enumerate() {
        if idx == geom_idx {
            continue;
        }
        let reader = ColumnReader::for_type(column.type_()).ok_or_else(|| {
            EtlError::Query(format!(
                "column '{}' has unsupported type {} (cast it in SQL)",
                column.name(),
                column.type_()
            ))
        })?;
        fields.push(Field::new(column.name(), reader.kind()));
        readers.push((idx, reader));
    }

    let rows = client
        .query(&stmt, &[])
        .await
        .map_err(|e| EtlError::Query(format!("Query failed: {}", e)))?;

    let mut features = Vec::with_capacity(rows.len());
    let mut srid: Option<Option<u32>> = None;

    for (row_idx, row) in rows.iter().enumerate() {
        let raw: Option<RawGeometry> = row.try_get(geom_idx)?;
        let geometry = match raw {
            Some(RawGeometry(bytes)) => {
                let row_srid = ewkb::srid_of(&bytes);
                match srid {
                    None => srid = Some(row_srid),
                    Some(seen) if seen != row_srid => {
                        return Err(EtlError::Query(format!(
                            "row {}: SRID {:?} differs from {:?}, mixed SRIDs are not supported",
                            row_idx + 1,
                            row_srid,
                            seen
                        )));
                    }
                    Some(_) => {}
                }
                Some(ewkb::from_ewkb(&bytes).map_err(|e| {
                    EtlError::Query(format!("row {}: {}", row_idx + 1, e))
                })?)
            }
            None => None,
        };

        let values = readers
            .iter()
            .map(|(idx, reader)| reader.read(row, *idx))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        features.push(Feature::new(geometry, values));
    }

    let crs = srid.flatten().map(Epsg);
    let schema = Schema::new(fields, geometry_column);
    let collection = FeatureCollection::from_features(schema, features, crs)?;

    info!(
        rows = collection.len(),
        crs = ?collection.crs().map(|c| c.code()),
        "Loaded query result"
    );
    Ok(collection)
}

// ---------------------------------------------------------------------------
// Écriture (mode remplacement)
// ---------------------------------------------------------------------------

fn write_err(context: &'static str) -> impl Fn(tokio_postgres::Error) -> EtlError {
    move |e| EtlError::Write(format!("{}: {}", context, e))
}

/// Type SQL d'une colonne scalaire
fn pg_type_for(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Boolean => "BOOLEAN",
        FieldKind::Integer => "BIGINT",
        FieldKind::Float => "DOUBLE PRECISION",
        FieldKind::Text => "TEXT",
    }
}

/// Ramène les types sans équivalent WKB à leur forme standard
fn normalize_geometry(geom: &Geometry) -> Cow<'_, Geometry> {
    match geom {
        Geometry::Line(l) => Cow::Owned(Geometry::LineString(geo::LineString::from(vec![
            l.start, l.end,
        ]))),
        Geometry::Rect(r) => Cow::Owned(Geometry::Polygon(r.to_polygon())),
        Geometry::Triangle(t) => Cow::Owned(Geometry::Polygon(t.to_polygon())),
        other => Cow::Borrowed(other),
    }
}

fn geometry_type_name(geom: &Geometry) -> &'static str {
    match geom {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) | Geometry::LineString(_) => "LINESTRING",
        Geometry::Polygon(_) | Geometry::Rect(_) | Geometry::Triangle(_) => "POLYGON",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
    }
}

/// Type géométrie de la colonne: le type commun, ou GEOMETRY s'ils diffèrent
pub fn postgis_geometry_type(collection: &FeatureCollection) -> &'static str {
    let mut types = collection
        .features()
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .map(geometry_type_name);

    match types.next() {
        Some(first) if types.all(|t| t == first) => first,
        _ => "GEOMETRY",
    }
}

/// DDL de la table cible
pub fn create_table_sql(target: &TableRef, collection: &FeatureCollection, srid: u32) -> String {
    let schema = collection.schema();
    let mut columns: Vec<String> = schema
        .fields
        .iter()
        .map(|f| format!("{} {}", quote_ident(&f.name), pg_type_for(f.kind)))
        .collect();
    columns.push(format!(
        "{} geometry({}, {})",
        quote_ident(&schema.geometry_column),
        postgis_geometry_type(collection),
        srid
    ));

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        target.qualified(),
        columns.join(",\n    ")
    )
}

/// Liste des colonnes du COPY, dans l'ordre de `encode_copy_rows`
fn copy_columns(schema: &Schema) -> String {
    schema
        .fields
        .iter()
        .map(|f| f.name.as_str())
        .chain(std::iter::once(schema.geometry_column.as_str()))
        .map(quote_ident)
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_csv_text_field(buf: &mut BytesMut, value: &str) {
    buf.extend_from_slice(b"\"");
    for b in value.as_bytes() {
        match *b {
            b'"' => buf.extend_from_slice(b"\"\""),
            _ => buf.extend_from_slice(&[*b]),
        }
    }
    buf.extend_from_slice(b"\"");
}

fn push_value(buf: &mut BytesMut, value: &Value) {
    match value {
        // Champ vide non quoté = NULL
        Value::Null => {}
        Value::Bool(b) => buf.extend_from_slice(if *b { b"t" } else { b"f" }),
        Value::Integer(i) => buf.extend_from_slice(i.to_string().as_bytes()),
        Value::Float(v) => buf.extend_from_slice(v.to_string().as_bytes()),
        Value::Text(s) => push_csv_text_field(buf, s),
    }
}

/// Encode une collection en lignes CSV pour
/// `COPY ... FROM STDIN WITH (FORMAT csv, DELIMITER '|')`.
///
/// Colonnes scalaires dans l'ordre du schéma, puis la géométrie en EWKB hexadécimal.
///
/// # Errors
///
/// `Write` si la collection n'a pas de CRS ou si une géométrie ne peut pas être encodée.
pub fn encode_copy_rows(collection: &FeatureCollection) -> Result<CopyPayload> {
    let srid = collection
        .crs()
        .ok_or_else(|| EtlError::Write("collection has no CRS, cannot write geometries".into()))?
        .code();

    let mut buf = BytesMut::with_capacity(collection.len() * 128);
    let mut rows = 0u64;

    for (idx, feature) in collection.features().iter().enumerate() {
        for value in &feature.values {
            push_value(&mut buf, value);
            buf.extend_from_slice(b"|");
        }

        if let Some(geometry) = &feature.geometry {
            let encoded = ewkb::to_ewkb(&normalize_geometry(geometry), srid)
                .map_err(|e| EtlError::Write(format!("record {}: {}", idx + 1, e)))?;
            buf.extend_from_slice(hex::encode_upper(encoded).as_bytes());
        }
        buf.extend_from_slice(b"\n");
        rows += 1;
    }

    Ok(CopyPayload {
        data: buf.freeze(),
        rows,
    })
}

/// Active PostGIS si nécessaire.
///
/// Si l'extension existe déjà mais que l'utilisateur ne peut pas la (re)créer,
/// on dégrade gracieusement.
async fn ensure_postgis(client: &Object) -> Result<()> {
    match client
        .execute("CREATE EXTENSION IF NOT EXISTS postgis", &[])
        .await
    {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!("CREATE EXTENSION postgis failed (will check if already installed): {e}");
            let exists = client
                .query_opt("SELECT 1 FROM pg_extension WHERE extname = 'postgis'", &[])
                .await
                .map_err(write_err("Failed to check pg_extension"))?
                .is_some();
            if exists {
                Ok(())
            } else {
                Err(EtlError::Write(format!(
                    "PostGIS extension is not installed and could not be created: {e}"
                )))
            }
        }
    }
}

/// Remplace une table par le contenu d'une collection.
///
/// Dans une seule transaction: `DROP TABLE IF EXISTS`, `CREATE TABLE`, `COPY`,
/// index GiST sur la géométrie, commit. En cas d'erreur la transaction est
/// annulée et la table précédente reste intacte.
///
/// Retourne le nombre de lignes écrites.
pub async fn replace_table(
    pool: &Pool,
    target: &TableRef,
    collection: &FeatureCollection,
) -> Result<u64> {
    let srid = collection
        .crs()
        .ok_or_else(|| EtlError::Write(format!("cannot write {}: collection has no CRS", target)))?
        .code();
    let payload = encode_copy_rows(collection)?;

    let mut client = pool.get().await?;
    ensure_postgis(&client).await?;

    let tx = client
        .transaction()
        .await
        .map_err(write_err("Failed to begin transaction"))?;

    let qualified = target.qualified();

    tx.batch_execute(&format!("DROP TABLE IF EXISTS {} CASCADE", qualified))
        .await
        .map_err(write_err("Failed to drop table"))?;

    let ddl = create_table_sql(target, collection, srid);
    debug!(sql = %ddl, "Creating table");
    tx.batch_execute(&ddl)
        .await
        .map_err(write_err("Failed to create table"))?;

    let copy_sql = format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv, DELIMITER '|', QUOTE '\"', ESCAPE '\"', NULL '')",
        qualified,
        copy_columns(collection.schema())
    );
    let sink: CopyInSink<Bytes> = tx
        .copy_in(&copy_sql)
        .await
        .map_err(write_err("Failed to start COPY"))?;
    let mut pinned = std::pin::pin!(sink);

    if !payload.data.is_empty() {
        pinned
            .as_mut()
            .send(payload.data)
            .await
            .map_err(write_err("Failed to send COPY data"))?;
    }
    let copied = pinned
        .as_mut()
        .finish()
        .await
        .map_err(write_err("Failed to finish COPY"))?;

    let index = quote_ident(&format!("{}_geom_idx", target.table));
    tx.batch_execute(&format!(
        "CREATE INDEX {} ON {} USING GIST ({})",
        index,
        qualified,
        quote_ident(&collection.schema().geometry_column)
    ))
    .await
    .map_err(write_err("Failed to create geometry index"))?;

    tx.commit().await.map_err(write_err("Failed to commit"))?;

    if copied != payload.rows {
        warn!(expected = payload.rows, copied, "COPY row count mismatch");
    }
    info!(table = %target, rows = copied, srid, "Replaced table");
    Ok(copied)
}
