//! Conversion WKT (Well-Known Text) avec geozero
//!
//! Les géométries sont planes (XY): les coordonnées Z ou M sont refusées
//! plutôt que tronquées.

use geo::Geometry;
use geozero::error::Result as GeozeroResult;
use geozero::wkt::{Wkt, WktWriter};
use geozero::{CoordDimensions, GeomProcessor, GeozeroGeometry, ToGeo};

use crate::types::{Feature, FeatureCollection, Field, FieldKind, Value};
use crate::GeoTableError;

const GEOMETRY_TAGS: &[&str] = &[
    "POINT",
    "LINESTRING",
    "POLYGON",
    "MULTIPOINT",
    "MULTILINESTRING",
    "MULTIPOLYGON",
    "GEOMETRYCOLLECTION",
];

/// Sérialise une géométrie en WKT
pub fn to_wkt(geometry: &Geometry) -> Result<String, GeoTableError> {
    let mut buf: Vec<u8> = Vec::with_capacity(256);
    {
        let mut writer = WktWriter::new(&mut buf);
        geometry
            .process_geom(&mut writer)
            .map_err(|e| GeoTableError::invalid_geometry("wkt", e.to_string()))?;
    }
    String::from_utf8(buf).map_err(|e| GeoTableError::invalid_geometry("wkt", e.to_string()))
}

/// Parse une chaîne WKT en géométrie.
///
/// Une géométrie `EMPTY` (`POINT EMPTY`, `POLYGON Z EMPTY`...) donne `None`.
///
/// # Errors
///
/// `InvalidGeometry` si le texte n'est pas du WKT valide ou s'il porte des
/// coordonnées Z ou M.
pub fn parse_wkt(text: &str) -> Result<Option<Geometry>, GeoTableError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GeoTableError::invalid_geometry("wkt", "empty WKT string"));
    }
    if is_empty_geometry(trimmed) {
        return Ok(None);
    }

    let wkt = Wkt(trimmed);
    ensure_xy(&wkt)
        .map_err(|e| GeoTableError::invalid_geometry("wkt", format!("{}: {}", e, trimmed)))?;
    wkt.to_geo()
        .map(Some)
        .map_err(|e| GeoTableError::invalid_geometry("wkt", format!("{}: {}", e, trimmed)))
}

/// `<TAG> [Z|M|ZM] EMPTY` au premier niveau
fn is_empty_geometry(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    let mut tokens = upper.split_whitespace();
    let Some(tag) = tokens.next() else {
        return false;
    };
    // POINTZ, POLYGONZM...
    let base = tag.trim_end_matches(['Z', 'M']);
    if !GEOMETRY_TAGS.contains(&base) {
        return false;
    }
    let rest: Vec<&str> = tokens.collect();
    matches!(rest.as_slice(), ["EMPTY"] | ["Z" | "M" | "ZM", "EMPTY"])
}

/// Relève les dimensions réellement présentes dans les coordonnées
#[derive(Debug, Default)]
struct CoordDims {
    z: bool,
    m: bool,
}

impl GeomProcessor for CoordDims {
    fn dimensions(&self) -> CoordDimensions {
        CoordDimensions::xyzm()
    }

    fn multi_dim(&self) -> bool {
        true
    }

    fn coordinate(
        &mut self,
        _x: f64,
        _y: f64,
        z: Option<f64>,
        m: Option<f64>,
        _t: Option<f64>,
        _tm: Option<u64>,
        _idx: usize,
    ) -> GeozeroResult<()> {
        self.z |= z.is_some();
        self.m |= m.is_some();
        Ok(())
    }
}

/// Refuse les géométries avec Z ou M, que `geo` ne représente pas
pub(crate) fn ensure_xy(geometry: &impl GeozeroGeometry) -> Result<(), String> {
    let mut dims = CoordDims::default();
    geometry
        .process_geom(&mut dims)
        .map_err(|e| e.to_string())?;

    let dimension = match (dims.z, dims.m) {
        (false, false) => return Ok(()),
        (true, false) => "Z",
        (false, true) => "M",
        (true, true) => "ZM",
    };
    Err(format!(
        "{} coordinates are not supported, geometries must be 2D (XY)",
        dimension
    ))
}

impl FeatureCollection {
    /// Retourne une copie avec une colonne texte contenant le WKT de chaque géométrie.
    ///
    /// Les géométries nulles donnent `Value::Null`. L'attribut géométrie n'est pas
    /// modifié. Si une colonne `column` existe déjà, ses valeurs sont remplacées.
    pub fn with_wkt_column(&self, column: &str) -> Result<FeatureCollection, GeoTableError> {
        let mut annotated = self.clone();
        let existing = annotated.schema().index_of(column);
        let (schema, features) = annotated.parts_mut();

        let idx = match existing {
            Some(idx) => {
                schema.fields[idx].kind = FieldKind::Text;
                idx
            }
            None => {
                schema.fields.push(Field::new(column, FieldKind::Text));
                schema.fields.len() - 1
            }
        };

        for feature in features.iter_mut() {
            let wkt = wkt_value(feature)?;
            if idx < feature.values.len() {
                feature.values[idx] = wkt;
            } else {
                feature.values.push(wkt);
            }
        }

        Ok(annotated)
    }
}

fn wkt_value(feature: &Feature) -> Result<Value, GeoTableError> {
    match &feature.geometry {
        Some(geometry) => Ok(Value::Text(to_wkt(geometry)?)),
        None => Ok(Value::Null),
    }
}
