//! Tests d'intégration GeoPackage sur un fichier construit à la volée

use std::path::Path;

use geo::{Geometry, LineString, Point, Polygon};
use geotable::{gpkg, Epsg, FieldKind, GeoTableError, Value};
use rusqlite::{params, Connection};

fn gpkg_blob(geometry: &Geometry, srs_id: i32) -> Vec<u8> {
    let wkb = wkb::geom_to_wkb(geometry).expect("WKB encoding");
    let mut blob = b"GP".to_vec();
    blob.push(0);
    blob.push(0b0000_0001);
    blob.extend_from_slice(&srs_id.to_le_bytes());
    blob.extend_from_slice(&wkb);
    blob
}

fn square(x: f64, y: f64, size: f64) -> Geometry {
    Geometry::Polygon(Polygon::new(
        LineString::from(vec![
            (x, y),
            (x + size, y),
            (x + size, y + size),
            (x, y + size),
            (x, y),
        ]),
        vec![],
    ))
}

/// Crée un GeoPackage minimal avec une couche de parcelles
fn create_fixture(path: &Path, layer: &str, srs_id: i32) {
    let organization = if srs_id > 0 { "EPSG" } else { "NONE" };
    create_fixture_with_srs(path, layer, srs_id, organization, i64::from(srs_id));
}

/// Idem avec une entrée `gpkg_spatial_ref_sys` explicite pour `srs_id`
fn create_fixture_with_srs(
    path: &Path,
    layer: &str,
    srs_id: i32,
    organization: &str,
    coordsys_id: i64,
) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        r#"
        CREATE TABLE gpkg_spatial_ref_sys (
            srs_name TEXT NOT NULL,
            srs_id INTEGER PRIMARY KEY,
            organization TEXT NOT NULL,
            organization_coordsys_id INTEGER NOT NULL,
            definition TEXT NOT NULL,
            description TEXT
        );
        INSERT INTO gpkg_spatial_ref_sys VALUES
            ('Undefined cartesian SRS', -1, 'NONE', -1, 'undefined', NULL),
            ('Undefined geographic SRS', 0, 'NONE', 0, 'undefined', NULL),
            ('WGS 84 geodetic', 4326, 'EPSG', 4326, 'GEOGCS["WGS 84"]', NULL);
        CREATE TABLE gpkg_contents (
            table_name TEXT PRIMARY KEY,
            data_type TEXT NOT NULL,
            identifier TEXT,
            srs_id INTEGER
        );
        CREATE TABLE gpkg_geometry_columns (
            table_name TEXT NOT NULL,
            column_name TEXT NOT NULL,
            geometry_type_name TEXT NOT NULL,
            srs_id INTEGER NOT NULL,
            z TINYINT NOT NULL,
            m TINYINT NOT NULL
        );
        "#,
    )
    .unwrap();

    conn.execute(
        "INSERT OR IGNORE INTO gpkg_spatial_ref_sys VALUES (?1, ?2, ?3, ?4, 'undefined', NULL)",
        params![format!("{}:{}", organization, coordsys_id), srs_id, organization, coordsys_id],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO gpkg_contents (table_name, data_type, identifier, srs_id) VALUES (?1, 'features', ?1, ?2)",
        params![layer, srs_id],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', 'POLYGON', ?2, 0, 0)",
        params![layer, srs_id],
    )
    .unwrap();

    conn.execute_batch(&format!(
        r#"CREATE TABLE "{layer}" (
            fid INTEGER PRIMARY KEY AUTOINCREMENT,
            geom POLYGON,
            parcel_id TEXT,
            area REAL,
            floors INTEGER
        );"#
    ))
    .unwrap();

    let insert = format!(
        r#"INSERT INTO "{layer}" (geom, parcel_id, area, floors) VALUES (?1, ?2, ?3, ?4)"#
    );
    conn.execute(
        &insert,
        params![gpkg_blob(&square(320000.0, 3613000.0, 10.0), srs_id), "P-001", 100.0, 2],
    )
    .unwrap();
    conn.execute(
        &insert,
        params![Option::<Vec<u8>>::None, "P-002", 55.5, Option::<i64>::None],
    )
    .unwrap();
    conn.execute(
        &insert,
        params![
            gpkg_blob(&Geometry::Point(Point::new(320050.0, 3613050.0)), srs_id),
            "P-003",
            Option::<f64>::None,
            1
        ],
    )
    .unwrap();
}

#[test]
fn test_read_layer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parcels.gpkg");
    create_fixture(&path, "P_madeira_2024", 5016);

    let layers = gpkg::list_layers(&path).unwrap();
    assert_eq!(layers, vec!["P_madeira_2024".to_string()]);

    let collection = gpkg::read_layer(&path, "P_madeira_2024").unwrap();

    assert_eq!(collection.len(), 3);
    assert_eq!(collection.crs(), Some(Epsg::PTRA08_UTM28N));
    assert_eq!(collection.schema().geometry_column, "geom");

    // fid et geom ne sont pas des attributs scalaires
    let names: Vec<&str> = collection.schema().names().collect();
    assert_eq!(names, vec!["parcel_id", "area", "floors"]);
    let kinds: Vec<FieldKind> = collection.schema().fields.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FieldKind::Text, FieldKind::Float, FieldKind::Integer]);

    assert_eq!(collection.features()[0].geometry, Some(square(320000.0, 3613000.0, 10.0)));
    assert!(collection.features()[1].geometry.is_none());
    assert!(matches!(
        collection.features()[2].geometry,
        Some(Geometry::Point(_))
    ));

    assert_eq!(collection.value(0, "parcel_id"), Some(&Value::from("P-001")));
    assert_eq!(collection.value(1, "floors"), Some(&Value::Null));
    assert_eq!(collection.value(2, "floors"), Some(&Value::Integer(1)));
}

#[test]
fn test_undefined_srs_gives_no_crs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("undefined.gpkg");
    create_fixture(&path, "layer", 0);

    let collection = gpkg::read_layer(&path, "layer").unwrap();
    assert_eq!(collection.crs(), None);
}

#[test]
fn test_crs_comes_from_spatial_ref_sys() {
    let dir = tempfile::tempdir().unwrap();

    // srs_id local au fichier, différent du code EPSG
    let path = dir.path().join("custom_srs.gpkg");
    create_fixture_with_srs(&path, "layer", 100000, "EPSG", 5016);
    let collection = gpkg::read_layer(&path, "layer").unwrap();
    assert_eq!(collection.crs(), Some(Epsg::PTRA08_UTM28N));
    assert_eq!(collection.len(), 3);

    // srs_id égal à un code EPSG mais défini par une autre organisation
    let path = dir.path().join("esri.gpkg");
    create_fixture_with_srs(&path, "layer", 5016, "ESRI", 102100);
    let collection = gpkg::read_layer(&path, "layer").unwrap();
    assert_eq!(collection.crs(), None);
}

#[test]
fn test_3d_geometry_fails_the_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("3d.gpkg");
    create_fixture(&path, "layer", 5016);

    // POINT Z (320000 3613000 12.5) en WKB ISO
    let mut wkb = vec![1u8];
    wkb.extend_from_slice(&1001u32.to_le_bytes());
    for v in [320000.0f64, 3613000.0, 12.5] {
        wkb.extend_from_slice(&v.to_le_bytes());
    }
    let mut blob = b"GP\x00\x01".to_vec();
    blob.extend_from_slice(&5016i32.to_le_bytes());
    blob.extend_from_slice(&wkb);

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        r#"INSERT INTO "layer" (geom, parcel_id) VALUES (?1, 'P-3D')"#,
        params![blob],
    )
    .unwrap();
    drop(conn);

    match gpkg::read_layer(&path, "layer").unwrap_err() {
        GeoTableError::ParseError { reason, .. } => {
            assert!(reason.contains("feature 4"), "reason: {}", reason);
            assert!(reason.contains("Z coordinates"), "reason: {}", reason);
        }
        other => panic!("Expected ParseError, got {:?}", other),
    }
}

#[test]
fn test_missing_layer_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("parcels.gpkg");
    create_fixture(&path, "P_madeira_2024", 5016);

    let err = gpkg::read_layer(&path, "P_madeira_1999").unwrap_err();
    assert!(matches!(err, GeoTableError::NotFound(_)), "got {:?}", err);
}

#[test]
fn test_missing_file_is_not_found() {
    let err = gpkg::read_layer(Path::new("/nonexistent/Parcelas.gpkg"), "P_madeira_2024")
        .unwrap_err();
    assert!(matches!(err, GeoTableError::NotFound(_)));
}

#[test]
fn test_not_a_geopackage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.sqlite");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE t (x INTEGER);")
        .unwrap();

    let err = gpkg::read_layer(&path, "t").unwrap_err();
    assert!(err.is_parse(), "got {:?}", err);
}

#[test]
fn test_corrupt_geometry_fails_the_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corrupt.gpkg");
    create_fixture(&path, "layer", 5016);

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        r#"INSERT INTO "layer" (geom, parcel_id) VALUES (?1, 'P-BAD')"#,
        params![b"GP\x00\x01\x94\x13\x00\x00\x01\x03".to_vec()],
    )
    .unwrap();
    drop(conn);

    let err = gpkg::read_layer(&path, "layer").unwrap_err();
    match err {
        GeoTableError::ParseError { reason, .. } => {
            assert!(reason.contains("feature 4"), "reason: {}", reason)
        }
        other => panic!("Expected ParseError, got {:?}", other),
    }
}
