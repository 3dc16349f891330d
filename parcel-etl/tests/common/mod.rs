//! Fixtures partagées des tests d'intégration

#![allow(dead_code)]

use std::path::Path;

use geo::{Geometry, LineString, Polygon};
use rusqlite::{params, Connection};

/// Lignes d'exemple `OBJECTID;OWNER;geometry`
pub const OWNERS_CSV: &str = "OBJECTID;OWNER;geometry\n\
1;Alice;POINT(-16.91 32.66)\n\
2;Bob;POINT(-16.92 32.67)\n";

pub fn write_file(path: &Path, content: &str) {
    std::fs::write(path, content).unwrap();
}

/// Blob géométrie GeoPackage: en-tête `GP` sans enveloppe + WKB
pub fn gpkg_blob(geometry: &Geometry, srs_id: i32) -> Vec<u8> {
    let wkb = wkb::geom_to_wkb(geometry).unwrap();
    let mut blob = b"GP".to_vec();
    blob.push(0);
    blob.push(0b0000_0001);
    blob.extend_from_slice(&srs_id.to_le_bytes());
    blob.extend_from_slice(&wkb);
    blob
}

pub fn square(x: f64, y: f64, size: f64) -> Geometry {
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

/// GeoPackage avec deux couches de parcelles en PTRA08 / UTM 28N:
/// `P_madeira_2024` (2 parcelles) et `P_madeira_2023` (1 parcelle)
pub fn create_parcels_gpkg(path: &Path) {
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
            ('PTRA08 / UTM zone 28N', 5016, 'EPSG', 5016, 'undefined', NULL);
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

    let layers: [(&str, Vec<(&str, f64)>); 2] = [
        ("P_madeira_2024", vec![("P-001", 100.0), ("P-002", 42.5)]),
        ("P_madeira_2023", vec![("P-001", 99.0)]),
    ];

    for (layer, parcels) in layers {
        conn.execute(
            "INSERT INTO gpkg_contents VALUES (?1, 'features', ?1, 5016)",
            params![layer],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO gpkg_geometry_columns VALUES (?1, 'geom', 'POLYGON', 5016, 0, 0)",
            params![layer],
        )
        .unwrap();
        conn.execute_batch(&format!(
            r#"CREATE TABLE "{layer}" (
                fid INTEGER PRIMARY KEY AUTOINCREMENT,
                geom POLYGON,
                parcel_id TEXT,
                area REAL
            );"#
        ))
        .unwrap();

        for (i, (parcel_id, area)) in parcels.into_iter().enumerate() {
            let geometry = square(320_000.0 + 20.0 * i as f64, 3_613_000.0, 10.0);
            conn.execute(
                &format!(r#"INSERT INTO "{layer}" (geom, parcel_id, area) VALUES (?1, ?2, ?3)"#),
                params![gpkg_blob(&geometry, 5016), parcel_id, area],
            )
            .unwrap();
        }
    }
}
