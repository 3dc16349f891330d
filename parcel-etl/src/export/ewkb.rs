//! EWKB PostGIS (WKB étendu avec SRID)

use geo::Geometry;
use geozero::wkb::Ewkb;
use geozero::ToGeo;
use wkb::geom_to_wkb;

/// Flag SRID dans le type géométrie EWKB
const SRID_FLAG: u32 = 0x2000_0000;

/// Convertit une géométrie geo en EWKB PostGIS
pub fn to_ewkb(geom: &Geometry, srid: u32) -> Result<Vec<u8>, String> {
    let wkb = geom_to_wkb(geom).map_err(|e| format!("Failed to convert geometry to WKB: {:?}", e))?;
    add_srid_to_wkb(&wkb, srid)
}

/// Ajoute le SRID au WKB pour créer du EWKB
fn add_srid_to_wkb(wkb: &[u8], srid: u32) -> Result<Vec<u8>, String> {
    if wkb.len() < 5 {
        return Err(format!("WKB too short ({} bytes)", wkb.len()));
    }

    let little_endian = wkb[0] == 1;
    let type_bytes = [wkb[1], wkb[2], wkb[3], wkb[4]];

    let mut ewkb = Vec::with_capacity(wkb.len() + 4);
    ewkb.push(wkb[0]);

    if little_endian {
        let geom_type = u32::from_le_bytes(type_bytes) | SRID_FLAG;
        ewkb.extend_from_slice(&geom_type.to_le_bytes());
        ewkb.extend_from_slice(&srid.to_le_bytes());
    } else {
        let geom_type = u32::from_be_bytes(type_bytes) | SRID_FLAG;
        ewkb.extend_from_slice(&geom_type.to_be_bytes());
        ewkb.extend_from_slice(&srid.to_be_bytes());
    }

    ewkb.extend_from_slice(&wkb[5..]);
    Ok(ewkb)
}

/// SRID porté par un EWKB, `None` s'il n'y en a pas (ou 0)
pub fn srid_of(ewkb: &[u8]) -> Option<u32> {
    if ewkb.len() < 9 {
        return None;
    }
    let little_endian = ewkb[0] == 1;
    let read = |bytes: [u8; 4]| {
        if little_endian {
            u32::from_le_bytes(bytes)
        } else {
            u32::from_be_bytes(bytes)
        }
    };

    let geom_type = read([ewkb[1], ewkb[2], ewkb[3], ewkb[4]]);
    if geom_type & SRID_FLAG == 0 {
        return None;
    }
    let srid = read([ewkb[5], ewkb[6], ewkb[7], ewkb[8]]);
    (srid > 0).then_some(srid)
}

/// Décode un EWKB (ou WKB simple) en géométrie geo
pub fn from_ewkb(ewkb: &[u8]) -> Result<Geometry, String> {
    Ewkb(ewkb.to_vec())
        .to_geo()
        .map_err(|e| format!("invalid EWKB: {}", e))
}
