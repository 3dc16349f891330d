//! Décodage des blobs géométrie GeoPackage (en-tête `GP` + WKB)

use geo::Geometry;
use geozero::wkb::Wkb;
use geozero::ToGeo;

use crate::wkt::ensure_xy;

/// En-tête d'un blob géométrie GeoPackage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    /// Version du format binaire (0 = version 1)
    pub version: u8,
    /// `srs_id` porté par le blob
    pub srs_id: i32,
    /// Géométrie vide (flag E)
    pub empty: bool,
    /// Taille totale de l'en-tête (enveloppe comprise)
    pub len: usize,
}

/// Taille de l'enveloppe selon l'indicateur (bits 1-3 des flags)
fn envelope_len(indicator: u8) -> Option<usize> {
    match indicator {
        0 => Some(0),
        1 => Some(32),
        2 | 3 => Some(48),
        4 => Some(64),
        _ => None,
    }
}

/// Lit l'en-tête d'un blob GeoPackage
pub fn read_header(blob: &[u8]) -> Result<BlobHeader, String> {
    if blob.len() < 8 {
        return Err(format!("blob too short ({} bytes)", blob.len()));
    }
    if &blob[0..2] != b"GP" {
        return Err("missing GP magic".to_string());
    }

    let version = blob[2];
    let flags = blob[3];

    // Bit 5: GeoPackage étendu, non supporté
    if flags & 0b0010_0000 != 0 {
        return Err("extended GeoPackage geometry is not supported".to_string());
    }

    let little_endian = flags & 0b0000_0001 != 0;
    let indicator = (flags >> 1) & 0b0000_0111;
    let empty = flags & 0b0001_0000 != 0;

    let envelope = envelope_len(indicator)
        .ok_or_else(|| format!("invalid envelope indicator {}", indicator))?;

    let srs_bytes = [blob[4], blob[5], blob[6], blob[7]];
    let srs_id = if little_endian {
        i32::from_le_bytes(srs_bytes)
    } else {
        i32::from_be_bytes(srs_bytes)
    };

    let len = 8 + envelope;
    if blob.len() < len {
        return Err(format!(
            "blob shorter than its header ({} < {} bytes)",
            blob.len(),
            len
        ));
    }

    Ok(BlobHeader {
        version,
        srs_id,
        empty,
        len,
    })
}

/// Décode un blob GeoPackage.
///
/// Retourne `None` pour une géométrie marquée vide. Les géométries Z ou M
/// sont refusées.
pub fn decode(blob: &[u8]) -> Result<Option<Geometry>, String> {
    let header = read_header(blob)?;
    if header.empty {
        return Ok(None);
    }

    let body = &blob[header.len..];
    if body.is_empty() {
        return Err("missing WKB payload".to_string());
    }

    let wkb = Wkb(body.to_vec());
    ensure_xy(&wkb)?;
    wkb.to_geo()
        .map(Some)
        .map_err(|e| format!("invalid WKB: {}", e))
}

/// Construit un blob GeoPackage (en-tête sans enveloppe) autour d'un WKB
#[cfg(test)]
pub(crate) fn encode(wkb: &[u8], srs_id: i32) -> Vec<u8> {
    let mut blob = Vec::with_capacity(wkb.len() + 8);
    blob.extend_from_slice(b"GP");
    blob.push(0); // version 1
    blob.push(0b0000_0001); // little endian, pas d'enveloppe
    blob.extend_from_slice(&srs_id.to_le_bytes());
    blob.extend_from_slice(wkb);
    blob
}
