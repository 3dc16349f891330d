//! Pipelines: lecture → normalisation/reprojection → écriture
//!
//! Chaque pipeline prend sa section de configuration, exécute ses étapes dans
//! l'ordre et retourne un [`RunReport`](crate::report::RunReport). Toute erreur
//! interrompt le pipeline.

pub mod csv_import;
pub mod csv_map;
pub mod parcel_export;
pub mod property_map;

use geotable::{Epsg, FeatureCollection};
use tracing::debug;

use crate::error::Result;
use crate::reproject::reproject;

/// Ramène une collection en WGS84 pour la carte (no-op si déjà en 4326)
pub(crate) fn ensure_wgs84(collection: FeatureCollection) -> Result<FeatureCollection> {
    if collection.crs() == Some(Epsg::WGS84) {
        debug!("Collection already in EPSG:4326");
        return Ok(collection);
    }
    reproject(&collection, Epsg::WGS84)
}
