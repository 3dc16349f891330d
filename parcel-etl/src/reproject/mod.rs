//! Reprojection des collections
//!
//! Utilise la reprojection légère (Rust pur) quand le couple EPSG est couvert,
//! et PROJ sinon si le feature `reproject` est activé.

pub mod lite;
#[cfg(feature = "reproject")]
pub mod proj;

use geo::Geometry;
use geotable::{Epsg, FeatureCollection};
use tracing::{debug, info};

use crate::error::{EtlError, Result};
pub use lite::ReprojectorLite;

/// Vérifie si PROJ est disponible
pub fn proj_available() -> bool {
    cfg!(feature = "reproject")
}

/// Reprojection intelligente
pub enum SmartReprojector {
    /// Reprojection légère (Rust pur)
    Lite(ReprojectorLite),
    /// Reprojection via PROJ (si feature activée)
    #[cfg(feature = "reproject")]
    Proj(proj::Reprojector),
    /// Pas de reprojection (source == cible)
    Identity,
}

impl SmartReprojector {
    /// Crée un nouveau reprojector
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if source_epsg == target_epsg {
            return Ok(Self::Identity);
        }

        if ReprojectorLite::is_supported(source_epsg, target_epsg) {
            return Ok(Self::Lite(ReprojectorLite::new(source_epsg, target_epsg)?));
        }

        #[cfg(feature = "reproject")]
        {
            Ok(Self::Proj(proj::Reprojector::new(source_epsg, target_epsg)?))
        }

        #[cfg(not(feature = "reproject"))]
        Err(EtlError::Projection(format!(
            "Reprojection EPSG:{} → EPSG:{} non supportée. \
             Systèmes supportés sans PROJ: 4326, 3857, 5016, 32628. \
             Pour d'autres projections, compilez avec: cargo build --features reproject",
            source_epsg, target_epsg
        )))
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        match self {
            Self::Identity => Ok(geom.clone()),
            Self::Lite(lite) => lite.transform_geometry(geom),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_geometry(geom),
        }
    }

    /// Retourne une description du reprojector utilisé
    pub fn description(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Lite(_) => "reproject_lite (pure Rust)",
            #[cfg(feature = "reproject")]
            Self::Proj(_) => "proj (PROJ library)",
        }
    }
}

/// Reprojette toutes les géométries d'une collection vers `target`.
///
/// La source n'est pas modifiée; la collection retournée porte le CRS `target`.
///
/// # Errors
///
/// `Projection` si la collection n'a pas de CRS ou si le couple n'est pas supporté.
pub fn reproject(collection: &FeatureCollection, target: Epsg) -> Result<FeatureCollection> {
    let source = collection.crs().ok_or_else(|| {
        EtlError::Projection(format!(
            "cannot reproject to {}: source collection has no CRS",
            target
        ))
    })?;

    let reprojector = SmartReprojector::new(source.code(), target.code())?;
    debug!(
        from = %source,
        to = %target,
        backend = reprojector.description(),
        "Reprojecting collection"
    );

    let reprojected =
        collection.try_map_geometries(Some(target), |g| reprojector.transform_geometry(g))?;

    info!(
        features = reprojected.len(),
        from = %source,
        to = %target,
        "Reprojected"
    );
    Ok(reprojected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;
    use geotable::{Feature, Field, FieldKind, Schema, Value};

    fn points(crs: Option<Epsg>) -> FeatureCollection {
        FeatureCollection::from_features(
            Schema::new(vec![Field::new("OWNER", FieldKind::Text)], "geometry"),
            vec![
                Feature::new(
                    Some(Geometry::Point(Point::new(-16.91, 32.66))),
                    vec![Value::from("Alice")],
                ),
                Feature::new(None, vec![Value::from("Bob")]),
            ],
            crs,
        )
        .unwrap()
    }

    #[test]
    fn test_identity() {
        let r = SmartReprojector::new(4326, 4326).unwrap();
        assert!(matches!(r, SmartReprojector::Identity));
    }

    #[test]
    fn test_lite() {
        let r = SmartReprojector::new(5016, 4326).unwrap();
        assert!(matches!(r, SmartReprojector::Lite(_)));
    }

    #[cfg(not(feature = "reproject"))]
    #[test]
    fn test_unsupported_without_proj() {
        let err = SmartReprojector::new(2154, 4326).err().unwrap();
        assert!(matches!(err, EtlError::Projection(_)));
    }

    #[test]
    fn test_reproject_without_crs_fails() {
        let err = reproject(&points(None), Epsg::WGS84).unwrap_err();
        assert!(matches!(err, EtlError::Projection(_)));
    }

    #[test]
    fn test_reproject_updates_tag_and_coordinates() {
        let source = points(Some(Epsg::WGS84));
        let projected = reproject(&source, Epsg::PTRA08_UTM28N).unwrap();

        assert_eq!(projected.crs(), Some(Epsg::PTRA08_UTM28N));
        match &projected.features()[0].geometry {
            Some(Geometry::Point(p)) => {
                assert!((p.x() - 320900.0).abs() < 1000.0, "x={}", p.x());
                assert!((p.y() - 3615200.0).abs() < 1000.0, "y={}", p.y());
            }
            other => panic!("Expected Point, got {:?}", other),
        }
        assert!(projected.features()[1].geometry.is_none());
        assert_eq!(projected.value(1, "OWNER"), Some(&Value::from("Bob")));

        // Source intacte
        assert_eq!(source.crs(), Some(Epsg::WGS84));
        assert_eq!(
            source.features()[0].geometry,
            Some(Geometry::Point(Point::new(-16.91, 32.66)))
        );
    }

    #[test]
    fn test_reproject_same_crs_is_identity() {
        let source = points(Some(Epsg::WGS84));
        let projected = reproject(&source, Epsg::WGS84).unwrap();
        assert_eq!(projected, source);
    }
}
