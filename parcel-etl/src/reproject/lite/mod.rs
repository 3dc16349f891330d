//! Reprojection légère en Rust pur (sans PROJ)
//!
//! Couvre les systèmes des données de Madère :
//! - PTRA08 / UTM 28N (EPSG:5016), GRS80
//! - WGS 84 / UTM 28N (EPSG:32628)
//! - WGS 84 (EPSG:4326)
//! - Web Mercator (EPSG:3857)
//!
//! PTRA08 est rattaché à l'ITRF: aucune transformation de datum n'est appliquée
//! vers WGS 84 (écart submétrique).

mod ellipsoid;
mod mercator;
mod utm;

use geo::{Coord, Geometry, MapCoords};

use crate::error::{EtlError, Result};
use ellipsoid::{GRS80, WGS84};
use utm::UtmZone;

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

const PTRA08_UTM28N: UtmZone = UtmZone::new(28, false, GRS80);
const WGS84_UTM28N: UtmZone = UtmZone::new(28, false, WGS84);

/// Système supporté par la reprojection légère
#[derive(Debug, Clone, Copy, PartialEq)]
enum LiteCrs {
    Geographic,
    WebMercator,
    Utm(UtmZone),
}

impl LiteCrs {
    fn from_epsg(epsg: u32) -> Option<Self> {
        match epsg {
            4326 => Some(Self::Geographic),
            3857 => Some(Self::WebMercator),
            5016 => Some(Self::Utm(PTRA08_UTM28N)),
            32628 => Some(Self::Utm(WGS84_UTM28N)),
            _ => None,
        }
    }

    fn to_geographic(self, x: f64, y: f64) -> Geographic {
        match self {
            Self::Geographic => Geographic::from_degrees(x, y),
            Self::WebMercator => mercator::web_mercator_to_geographic(x, y),
            Self::Utm(zone) => zone.to_geographic(x, y),
        }
    }

    fn from_geographic(self, geo: Geographic) -> (f64, f64) {
        match self {
            Self::Geographic => geo.to_degrees(),
            Self::WebMercator => mercator::geographic_to_web_mercator(geo),
            Self::Utm(zone) => zone.from_geographic(geo),
        }
    }
}

/// Reprojection légère entre deux systèmes supportés
#[derive(Debug, Clone, Copy)]
pub struct ReprojectorLite {
    source_epsg: u32,
    target_epsg: u32,
    source: LiteCrs,
    target: LiteCrs,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let source = LiteCrs::from_epsg(source_epsg).ok_or_else(|| {
            EtlError::Projection(format!(
                "EPSG:{} non supporté. Sources supportées: 4326, 3857, 5016, 32628",
                source_epsg
            ))
        })?;
        let target = LiteCrs::from_epsg(target_epsg).ok_or_else(|| {
            EtlError::Projection(format!(
                "EPSG:{} non supporté. Cibles supportées: 4326, 3857, 5016, 32628",
                target_epsg
            ))
        })?;

        Ok(Self {
            source_epsg,
            target_epsg,
            source,
            target,
        })
    }

    /// Vérifie si la reprojection est supportée
    pub fn is_supported(source: u32, target: u32) -> bool {
        LiteCrs::from_epsg(source).is_some() && LiteCrs::from_epsg(target).is_some()
    }

    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Transforme un point (x, y) de la source vers la cible
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let geo = self.source.to_geographic(x, y);
        let (tx, ty) = self.target.from_geographic(geo);

        if !tx.is_finite() || !ty.is_finite() {
            return Err(EtlError::Projection(format!(
                "({}, {}) hors du domaine de EPSG:{} → EPSG:{}",
                x, y, self.source_epsg, self.target_epsg
            )));
        }
        Ok((tx, ty))
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        geom.try_map_coords(|c: Coord| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}
