//! Projection Web Mercator (EPSG:3857)
//!
//! Modèle sphérique sur le rayon équatorial WGS84.

use super::ellipsoid::WGS84;
use super::Geographic;

/// Latitude maximale représentable (au-delà, y diverge)
const MAX_LAT_DEG: f64 = 85.06;

/// Convertit coordonnées géographiques vers Web Mercator
pub fn geographic_to_web_mercator(geo: Geographic) -> (f64, f64) {
    let r = WGS84.a;
    let lat = geo
        .lat
        .clamp(-MAX_LAT_DEG.to_radians(), MAX_LAT_DEG.to_radians());

    let x = r * geo.lon;
    let y = r * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln();

    (x, y)
}

/// Convertit Web Mercator vers coordonnées géographiques
pub fn web_mercator_to_geographic(x: f64, y: f64) -> Geographic {
    let r = WGS84.a;

    let lon = x / r;
    let lat = 2.0 * (y / r).exp().atan() - std::f64::consts::FRAC_PI_2;

    Geographic::new(lon, lat)
}
