//! Projection UTM (Universal Transverse Mercator), séries de Snyder
//!
//! Zone utilisée par les données de Madère: 28N (méridien central -15°),
//! sur GRS80 (PTRA08, EPSG:5016) ou WGS84 (EPSG:32628).

use super::ellipsoid::Ellipsoid;
use super::Geographic;

/// Facteur d'échelle sur le méridien central
const K0: f64 = 0.9996;

/// False easting
const X0: f64 = 500000.0;

/// Paramètres d'une zone UTM
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtmZone {
    pub zone: u32,
    pub south: bool,
    pub ellipsoid: Ellipsoid,
}

impl UtmZone {
    pub const fn new(zone: u32, south: bool, ellipsoid: Ellipsoid) -> Self {
        Self {
            zone,
            south,
            ellipsoid,
        }
    }

    /// Longitude centrale de la zone (radians)
    fn central_meridian(&self) -> f64 {
        ((self.zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians()
    }

    fn false_northing(&self) -> f64 {
        if self.south {
            10000000.0
        } else {
            0.0
        }
    }

    /// Longueur d'arc du méridien depuis l'équateur
    fn meridian_arc(&self, phi: f64) -> f64 {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        a * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }

    /// Convertit UTM vers coordonnées géographiques
    pub fn to_geographic(&self, x: f64, y: f64) -> Geographic {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = self.ellipsoid.ep2();

        let x = x - X0;
        let y = y - self.false_northing();

        // Latitude du pied de la perpendiculaire
        let m = y / K0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let n1 = a / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
        let t1 = tan_phi1.powi(2);
        let c1 = ep2 * cos_phi1.powi(2);
        let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
        let d = x / (n1 * K0);

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2)
                        - 252.0 * ep2
                        - 3.0 * c1.powi(2))
                        * d.powi(6)
                        / 720.0);

        let lon = self.central_meridian()
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                    * d.powi(5)
                    / 120.0)
                / cos_phi1;

        Geographic::new(lon, lat)
    }

    /// Convertit des coordonnées géographiques vers UTM
    pub fn from_geographic(&self, geo: Geographic) -> (f64, f64) {
        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = self.ellipsoid.ep2();

        let phi = geo.lat;
        let sin_phi = phi.sin();
        let cos_phi = phi.cos();
        let tan_phi = phi.tan();

        let n = a / (1.0 - e2 * sin_phi.powi(2)).sqrt();
        let t = tan_phi.powi(2);
        let c = ep2 * cos_phi.powi(2);
        let big_a = (geo.lon - self.central_meridian()) * cos_phi;
        let m = self.meridian_arc(phi);

        let x = K0
            * n
            * (big_a
                + (1.0 - t + c) * big_a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t.powi(2) + 72.0 * c - 58.0 * ep2) * big_a.powi(5) / 120.0)
            + X0;

        let y = K0
            * (m + n
                * tan_phi
                * (big_a.powi(2) / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c.powi(2)) * big_a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t.powi(2) + 600.0 * c - 330.0 * ep2) * big_a.powi(6)
                        / 720.0))
            + self.false_northing();

        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reproject::lite::ellipsoid::{GRS80, WGS84};

    const ZONE_28N: UtmZone = UtmZone::new(28, false, GRS80);

    #[test]
    fn test_funchal_forward() {
        // Funchal: -16.91°E, 32.65°N
        let (x, y) = ZONE_28N.from_geographic(Geographic::from_degrees(-16.91, 32.65));

        assert!((x - 320900.0).abs() < 1000.0, "x={}", x);
        assert!((y - 3614100.0).abs() < 1000.0, "y={}", y);
    }

    #[test]
    fn test_roundtrip() {
        for (lon, lat) in [(-16.91, 32.65), (-17.25, 32.8), (-16.33, 33.07)] {
            let (x, y) = ZONE_28N.from_geographic(Geographic::from_degrees(lon, lat));
            let (lon2, lat2) = ZONE_28N.to_geographic(x, y).to_degrees();
            assert!((lon - lon2).abs() < 1e-6, "lon={} -> {}", lon, lon2);
            assert!((lat - lat2).abs() < 1e-6, "lat={} -> {}", lat, lat2);
        }
    }

    #[test]
    fn test_central_meridian_on_equator() {
        let zone = UtmZone::new(28, false, WGS84);
        let (lon, lat) = zone.to_geographic(500000.0, 0.0).to_degrees();
        assert!((lon - (-15.0)).abs() < 1e-9, "lon={}", lon);
        assert!(lat.abs() < 1e-9, "lat={}", lat);
    }

    #[test]
    fn test_southern_zone() {
        // Saint-Denis (Réunion), UTM 40S
        let zone = UtmZone::new(40, true, WGS84);
        let (lon, lat) = zone.to_geographic(338000.0, 7691000.0).to_degrees();
        assert!((lon - 55.45).abs() < 0.2, "lon={}", lon);
        assert!((lat - (-20.88)).abs() < 0.2, "lat={}", lat);
    }
}
