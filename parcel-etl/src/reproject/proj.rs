//! Reprojection de géométries avec PROJ
//!
//! Disponible uniquement avec le feature `reproject`.

use geo::{Coord, Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use proj::Proj;

use crate::error::{EtlError, Result};

/// Reprojection entre deux systèmes de coordonnées via PROJ
pub struct Reprojector {
    proj: Proj,
    source_epsg: u32,
    target_epsg: u32,
}

impl Reprojector {
    /// Crée un nouveau reprojector entre deux EPSG
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);

        let proj = Proj::new_known_crs(&source, &target, None).map_err(|e| {
            EtlError::Projection(format!(
                "Failed to create projection from {} to {}: {}",
                source, target, e
            ))
        })?;

        Ok(Self {
            proj,
            source_epsg,
            target_epsg,
        })
    }

    pub fn source_epsg(&self) -> u32 {
        self.source_epsg
    }

    pub fn target_epsg(&self) -> u32 {
        self.target_epsg
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        match geom {
            Geometry::Point(p) => Ok(Geometry::Point(Point::from(self.transform_coord(p.0)?))),
            Geometry::Line(l) => Ok(Geometry::Line(geo::Line::new(
                self.transform_coord(l.start)?,
                self.transform_coord(l.end)?,
            ))),
            Geometry::LineString(ls) => Ok(Geometry::LineString(self.transform_linestring(ls)?)),
            Geometry::Polygon(p) => Ok(Geometry::Polygon(self.transform_polygon(p)?)),
            Geometry::MultiPoint(mp) => {
                let points = mp
                    .iter()
                    .map(|p| self.transform_coord(p.0).map(Point::from))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Geometry::MultiPoint(MultiPoint::new(points)))
            }
            Geometry::MultiLineString(mls) => {
                let lines = mls
                    .iter()
                    .map(|ls| self.transform_linestring(ls))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Geometry::MultiLineString(MultiLineString::new(lines)))
            }
            Geometry::MultiPolygon(mp) => {
                let polys = mp
                    .iter()
                    .map(|p| self.transform_polygon(p))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Geometry::MultiPolygon(MultiPolygon::new(polys)))
            }
            Geometry::GeometryCollection(gc) => {
                let geoms = gc
                    .iter()
                    .map(|g| self.transform_geometry(g))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Geometry::GeometryCollection(geo::GeometryCollection(geoms)))
            }
            Geometry::Rect(r) => Ok(Geometry::Polygon(self.transform_polygon(&r.to_polygon())?)),
            Geometry::Triangle(t) => {
                Ok(Geometry::Polygon(self.transform_polygon(&t.to_polygon())?))
            }
        }
    }

    fn transform_coord(&self, coord: Coord) -> Result<Coord> {
        let (x, y) = self
            .proj
            .convert((coord.x, coord.y))
            .map_err(|e| EtlError::Projection(format!("Coordinate transformation failed: {}", e)))?;
        Ok(Coord { x, y })
    }

    /// Transforme une LineString (conversion par lot)
    fn transform_linestring(&self, ls: &LineString) -> Result<LineString> {
        let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

        self.proj.convert_array(&mut coords).map_err(|e| {
            EtlError::Projection(format!("Batch coordinate transformation failed: {}", e))
        })?;

        Ok(LineString::new(
            coords.into_iter().map(|(x, y)| Coord { x, y }).collect(),
        ))
    }

    fn transform_polygon(&self, p: &Polygon) -> Result<Polygon> {
        let exterior = self.transform_linestring(p.exterior())?;
        let interiors = p
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon::new(exterior, interiors))
    }
}
