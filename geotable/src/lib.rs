//! # geotable
//!
//! Tables géographiques à une colonne géométrie: un schéma de colonnes scalaires,
//! des enregistrements et un CRS unique.
//!
//! ## Features
//!
//! - Lecture des couches vecteur GeoPackage (en-tête binaire `GP` + WKB)
//! - Lecture de fichiers délimités (CSV) avec une colonne géométrie en WKT
//! - Annotation WKT des géométries et normalisation du CRS
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geotable::{gpkg, Epsg};
//! use std::path::Path;
//!
//! let parcels = gpkg::read_layer(Path::new("data/Parcelas_madeira.gpkg"), "P_madeira_2024")?;
//! let annotated = parcels.with_wkt_column("geometry_wkt")?;
//! println!("{} parcels in {:?}", annotated.len(), annotated.crs());
//! ```

pub mod crs;
pub mod delimited;
pub mod error;
pub mod gpkg;
pub mod types;
pub mod wkt;

pub use crs::CrsPolicy;
pub use delimited::{read_delimited, DelimitedOptions};
pub use error::GeoTableError;
pub use types::{Epsg, Feature, FeatureCollection, Field, FieldKind, Schema, Value};
pub use wkt::{parse_wkt, to_wkt};
