//! Configuration des pipelines

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use geotable::{CrsPolicy, DelimitedOptions, Epsg};

use crate::error::{EtlError, Result};
use crate::export::map::MapOptions;
use crate::export::postgres::TableRef;

/// Presets embarqués
pub const PRESETS: &[&str] = &["madeira"];

/// Configuration principale: une section par pipeline
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EtlConfig {
    pub parcel_export: ParcelExportConfig,
    pub property_map: PropertyMapConfig,
    pub csv_import: CsvImportConfig,
    pub csv_map: CsvMapConfig,
}

/// GeoPackage → classeur xlsx
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ParcelExportConfig {
    /// Fichier GeoPackage source
    pub source: PathBuf,

    /// Couches à exporter, dans l'ordre des feuilles
    pub layers: Vec<LayerSheet>,

    /// Nom de la colonne WKT ajoutée
    #[serde(default = "default_wkt_column")]
    pub wkt_column: String,

    pub output: PathBuf,
}

/// Couche source et feuille cible
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerSheet {
    pub layer: String,
    pub sheet: String,
}

/// Requête PostGIS → carte HTML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PropertyMapConfig {
    pub query: String,

    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,

    /// CRS attribué si la base ne renvoie pas de SRID
    #[serde(default = "default_assume_wgs84")]
    pub crs: CrsPolicySpec,

    #[serde(default)]
    pub map: MapOptions,

    pub output: PathBuf,
}

/// CSV (WKT) → table PostGIS, mode remplacement
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsvImportConfig {
    pub source: CsvSource,

    /// CRS des coordonnées du fichier
    pub crs: CrsPolicySpec,

    /// CRS de la table écrite
    #[serde(default = "default_target_crs")]
    pub target_crs: u32,

    /// Table cible `schema.table`
    pub table: String,
}

impl CsvImportConfig {
    pub fn table_ref(&self) -> Result<TableRef> {
        self.table.parse().map_err(EtlError::Config)
    }
}

/// CSV (WKT) → carte HTML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsvMapConfig {
    pub source: CsvSource,

    #[serde(default = "default_assume_wgs84")]
    pub crs: CrsPolicySpec,

    #[serde(default)]
    pub map: MapOptions,

    pub output: PathBuf,
}

/// Fichier délimité avec une colonne WKT
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsvSource {
    pub path: PathBuf,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default = "default_encoding")]
    pub encoding: String,

    #[serde(default = "default_geometry_column")]
    pub geometry_column: String,
}

impl CsvSource {
    /// Options du lecteur; le séparateur doit être un caractère ASCII
    pub fn options(&self) -> Result<DelimitedOptions> {
        if !self.delimiter.is_ascii() {
            return Err(EtlError::Config(format!(
                "delimiter must be an ASCII character, got '{}'",
                self.delimiter
            )));
        }
        Ok(DelimitedOptions {
            delimiter: self.delimiter as u8,
            encoding: self.encoding.clone(),
            geometry_column: self.geometry_column.clone(),
        })
    }
}

/// Politique de CRS telle qu'écrite dans le JSON:
/// `{"assume_when_missing": 4326}` ou `{"declare": 5016}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrsPolicySpec {
    AssumeWhenMissing(u32),
    Declare(u32),
}

impl From<CrsPolicySpec> for CrsPolicy {
    fn from(spec: CrsPolicySpec) -> Self {
        match spec {
            CrsPolicySpec::AssumeWhenMissing(code) => CrsPolicy::AssumeWhenMissing(Epsg(code)),
            CrsPolicySpec::Declare(code) => CrsPolicy::Declare(Epsg(code)),
        }
    }
}

fn default_wkt_column() -> String {
    "geometry_wkt".to_string()
}

fn default_geometry_column() -> String {
    "geometry".to_string()
}

fn default_delimiter() -> char {
    ';'
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_target_crs() -> u32 {
    Epsg::WGS84.code()
}

fn default_assume_wgs84() -> CrsPolicySpec {
    CrsPolicySpec::AssumeWhenMissing(Epsg::WGS84.code())
}

impl EtlConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            EtlError::Config(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "madeira" => Self::load_embedded(include_str!("presets/madeira.json")),
            _ => Err(EtlError::Config(format!(
                "Unknown preset: {}. Use: {}",
                preset,
                PRESETS.join(", ")
            ))),
        }
    }

    /// Nom de preset ou chemin vers un JSON
    pub fn resolve(spec: &str) -> Result<Self> {
        if PRESETS.contains(&spec) {
            Self::from_preset(spec)
        } else {
            Self::load(Path::new(spec))
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| EtlError::Config(format!("Failed to parse embedded config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_madeira_preset() {
        let config = EtlConfig::from_preset("madeira").unwrap();

        let export = &config.parcel_export;
        assert_eq!(export.source, PathBuf::from("data/Parcelas_madeira.gpkg"));
        assert_eq!(
            export.layers,
            vec![
                LayerSheet {
                    layer: "P_madeira_2024".into(),
                    sheet: "Parcelas_2024".into()
                },
                LayerSheet {
                    layer: "P_madeira_2023".into(),
                    sheet: "Parcelas_2023".into()
                },
            ]
        );
        assert_eq!(export.wkt_column, "geometry_wkt");
        assert_eq!(export.output, PathBuf::from("data/Parcelas_Madeira.xlsx"));

        let map = &config.property_map;
        assert!(map.query.contains("public.properties_data"));
        assert_eq!(map.map.tooltip_fields, vec!["objectid", "owner"]);
        assert_eq!(map.map.center, [32.65, -16.9]);
        assert_eq!(map.map.zoom, 12);
        assert_eq!(map.output, PathBuf::from("map.html"));

        let import = &config.csv_import;
        assert_eq!(import.crs, CrsPolicySpec::Declare(5016));
        assert_eq!(import.target_crs, 4326);
        assert_eq!(
            import.table_ref().unwrap(),
            TableRef::new("public", "properties_data")
        );

        let csv_map = &config.csv_map;
        assert_eq!(csv_map.crs, CrsPolicySpec::AssumeWhenMissing(4326));
        assert_eq!(csv_map.map.tooltip_fields, vec!["OBJECTID", "OWNER"]);
        assert_eq!(csv_map.output, PathBuf::from("map_properties.html"));
    }

    #[test]
    fn test_unknown_preset() {
        let err = EtlConfig::from_preset("lisboa").unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_resolve_missing_file() {
        let err = EtlConfig::resolve("/nonexistent/config.json").unwrap_err();
        assert!(matches!(err, EtlError::Config(_)));
    }

    #[test]
    fn test_load_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "parcel_export": {
                    "source": "p.gpkg",
                    "layers": [{"layer": "a", "sheet": "A"}],
                    "output": "p.xlsx"
                },
                "property_map": {"query": "SELECT 1", "output": "m.html"},
                "csv_import": {
                    "source": {"path": "in.csv"},
                    "crs": {"declare": 32628},
                    "table": "properties"
                },
                "csv_map": {"source": {"path": "in.csv", "delimiter": ","}, "output": "c.html"}
            }"#,
        )
        .unwrap();

        let config = EtlConfig::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(config.parcel_export.wkt_column, "geometry_wkt");
        assert_eq!(config.property_map.geometry_column, "geometry");
        assert_eq!(
            config.property_map.crs,
            CrsPolicySpec::AssumeWhenMissing(4326)
        );
        assert_eq!(config.property_map.map, MapOptions::default());
        assert_eq!(
            config.csv_import.table_ref().unwrap(),
            TableRef::new("public", "properties")
        );

        let options = config.csv_map.source.options().unwrap();
        assert_eq!(options.delimiter, b',');
        assert_eq!(options.encoding, "utf-8");
        assert_eq!(options.geometry_column, "geometry");
    }

    #[test]
    fn test_non_ascii_delimiter() {
        let source = CsvSource {
            path: "in.csv".into(),
            delimiter: '§',
            encoding: "utf-8".into(),
            geometry_column: "geometry".into(),
        };
        assert!(matches!(source.options(), Err(EtlError::Config(_))));
    }

    #[test]
    fn test_crs_policy_conversion() {
        assert_eq!(
            CrsPolicy::from(CrsPolicySpec::Declare(5016)),
            CrsPolicy::Declare(Epsg::PTRA08_UTM28N)
        );
        let parsed: CrsPolicySpec = serde_json::from_str(r#"{"assume_when_missing": 4326}"#).unwrap();
        assert_eq!(parsed, CrsPolicySpec::AssumeWhenMissing(4326));
    }
}
