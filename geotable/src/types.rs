//! Types de données pour le crate geotable

use std::fmt;
use std::str::FromStr;

use geo::Geometry;

use crate::GeoTableError;

/// Code EPSG d'un système de coordonnées
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epsg(pub u32);

impl Epsg {
    /// WGS 84 géographique (longitude, latitude en degrés)
    pub const WGS84: Epsg = Epsg(4326);

    /// Web Mercator (pseudo-Mercator sphérique)
    pub const WEB_MERCATOR: Epsg = Epsg(3857);

    /// PTRA08 / UTM zone 28N (Madère), système régional des données sources
    pub const PTRA08_UTM28N: Epsg = Epsg(5016);

    /// WGS 84 / UTM zone 28N
    pub const WGS84_UTM28N: Epsg = Epsg(32628);

    /// Retourne le code numérique
    pub fn code(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Epsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl From<u32> for Epsg {
    fn from(code: u32) -> Self {
        Self(code)
    }
}

impl FromStr for Epsg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .map(Epsg)
            .map_err(|_| format!("Invalid EPSG code: {}. Use e.g. 4326 or EPSG:4326", s))
    }
}

/// Type d'une colonne scalaire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Boolean,
    Integer,
    Float,
    Text,
}

/// Valeur scalaire d'un attribut
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Colonne scalaire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Schéma d'une table: colonnes scalaires ordonnées + nom de l'attribut géométrie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    /// Colonnes scalaires, dans l'ordre de la source
    pub fields: Vec<Field>,

    /// Nom de l'attribut géométrie (exclu de `fields`)
    pub geometry_column: String,
}

impl Schema {
    pub fn new(fields: Vec<Field>, geometry_column: impl Into<String>) -> Self {
        Self {
            fields,
            geometry_column: geometry_column.into(),
        }
    }

    /// Position d'une colonne scalaire
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Noms des colonnes scalaires
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Un enregistrement: une géométrie (éventuellement absente) et ses valeurs scalaires
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Géométrie, `None` quand elle est nulle dans la source
    pub geometry: Option<Geometry>,

    /// Valeurs, alignées sur `Schema::fields`
    pub values: Vec<Value>,
}

impl Feature {
    pub fn new(geometry: Option<Geometry>, values: Vec<Value>) -> Self {
        Self { geometry, values }
    }
}

/// Suite ordonnée d'enregistrements partageant un schéma et un CRS
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureCollection {
    schema: Schema,
    features: Vec<Feature>,
    crs: Option<Epsg>,
}

impl FeatureCollection {
    /// Crée une collection vide
    pub fn new(schema: Schema, crs: Option<Epsg>) -> Self {
        Self {
            schema,
            features: Vec::new(),
            crs,
        }
    }

    /// Crée une collection à partir d'enregistrements existants
    ///
    /// # Errors
    ///
    /// `SchemaMismatch` si un enregistrement n'a pas autant de valeurs que de colonnes.
    pub fn from_features(
        schema: Schema,
        features: Vec<Feature>,
        crs: Option<Epsg>,
    ) -> Result<Self, GeoTableError> {
        let mut collection = Self::new(schema, crs);
        collection.features.reserve(features.len());
        for feature in features {
            collection.push(feature)?;
        }
        Ok(collection)
    }

    /// Ajoute un enregistrement en vérifiant son arité
    pub fn push(&mut self, feature: Feature) -> Result<(), GeoTableError> {
        if feature.values.len() != self.schema.fields.len() {
            return Err(GeoTableError::SchemaMismatch(format!(
                "record {} has {} values, schema has {} fields",
                self.features.len(),
                feature.values.len(),
                self.schema.fields.len()
            )));
        }
        self.features.push(feature);
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn crs(&self) -> Option<Epsg> {
        self.crs
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Valeur d'une colonne pour un enregistrement
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.schema.index_of(column)?;
        self.features.get(row).and_then(|f| f.values.get(idx))
    }

    /// Applique une transformation à chaque géométrie non nulle.
    ///
    /// Le schéma et les valeurs sont conservés; le CRS de la nouvelle collection
    /// est `crs`.
    pub fn try_map_geometries<F, E>(&self, crs: Option<Epsg>, mut f: F) -> Result<Self, E>
    where
        F: FnMut(&Geometry) -> Result<Geometry, E>,
    {
        let features = self
            .features
            .iter()
            .map(|feature| {
                let geometry = feature.geometry.as_ref().map(&mut f).transpose()?;
                Ok(Feature {
                    geometry,
                    values: feature.values.clone(),
                })
            })
            .collect::<Result<Vec<_>, E>>()?;

        Ok(Self {
            schema: self.schema.clone(),
            features,
            crs,
        })
    }

    pub(crate) fn set_crs(&mut self, crs: Option<Epsg>) {
        self.crs = crs;
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut Schema, &mut Vec<Feature>) {
        (&mut self.schema, &mut self.features)
    }
}
