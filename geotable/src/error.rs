//! Types d'erreurs pour le crate geotable

use thiserror::Error;

/// Erreurs pouvant survenir lors de la lecture d'une table géographique
#[derive(Debug, Error)]
pub enum GeoTableError {
    /// Fichier ou couche introuvable
    #[error("Not found: {0}")]
    NotFound(String),

    /// Erreur d'I/O lors de la lecture du fichier
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur SQLite (GeoPackage)
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Erreur de parsing d'un fichier (structure tabulaire, encodage, WKT)
    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },

    /// Géométrie invalide (blob GeoPackage ou WKT)
    #[error("Invalid geometry for {entity_id}: {reason}")]
    InvalidGeometry { entity_id: String, reason: String },

    /// Enregistrement incompatible avec le schéma de la table
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl GeoTableError {
    /// Crée une erreur de parsing avec contexte
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(entity_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            entity_id: entity_id.into(),
            reason: reason.into(),
        }
    }

    /// Vrai pour les erreurs qui relèvent du contenu (et non de l'accès au fichier)
    pub fn is_parse(&self) -> bool {
        matches!(
            self,
            Self::ParseError { .. } | Self::InvalidGeometry { .. } | Self::SchemaMismatch(_)
        )
    }
}
