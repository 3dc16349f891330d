//! Erreurs des pipelines

use geotable::GeoTableError;
use thiserror::Error;

/// Erreurs pouvant interrompre un pipeline.
///
/// Aucune n'est rattrapée: elles remontent jusqu'au binaire.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Fichier ou couche introuvable
    #[error("Not found: {0}")]
    NotFound(String),

    /// Contenu source invalide (WKT, structure tabulaire, encodage, blob géométrie)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Impossible d'obtenir une connexion à la base
    #[error("Connection error: {0}")]
    Connection(String),

    /// Requête SQL en échec ou résultat inexploitable
    #[error("Query error: {0}")]
    Query(String),

    /// Reprojection impossible (CRS source absent, couple non supporté)
    #[error("Projection error: {0}")]
    Projection(String),

    /// Le sink refuse l'écriture
    #[error("Write error: {0}")]
    Write(String),

    /// Rendu de carte impossible
    #[error("Render error: {0}")]
    Render(String),

    /// Configuration invalide
    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EtlError>;

impl From<GeoTableError> for EtlError {
    fn from(err: GeoTableError) -> Self {
        match err {
            GeoTableError::NotFound(what) => EtlError::NotFound(what),
            other => EtlError::Parse(other.to_string()),
        }
    }
}

impl From<tokio_postgres::Error> for EtlError {
    fn from(err: tokio_postgres::Error) -> Self {
        EtlError::Query(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for EtlError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        EtlError::Connection(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_geotable_error() {
        let err: EtlError = GeoTableError::NotFound("layer 'x'".into()).into();
        assert!(matches!(err, EtlError::NotFound(_)));

        let err: EtlError = GeoTableError::parse_error("a.csv", "row 2: invalid WKT").into();
        match err {
            EtlError::Parse(msg) => assert!(msg.contains("row 2")),
            other => panic!("Expected Parse, got {:?}", other),
        }
    }
}
