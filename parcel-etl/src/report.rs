//! Rapport d'exécution d'un pipeline

use std::path::Path;
use std::time::Duration;

use geotable::Epsg;
use serde::Serialize;

use crate::error::{EtlError, Result};

/// Résultat d'une exécution réussie
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Nom du pipeline (`parcel-export`, `csv-import`...)
    pub pipeline: String,
    /// Enregistrements lus à la source
    pub records_read: usize,
    /// Enregistrements écrits (ou affichés sur la carte)
    pub records_written: usize,
    /// Fichier ou table cible
    pub sink: String,
    /// CRS des données lues (EPSG)
    pub crs_in: Option<u32>,
    /// CRS des données écrites (EPSG)
    pub crs_out: Option<u32>,
    pub duration_secs: f64,
}

impl RunReport {
    pub fn new(pipeline: &str, sink: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.to_string(),
            records_read: 0,
            records_written: 0,
            sink: sink.into(),
            crs_in: None,
            crs_out: None,
            duration_secs: 0.0,
        }
    }

    pub fn with_crs(mut self, crs_in: Option<Epsg>, crs_out: Option<Epsg>) -> Self {
        self.crs_in = crs_in.map(Epsg::code);
        self.crs_out = crs_out.map(Epsg::code);
        self
    }

    /// Définit la durée de l'exécution
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| EtlError::Write(format!("report: {}", e)))?;
        std::fs::write(path, json)
            .map_err(|e| EtlError::Write(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    /// Message de fin affiché par le CLI
    pub fn summary(&self) -> String {
        let crs = |c: Option<u32>| c.map(|c| format!("EPSG:{}", c)).unwrap_or_else(|| "-".into());
        format!(
            "{}: {} read, {} written to {} ({} -> {}) in {:.2}s",
            self.pipeline,
            self.records_read,
            self.records_written,
            self.sink,
            crs(self.crs_in),
            crs(self.crs_out),
            self.duration_secs
        )
    }
}
