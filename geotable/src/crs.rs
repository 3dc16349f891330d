//! Normalisation du CRS d'une collection (sans transformation des coordonnées)

use crate::types::{Epsg, FeatureCollection};

/// Politique explicite d'étiquetage du CRS, choisie par pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsPolicy {
    /// Attribue le CRS uniquement si la collection n'en a pas
    AssumeWhenMissing(Epsg),
    /// Déclare le CRS même si la collection en a déjà un (pas de transformation)
    Declare(Epsg),
}

impl CrsPolicy {
    /// CRS qui sera porté par la collection si elle n'en a pas
    pub fn epsg(self) -> Epsg {
        match self {
            CrsPolicy::AssumeWhenMissing(epsg) | CrsPolicy::Declare(epsg) => epsg,
        }
    }
}

impl FeatureCollection {
    /// Attribue `epsg` si aucun CRS n'est défini; no-op sinon.
    ///
    /// Les coordonnées ne sont jamais modifiées.
    pub fn assign_crs_if_missing(mut self, epsg: Epsg) -> Self {
        if self.crs().is_none() {
            self.set_crs(Some(epsg));
        }
        self
    }

    /// Déclare `epsg` sans transformer les coordonnées, même si un CRS existe
    pub fn override_crs(mut self, epsg: Epsg) -> Self {
        self.set_crs(Some(epsg));
        self
    }

    /// Applique une politique de CRS
    pub fn apply_crs_policy(self, policy: CrsPolicy) -> Self {
        match policy {
            CrsPolicy::AssumeWhenMissing(epsg) => self.assign_crs_if_missing(epsg),
            CrsPolicy::Declare(epsg) => self.override_crs(epsg),
        }
    }
}
