use std::sync::Arc;

use crate::error::{FeatureError, Result};
use crate::geodesy::GeodeticPoint;
use crate::model::feature::NearbyFeature;
use crate::store::SpatialStore;

/// Radius queries over processed features.
pub struct ProximityQuery<S: SpatialStore> {
    store: Arc<S>,
    default_radius_m: f64,
}

impl<S: SpatialStore> ProximityQuery<S> {
    pub fn new(store: Arc<S>, default_radius_m: f64) -> Self {
        Self {
            store,
            default_radius_m,
        }
    }

    /// Processed features whose footprint lies within `radius_m` meters of (`lat`, `lon`),
    /// nearest first. Equal distances are ordered by feature id so repeated queries agree.
    ///
    /// `radius_m` falls back to the configured default when `None`.
    pub fn features_near(
        &self,
        lat: f64,
        lon: f64,
        radius_m: Option<f64>,
    ) -> Result<Vec<NearbyFeature>> {
        let center = GeodeticPoint::new(lat, lon).inspect_err(|err| log::warn!("{}", err))?;
        let radius_m = radius_m.unwrap_or(self.default_radius_m);
        if !(radius_m.is_finite() && radius_m > 0.0) {
            log::warn!("Rejected query radius {}", radius_m);
            return Err(FeatureError::validation(format!(
                "Radius must be a positive number of meters, got {}",
                radius_m
            )));
        }

        let nearby: Vec<NearbyFeature> = self
            .store
            .within_radius(&center, radius_m)?
            .into_iter()
            .map(|(stored, distance_m)| NearbyFeature {
                feature: stored.view(),
                distance_m,
            })
            .collect();
        log::debug!(
            "{} features within {} m of ({}, {})",
            nearby.len(),
            radius_m,
            lat,
            lon
        );
        Ok(nearby)
    }
}
