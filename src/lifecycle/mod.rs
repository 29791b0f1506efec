//! Creation, processing and removal of features.

pub mod locks;

use std::sync::Arc;

use chrono::Utc;

use crate::config::EngineConfig;
use crate::error::{FeatureError, Result};
use crate::geodesy::GeodeticPoint;
use crate::model::feature::{FeatureId, FeatureName, FeatureRecord, FeatureView, Footprint};
use crate::store::SpatialStore;

use locks::FeatureLocks;

/// Owns the `queued -> done` transition of features and computes their footprints.
pub struct FeatureLifecycle<S: SpatialStore> {
    store: Arc<S>,
    locks: FeatureLocks,
    config: EngineConfig,
}

impl<S: SpatialStore> FeatureLifecycle<S> {
    /// Fails with `FeatureError::Validation` if `config` is out of range.
    pub fn new(store: Arc<S>, config: EngineConfig) -> Result<Self> {
        config
            .validate()
            .inspect_err(|err| log::error!("Invalid engine config: {}", err))?;
        Ok(Self {
            store,
            locks: FeatureLocks::new(),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate and persist a new queued feature.
    pub fn create_feature(&self, name: &str, lat: f64, lon: f64) -> Result<FeatureId> {
        let name = FeatureName::new(name).inspect_err(|err| log::warn!("{}", err))?;
        let location = GeodeticPoint::new(lat, lon).inspect_err(|err| log::warn!("{}", err))?;
        let record = FeatureRecord::queued(name, location, Utc::now());
        let id = record.id;
        self.store.insert_feature(record)?;
        log::info!("Created feature {} at ({}, {})", id, lat, lon);
        Ok(id)
    }

    /// Buffer the feature's location by `buffer_m` meters (the configured default when `None`),
    /// mark it done and count the attempt.
    ///
    /// Processing the same id is serialized, so concurrent calls each add exactly one attempt and
    /// the stored footprint is the one computed by the last call. On failure the feature keeps
    /// its previous state.
    pub fn process_feature(&self, id: &FeatureId, buffer_m: Option<f64>) -> Result<bool> {
        let buffer_m = buffer_m.unwrap_or(self.config.default_buffer_m);
        self.validate_buffer(buffer_m)?;

        self.locks.with_lock(id, || {
            let stored = self.store.fetch(id)?.ok_or_else(|| {
                log::warn!("Cannot process unknown feature {}", id);
                FeatureError::NotFound(*id)
            })?;
            let footprint = Footprint::compute(
                *id,
                &stored.record.location,
                buffer_m,
                self.config.buffer_segments,
            );
            let committed = self.store.commit_processing(footprint, Utc::now())?;
            log::info!(
                "Processed feature {} with a {} m buffer, attempt {}",
                id,
                buffer_m,
                committed.record.attempts
            );
            Ok(true)
        })
    }

    pub fn get_feature(&self, id: &FeatureId) -> Result<FeatureView> {
        self.store
            .fetch(id)?
            .map(|stored| stored.view())
            .ok_or(FeatureError::NotFound(*id))
    }

    /// Remove a feature and its footprint.
    pub fn delete_feature(&self, id: &FeatureId) -> Result<bool> {
        self.locks.with_lock(id, || {
            if self.store.delete_feature(id)? {
                log::info!("Deleted feature {}", id);
                Ok(true)
            } else {
                Err(FeatureError::NotFound(*id))
            }
        })
    }

    fn validate_buffer(&self, buffer_m: f64) -> Result<()> {
        if buffer_m.is_finite() && buffer_m > 0.0 && buffer_m <= self.config.max_buffer_m {
            Ok(())
        } else {
            Err(FeatureError::validation(format!(
                "Buffer must be in (0, {}] meters, got {}",
                self.config.max_buffer_m, buffer_m
            )))
        }
    }
}
