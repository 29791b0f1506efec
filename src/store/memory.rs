use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};

use crate::error::{FeatureError, Result};
use crate::geodesy::GeodeticPoint;
use crate::model::feature::{FeatureId, FeatureRecord, FeatureStatus, Footprint, StoredFeature};

use super::SpatialStore;

/// Lon/lat bounding box of a footprint, tagged with its owning feature.
type FootprintEnvelope = GeomWithData<Rectangle<[f64; 2]>, FeatureId>;

/// Lower bound of the length of one degree of latitude on WGS84, in meters. Also a lower bound of
/// one degree of longitude at the equator.
const MIN_METERS_PER_DEGREE: f64 = 110_574.0;

#[derive(Default)]
struct StoreState {
    features: HashMap<FeatureId, FeatureRecord>,
    footprints: HashMap<FeatureId, Footprint>,
    index: RTree<FootprintEnvelope>,
}

/// A `SpatialStore` held in memory.
///
/// Features and footprints are keyed by feature id, so a feature has at most one footprint.
/// Footprint envelopes are indexed in an R-tree. All state sits behind one lock, which makes a
/// processing commit (status, attempts, footprint and index entry) one atomic unit for readers.
#[derive(Default)]
pub struct InMemorySpatialStore {
    state: RwLock<StoreState>,
}

impl InMemorySpatialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| FeatureError::store_unavailable("Store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| FeatureError::store_unavailable("Store lock poisoned"))
    }

    #[cfg(test)]
    fn indexed_footprints(&self) -> usize {
        self.read().unwrap().index.size()
    }
}

fn footprint_envelope(footprint: &Footprint) -> Option<FootprintEnvelope> {
    let rect = footprint.bounding_rect()?;
    Some(FootprintEnvelope::new(
        Rectangle::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
        footprint.feature_id,
    ))
}

/// Boxes that together contain every point within `radius_m` of `center`.
///
/// Footprint longitudes may be unwrapped past the antimeridian, so the box is repeated one turn
/// east and west.
fn search_envelopes(center: &GeodeticPoint, radius_m: f64) -> Vec<AABB<[f64; 2]>> {
    let delta_lat = radius_m / MIN_METERS_PER_DEGREE;
    let min_lat = center.lat() - delta_lat;
    let max_lat = center.lat() + delta_lat;
    let delta_lon = if min_lat <= -90.0 || max_lat >= 90.0 {
        // The disc contains a pole.
        180.0
    } else {
        let widest_lat = min_lat.abs().max(max_lat.abs());
        (delta_lat / widest_lat.to_radians().cos()).min(180.0)
    };
    let (min_lat, max_lat) = (min_lat.max(-90.0), max_lat.min(90.0));
    [-360.0, 0.0, 360.0]
        .iter()
        .map(|shift| {
            AABB::from_corners(
                [center.lon() - delta_lon + shift, min_lat],
                [center.lon() + delta_lon + shift, max_lat],
            )
        })
        .collect()
}

impl SpatialStore for InMemorySpatialStore {
    fn insert_feature(&self, record: FeatureRecord) -> Result<()> {
        let mut state = self.write()?;
        if state.features.contains_key(&record.id) {
            return Err(FeatureError::store_unavailable(format!(
                "Feature id {} is already taken",
                record.id
            )));
        }
        log::debug!("Inserting feature {}", record.id);
        state.features.insert(record.id, record);
        Ok(())
    }

    fn fetch(&self, id: &FeatureId) -> Result<Option<StoredFeature>> {
        let state = self.read()?;
        Ok(state.features.get(id).map(|record| StoredFeature {
            record: record.clone(),
            footprint: state.footprints.get(id).cloned(),
        }))
    }

    fn commit_processing(
        &self,
        footprint: Footprint,
        processed_at: DateTime<Utc>,
    ) -> Result<StoredFeature> {
        let id = footprint.feature_id;
        let envelope = footprint_envelope(&footprint)
            .ok_or_else(|| FeatureError::validation(format!("Footprint of {} is empty", id)))?;

        let mut state = self.write()?;
        let state = &mut *state;
        let record = state
            .features
            .get_mut(&id)
            .ok_or(FeatureError::NotFound(id))?;
        record.status = FeatureStatus::Done;
        record.attempts = record.attempts.saturating_add(1);
        record.updated_at = processed_at;
        let record = record.clone();

        if let Some(previous) = state.footprints.get(&id).and_then(footprint_envelope) {
            state.index.remove(&previous);
        }
        state.index.insert(envelope);
        state.footprints.insert(id, footprint.clone());
        log::debug!(
            "Committed footprint of {} ({} m buffer), attempt {}",
            id,
            footprint.buffer_m,
            record.attempts
        );

        Ok(StoredFeature {
            record,
            footprint: Some(footprint),
        })
    }

    fn delete_feature(&self, id: &FeatureId) -> Result<bool> {
        let mut state = self.write()?;
        if state.features.remove(id).is_none() {
            return Ok(false);
        }
        if let Some(footprint) = state.footprints.remove(id) {
            if let Some(envelope) = footprint_envelope(&footprint) {
                state.index.remove(&envelope);
            }
        }
        log::debug!("Deleted feature {}", id);
        Ok(true)
    }

    fn within_radius(
        &self,
        center: &GeodeticPoint,
        radius_m: f64,
    ) -> Result<Vec<(StoredFeature, f64)>> {
        let state = self.read()?;
        let state = &*state;

        let candidates: BTreeSet<FeatureId> = search_envelopes(center, radius_m)
            .iter()
            .flat_map(|envelope| state.index.locate_in_envelope_intersecting(envelope))
            .map(|entry| entry.data)
            .collect();

        let mut results: Vec<(StoredFeature, f64)> = candidates
            .par_iter()
            .filter_map(|id| {
                let footprint = state.footprints.get(id)?;
                let record = state.features.get(id)?;
                let distance = footprint.distance_to(center);
                (distance <= radius_m).then(|| {
                    (
                        StoredFeature {
                            record: record.clone(),
                            footprint: Some(footprint.clone()),
                        },
                        distance,
                    )
                })
            })
            .collect();
        results.sort_by(|(a, a_distance), (b, b_distance)| {
            a_distance
                .total_cmp(b_distance)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        log::debug!(
            "{} of {} index candidates within {} m of ({}, {})",
            results.len(),
            candidates.len(),
            radius_m,
            center.lat(),
            center.lon()
        );
        Ok(results)
    }

    fn processed_features(&self) -> Result<Vec<StoredFeature>> {
        let state = self.read()?;
        let mut features: Vec<StoredFeature> = state
            .footprints
            .iter()
            .filter_map(|(id, footprint)| {
                state.features.get(id).map(|record| StoredFeature {
                    record: record.clone(),
                    footprint: Some(footprint.clone()),
                })
            })
            .collect();
        features.sort_by_key(|feature| feature.record.id);
        Ok(features)
    }
}
