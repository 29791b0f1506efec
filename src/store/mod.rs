//! Durable storage of features and footprints behind the `SpatialStore` trait.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::geodesy::GeodeticPoint;
use crate::model::feature::{FeatureId, FeatureRecord, Footprint, StoredFeature};

pub use memory::InMemorySpatialStore;

/// Storage for features and their footprints with an index over footprint geometries.
///
/// Every call is bounded: an implementation that cannot reach its backing storage fails with
/// `FeatureError::StoreUnavailable` instead of retrying.
pub trait SpatialStore: Send + Sync {
    /// Persist a new feature. No footprint is created.
    fn insert_feature(&self, record: FeatureRecord) -> Result<()>;

    /// Read a feature and its footprint as one consistent snapshot.
    fn fetch(&self, id: &FeatureId) -> Result<Option<StoredFeature>>;

    /// Mark the feature done, increment its attempts and upsert its footprint, all or nothing.
    ///
    /// Fails with `FeatureError::NotFound` if the feature no longer exists.
    fn commit_processing(
        &self,
        footprint: Footprint,
        processed_at: DateTime<Utc>,
    ) -> Result<StoredFeature>;

    /// Remove a feature together with its footprint. Returns false if the feature did not exist.
    fn delete_feature(&self, id: &FeatureId) -> Result<bool>;

    /// Processed features whose footprint lies within `radius_m` meters of `center`, paired with
    /// the geodesic distance to the footprint. Sorted by distance, then by feature id.
    ///
    /// Implementations own this filtering and ordering, callers return the list as is.
    fn within_radius(
        &self,
        center: &GeodeticPoint,
        radius_m: f64,
    ) -> Result<Vec<(StoredFeature, f64)>>;

    /// All features that have a footprint, ordered by id.
    fn processed_features(&self) -> Result<Vec<StoredFeature>>;
}
