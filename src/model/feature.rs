use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{FeatureError, Result};
use crate::geodesy::{GeodeticPoint, GeodeticPolygon};

pub const MAX_NAME_CHARS: usize = 200;

/// Identifier of a feature, a random v4 UUID. Ordering is used to break distance ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(Uuid);

impl FeatureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an id received as text. A malformed id is an input error, not a missing feature.
    pub fn parse_str(value: &str) -> Result<Self> {
        Uuid::parse_str(value).map(Self).map_err(|err| {
            FeatureError::validation(format!("Invalid feature id '{}': {}", value, err))
        })
    }
}

impl Default for FeatureId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A feature name of 1 to 200 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureName(String);

impl FeatureName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let length = name.chars().count();
        if length == 0 {
            return Err(FeatureError::validation("Feature name must not be empty"));
        }
        if length > MAX_NAME_CHARS {
            return Err(FeatureError::validation(format!(
                "Feature name has {} characters, at most {} are allowed",
                length, MAX_NAME_CHARS
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureStatus {
    Queued,
    Done,
}

impl FeatureStatus {
    pub fn name(&self) -> &'static str {
        match self {
            FeatureStatus::Queued => "queued",
            FeatureStatus::Done => "done",
        }
    }
}

/// The stored attributes of a feature. `id`, `name` and `location` never change after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub id: FeatureId,
    pub name: FeatureName,
    pub location: GeodeticPoint,
    pub status: FeatureStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeatureRecord {
    /// A freshly created, unprocessed feature.
    pub fn queued(name: FeatureName, location: GeodeticPoint, now: DateTime<Utc>) -> Self {
        Self {
            id: FeatureId::new(),
            name,
            location,
            status: FeatureStatus::Queued,
            attempts: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The buffered polygon derived from a processed feature, owned 1:1 by that feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    pub feature_id: FeatureId,
    pub center: GeodeticPoint,
    pub buffer_m: f64,
    pub area_m2: f64,
    pub polygon: GeodeticPolygon,
}

impl Footprint {
    /// Buffer `location` by `buffer_m` meters and measure the resulting polygon.
    pub fn compute(
        feature_id: FeatureId,
        location: &GeodeticPoint,
        buffer_m: f64,
        segments: usize,
    ) -> Self {
        let polygon = location.buffer(buffer_m, segments);
        Self {
            feature_id,
            center: *location,
            buffer_m,
            area_m2: polygon.area(),
            polygon,
        }
    }

    /// Whether the buffer contains the pole of its hemisphere. The lon/lat ring of such a
    /// footprint sweeps every meridian and has no interior.
    pub fn encloses_pole(&self) -> bool {
        self.center.distance_to(&self.center.nearest_pole()) <= self.buffer_m
    }

    /// Geodesic distance in meters from `point` to the footprint, 0 inside or on the boundary.
    ///
    /// A footprint around a pole is measured as the geodesic disc it was buffered from.
    pub fn distance_to(&self, point: &GeodeticPoint) -> f64 {
        if self.encloses_pole() {
            (self.center.distance_to(point) - self.buffer_m).max(0.0)
        } else {
            self.polygon.distance_to(point)
        }
    }

    /// Lon/lat bounds of the footprint. Around a pole they reach the pole and span a full turn of
    /// longitude centered on the feature.
    pub fn bounding_rect(&self) -> Option<geo::Rect> {
        let rect = self.polygon.bounding_rect()?;
        if !self.encloses_pole() {
            return Some(rect);
        }
        let (min_lat, max_lat) = if self.center.lat() >= 0.0 {
            (rect.min().y, 90.0)
        } else {
            (-90.0, rect.max().y)
        };
        Some(geo::Rect::new(
            geo::coord! { x: self.center.lon() - 180.0, y: min_lat },
            geo::coord! { x: self.center.lon() + 180.0, y: max_lat },
        ))
    }
}

/// A feature together with its footprint, as read from the store in one consistent snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFeature {
    pub record: FeatureRecord,
    pub footprint: Option<Footprint>,
}

impl StoredFeature {
    pub fn view(&self) -> FeatureView {
        FeatureView {
            id: self.record.id,
            name: self.record.name.as_str().to_owned(),
            status: self.record.status,
            location: self.record.location,
            buffer_area_m2: self
                .footprint
                .as_ref()
                .map_or(0.0, |footprint| footprint.area_m2),
            attempts: self.record.attempts,
            created_at: self.record.created_at,
            updated_at: self.record.updated_at,
        }
    }
}

/// What callers see of a feature. `buffer_area_m2` is 0 until the feature is processed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureView {
    pub id: FeatureId,
    pub name: String,
    pub status: FeatureStatus,
    pub location: GeodeticPoint,
    pub buffer_area_m2: f64,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A proximity query hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyFeature {
    #[serde(flatten)]
    pub feature: FeatureView,
    pub distance_m: f64,
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::Utc;
    use rstest::rstest;

    use super::{FeatureId, FeatureName, FeatureRecord, FeatureStatus, Footprint, StoredFeature};
    use crate::{error::FeatureError, geodesy::GeodeticPoint};

    #[rstest]
    #[case("a".to_string(), true)]
    #[case("Kilimanjaro summit".to_string(), true)]
    #[case("x".repeat(200), true)]
    #[case("é".repeat(200), true)]
    #[case(String::new(), false)]
    #[case("x".repeat(201), false)]
    fn test_feature_name_length_bounds(#[case] name: String, #[case] valid: bool) {
        assert_eq!(valid, FeatureName::new(name).is_ok());
    }

    #[test]
    fn test_feature_id_parse_str() {
        let id = FeatureId::new();
        assert_eq!(id, FeatureId::parse_str(&id.to_string()).unwrap());
        assert!(matches!(
            FeatureId::parse_str("not-a-uuid"),
            Err(FeatureError::Validation(_))
        ));
    }

    #[test]
    fn test_feature_ids_are_unique() {
        let ids: std::collections::HashSet<FeatureId> =
            (0..1000).map(|_| FeatureId::new()).collect();
        assert_eq!(1000, ids.len());
    }

    #[test]
    fn test_view_of_queued_feature_has_zero_area() {
        let record = FeatureRecord::queued(
            FeatureName::new("depot").unwrap(),
            GeodeticPoint::new(1.0, 2.0).unwrap(),
            Utc::now(),
        );
        let view = StoredFeature {
            record,
            footprint: None,
        }
        .view();
        assert_eq!(FeatureStatus::Queued, view.status);
        assert_eq!(0, view.attempts);
        assert_eq!(0.0, view.buffer_area_m2);
        assert_eq!(view.created_at, view.updated_at);
    }

    #[test]
    fn test_footprint_compute_matches_polygon_area() {
        let id = FeatureId::new();
        let location = GeodeticPoint::new(51.5072, -0.1276).unwrap();
        let footprint = Footprint::compute(id, &location, 500.0, 64);
        assert_eq!(id, footprint.feature_id);
        assert_eq!(500.0, footprint.buffer_m);
        assert_eq!(footprint.polygon.area(), footprint.area_m2);
    }

    #[rstest]
    #[case(90.0, 0.0, true)]
    #[case(-89.9999, 10.0, true)]
    #[case(89.996, 45.0, true)]
    #[case(89.99, 0.0, false)]
    #[case(-45.0, 170.0, false)]
    fn test_encloses_pole(#[case] lat: f64, #[case] lon: f64, #[case] encloses: bool) {
        let location = GeodeticPoint::new(lat, lon).unwrap();
        let footprint = Footprint::compute(FeatureId::new(), &location, 500.0, 64);
        assert_eq!(encloses, footprint.encloses_pole());
    }

    #[rstest]
    #[case(90.0, 0.0)]
    #[case(-89.9999, 10.0)]
    fn test_footprint_around_pole_contains_its_center(#[case] lat: f64, #[case] lon: f64) {
        let location = GeodeticPoint::new(lat, lon).unwrap();
        let footprint = Footprint::compute(FeatureId::new(), &location, 500.0, 64);
        assert_eq!(0.0, footprint.distance_to(&location));

        let pole = location.nearest_pole();
        assert_eq!(0.0, footprint.distance_to(&pole));
        let rect = footprint.bounding_rect().unwrap();
        assert!(rect.min().y <= pole.lat() && pole.lat() <= rect.max().y);
        assert_eq!(360.0, rect.width());

        // ~1 km from the feature along its meridian, outside the 500 m disc.
        let away = GeodeticPoint::new(lat - lat.signum() * 0.009, lon).unwrap();
        assert_abs_diff_eq!(
            location.distance_to(&away) - 500.0,
            footprint.distance_to(&away),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!("done\n", serde_yaml::to_string(&FeatureStatus::Done).unwrap());
        assert_eq!(FeatureStatus::Queued.name(), "queued");
    }
}
