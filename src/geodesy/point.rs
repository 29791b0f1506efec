use std::ops::RangeInclusive;

use geo::{GeodesicDestination, GeodesicDistance};
use serde::Serialize;

use crate::error::{FeatureError, Result};

use super::polygon::GeodeticPolygon;

pub const LATITUDE_RANGE: RangeInclusive<f64> = -90.0..=90.0;
pub const LONGITUDE_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// A WGS84 point. Latitude and longitude are in degrees and always within their legal ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeodeticPoint {
    lat: f64,
    lon: f64,
}

impl GeodeticPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !LATITUDE_RANGE.contains(&lat) {
            return Err(FeatureError::validation(format!(
                "Latitude {} is outside of [-90, 90]",
                lat
            )));
        }
        if !LONGITUDE_RANGE.contains(&lon) {
            return Err(FeatureError::validation(format!(
                "Longitude {} is outside of [-180, 180]",
                lon
            )));
        }
        Ok(Self { lat, lon })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// The point in geo's x = longitude, y = latitude convention.
    pub fn to_geo(&self) -> geo::Point {
        geo::Point::new(self.lon, self.lat)
    }

    /// Geodesic distance on the WGS84 ellipsoid, in meters.
    pub fn distance_to(&self, other: &GeodeticPoint) -> f64 {
        self.to_geo().geodesic_distance(&other.to_geo())
    }

    /// The pole in this point's hemisphere, on the same meridian. The equator counts as north.
    pub fn nearest_pole(&self) -> GeodeticPoint {
        let lat = if self.lat >= 0.0 { 90.0 } else { -90.0 };
        Self { lat, lon: self.lon }
    }

    /// Inflate the point into a polygon whose vertices lie `radius_m` meters away along geodesics.
    ///
    /// The ring is wound counter-clockwise, starting due north. Vertex longitudes are unwrapped
    /// around this point so that a buffer crossing the antimeridian stays a contiguous ring, e.g. a
    /// vertex east of 180 is stored as 180.01 rather than -179.99.
    pub fn buffer(&self, radius_m: f64, segments: usize) -> GeodeticPolygon {
        let center = self.to_geo();
        let step = 360.0 / segments as f64;
        let ring: Vec<geo::Coord> = (0..segments)
            .map(|segment| {
                let bearing = (segments - segment) as f64 * step % 360.0;
                let vertex = center.geodesic_destination(bearing, radius_m);
                geo::coord! {
                    x: self.lon + wrap_longitude_delta(vertex.x() - self.lon),
                    y: vertex.y(),
                }
            })
            .collect();
        GeodeticPolygon::new(geo::Polygon::new(geo::LineString::new(ring), vec![]))
    }
}

/// Map a longitude difference into [-180, 180).
pub fn wrap_longitude_delta(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}
