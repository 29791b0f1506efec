use geo::{BoundingRect, GeodesicArea, GeodesicDistance, Intersects};

use super::point::GeodeticPoint;

/// A polygon on the WGS84 ellipsoid with lon/lat vertices.
///
/// Vertex longitudes may fall outside of [-180, 180] when the ring crosses the antimeridian, see
/// `GeodeticPoint::buffer`.
#[derive(Debug, Clone, PartialEq)]
pub struct GeodeticPolygon {
    polygon: geo::Polygon,
}

impl GeodeticPolygon {
    pub fn new(polygon: geo::Polygon) -> Self {
        Self { polygon }
    }

    pub fn as_geo(&self) -> &geo::Polygon {
        &self.polygon
    }

    /// Geodesic surface area in square meters.
    pub fn area(&self) -> f64 {
        self.polygon.geodesic_area_unsigned()
    }

    pub fn bounding_rect(&self) -> Option<geo::Rect> {
        self.polygon.bounding_rect()
    }

    /// Geodesic distance in meters from `point` to the closest point of the polygon, 0 when the
    /// point is inside or on the boundary. The ring must not enclose a pole.
    pub fn distance_to(&self, point: &GeodeticPoint) -> f64 {
        let reference_lon = match self.bounding_rect() {
            Some(rect) => rect.center().x,
            None => return f64::INFINITY,
        };
        // Shift the query point into the same longitude window as the vertices.
        let mut lon = point.lon();
        if lon - reference_lon > 180.0 {
            lon -= 360.0;
        } else if lon - reference_lon < -180.0 {
            lon += 360.0;
        }
        let point = geo::Point::new(lon, point.lat());
        if self.polygon.intersects(&point) {
            return 0.0;
        }
        self.polygon
            .exterior()
            .lines()
            .chain(self.polygon.interiors().iter().flat_map(|ring| ring.lines()))
            .map(|line| distance_to_line(&point, &line))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Geodesic distance from `point` to the closest point of a short polygon edge.
///
/// The closest point is located in a local equirectangular frame centered on `point`, which is
/// accurate for edges much shorter than the Earth's radius, and measured geodesically.
fn distance_to_line(point: &geo::Point, line: &geo::Line) -> f64 {
    let scale = point.y().to_radians().cos();
    let start = (
        (line.start.x - point.x()) * scale,
        line.start.y - point.y(),
    );
    let end = ((line.end.x - point.x()) * scale, line.end.y - point.y());
    let delta = (end.0 - start.0, end.1 - start.1);
    let length_squared = delta.0 * delta.0 + delta.1 * delta.1;
    let fraction = if length_squared > 0.0 {
        (-(start.0 * delta.0 + start.1 * delta.1) / length_squared).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let closest = geo::Point::new(
        line.start.x + fraction * (line.end.x - line.start.x),
        line.start.y + fraction * (line.end.y - line.start.y),
    );
    point.geodesic_distance(&closest)
}
