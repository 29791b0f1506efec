//! Geodesic primitives on the WGS84 ellipsoid: validated points, buffers, areas and distances.

pub mod point;
pub mod polygon;

pub use point::GeodeticPoint;
pub use polygon::GeodeticPolygon;
