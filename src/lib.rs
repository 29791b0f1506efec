//! Point features with geodesic buffer footprints and distance-ordered radius queries.

pub mod config;
pub mod error;
pub mod geodesy;
pub mod geofile;
pub mod lifecycle;
pub mod model;
pub mod proximity;
pub mod store;

pub use error::{FeatureError, Result};
pub use lifecycle::FeatureLifecycle;
pub use proximity::ProximityQuery;
pub use store::{InMemorySpatialStore, SpatialStore};
