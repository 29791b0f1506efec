use std::{fs, io, path::Path};

use geojson::{feature::Id, JsonObject, JsonValue};

use crate::model::feature::StoredFeature;

/// Convert processed features into GeoJSON polygons carrying the feature attributes as
/// properties. Features without a footprint are skipped.
pub fn footprints_to_feature_collection(
    features: &[StoredFeature],
) -> geojson::FeatureCollection {
    features
        .iter()
        .filter_map(|stored| {
            let footprint = stored.footprint.as_ref()?;
            let mut properties = JsonObject::new();
            properties.insert(
                "name".to_string(),
                JsonValue::from(stored.record.name.as_str()),
            );
            properties.insert(
                "status".to_string(),
                JsonValue::from(stored.record.status.name()),
            );
            properties.insert(
                "attempts".to_string(),
                JsonValue::from(stored.record.attempts),
            );
            properties.insert("buffer_m".to_string(), JsonValue::from(footprint.buffer_m));
            properties.insert("area_m2".to_string(), JsonValue::from(footprint.area_m2));
            Some(geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::from(footprint.polygon.as_geo())),
                id: Some(Id::String(stored.record.id.to_string())),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect()
}

pub fn write_footprints_to_geojson(
    features: &[StoredFeature],
    output_filepath: &Path,
) -> io::Result<()> {
    let feature_collection = footprints_to_feature_collection(features);
    log::info!(
        "Writing {} footprints to {:?}",
        feature_collection.features.len(),
        output_filepath
    );
    let geojson_contents = geojson::GeoJson::from(feature_collection);
    fs::write(output_filepath, geojson_contents.to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;
    use testdir::testdir;

    use super::write_footprints_to_geojson;
    use crate::{
        geodesy::GeodeticPoint,
        model::feature::{FeatureName, FeatureRecord, FeatureStatus, Footprint, StoredFeature},
    };

    fn stored(name: &str, processed: bool) -> StoredFeature {
        let mut record = FeatureRecord::queued(
            FeatureName::new(name).unwrap(),
            GeodeticPoint::new(35.6862, 139.7895).unwrap(),
            Utc::now(),
        );
        let footprint = processed.then(|| {
            record.status = FeatureStatus::Done;
            record.attempts = 1;
            Footprint::compute(record.id, &record.location, 500.0, 16)
        });
        StoredFeature { record, footprint }
    }

    #[test]
    fn test_write_footprints_to_geojson() {
        let features = vec![stored("processed", true), stored("queued", false)];
        let test_dir = testdir!();
        let filepath = test_dir.join("footprints.geojson");

        write_footprints_to_geojson(&features, &filepath).unwrap();

        let contents = fs::read_to_string(&filepath).unwrap();
        let geojson: geojson::GeoJson = contents.parse().unwrap();
        let collection = geojson::FeatureCollection::try_from(geojson).unwrap();
        assert_eq!(1, collection.features.len());

        let feature = &collection.features[0];
        assert_eq!(
            Some(geojson::feature::Id::String(features[0].record.id.to_string())),
            feature.id
        );
        assert_eq!(
            Some(&geojson::JsonValue::from("processed")),
            feature.property("name")
        );
        assert_eq!(
            Some(&geojson::JsonValue::from("done")),
            feature.property("status")
        );
        match &feature.geometry.as_ref().unwrap().value {
            geojson::Value::Polygon(rings) => assert_eq!(17, rings[0].len()),
            other => panic!("Expected a polygon, got {:?}", other),
        }
    }
}
