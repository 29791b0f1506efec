use std::{fs, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use geo_footprints::{
    config::{ScenarioConfig, ScenarioFeature},
    geofile::geojson::write_footprints_to_geojson,
    model::feature::{FeatureId, NearbyFeature},
    FeatureLifecycle, InMemorySpatialStore, ProximityQuery, SpatialStore,
};
use rayon::prelude::*;
use serde::Serialize;

/// Create, process and query geospatial features described in a scenario file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the scenario config file.
    #[arg(short, long)]
    config_filepath: PathBuf,
}

#[derive(Serialize, Debug)]
struct QueryReport {
    lat: f64,
    lon: f64,
    radius_m: Option<f64>,
    results: Vec<NearbyFeature>,
}

#[derive(Serialize, Debug)]
struct ScenarioReport {
    created: Vec<FeatureId>,
    queries: Vec<QueryReport>,
}

fn create_features(
    lifecycle: &FeatureLifecycle<InMemorySpatialStore>,
    features: &[ScenarioFeature],
) -> anyhow::Result<Vec<FeatureId>> {
    features
        .iter()
        .map(|feature| {
            lifecycle
                .create_feature(&feature.name, feature.lat, feature.lon)
                .with_context(|| format!("Creating feature '{}'", feature.name))
        })
        .collect()
}

fn try_main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    env_logger::init();

    let args = Args::try_parse()?;
    let config = ScenarioConfig::load(&args.config_filepath)?;

    let store = Arc::new(InMemorySpatialStore::new());
    let proximity = ProximityQuery::new(Arc::clone(&store), config.engine.default_radius_m);
    let lifecycle = FeatureLifecycle::new(Arc::clone(&store), config.engine.clone())?;

    let created = create_features(&lifecycle, &config.features)?;
    log::info!("Created {} features", created.len());

    created
        .par_iter()
        .zip(config.features.par_iter())
        .filter(|(_, feature)| feature.process)
        .try_for_each(|(id, feature)| {
            lifecycle
                .process_feature(id, feature.buffer_m)
                .map(|_| ())
                .with_context(|| format!("Processing feature '{}'", feature.name))
        })?;

    let queries = config
        .queries
        .iter()
        .map(|query| {
            let results = proximity
                .features_near(query.lat, query.lon, query.radius_m)
                .with_context(|| format!("Querying near ({}, {})", query.lat, query.lon))?;
            log::info!(
                "{} features near ({}, {})",
                results.len(),
                query.lat,
                query.lon
            );
            for result in &results {
                log::info!(
                    "  {} '{}' at {:.1} m, footprint {:.1} m2",
                    result.feature.id,
                    result.feature.name,
                    result.distance_m,
                    result.feature.buffer_area_m2
                );
            }
            Ok(QueryReport {
                lat: query.lat,
                lon: query.lon,
                radius_m: query.radius_m,
                results,
            })
        })
        .collect::<anyhow::Result<Vec<QueryReport>>>()?;

    if let Some(output_geojson) = &config.output_geojson {
        write_footprints_to_geojson(&store.processed_features()?, output_geojson)?;
    }
    if let Some(report_filepath) = &config.report_filepath {
        log::info!("Writing report to {:?}", report_filepath);
        let report = serde_yaml::to_string(&ScenarioReport { created, queries })?;
        fs::write(report_filepath, report)?;
    }
    Ok(())
}

fn main() {
    if let Err(e) = try_main() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1)
    }
}
