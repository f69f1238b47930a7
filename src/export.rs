use crate::topology::{FeatureCollection, FeatureId, Topology};
use anyhow::{Context, Result};
use geojson::feature::Id;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Objects written by `export_collections`.
pub const EXPORTED_OBJECTS: [&str; 2] = ["counties", "states"];

pub fn to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    let features = collection
        .features
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: feature
                .geometry
                .as_ref()
                .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
            id: feature.id.as_ref().map(|id| match id {
                FeatureId::Number(n) => Id::Number((*n).into()),
                FeatureId::String(s) => Id::String(s.clone()),
            }),
            properties: feature.properties.clone(),
            foreign_members: None,
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes `<name>.geojson` into `dir` for each exported object.
pub fn export_collections(topology: &Topology, dir: &Path) -> Result<Vec<PathBuf>> {
    let decoder = topology.decoder().context("Failed to decode topology")?;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {:?}", dir))?;

    let mut written = Vec::new();
    for name in EXPORTED_OBJECTS {
        let collection = decoder
            .feature(name)
            .with_context(|| format!("Failed to decode object '{}'", name))?;
        let path = dir.join(format!("{name}.geojson"));
        let json = serde_json::to_string(&to_geojson(&collection))?;
        fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        info!(?path, features = collection.features.len(), "geojson written");
        written.push(path);
    }
    Ok(written)
}
