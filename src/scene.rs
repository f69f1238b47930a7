use crate::data::MapData;
use crate::legend::{build_legend, Legend};
use crate::path::svg_path;
use crate::projection::{project_geometry, project_multi_polygon, Projection};
use crate::scale::{color_scale, ColorScale, FALLBACK_FILL};
use crate::topology::{Feature, FeatureId, TopologyError};
use crate::types::{EducationEntry, EducationIndex};
use geo::{Geometry, MultiPolygon};
use rayon::prelude::*;
use tracing::debug;

pub const CANVAS_WIDTH: f64 = 960.0;
pub const CANVAS_HEIGHT: f64 = 600.0;

#[derive(Debug, Clone)]
pub struct CountyShape {
    pub id: Option<FeatureId>,
    pub fips: Option<u32>,
    /// Percentage from the education index, 0 when the county has no record.
    pub education: f64,
    pub fill: &'static str,
    pub has_data: bool,
    pub path: String,
    /// Projected outline used for hit-testing.
    pub outline: MultiPolygon<f64>,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub scale: ColorScale,
    pub index: EducationIndex,
    pub counties: Vec<CountyShape>,
    pub state_borders: String,
    pub legend: Legend,
}

impl Scene {
    pub fn county(&self, fips: u32) -> Option<&CountyShape> {
        self.counties.iter().find(|c| c.fips == Some(fips))
    }
}

/// Builds a complete scene from scratch. Nothing is reused between calls, so
/// the color domain always reflects the records passed in.
pub fn build_scene(data: &MapData, projection: &dyn Projection) -> Result<Scene, TopologyError> {
    let decoder = data.topology.decoder()?;
    let counties = decoder.feature("counties")?;
    let states = decoder.multi_polygon("states")?;

    let index = EducationIndex::from_records(&data.education);
    let scale = color_scale(data.education.iter().map(|r| r.bachelors_or_higher));

    let shapes: Vec<CountyShape> = counties
        .features
        .into_par_iter()
        .map(|feature| county_shape(feature, &index, &scale, projection))
        .collect();

    let state_borders = project_multi_polygon(projection, &states)
        .map(|mp| svg_path(&Geometry::MultiPolygon(mp)))
        .unwrap_or_default();

    let legend = build_legend(&scale, CANVAS_WIDTH, CANVAS_HEIGHT);

    debug!(
        counties = shapes.len(),
        records = index.len(),
        domain = ?scale.domain(),
        "scene built"
    );

    Ok(Scene {
        width: CANVAS_WIDTH,
        height: CANVAS_HEIGHT,
        scale,
        index,
        counties: shapes,
        state_borders,
        legend,
    })
}

fn county_shape(feature: Feature, index: &EducationIndex, scale: &ColorScale, projection: &dyn Projection) -> CountyShape {
    let fips = feature.id.as_ref().and_then(FeatureId::as_fips);
    let entry = fips.and_then(|f| index.get(f));

    let (education, fill) = match entry {
        Some(e) => (
            e.bachelors_or_higher,
            scale.apply(e.bachelors_or_higher).copied().unwrap_or(FALLBACK_FILL),
        ),
        None => (0.0, FALLBACK_FILL),
    };

    let projected = feature
        .geometry
        .as_ref()
        .and_then(|g| project_geometry(projection, g));
    let path = projected.as_ref().map(svg_path).unwrap_or_default();
    let outline = projected.map(polygons_of).unwrap_or_else(|| MultiPolygon::new(Vec::new()));

    CountyShape {
        id: feature.id,
        fips,
        education,
        fill,
        has_data: entry.is_some(),
        path,
        outline,
    }
}

fn polygons_of(geometry: Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
        Geometry::MultiPolygon(mp) => mp,
        Geometry::GeometryCollection(gc) => {
            MultiPolygon::new(gc.into_iter().flat_map(|g| polygons_of(g).0).collect())
        }
        _ => MultiPolygon::new(Vec::new()),
    }
}

pub fn tooltip_content(entry: &EducationEntry) -> String {
    format!("{}, {}: {}%", entry.area_name, entry.state, entry.bachelors_or_higher)
}
