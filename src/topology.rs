use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TopologyError {
    #[error("document type is '{0}', expected 'Topology'")]
    NotATopology(String),
    #[error("topology has no object named '{0}'")]
    MissingObject(String),
    #[error("arc index {0} is out of range")]
    ArcOutOfRange(i64),
    #[error("position has fewer than two ordinates")]
    InvalidPosition,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    #[serde(rename = "type")]
    pub kind: String,
    pub objects: HashMap<String, TopoObject>,
    pub arcs: Vec<Vec<Vec<f64>>>,
    #[serde(default)]
    pub transform: Option<Transform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

impl Transform {
    fn apply(&self, x: f64, y: f64) -> Coord<f64> {
        Coord {
            x: x * self.scale[0] + self.translate[0],
            y: y * self.scale[1] + self.translate[1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(i64),
    String(String),
}

impl FeatureId {
    /// County identifiers arrive as numbers, but some topologies quote them.
    /// Quoted ids are parsed as integers, so `"01001"` joins record 1001
    /// rather than falling back to the gray fill.
    pub fn as_fips(&self) -> Option<u32> {
        match self {
            FeatureId::Number(n) => u32::try_from(*n).ok(),
            FeatureId::String(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{n}"),
            FeatureId::String(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TopoObject {
    #[serde(default)]
    pub id: Option<FeatureId>,
    #[serde(default)]
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    pub geometry: TopoGeometry,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    Point { coordinates: Vec<f64> },
    MultiPoint { coordinates: Vec<Vec<f64>> },
    LineString { arcs: Vec<i64> },
    MultiLineString { arcs: Vec<Vec<i64>> },
    Polygon { arcs: Vec<Vec<i64>> },
    MultiPolygon { arcs: Vec<Vec<Vec<i64>>> },
    GeometryCollection { geometries: Vec<TopoObject> },
    #[serde(other)]
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<FeatureId>,
    pub properties: Option<serde_json::Map<String, serde_json::Value>>,
    pub geometry: Option<Geometry<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl Topology {
    /// Decodes all arcs once so several objects can be extracted cheaply.
    pub fn decoder(&self) -> Result<Decoder<'_>, TopologyError> {
        if self.kind != "Topology" {
            return Err(TopologyError::NotATopology(self.kind.clone()));
        }
        let arcs = self
            .arcs
            .iter()
            .map(|arc| decode_arc(arc, self.transform.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Decoder { topology: self, arcs })
    }

    pub fn feature(&self, name: &str) -> Result<FeatureCollection, TopologyError> {
        self.decoder()?.feature(name)
    }
}

fn decode_arc(arc: &[Vec<f64>], transform: Option<&Transform>) -> Result<Vec<Coord<f64>>, TopologyError> {
    let (mut x, mut y) = (0.0, 0.0);
    arc.iter()
        .map(|position| {
            let (dx, dy) = match position.as_slice() {
                [dx, dy, ..] => (*dx, *dy),
                _ => return Err(TopologyError::InvalidPosition),
            };
            Ok(match transform {
                Some(t) => {
                    x += dx;
                    y += dy;
                    t.apply(x, y)
                }
                None => Coord { x: dx, y: dy },
            })
        })
        .collect()
}

pub struct Decoder<'a> {
    topology: &'a Topology,
    arcs: Vec<Vec<Coord<f64>>>,
}

impl Decoder<'_> {
    /// A GeometryCollection object yields one feature per member; any other
    /// object yields a single feature.
    pub fn feature(&self, name: &str) -> Result<FeatureCollection, TopologyError> {
        let object = self
            .topology
            .objects
            .get(name)
            .ok_or_else(|| TopologyError::MissingObject(name.to_string()))?;

        let features = match &object.geometry {
            TopoGeometry::GeometryCollection { geometries } => geometries
                .iter()
                .map(|member| self.to_feature(member))
                .collect::<Result<Vec<_>, _>>()?,
            _ => vec![self.to_feature(object)?],
        };
        Ok(FeatureCollection { features })
    }

    /// Every polygon of the named object gathered into one multi-geometry.
    pub fn multi_polygon(&self, name: &str) -> Result<MultiPolygon<f64>, TopologyError> {
        let collection = self.feature(name)?;
        let mut polygons = Vec::new();
        for geometry in collection.features.into_iter().filter_map(|f| f.geometry) {
            collect_polygons(geometry, &mut polygons);
        }
        Ok(MultiPolygon::new(polygons))
    }

    fn to_feature(&self, object: &TopoObject) -> Result<Feature, TopologyError> {
        Ok(Feature {
            id: object.id.clone(),
            properties: object.properties.clone(),
            geometry: self.geometry(&object.geometry)?,
        })
    }

    fn geometry(&self, geometry: &TopoGeometry) -> Result<Option<Geometry<f64>>, TopologyError> {
        let decoded = match geometry {
            TopoGeometry::Point { coordinates } => Geometry::Point(Point::from(self.position(coordinates)?)),
            TopoGeometry::MultiPoint { coordinates } => Geometry::MultiPoint(MultiPoint::new(
                coordinates
                    .iter()
                    .map(|c| self.position(c).map(Point::from))
                    .collect::<Result<_, _>>()?,
            )),
            TopoGeometry::LineString { arcs } => Geometry::LineString(LineString::new(self.open_line(arcs)?)),
            TopoGeometry::MultiLineString { arcs } => Geometry::MultiLineString(MultiLineString::new(
                arcs.iter()
                    .map(|a| self.open_line(a).map(LineString::new))
                    .collect::<Result<_, _>>()?,
            )),
            TopoGeometry::Polygon { arcs } => Geometry::Polygon(self.polygon(arcs)?),
            TopoGeometry::MultiPolygon { arcs } => Geometry::MultiPolygon(MultiPolygon::new(
                arcs.iter().map(|rings| self.polygon(rings)).collect::<Result<_, _>>()?,
            )),
            TopoGeometry::GeometryCollection { geometries } => {
                let mut members = Vec::with_capacity(geometries.len());
                for member in geometries {
                    if let Some(g) = self.geometry(&member.geometry)? {
                        members.push(g);
                    }
                }
                Geometry::GeometryCollection(GeometryCollection::new_from(members))
            }
            TopoGeometry::Null => return Ok(None),
        };
        Ok(Some(decoded))
    }

    fn position(&self, position: &[f64]) -> Result<Coord<f64>, TopologyError> {
        let [x, y, ..] = position else {
            return Err(TopologyError::InvalidPosition);
        };
        Ok(match &self.topology.transform {
            Some(t) => t.apply(*x, *y),
            None => Coord { x: *x, y: *y },
        })
    }

    /// A negative index `i` refers to arc `!i` traversed backwards.
    fn arc(&self, index: i64) -> Result<&[Coord<f64>], TopologyError> {
        let slot = if index < 0 { !index } else { index };
        usize::try_from(slot)
            .ok()
            .and_then(|i| self.arcs.get(i))
            .map(Vec::as_slice)
            .ok_or(TopologyError::ArcOutOfRange(index))
    }

    /// Joins arcs end to end, dropping the duplicated junction point.
    fn stitch(&self, indexes: &[i64]) -> Result<Vec<Coord<f64>>, TopologyError> {
        let mut points: Vec<Coord<f64>> = Vec::new();
        for &index in indexes {
            let arc = self.arc(index)?;
            points.pop();
            if index < 0 {
                points.extend(arc.iter().rev());
            } else {
                points.extend_from_slice(arc);
            }
        }
        Ok(points)
    }

    fn open_line(&self, indexes: &[i64]) -> Result<Vec<Coord<f64>>, TopologyError> {
        let mut points = self.stitch(indexes)?;
        pad(&mut points, 2);
        Ok(points)
    }

    fn ring(&self, indexes: &[i64]) -> Result<Vec<Coord<f64>>, TopologyError> {
        let mut points = self.stitch(indexes)?;
        pad(&mut points, 4);
        Ok(points)
    }

    fn polygon(&self, rings: &[Vec<i64>]) -> Result<Polygon<f64>, TopologyError> {
        let mut decoded = rings
            .iter()
            .map(|r| self.ring(r).map(LineString::new))
            .collect::<Result<Vec<_>, _>>()?;
        if decoded.is_empty() {
            return Ok(Polygon::new(LineString::new(Vec::new()), Vec::new()));
        }
        let exterior = decoded.remove(0);
        Ok(Polygon::new(exterior, decoded))
    }
}

fn pad(points: &mut Vec<Coord<f64>>, min_len: usize) {
    if let Some(&first) = points.first() {
        while points.len() < min_len {
            points.push(first);
        }
    }
}

fn collect_polygons(geometry: Geometry<f64>, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp),
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                collect_polygons(g, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use serde_json::json;

    fn coords(ls: &LineString<f64>) -> Vec<(f64, f64)> {
        ls.coords().map(|c| (c.x, c.y)).collect()
    }

    fn exterior(feature: &Feature) -> Vec<(f64, f64)> {
        match &feature.geometry {
            Some(Geometry::Polygon(p)) => coords(p.exterior()),
            other => panic!("expected polygon, got {other:?}"),
        }
    }

    #[test]
    fn stitches_forward_arcs_into_closed_ring() {
        let topology = fixtures::topology();
        let counties = topology.feature("counties").unwrap();
        assert_eq!(counties.features.len(), 3);
        assert_eq!(counties.features[0].id, Some(FeatureId::Number(1001)));
        assert_eq!(
            exterior(&counties.features[0]),
            vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn negative_index_reverses_arc() {
        let topology = fixtures::topology();
        let counties = topology.feature("counties").unwrap();
        assert_eq!(
            exterior(&counties.features[1]),
            vec![(10.0, 0.0), (20.0, 0.0), (20.0, 10.0), (10.0, 10.0), (10.0, 0.0)]
        );
    }

    #[test]
    fn applies_delta_decoding_and_transform() {
        let topology: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "transform": { "scale": [2.0, 0.5], "translate": [100.0, 200.0] },
            "objects": {
                "line": { "type": "LineString", "arcs": [0] },
                "spot": { "type": "Point", "coordinates": [4, 4] }
            },
            "arcs": [[[1, 2], [3, 4]]]
        }))
        .unwrap();

        let line = topology.feature("line").unwrap();
        match &line.features[0].geometry {
            Some(Geometry::LineString(ls)) => {
                assert_eq!(coords(ls), vec![(102.0, 201.0), (108.0, 203.0)]);
            }
            other => panic!("expected line, got {other:?}"),
        }

        // points are quantized but not delta-encoded
        let spot = topology.feature("spot").unwrap();
        assert_eq!(
            spot.features[0].geometry,
            Some(Geometry::Point(Point::new(108.0, 202.0)))
        );
    }

    #[test]
    fn untransformed_positions_pass_through() {
        let topology: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "objects": { "line": { "type": "LineString", "arcs": [0] } },
            "arcs": [[[1.5, 2.5], [3.5, 4.5]]]
        }))
        .unwrap();
        match &topology.feature("line").unwrap().features[0].geometry {
            Some(Geometry::LineString(ls)) => assert_eq!(coords(ls), vec![(1.5, 2.5), (3.5, 4.5)]),
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn short_rings_are_padded() {
        let topology: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "objects": { "tiny": { "type": "Polygon", "arcs": [[0]] } },
            "arcs": [[[0, 0], [1, 1]]]
        }))
        .unwrap();
        let feature = &topology.feature("tiny").unwrap().features[0];
        assert_eq!(exterior(feature), vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0), (0.0, 0.0)]);
    }

    #[test]
    fn single_point_lines_are_padded() {
        let topology: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "objects": { "stub": { "type": "LineString", "arcs": [0] } },
            "arcs": [[[3, 4]]]
        }))
        .unwrap();
        match &topology.feature("stub").unwrap().features[0].geometry {
            Some(Geometry::LineString(ls)) => assert_eq!(coords(ls), vec![(3.0, 4.0), (3.0, 4.0)]),
            other => panic!("expected line, got {other:?}"),
        }
    }

    #[test]
    fn multi_line_string_stitches_and_reverses() {
        let topology: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "objects": { "rivers": { "type": "MultiLineString", "arcs": [[0, 1], [-2]] } },
            "arcs": [
                [[0, 0], [1, 0]],
                [[1, 0], [1, 1], [2, 1]]
            ]
        }))
        .unwrap();
        match &topology.feature("rivers").unwrap().features[0].geometry {
            Some(Geometry::MultiLineString(mls)) => {
                assert_eq!(mls.0.len(), 2);
                assert_eq!(coords(&mls.0[0]), vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (2.0, 1.0)]);
                assert_eq!(coords(&mls.0[1]), vec![(2.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
            }
            other => panic!("expected multi line, got {other:?}"),
        }
    }

    #[test]
    fn nested_collection_member_keeps_polygon_ring() {
        let topology: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "objects": {
                "group": {
                    "type": "GeometryCollection",
                    "geometries": [{
                        "type": "GeometryCollection",
                        "id": "inner",
                        "geometries": [{ "type": "Polygon", "arcs": [[0]] }]
                    }]
                }
            },
            "arcs": [[[0, 0], [4, 0], [4, 4], [0, 0]]]
        }))
        .unwrap();

        let group = topology.feature("group").unwrap();
        assert_eq!(group.features.len(), 1);
        assert_eq!(group.features[0].id, Some(FeatureId::String("inner".into())));
        match &group.features[0].geometry {
            Some(Geometry::GeometryCollection(gc)) => {
                assert_eq!(gc.0.len(), 1);
                match &gc.0[0] {
                    Geometry::Polygon(p) => assert_eq!(
                        coords(p.exterior()),
                        vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 0.0)]
                    ),
                    other => panic!("expected polygon, got {other:?}"),
                }
            }
            other => panic!("expected collection, got {other:?}"),
        }
    }

    #[test]
    fn multi_polygon_gathers_every_state_polygon() {
        let topology = fixtures::topology();
        let decoder = topology.decoder().unwrap();
        let states = decoder.multi_polygon("states").unwrap();
        assert_eq!(states.0.len(), 2);
        assert_eq!(
            coords(states.0[0].exterior()),
            vec![(0.0, 0.0), (10.0, 0.0), (20.0, 0.0), (20.0, 10.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]
        );
    }

    #[test]
    fn string_ids_and_properties_survive() {
        let topology = fixtures::topology();
        let states = topology.feature("states").unwrap();
        assert_eq!(states.features[0].id, Some(FeatureId::String("01".into())));
        assert_eq!(states.features[0].id.as_ref().and_then(FeatureId::as_fips), Some(1));
        let name = states.features[0]
            .properties
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str());
        assert_eq!(name, Some("Alabama"));
    }

    #[test]
    fn reports_missing_object_and_bad_arcs() {
        let topology = fixtures::topology();
        assert_eq!(
            topology.feature("nation"),
            Err(TopologyError::MissingObject("nation".into()))
        );

        let broken: Topology = serde_json::from_value(json!({
            "type": "Topology",
            "objects": { "bad": { "type": "Polygon", "arcs": [[7]] } },
            "arcs": []
        }))
        .unwrap();
        assert_eq!(broken.feature("bad"), Err(TopologyError::ArcOutOfRange(7)));
    }

    #[test]
    fn rejects_non_topology_documents() {
        let doc: Topology = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "objects": {},
            "arcs": []
        }))
        .unwrap();
        assert!(matches!(doc.decoder(), Err(TopologyError::NotATopology(_))));
    }
}
