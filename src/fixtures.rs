use crate::data::MapData;
use crate::topology::Topology;
use crate::types::EducationRecord;
use serde_json::{json, Value};
use std::sync::Arc;

// Counties 1001 and 1003 share the edge x = 10; 9999 is a triangle with no
// education record; 1005 has a record but no geometry.
pub fn topology_json() -> Value {
    json!({
        "type": "Topology",
        "bbox": [0, 0, 35, 10],
        "transform": { "scale": [1, 1], "translate": [0, 0] },
        "objects": {
            "counties": {
                "type": "GeometryCollection",
                "geometries": [
                    { "type": "Polygon", "id": 1001, "arcs": [[0, 1, 2]] },
                    { "type": "Polygon", "id": 1003, "arcs": [[3, -2]] },
                    { "type": "Polygon", "id": 9999, "arcs": [[4]] }
                ]
            },
            "states": {
                "type": "GeometryCollection",
                "geometries": [
                    {
                        "type": "MultiPolygon",
                        "id": "01",
                        "properties": { "name": "Alabama" },
                        "arcs": [[[0, 3, 2]], [[4]]]
                    }
                ]
            }
        },
        "arcs": [
            [[0, 0], [10, 0]],
            [[10, 0], [0, 10]],
            [[10, 10], [-10, 0], [0, -10]],
            [[10, 0], [10, 0], [0, 10], [-10, 0]],
            [[30, 0], [5, 0], [0, 5], [-5, -5]]
        ]
    })
}

pub fn topology() -> Topology {
    serde_json::from_value(topology_json()).expect("fixture topology")
}

pub fn education_json() -> Value {
    json!([
        { "fips": 1001, "state": "AL", "area_name": "Autauga County", "bachelorsOrHigher": 10.0 },
        { "fips": 1003, "state": "AL", "area_name": "Baldwin County", "bachelorsOrHigher": 50.0 },
        { "fips": 1005, "state": "AL", "area_name": "Barbour County", "bachelorsOrHigher": 30.0 }
    ])
}

pub fn education() -> Vec<EducationRecord> {
    serde_json::from_value(education_json()).expect("fixture education")
}

pub fn map_data() -> Arc<MapData> {
    Arc::new(MapData {
        education: education(),
        topology: topology(),
    })
}
