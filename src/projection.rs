use geo::{Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-6;

pub trait Projection: Send + Sync {
    /// Returns `None` for positions the projection cannot place on the canvas.
    fn project(&self, x: f64, y: f64) -> Option<(f64, f64)>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionKind {
    /// Coordinates are already screen units. The published counties topology
    /// ships pre-projected in Albers USA for the 960×600 canvas.
    #[default]
    Preprojected,
    /// Longitude/latitude input projected with the composite Albers USA.
    AlbersUsa,
}

impl ProjectionKind {
    pub fn build(self) -> Box<dyn Projection> {
        match self {
            ProjectionKind::Preprojected => Box::new(Preprojected),
            ProjectionKind::AlbersUsa => Box::new(AlbersUsa::for_canvas(960.0, 600.0)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Preprojected;

impl Projection for Preprojected {
    fn project(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        Some((x, y))
    }
}

/// Conic equal-area projection with a longitude-only rotation.
#[derive(Debug, Clone, Copy)]
struct ConicEqualArea {
    n: f64,
    c: f64,
    r0: f64,
    rotate: f64,
    scale: f64,
    translate: (f64, f64),
    center: (f64, f64),
}

impl ConicEqualArea {
    fn new(parallels: (f64, f64), rotate: f64, center: (f64, f64), scale: f64, translate: (f64, f64)) -> Self {
        let sy0 = parallels.0.to_radians().sin();
        let n = (sy0 + parallels.1.to_radians().sin()) / 2.0;
        let c = 1.0 + sy0 * (2.0 * n - sy0);
        let r0 = c.sqrt() / n;
        let mut projection = Self {
            n,
            c,
            r0,
            rotate: rotate.to_radians(),
            scale,
            translate,
            center: (0.0, 0.0),
        };
        // the center is expressed in the rotated frame
        projection.center = projection.raw(center.0.to_radians(), center.1.to_radians());
        projection
    }

    fn raw(&self, lambda: f64, phi: f64) -> (f64, f64) {
        let r = (self.c - 2.0 * self.n * phi.sin()).max(0.0).sqrt() / self.n;
        let a = lambda * self.n;
        (r * a.sin(), self.r0 - r * a.cos())
    }

    fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let mut lambda = lon.to_radians() + self.rotate;
        if lambda > std::f64::consts::PI {
            lambda -= std::f64::consts::TAU;
        } else if lambda < -std::f64::consts::PI {
            lambda += std::f64::consts::TAU;
        }
        let (x, y) = self.raw(lambda, lat.to_radians());
        (
            self.translate.0 + self.scale * (x - self.center.0),
            self.translate.1 - self.scale * (y - self.center.1),
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct ClipExtent {
    min: (f64, f64),
    max: (f64, f64),
}

impl ClipExtent {
    fn contains(&self, (x, y): (f64, f64)) -> bool {
        self.min.0 <= x && x <= self.max.0 && self.min.1 <= y && y <= self.max.1
    }
}

/// Composite of the lower 48, Alaska and Hawaii, each inset clipped to its
/// own box on the canvas.
#[derive(Debug, Clone)]
pub struct AlbersUsa {
    insets: [(ConicEqualArea, ClipExtent); 3],
}

impl AlbersUsa {
    pub fn new(scale: f64, translate: (f64, f64)) -> Self {
        let k = scale;
        let (x, y) = translate;

        let lower48 = ConicEqualArea::new((29.5, 45.5), 96.0, (-0.6, 38.7), k, (x, y));
        let lower48_clip = ClipExtent {
            min: (x - 0.455 * k, y - 0.238 * k),
            max: (x + 0.455 * k, y + 0.238 * k),
        };

        let alaska = ConicEqualArea::new((55.0, 65.0), 154.0, (-2.0, 58.5), k * 0.35, (x - 0.307 * k, y + 0.201 * k));
        let alaska_clip = ClipExtent {
            min: (x - 0.425 * k + EPSILON, y + 0.120 * k + EPSILON),
            max: (x - 0.214 * k - EPSILON, y + 0.234 * k - EPSILON),
        };

        let hawaii = ConicEqualArea::new((8.0, 18.0), 157.0, (-3.0, 19.9), k, (x - 0.205 * k, y + 0.212 * k));
        let hawaii_clip = ClipExtent {
            min: (x - 0.214 * k + EPSILON, y + 0.166 * k + EPSILON),
            max: (x - 0.115 * k - EPSILON, y + 0.234 * k - EPSILON),
        };

        Self {
            insets: [(lower48, lower48_clip), (alaska, alaska_clip), (hawaii, hawaii_clip)],
        }
    }

    pub fn for_canvas(width: f64, height: f64) -> Self {
        Self::new(1070.0, (width / 2.0, height / 2.0))
    }
}

impl Projection for AlbersUsa {
    fn project(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        self.insets.iter().find_map(|(projection, clip)| {
            let point = projection.project(lon, lat);
            clip.contains(point).then_some(point)
        })
    }
}

/// Projects every position of a geometry. Unplaceable positions are dropped;
/// parts left with too few positions are dropped with them.
pub fn project_geometry(projection: &dyn Projection, geometry: &Geometry<f64>) -> Option<Geometry<f64>> {
    match geometry {
        Geometry::Point(p) => project_point(projection, p).map(Geometry::Point),
        Geometry::MultiPoint(mp) => {
            let points: Vec<Point<f64>> = mp.iter().filter_map(|p| project_point(projection, p)).collect();
            (!points.is_empty()).then(|| Geometry::MultiPoint(MultiPoint::new(points)))
        }
        Geometry::Line(line) => project_line(projection, &LineString::from(*line)).map(Geometry::LineString),
        Geometry::LineString(ls) => project_line(projection, ls).map(Geometry::LineString),
        Geometry::MultiLineString(mls) => {
            let lines: Vec<_> = mls.iter().filter_map(|ls| project_line(projection, ls)).collect();
            (!lines.is_empty()).then(|| Geometry::MultiLineString(MultiLineString::new(lines)))
        }
        Geometry::Polygon(p) => project_polygon(projection, p).map(Geometry::Polygon),
        Geometry::MultiPolygon(mp) => project_multi_polygon(projection, mp).map(Geometry::MultiPolygon),
        Geometry::Rect(r) => project_polygon(projection, &r.to_polygon()).map(Geometry::Polygon),
        Geometry::Triangle(t) => project_polygon(projection, &t.to_polygon()).map(Geometry::Polygon),
        Geometry::GeometryCollection(gc) => {
            let members: Vec<_> = gc.iter().filter_map(|g| project_geometry(projection, g)).collect();
            (!members.is_empty()).then(|| Geometry::GeometryCollection(GeometryCollection::new_from(members)))
        }
    }
}

pub fn project_multi_polygon(projection: &dyn Projection, mp: &MultiPolygon<f64>) -> Option<MultiPolygon<f64>> {
    let polygons: Vec<_> = mp.iter().filter_map(|p| project_polygon(projection, p)).collect();
    (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
}

fn project_coords(projection: &dyn Projection, ls: &LineString<f64>) -> Vec<Coord<f64>> {
    ls.coords()
        .filter_map(|c| projection.project(c.x, c.y))
        .map(|(x, y)| Coord { x, y })
        .collect()
}

fn project_point(projection: &dyn Projection, p: &Point<f64>) -> Option<Point<f64>> {
    projection.project(p.x(), p.y()).map(|(x, y)| Point::new(x, y))
}

fn project_line(projection: &dyn Projection, ls: &LineString<f64>) -> Option<LineString<f64>> {
    let coords = project_coords(projection, ls);
    (coords.len() >= 2).then(|| LineString::new(coords))
}

fn project_ring(projection: &dyn Projection, ls: &LineString<f64>) -> Option<LineString<f64>> {
    let coords = project_coords(projection, ls);
    (coords.len() >= 3).then(|| LineString::new(coords))
}

fn project_polygon(projection: &dyn Projection, p: &Polygon<f64>) -> Option<Polygon<f64>> {
    let exterior = project_ring(projection, p.exterior())?;
    let interiors = p.interiors().iter().filter_map(|r| project_ring(projection, r)).collect();
    Some(Polygon::new(exterior, interiors))
}
