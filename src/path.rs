use geo::{Coord, Geometry, LineString, Polygon};
use std::fmt::Write;

const POINT_RADIUS: f64 = 4.5;

pub fn svg_path(geometry: &Geometry<f64>) -> String {
    let mut out = String::new();
    write_geometry(&mut out, geometry);
    out
}

/// Rounds to three decimals and prints the shortest form (`480`, `12.5`).
pub fn format_number(value: f64) -> String {
    let mut out = String::new();
    push_number(&mut out, value);
    out
}

fn push_number(out: &mut String, value: f64) {
    let rounded = (value * 1000.0).round() / 1000.0;
    // avoid "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    let _ = write!(out, "{rounded}");
}

fn push_coord(out: &mut String, command: char, c: &Coord<f64>) {
    out.push(command);
    push_number(out, c.x);
    out.push(',');
    push_number(out, c.y);
}

fn write_geometry(out: &mut String, geometry: &Geometry<f64>) {
    match geometry {
        Geometry::Point(p) => write_point(out, p.0),
        Geometry::MultiPoint(mp) => mp.iter().for_each(|p| write_point(out, p.0)),
        Geometry::Line(line) => write_line(out, &LineString::from(*line)),
        Geometry::LineString(ls) => write_line(out, ls),
        Geometry::MultiLineString(mls) => mls.iter().for_each(|ls| write_line(out, ls)),
        Geometry::Polygon(p) => write_polygon(out, p),
        Geometry::MultiPolygon(mp) => mp.iter().for_each(|p| write_polygon(out, p)),
        Geometry::Rect(r) => write_polygon(out, &r.to_polygon()),
        Geometry::Triangle(t) => write_polygon(out, &t.to_polygon()),
        Geometry::GeometryCollection(gc) => gc.iter().for_each(|g| write_geometry(out, g)),
    }
}

fn write_point(out: &mut String, c: Coord<f64>) {
    push_coord(out, 'M', &c);
    let r = POINT_RADIUS;
    let _ = write!(out, "m0,{r}a{r},{r} 0 1,1 0,{}a{r},{r} 0 1,1 0,{}z", -2.0 * r, 2.0 * r);
}

fn write_line(out: &mut String, ls: &LineString<f64>) {
    for (i, c) in ls.coords().enumerate() {
        push_coord(out, if i == 0 { 'M' } else { 'L' }, c);
    }
}

fn write_polygon(out: &mut String, polygon: &Polygon<f64>) {
    write_ring(out, polygon.exterior());
    for interior in polygon.interiors() {
        write_ring(out, interior);
    }
}

/// Rings are closed with `Z`, so the repeated closing position is skipped.
fn write_ring(out: &mut String, ring: &LineString<f64>) {
    let coords = &ring.0;
    let len = if coords.len() > 1 && ring.is_closed() {
        coords.len() - 1
    } else {
        coords.len()
    };
    if len == 0 {
        return;
    }
    for (i, c) in coords[..len].iter().enumerate() {
        push_coord(out, if i == 0 { 'M' } else { 'L' }, c);
    }
    out.push('Z');
}
