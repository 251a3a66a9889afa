//! Area on the WGS84 ellipsoid of polygons whose edges are straight lines in longitude/latitude,
//! the way GeoJSON geometries are drawn.
//!
//! The area element `a²(1-e²)cosφ / (1-e²sin²φ)² dλ dφ` integrates in φ to `a²/2 · q(φ)`, with `q`
//! the authalic latitude function, so a ring's area is the line integral of `a²/2 · q(φ) dλ` along
//! its edges. A ring that folds back on itself integrates to zero.
use geo::{Coord, LineString, MultiPolygon, Polygon};

const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
const INVERSE_FLATTENING: f64 = 298.257_223_563;

/// Radians of latitude per integration step along an edge.
const MAX_STEP: f64 = 0.01;

// Gauss-Legendre nodes and weights on [0, 1]
const NODES: [f64; 3] = [0.112_701_665_379_258_3, 0.5, 0.887_298_334_620_741_7];
const WEIGHTS: [f64; 3] = [5.0 / 18.0, 8.0 / 18.0, 5.0 / 18.0];

/// Area in square metres of longitude/latitude polygons given in degrees.
pub fn ellipsoidal_area_m2<'a>(features: impl IntoIterator<Item = &'a MultiPolygon<f64>>) -> f64 {
    features.into_iter().map(multi_polygon_area).sum()
}

fn multi_polygon_area(multi_polygon: &MultiPolygon<f64>) -> f64 {
    multi_polygon.iter().map(polygon_area).sum()
}

fn polygon_area(polygon: &Polygon<f64>) -> f64 {
    let holes: f64 = polygon.interiors().iter().map(ring_area).sum();
    (ring_area(polygon.exterior()) - holes).max(0.0)
}

fn ring_area(ring: &LineString<f64>) -> f64 {
    let Some(first) = ring.0.first() else {
        return 0.0;
    };
    // q relative to the first vertex keeps the summands small
    let q_ref = authalic_q(first.y.to_radians());

    // geo keeps polygon rings closed
    let integral: f64 = ring
        .lines()
        .map(|line| edge_integral(line.start, line.end, q_ref))
        .sum();
    (0.5 * SEMI_MAJOR_AXIS.powi(2) * integral).abs()
}

fn edge_integral(start: Coord<f64>, end: Coord<f64>, q_ref: f64) -> f64 {
    let (lon0, lat0) = (start.x.to_radians(), start.y.to_radians());
    let d_lon = end.x.to_radians() - lon0;
    if d_lon == 0.0 {
        return 0.0;
    }
    let d_lat = end.y.to_radians() - lat0;
    let steps = (d_lat.abs() / MAX_STEP).ceil().max(1.0) as usize;
    let mut mean = 0.0;
    for step in 0..steps {
        for (node, weight) in NODES.iter().zip(WEIGHTS) {
            let t = (step as f64 + node) / steps as f64;
            mean += weight * (authalic_q(lat0 + t * d_lat) - q_ref);
        }
    }
    d_lon * mean / steps as f64
}

fn authalic_q(lat: f64) -> f64 {
    let f = 1.0 / INVERSE_FLATTENING;
    let e2 = f * (2.0 - f);
    let e = e2.sqrt();
    let s = lat.sin();
    (1.0 - e2) * (s / (1.0 - e2 * s * s) - (1.0 / (2.0 * e)) * ((1.0 - e * s) / (1.0 + e * s)).ln())
}
