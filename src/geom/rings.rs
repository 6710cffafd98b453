use geo::{BooleanOps, Centroid, Coord, LineString, MultiPolygon, Point, Polygon, Validation};
use serde_json::Value;

/// Convert a raw ring array into validated polygons.
///
/// Each ring is converted independently. Rings that are malformed (non-array
/// points, non-numeric coordinates), too short (fewer than 4 points), or
/// topologically invalid are skipped, never repaired.
pub fn rings_to_polygons(rings: &Value) -> Vec<Polygon<f64>> {
    let Some(rings) = rings.as_array() else { return Vec::new() };

    let mut polygons = Vec::new();
    for ring in rings {
        let Some(coords) = parse_ring(ring) else { continue };
        if coords.len() < 4 {
            continue;
        }
        let polygon = Polygon::new(LineString::new(coords), vec![]);
        if polygon.is_valid() {
            polygons.push(polygon);
        }
    }
    polygons
}

/// Representative point for one feature's ring array: the centroid of the
/// left-fold union of its valid polygons. `None` when the feature has no
/// valid polygon or the union is empty.
pub fn centroid_of_rings(rings: &Value) -> Option<Point<f64>> {
    rings_to_polygons(rings)
        .into_iter()
        .map(|polygon| MultiPolygon::new(vec![polygon]))
        .reduce(|a, b| a.union(&b))?
        .centroid()
}

fn parse_ring(ring: &Value) -> Option<Vec<Coord<f64>>> {
    let points = ring.as_array()?;
    let mut coords = Vec::with_capacity(points.len());
    for point in points {
        let point = point.as_array()?;
        coords.push(Coord {
            x: point.first()?.as_f64()?,
            y: point.get(1)?.as_f64()?,
        });
    }
    Some(coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn unit_square(offset: f64) -> Value {
        json!([
            [offset, 0.0],
            [offset + 1.0, 0.0],
            [offset + 1.0, 1.0],
            [offset, 1.0],
            [offset, 0.0]
        ])
    }

    #[test]
    fn valid_ring_builds_one_polygon() {
        let polygons = rings_to_polygons(&json!([unit_square(0.0)]));
        assert_eq!(polygons.len(), 1);
    }

    #[test]
    fn short_ring_is_skipped() {
        let polygons = rings_to_polygons(&json!([[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]]]));
        assert!(polygons.is_empty());
    }

    #[test]
    fn malformed_coordinates_skip_the_ring_only() {
        let rings = json!([[[0.0, 0.0], ["x", 1.0], [1.0, 1.0], [0.0, 0.0]], unit_square(0.0)]);
        assert_eq!(rings_to_polygons(&rings).len(), 1);
    }

    #[test]
    fn non_array_geometry_yields_nothing() {
        assert!(rings_to_polygons(&json!(null)).is_empty());
        assert!(rings_to_polygons(&json!("rings")).is_empty());
    }

    #[test]
    fn centroid_of_single_square() {
        let centroid = centroid_of_rings(&json!([unit_square(0.0)])).unwrap();
        assert!((centroid.x() - 0.5).abs() < 1e-9);
        assert!((centroid.y() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn centroid_of_union_spans_both_parts() {
        let centroid = centroid_of_rings(&json!([unit_square(0.0), unit_square(1.0)])).unwrap();
        assert!((centroid.x() - 1.0).abs() < 1e-9);
        assert!((centroid.y() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_valid_rings_yield_no_centroid() {
        assert!(centroid_of_rings(&json!([])).is_none());
        assert!(centroid_of_rings(&json!([[[0.0, 0.0], [1.0, 1.0]]])).is_none());
    }
}
