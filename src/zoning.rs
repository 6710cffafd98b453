use geo::{BoundingRect, Intersects, Point, Polygon};
use regex::Regex;
use rstar::{RTree, AABB};
use serde_json::{Map, Value};

use crate::attrs::value_text;
use crate::geom::{rings_to_polygons, IndexedBox};
use crate::source::Feature;

/// Immutable spatial index over the run's residential zoning polygons.
///
/// The R-tree holds bounding boxes; point queries filter candidates through
/// an exact intersection test against the stored polygon.
pub struct ZoningIndex {
    shapes: Vec<Polygon<f64>>,
    rtree: RTree<IndexedBox>,
}

impl ZoningIndex {
    fn new(shapes: Vec<Polygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                shapes
                    .iter()
                    .enumerate()
                    .filter_map(|(i, polygon)| {
                        polygon.bounding_rect().map(|rect| IndexedBox::new(i, rect))
                    })
                    .collect(),
            ),
            shapes,
        }
    }

    /// Number of indexed polygons.
    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// True if any indexed polygon intersects the point.
    pub fn intersects_point(&self, point: Point<f64>) -> bool {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.rtree
            .locate_in_envelope_intersecting(&envelope)
            .any(|entry| self.shapes[entry.idx()].intersects(&point))
    }
}

/// True if any zoning-related attribute value matches the residential pattern.
///
/// Keys are scanned by substring ("zone", "district", "class") instead of a
/// fixed schema, since the upstream schema is not controlled by this system.
pub fn is_residential_zone(attrs: &Map<String, Value>, zone_re: &Regex) -> bool {
    attrs.iter().any(|(key, value)| {
        let key = key.to_lowercase();
        if !key.contains("zone") && !key.contains("district") && !key.contains("class") {
            return false;
        }
        let text = value_text(value);
        !text.is_empty() && zone_re.is_match(&text)
    })
}

/// Build the residential index from the run's zoning features.
///
/// Returns `None` when no residential polygons exist; callers must treat
/// that as "cannot determine zoning spatially" and use the textual fallback.
pub fn build_residential_index(features: &[Feature], zone_re: &Regex) -> Option<ZoningIndex> {
    let mut shapes = Vec::new();
    for feature in features {
        if !is_residential_zone(&feature.attributes, zone_re) {
            continue;
        }
        if let Some(geometry) = &feature.geometry {
            shapes.extend(rings_to_polygons(&geometry.rings));
        }
    }
    if shapes.is_empty() {
        None
    } else {
        Some(ZoningIndex::new(shapes))
    }
}

/// Two-tier residential match: spatial when both a representative point and
/// an index exist, otherwise a regex match against the parcel's own zoning
/// label. Deterministic even when geometry or zoning data failed to build.
pub fn matches_residential(
    centroid: Option<Point<f64>>,
    index: Option<&ZoningIndex>,
    zoning_label: &str,
    zone_re: &Regex,
) -> bool {
    match (centroid, index) {
        (Some(point), Some(index)) => index.intersects_point(point),
        _ => zone_re.is_match(zoning_label),
    }
}
