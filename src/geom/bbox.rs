use geo::Rect;
use rstar::{RTreeObject, AABB};

/// A bounding box in an R-tree, associated with a Polygon by index.
#[derive(Debug, Clone)]
pub(crate) struct IndexedBox {
    idx: usize, // Index of the corresponding Polygon in the index's shape list
    bbox: Rect<f64>,
}

impl IndexedBox {
    pub(crate) fn new(idx: usize, bbox: Rect<f64>) -> Self {
        Self { idx, bbox }
    }

    /// Get the index of the corresponding Polygon.
    pub(crate) fn idx(&self) -> usize { self.idx }
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}
