mod bbox;
mod rings;

pub(crate) use bbox::IndexedBox;
pub use rings::{centroid_of_rings, rings_to_polygons};
