//! IndexRTree trait definition for series indexing.

use crate::bounding_box::BoundingBox;
use crate::rtree::SpatialResult;

/// An R-Tree as seen by the index manager that owns it.
///
/// Implementations hand out owned keys so that callers never hold a borrow
/// into the tree across lock boundaries.
pub trait IndexRTree<T>: Send + Sync {
    /// Adds a key to the rtree.
    fn add(&self, key: &BoundingBox, value: T) -> SpatialResult<()>;

    /// Finds the values whose keys intersect `key`.
    fn find_intersecting_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<T>>;

    /// Finds the values whose keys lie inside `key`.
    fn find_contained_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<T>>;

    /// Gets the number of entries in the rtree.
    fn size(&self) -> u64;

    /// Discards every entry, keeping the configuration.
    fn clear(&self) -> SpatialResult<()>;
}
