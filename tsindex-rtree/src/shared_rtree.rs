use bytes::BufMut;
use log::debug;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::bounding_box::BoundingBox;
use crate::index_rtree::IndexRTree;
use crate::rtree::{RTree, RTreeConfig, SpatialResult};

/// A cloneable handle that serializes writers and admits concurrent readers.
///
/// [`RTree`] performs no locking of its own. `SharedRTree` wraps it in a
/// read-write lock so that inserts never overlap with traversals, queries or
/// serialization.
///
/// # Example
///
/// ```rust
/// use tsindex_rtree::{BoundingBox, IndexRTree, RTreeConfig, SharedRTree};
///
/// let tree = SharedRTree::new(RTreeConfig::default()).unwrap();
/// let writer = tree.clone();
/// std::thread::spawn(move || {
///     writer.add(&BoundingBox::point(&[1.0, 1.0]).unwrap(), 42u64).unwrap();
/// })
/// .join()
/// .unwrap();
///
/// assert_eq!(tree.size(), 1);
/// ```
pub struct SharedRTree<T> {
    inner: Arc<RwLock<RTree<T>>>,
}

impl<T> Clone for SharedRTree<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> SharedRTree<T> {
    /// Creates a handle around a new, empty tree.
    pub fn new(config: RTreeConfig) -> SpatialResult<Self> {
        Ok(Self::from_tree(RTree::new(config)?))
    }

    /// Takes ownership of an existing tree, typically one just deserialized.
    pub fn from_tree(tree: RTree<T>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    /// Inserts under the write lock.
    pub fn insert(&self, bbox: BoundingBox, payload: T) -> SpatialResult<()> {
        self.inner.write().insert(bbox, payload)
    }

    /// Runs `f` against the tree under the read lock.
    pub fn read<R>(&self, f: impl FnOnce(&RTree<T>) -> R) -> R {
        f(&self.inner.read())
    }

    /// Swaps in a whole new tree and returns the previous one.
    pub fn replace(&self, tree: RTree<T>) -> RTree<T> {
        let old = std::mem::replace(&mut *self.inner.write(), tree);
        debug!("Replaced shared R-Tree holding {} entries", old.len());
        old
    }

    /// Serializes a consistent snapshot under the read lock.
    pub fn serialize<B, E>(&self, sink: &mut B, encoder: E) -> SpatialResult<()>
    where
        B: BufMut,
        E: FnMut(&T, &mut B) -> SpatialResult<()>,
    {
        self.inner.read().serialize(sink, encoder)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl<T: Clone + Send + Sync> IndexRTree<T> for SharedRTree<T> {
    fn add(&self, key: &BoundingBox, value: T) -> SpatialResult<()> {
        self.insert(key.clone(), value)
    }

    fn find_intersecting_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<T>> {
        let tree = self.inner.read();
        Ok(tree.find_intersecting(key)?.into_iter().cloned().collect())
    }

    fn find_contained_keys(&self, key: &BoundingBox) -> SpatialResult<Vec<T>> {
        let tree = self.inner.read();
        Ok(tree.find_contained(key)?.into_iter().cloned().collect())
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn clear(&self) -> SpatialResult<()> {
        let mut tree = self.inner.write();
        let config = *tree.config();
        *tree = RTree::new(config)?;
        debug!("Cleared shared R-Tree");
        Ok(())
    }
}
