//! # TsIndex R-Tree - Bounding-Box Index for Time-Series Features
//!
//! This crate provides the in-memory R-Tree used to index feature vectors
//! extracted from time series, so that range and containment queries can
//! discard whole groups of series by their bounding boxes.
//!
//! ## Features
//!
//! - **Configurable Fan-Out**: `max_children` / `min_children` fixed per tree
//! - **N Dimensions**: boxes of any dimensionality, including degenerate points
//! - **Split Policies**: linear and quadratic seed selection
//! - **Codec Agnostic**: payloads are written and read by caller-supplied codecs
//! - **Deterministic**: identical insert sequences give identical trees and bytes
//! - **Shared Access**: a lock-guarded handle for one writer and many readers
//!
//! ## Quick Start
//!
//! ```rust
//! use tsindex_rtree::{codec, BoundingBox, RTree, RTreeConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tree = RTree::new(RTreeConfig::default())?;
//! for i in 0..10i32 {
//!     tree.insert_point(&[i as f32, (i * 2) as f32], i)?;
//! }
//!
//! let query = BoundingBox::new(vec![0.0, 0.0], vec![3.0, 6.0])?;
//! assert_eq!(tree.find_contained(&query)?.len(), 4);
//!
//! let mut bytes = Vec::new();
//! tree.serialize(&mut bytes, codec::put_i32)?;
//! let restored = RTree::deserialize(&mut bytes.as_slice(), codec::get_i32)?;
//! assert_eq!(restored.structural_dump(), tree.structural_dump());
//! # Ok(())
//! # }
//! ```

pub mod bounding_box;
pub mod index_rtree;
pub mod rtree;
pub mod shared_rtree;

pub use bounding_box::BoundingBox;
pub use index_rtree::IndexRTree;
pub use rtree::{
    codec, Entry, IntegrityReport, NodeId, NodeRef, RTree, RTreeConfig, RTreeStats, SeedsPicker,
    SpatialError, SpatialResult,
};
pub use shared_rtree::SharedRTree;
