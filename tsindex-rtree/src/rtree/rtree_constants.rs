//! Constants for the R-Tree implementation.

/// Fan-out used by the reference configuration
pub const DEFAULT_MAX_CHILDREN: usize = 4;

/// Minimum occupancy used by the reference configuration
pub const DEFAULT_MIN_CHILDREN: usize = 2;

/// Dimensionality used by the reference configuration
pub const DEFAULT_DIMENSIONS: usize = 2;

/// Deepest node nesting accepted when decoding a serialized tree.
/// A fan-out of at least two never gets near this.
pub const MAX_TREE_HEIGHT: usize = 64;

/// Per-level indentation marker in the structural dump
pub const DUMP_INDENT: &str = "--";

/// Wire value of the leaf flag for a leaf node
pub const LEAF_FLAG: u8 = 1;

/// Wire value of the leaf flag for an internal node
pub const INTERNAL_FLAG: u8 = 0;
