//! In-memory R-Tree for time-series feature indexing.
//!
//! This module provides the tree itself together with:
//! - Linear and quadratic node splitting with minimum-occupancy guarantees
//! - A compact big-endian wire format with caller-supplied payload codecs
//! - Integrity checking of every structural invariant
//!
//! The whole tree lives in memory and is serialized or deserialized as one
//! unit.

pub mod codec;
pub mod persistence;
pub mod rtree_config;
pub mod rtree_constants;
pub mod rtree_types;
mod rtree_impl;
mod rtree_split;

pub use persistence::IntegrityReport;
pub use rtree_config::{RTreeConfig, SeedsPicker};
pub use rtree_constants::{DEFAULT_DIMENSIONS, DEFAULT_MAX_CHILDREN, DEFAULT_MIN_CHILDREN};
pub use rtree_impl::{NodeRef, RTree};
pub use rtree_types::{Entry, NodeId, RTreeStats, SpatialError, SpatialResult};
