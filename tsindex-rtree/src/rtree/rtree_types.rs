//! Core types and data structures for the R-Tree.
//!
//! This module defines the fundamental types used throughout the R-Tree:
//! - Error types and result types
//! - Arena node types (leaf and internal)
//! - Statistics structures

use std::io;
use thiserror::Error;

use crate::bounding_box::BoundingBox;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in spatial indexing operations
#[derive(Debug, Error)]
pub enum SpatialError {
    /// The tree parameters cannot guarantee a valid two-way split.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// A box or query does not match the tree's shape.
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Truncated or corrupt serialized data, or a payload codec failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The tree's internal structure does not permit the operation.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<bincode::error::EncodeError> for SpatialError {
    fn from(err: bincode::error::EncodeError) -> Self {
        SpatialError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for SpatialError {
    fn from(err: bincode::error::DecodeError) -> Self {
        SpatialError::Serialization(err.to_string())
    }
}

/// Result type for spatial operations
pub type SpatialResult<T> = Result<T, SpatialError>;

/// Index of a node inside the tree's arena
pub type NodeId = usize;

// ============================================================================
// Statistics
// ============================================================================

/// Structural statistics about an R-Tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RTreeStats {
    pub total_entries: u64,
    pub node_count: u64,
    pub leaf_count: u64,
    pub tree_height: u32,
}

// ============================================================================
// Node Types
// ============================================================================

/// An entry in a leaf node: the box of one indexed item plus its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<T> {
    pub(crate) bbox: BoundingBox,
    pub(crate) payload: T,
}

impl<T> Entry<T> {
    pub(crate) fn new(bbox: BoundingBox, payload: T) -> Self {
        Self { bbox, payload }
    }

    /// The entry's own box.
    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// The opaque payload stored with the box.
    pub fn payload(&self) -> &T {
        &self.payload
    }
}

/// What a node holds
#[derive(Debug, Clone)]
pub(crate) enum NodeItems<T> {
    /// Leaf node containing actual entries
    Leaf { entries: Vec<Entry<T>> },
    /// Internal node containing owned children, by arena index
    Internal { children: Vec<NodeId> },
}

/// A node stored in the tree's arena.
///
/// Ownership runs downward through `items`; `parent` is a plain index used
/// only to walk upward and is `None` for the root alone.
#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    pub(crate) bbox: BoundingBox,
    pub(crate) parent: Option<NodeId>,
    pub(crate) items: NodeItems<T>,
}

impl<T> Node<T> {
    pub(crate) fn new_leaf(bbox: BoundingBox, parent: Option<NodeId>) -> Self {
        Self {
            bbox,
            parent,
            items: NodeItems::Leaf {
                entries: Vec::new(),
            },
        }
    }

    pub(crate) fn new_internal(bbox: BoundingBox, parent: Option<NodeId>) -> Self {
        Self {
            bbox,
            parent,
            items: NodeItems::Internal {
                children: Vec::new(),
            },
        }
    }

    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self.items, NodeItems::Leaf { .. })
    }

    pub(crate) fn len(&self) -> usize {
        match &self.items {
            NodeItems::Leaf { entries } => entries.len(),
            NodeItems::Internal { children } => children.len(),
        }
    }

    pub(crate) fn children(&self) -> &[NodeId] {
        match &self.items {
            NodeItems::Internal { children } => children,
            NodeItems::Leaf { .. } => &[],
        }
    }

    pub(crate) fn entries(&self) -> &[Entry<T>] {
        match &self.items {
            NodeItems::Leaf { entries } => entries,
            NodeItems::Internal { .. } => &[],
        }
    }
}
