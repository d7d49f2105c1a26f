//! R-Tree configuration module.
//!
//! The configuration is fixed when a tree is constructed and travels with the
//! tree in its serialized header.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use super::rtree_constants::{DEFAULT_DIMENSIONS, DEFAULT_MAX_CHILDREN, DEFAULT_MIN_CHILDREN};
use super::rtree_types::{SpatialError, SpatialResult};

/// Seed-selection policy used when an overflowing node is split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SeedsPicker {
    /// Linear-cost seeds: the pair with the greatest normalized separation
    /// along any single dimension. Remaining items are taken in order.
    #[default]
    Linear,
    /// Quadratic-cost seeds: the pair wasting the most area when covered
    /// together. Remaining items are taken by strongest group preference.
    Quadratic,
}

impl SeedsPicker {
    /// Stable tag written in the serialized header.
    pub fn wire_tag(&self) -> u8 {
        match self {
            SeedsPicker::Linear => 0,
            SeedsPicker::Quadratic => 1,
        }
    }

    /// Inverse of [`SeedsPicker::wire_tag`].
    pub fn from_wire_tag(tag: u8) -> SpatialResult<Self> {
        match tag {
            0 => Ok(SeedsPicker::Linear),
            1 => Ok(SeedsPicker::Quadratic),
            other => Err(SpatialError::Serialization(format!(
                "unknown seeds picker tag {}",
                other
            ))),
        }
    }
}

impl Display for SeedsPicker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedsPicker::Linear => write!(f, "LINEAR"),
            SeedsPicker::Quadratic => write!(f, "QUADRATIC"),
        }
    }
}

/// Immutable R-Tree parameters.
///
/// # Example
///
/// ```rust
/// use tsindex_rtree::{RTreeConfig, SeedsPicker};
///
/// let config = RTreeConfig::new(8, 3, 4, SeedsPicker::Linear).unwrap();
/// assert_eq!(config.max_children(), 8);
///
/// // min_children must not exceed max_children / 2
/// assert!(RTreeConfig::new(8, 5, 4, SeedsPicker::Linear).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RTreeConfig {
    max_children: usize,
    min_children: usize,
    dimensions: usize,
    #[serde(default)]
    seeds_picker: SeedsPicker,
}

impl RTreeConfig {
    /// Creates and validates a configuration.
    pub fn new(
        max_children: usize,
        min_children: usize,
        dimensions: usize,
        seeds_picker: SeedsPicker,
    ) -> SpatialResult<Self> {
        let config = Self {
            max_children,
            min_children,
            dimensions,
            seeds_picker,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the fan-out and dimensionality rules.
    ///
    /// Configurations that arrive through serde are not checked until this
    /// runs, which tree construction always does.
    pub fn validate(&self) -> SpatialResult<()> {
        if self.max_children < 2 {
            return Err(SpatialError::Configuration(format!(
                "max_children must be at least 2, got {}",
                self.max_children
            )));
        }
        if self.min_children > self.max_children / 2 {
            return Err(SpatialError::Configuration(format!(
                "min_children {} exceeds max_children / 2 ({})",
                self.min_children,
                self.max_children / 2
            )));
        }
        if self.dimensions < 1 {
            return Err(SpatialError::Configuration(
                "dimensions must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Maximum children (internal) or entries (leaf) per node.
    #[inline]
    pub fn max_children(&self) -> usize {
        self.max_children
    }

    /// Minimum children or entries per non-root node.
    #[inline]
    pub fn min_children(&self) -> usize {
        self.min_children
    }

    /// Number of dimensions of every box in the tree.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Split policy.
    #[inline]
    pub fn seeds_picker(&self) -> SeedsPicker {
        self.seeds_picker
    }

    /// Returns a copy using a different split policy.
    /// Builder-style method for chaining.
    #[inline]
    pub fn with_seeds_picker(mut self, seeds_picker: SeedsPicker) -> Self {
        self.seeds_picker = seeds_picker;
        self
    }
}

impl Default for RTreeConfig {
    fn default() -> Self {
        Self {
            max_children: DEFAULT_MAX_CHILDREN,
            min_children: DEFAULT_MIN_CHILDREN,
            dimensions: DEFAULT_DIMENSIONS,
            seeds_picker: SeedsPicker::Linear,
        }
    }
}

impl Display for RTreeConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "nMax:{},nMin:{},dim:{},seedsPicker:{}",
            self.max_children, self.min_children, self.dimensions, self.seeds_picker
        )
    }
}
