use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::rtree::rtree_types::{SpatialError, SpatialResult};

/// An axis-aligned bounding box with one `(lower, upper)` pair per dimension.
///
/// `BoundingBox` encloses either a single indexed item (an entry) or the
/// contents of a tree node. A box whose lower and upper bounds coincide in
/// every dimension is a point and is fully supported.
///
/// # Examples
///
/// ```rust
/// use tsindex_rtree::BoundingBox;
///
/// let bbox = BoundingBox::new(vec![0.0, 0.0], vec![10.0, 5.0]).unwrap();
/// assert_eq!(bbox.area(), 50.0);
///
/// let point = BoundingBox::point(&[3.0, 4.0]).unwrap();
/// assert!(bbox.contains(&point));
/// ```
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct BoundingBox {
    lower: Vec<f32>,
    upper: Vec<f32>,
}

impl BoundingBox {
    /// Creates a bounding box from per-dimension lower and upper bounds.
    ///
    /// Fails with [`SpatialError::MalformedInput`] when the two slices differ
    /// in length, are empty, or a lower bound exceeds its upper bound (NaN
    /// bounds are rejected the same way).
    pub fn new(lower: Vec<f32>, upper: Vec<f32>) -> SpatialResult<Self> {
        if lower.is_empty() {
            return Err(SpatialError::MalformedInput(
                "bounding box needs at least one dimension".into(),
            ));
        }
        if lower.len() != upper.len() {
            return Err(SpatialError::MalformedInput(format!(
                "bounding box has {} lower bounds but {} upper bounds",
                lower.len(),
                upper.len()
            )));
        }
        for (dim, (l, u)) in lower.iter().zip(upper.iter()).enumerate() {
            if !(l <= u) {
                return Err(SpatialError::MalformedInput(format!(
                    "lower bound {:?} exceeds upper bound {:?} in dimension {}",
                    l, u, dim
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// Creates a degenerate box covering exactly one point.
    pub fn point(coords: &[f32]) -> SpatialResult<Self> {
        Self::new(coords.to_vec(), coords.to_vec())
    }

    /// Builds a box without validation. Callers guarantee equal lengths.
    pub(crate) fn from_parts(lower: Vec<f32>, upper: Vec<f32>) -> Self {
        Self { lower, upper }
    }

    /// The inverted box used by a root that has never held anything.
    pub(crate) fn empty(dimensions: usize) -> Self {
        Self {
            lower: vec![f32::MAX; dimensions],
            upper: vec![-f32::MAX; dimensions],
        }
    }

    /// Number of dimensions.
    pub fn dimensions(&self) -> usize {
        self.lower.len()
    }

    /// Lower bounds, one per dimension.
    pub fn lower(&self) -> &[f32] {
        &self.lower
    }

    /// Upper bounds, one per dimension.
    pub fn upper(&self) -> &[f32] {
        &self.upper
    }

    /// Returns true when every lower bound equals its upper bound.
    pub fn is_point(&self) -> bool {
        self.lower.iter().zip(&self.upper).all(|(l, u)| l == u)
    }

    /// Product of the per-dimension extents.
    pub fn area(&self) -> f32 {
        self.lower
            .iter()
            .zip(&self.upper)
            .fold(1.0f32, |area, (l, u)| area * (u - l))
    }

    /// Returns the smallest box enclosing both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut merged = self.clone();
        merged.expand(other);
        merged
    }

    /// Grows this box in place so that it also encloses `other`.
    pub fn expand(&mut self, other: &BoundingBox) {
        for (l, o) in self.lower.iter_mut().zip(&other.lower) {
            if *o < *l {
                *l = *o;
            }
        }
        for (u, o) in self.upper.iter_mut().zip(&other.upper) {
            if *o > *u {
                *u = *o;
            }
        }
    }

    /// Area that must be added to this box for it to enclose `other`.
    pub fn enlargement(&self, other: &BoundingBox) -> f32 {
        self.union(other).area() - self.area()
    }

    /// Checks if this bounding box intersects another (touching counts).
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        (0..self.dimensions())
            .all(|i| self.lower[i] <= other.upper[i] && self.upper[i] >= other.lower[i])
    }

    /// Checks if this bounding box fully contains another.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        (0..self.dimensions())
            .all(|i| self.lower[i] <= other.lower[i] && self.upper[i] >= other.upper[i])
    }

    /// Recomputes the tight cover of `boxes`, or `None` when there are none.
    pub(crate) fn cover<'a, I>(boxes: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        let mut iter = boxes.into_iter();
        let mut cover = iter.next()?.clone();
        for b in iter {
            cover.expand(b);
        }
        Some(cover)
    }
}

fn write_bounds(f: &mut Formatter<'_>, bounds: &[f32]) -> std::fmt::Result {
    write!(f, "[")?;
    for (i, v) in bounds.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{:?}", v)?;
    }
    write!(f, "]")
}

impl Display for BoundingBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LB=")?;
        write_bounds(f, &self.lower)?;
        write!(f, ", UB=")?;
        write_bounds(f, &self.upper)
    }
}
