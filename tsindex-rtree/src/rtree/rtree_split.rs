//! Node overflow splitting.
//!
//! Splitting works purely on the boxes of the overflowing node's items and
//! returns two ordered groups of item indices. The tree then moves the
//! actual entries or children into the two resulting nodes, so the same code
//! serves leaves and internal nodes alike.

use crate::bounding_box::BoundingBox;

use super::rtree_config::SeedsPicker;

/// Two groups of item indices produced by a split, in assignment order.
///
/// The first group stays in the overflowing node and the second moves to the
/// new sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SplitGroups {
    pub(crate) first: Vec<usize>,
    pub(crate) second: Vec<usize>,
}

/// A group under construction: its members and their running cover.
struct Group {
    members: Vec<usize>,
    bbox: BoundingBox,
}

impl Group {
    fn seeded(seed: usize, boxes: &[BoundingBox]) -> Self {
        Self {
            members: vec![seed],
            bbox: boxes[seed].clone(),
        }
    }

    fn push(&mut self, item: usize, boxes: &[BoundingBox]) {
        self.members.push(item);
        self.bbox.expand(&boxes[item]);
    }
}

/// Partitions `boxes` into two groups.
///
/// Every index appears in exactly one group. Unless the forced-remainder rule
/// fills a group, each group ends up with at least `min_children` members.
pub(crate) fn split_groups(
    boxes: &[BoundingBox],
    min_children: usize,
    picker: SeedsPicker,
) -> SplitGroups {
    debug_assert!(boxes.len() >= 2, "cannot split fewer than two items");

    let mut remaining: Vec<usize> = (0..boxes.len()).collect();
    let (seed_a, seed_b) = match picker {
        SeedsPicker::Linear => linear_pick_seeds(boxes),
        SeedsPicker::Quadratic => quadratic_pick_seeds(boxes),
    };
    remaining.retain(|&i| i != seed_a && i != seed_b);

    let mut groups = [Group::seeded(seed_a, boxes), Group::seeded(seed_b, boxes)];

    while !remaining.is_empty() {
        // forced remainder: one group can only reach the minimum by taking
        // everything that is left
        if groups[0].members.len() >= min_children
            && groups[1].members.len() + remaining.len() == min_children
        {
            for item in remaining.drain(..) {
                groups[1].push(item, boxes);
            }
            break;
        }
        if groups[1].members.len() >= min_children
            && groups[0].members.len() + remaining.len() == min_children
        {
            for item in remaining.drain(..) {
                groups[0].push(item, boxes);
            }
            break;
        }

        let item = match picker {
            SeedsPicker::Linear => remaining.remove(0),
            SeedsPicker::Quadratic => {
                let pos = quadratic_pick_next(boxes, &remaining, &groups);
                remaining.remove(pos)
            }
        };

        let target = choose_group(&groups, &boxes[item]);
        groups[target].push(item, boxes);
    }

    let [first, second] = groups;
    SplitGroups {
        first: first.members,
        second: second.members,
    }
}

/// Smaller enlargement wins, then the smaller group, then the first group.
fn choose_group(groups: &[Group; 2], bbox: &BoundingBox) -> usize {
    let e0 = groups[0].bbox.enlargement(bbox);
    let e1 = groups[1].bbox.enlargement(bbox);
    if e0 < e1 {
        0
    } else if e1 < e0 {
        1
    } else if groups[1].members.len() < groups[0].members.len() {
        1
    } else {
        0
    }
}

/// Picks the pair with the greatest normalized separation along a single
/// dimension. Falls back to the first two items when no dimension shows a
/// positive separation.
fn linear_pick_seeds(boxes: &[BoundingBox]) -> (usize, usize) {
    let dimensions = boxes[0].dimensions();
    let mut best = (0, 1);
    let mut best_separation = 0.0f32;

    for dim in 0..dimensions {
        let mut dim_lb = f32::MAX;
        let mut dim_ub = -f32::MAX;
        let mut max_lb = -f32::MAX;
        let mut min_ub = f32::MAX;
        let mut max_lb_item = 0;
        let mut min_ub_item = 0;

        for (i, b) in boxes.iter().enumerate() {
            let lb = b.lower()[dim];
            let ub = b.upper()[dim];
            if lb < dim_lb {
                dim_lb = lb;
            }
            if ub > dim_ub {
                dim_ub = ub;
            }
            if lb > max_lb {
                max_lb = lb;
                max_lb_item = i;
            }
            if ub < min_ub {
                min_ub = ub;
                min_ub_item = i;
            }
        }

        // a zero extent yields NaN, which never wins the comparison below
        let separation = if max_lb_item == min_ub_item {
            -1.0
        } else {
            ((min_ub - max_lb) / (dim_ub - dim_lb)).abs()
        };

        if separation > best_separation {
            best_separation = separation;
            best = (max_lb_item, min_ub_item);
        }
    }

    best
}

/// Picks the pair whose joint cover wastes the most area.
fn quadratic_pick_seeds(boxes: &[BoundingBox]) -> (usize, usize) {
    let mut best = (0, 1);
    let mut worst_waste = f32::NEG_INFINITY;

    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            let waste = boxes[i].union(&boxes[j]).area() - boxes[i].area() - boxes[j].area();
            if waste > worst_waste {
                worst_waste = waste;
                best = (i, j);
            }
        }
    }

    best
}

/// Position in `remaining` of the item with the strongest preference for
/// one group over the other.
fn quadratic_pick_next(boxes: &[BoundingBox], remaining: &[usize], groups: &[Group; 2]) -> usize {
    let mut best_pos = 0;
    let mut best_diff = f32::NEG_INFINITY;

    for (pos, &item) in remaining.iter().enumerate() {
        let e0 = groups[0].bbox.enlargement(&boxes[item]);
        let e1 = groups[1].bbox.enlargement(&boxes[item]);
        let diff = (e0 - e1).abs();
        if diff > best_diff {
            best_diff = diff;
            best_pos = pos;
        }
    }

    best_pos
}
