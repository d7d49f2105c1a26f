//! R-Tree implementation.
//!
//! Nodes live in an arena (`Vec<Node<T>>`) and refer to each other by index.
//! Children are owned through the parent's item list; the parent index on
//! each node is only followed upward while tightening boxes and propagating
//! splits. Nodes are never removed from the arena: a split reuses the
//! overflowing node and appends one sibling, and a root split appends a new
//! root above the old one.

use log::{debug, trace};
use std::fmt::{Display, Formatter};

use super::persistence::IntegrityReport;
use super::rtree_config::RTreeConfig;
use super::rtree_constants::{DUMP_INDENT, MAX_TREE_HEIGHT};
use super::rtree_split::{split_groups, SplitGroups};
use super::rtree_types::*;
use crate::bounding_box::BoundingBox;

/// An in-memory R-Tree mapping bounding boxes to payloads.
///
/// # Example
///
/// ```rust
/// use tsindex_rtree::{BoundingBox, RTree, RTreeConfig};
///
/// let mut tree = RTree::new(RTreeConfig::default()).unwrap();
/// tree.insert_point(&[1.0, 2.0], 10u32).unwrap();
/// tree.insert(BoundingBox::new(vec![3.0, 3.0], vec![5.0, 4.0]).unwrap(), 11).unwrap();
///
/// let query = BoundingBox::new(vec![0.0, 0.0], vec![4.0, 4.0]).unwrap();
/// assert_eq!(tree.find_intersecting(&query).unwrap(), vec![&10, &11]);
/// ```
#[derive(Debug, Clone)]
pub struct RTree<T> {
    pub(crate) config: RTreeConfig,
    pub(crate) nodes: Vec<Node<T>>,
    pub(crate) root: NodeId,
    pub(crate) size: usize,
}

impl<T> RTree<T> {
    /// Creates an empty tree whose root is an empty leaf.
    pub fn new(config: RTreeConfig) -> SpatialResult<Self> {
        config.validate()?;
        debug!("Creating R-Tree with {}", config);
        Ok(Self {
            config,
            nodes: vec![Node::new_leaf(BoundingBox::empty(config.dimensions()), None)],
            root: 0,
            size: 0,
        })
    }

    /// Assembles a tree from an already linked arena.
    pub(crate) fn from_parts(
        config: RTreeConfig,
        nodes: Vec<Node<T>>,
        root: NodeId,
        size: usize,
    ) -> Self {
        Self {
            config,
            nodes,
            root,
            size,
        }
    }

    /// The configuration fixed at construction.
    pub fn config(&self) -> &RTreeConfig {
        &self.config
    }

    /// Number of entries in the tree.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Number of levels, counting the root. A lone root leaf has height 1.
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Some(&first) = self.nodes[current].children().first() {
            height += 1;
            current = first;
        }
        height
    }

    /// Read-only view of the root node.
    pub fn root(&self) -> NodeRef<'_, T> {
        NodeRef {
            tree: self,
            id: self.root,
        }
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Inserts `payload` under `bbox`.
    ///
    /// Fails with [`SpatialError::MalformedInput`] when the box does not have
    /// exactly the configured number of dimensions or has an inverted bound;
    /// the tree is unchanged in that case.
    pub fn insert(&mut self, bbox: BoundingBox, payload: T) -> SpatialResult<()> {
        self.check_shape(&bbox)?;

        let leaf = self.choose_leaf(&bbox);
        match &mut self.nodes[leaf].items {
            NodeItems::Leaf { entries } => entries.push(Entry::new(bbox, payload)),
            NodeItems::Internal { .. } => {
                return Err(SpatialError::InvalidOperation(format!(
                    "descent stopped at internal node {} without children",
                    leaf
                )));
            }
        }
        self.size += 1;

        if self.nodes[leaf].len() > self.config.max_children() {
            let sibling = self.split_node(leaf);
            self.adjust_tree(leaf, Some(sibling));
        } else {
            self.adjust_tree(leaf, None);
        }
        Ok(())
    }

    /// Inserts `payload` under the degenerate box at `coords`.
    pub fn insert_point(&mut self, coords: &[f32], payload: T) -> SpatialResult<()> {
        let bbox = BoundingBox::point(coords)?;
        self.insert(bbox, payload)
    }

    fn check_shape(&self, bbox: &BoundingBox) -> SpatialResult<()> {
        if bbox.dimensions() != self.config.dimensions() {
            return Err(SpatialError::MalformedInput(format!(
                "expected {} dimensions, got {}",
                self.config.dimensions(),
                bbox.dimensions()
            )));
        }
        if bbox.lower().len() != bbox.upper().len()
            || bbox.lower().iter().zip(bbox.upper()).any(|(l, u)| !(l <= u))
        {
            return Err(SpatialError::MalformedInput(format!(
                "inverted bounds in {}",
                bbox
            )));
        }
        Ok(())
    }

    /// Descends to the leaf needing the least enlargement to absorb `bbox`.
    fn choose_leaf(&self, bbox: &BoundingBox) -> NodeId {
        let mut current = self.root;
        loop {
            let children = match &self.nodes[current].items {
                NodeItems::Leaf { .. } => return current,
                NodeItems::Internal { children } => children,
            };

            let mut best: Option<(NodeId, f32, f32)> = None;
            for &child in children {
                let child_box = &self.nodes[child].bbox;
                let union_area = child_box.union(bbox).area();
                let enlargement = union_area - child_box.area();

                let better = match best {
                    None => true,
                    Some((_, best_enlargement, best_area)) => {
                        enlargement < best_enlargement
                            || (enlargement == best_enlargement && union_area < best_area)
                    }
                };
                if better {
                    best = Some((child, enlargement, union_area));
                }
            }

            match best {
                Some((child, enlargement, _)) => {
                    trace!(
                        "Descending from node {} to node {} (enlargement {})",
                        current,
                        child,
                        enlargement
                    );
                    current = child;
                }
                None => return current,
            }
        }
    }

    /// Tightens `node` and its ancestors, splitting any parent that
    /// overflowed after receiving `split`, the sibling produced by the
    /// previous split.
    fn adjust_tree(&mut self, node: NodeId, split: Option<NodeId>) {
        if node == self.root {
            if let Some(sibling) = split {
                self.grow_root(node, sibling);
            }
            self.tighten(self.root);
            return;
        }

        self.tighten(node);
        if let Some(sibling) = split {
            self.tighten(sibling);
            if let Some(parent) = self.nodes[node].parent {
                if self.nodes[parent].len() > self.config.max_children() {
                    let parent_sibling = self.split_node(parent);
                    // the cascade tightens every ancestor on its way up
                    self.adjust_tree(parent, Some(parent_sibling));
                    return;
                }
            }
        }

        if let Some(parent) = self.nodes[node].parent {
            self.adjust_tree(parent, None);
        }
    }

    /// Places a new internal root above the two halves of the old one.
    fn grow_root(&mut self, old_root: NodeId, sibling: NodeId) {
        let new_root = self.nodes.len();
        let mut node = Node::new_internal(BoundingBox::empty(self.config.dimensions()), None);
        node.items = NodeItems::Internal {
            children: vec![old_root, sibling],
        };
        self.nodes.push(node);
        self.root = new_root;
        debug!(
            "R-Tree root split: new root {} over nodes {} and {}, height {}",
            new_root,
            old_root,
            sibling,
            self.height()
        );
    }

    /// Splits an overflowing node in two and returns the new sibling.
    ///
    /// The node keeps its position and receives the first group. The sibling
    /// is appended to the end of the parent's child list before the items are
    /// distributed; a parentless node leaves the sibling detached for
    /// [`RTree::adjust_tree`] to place under a new root.
    fn split_node(&mut self, node: NodeId) -> NodeId {
        let parent = self.nodes[node].parent;
        let sibling = self.nodes.len();
        let sibling_node = if self.nodes[node].is_leaf() {
            Node::new_leaf(self.nodes[node].bbox.clone(), parent)
        } else {
            Node::new_internal(self.nodes[node].bbox.clone(), parent)
        };
        self.nodes.push(sibling_node);
        if let Some(parent) = parent {
            if let NodeItems::Internal { children } = &mut self.nodes[parent].items {
                children.push(sibling);
            }
        }

        let min_children = self.config.min_children();
        let picker = self.config.seeds_picker();
        let items = std::mem::replace(
            &mut self.nodes[node].items,
            NodeItems::Internal {
                children: Vec::new(),
            },
        );

        let (kept, moved) = match items {
            NodeItems::Leaf { entries } => {
                let boxes: Vec<BoundingBox> = entries.iter().map(|e| e.bbox.clone()).collect();
                let groups = split_groups(&boxes, min_children, picker);
                self.check_groups(&groups);
                let (first, second) = distribute(entries, &groups);
                (
                    NodeItems::Leaf { entries: first },
                    NodeItems::Leaf { entries: second },
                )
            }
            NodeItems::Internal { children } => {
                let boxes: Vec<BoundingBox> = children
                    .iter()
                    .map(|&c| self.nodes[c].bbox.clone())
                    .collect();
                let groups = split_groups(&boxes, min_children, picker);
                self.check_groups(&groups);
                let (first, second) = distribute(children, &groups);
                (
                    NodeItems::Internal { children: first },
                    NodeItems::Internal { children: second },
                )
            }
        };

        debug!(
            "Split {} node {} into {} + {} items (sibling {})",
            if matches!(kept, NodeItems::Leaf { .. }) {
                "leaf"
            } else {
                "internal"
            },
            node,
            kept_len(&kept),
            kept_len(&moved),
            sibling
        );

        self.nodes[node].items = kept;
        self.nodes[sibling].items = moved;
        self.tighten(node);
        self.tighten(sibling);
        sibling
    }

    fn check_groups(&self, groups: &SplitGroups) {
        debug_assert!(
            !groups.first.is_empty() && !groups.second.is_empty(),
            "split produced an empty group"
        );
        debug_assert!(
            groups.first.len() <= self.config.max_children()
                && groups.second.len() <= self.config.max_children(),
            "split group exceeds max_children"
        );
        debug_assert!(
            groups.first.len() >= self.config.min_children()
                && groups.second.len() >= self.config.min_children(),
            "split group below min_children"
        );
    }

    /// Recomputes the node's tight box and re-links its children to it.
    fn tighten(&mut self, node: NodeId) {
        let cover = match &self.nodes[node].items {
            NodeItems::Leaf { entries } => BoundingBox::cover(entries.iter().map(|e| &e.bbox)),
            NodeItems::Internal { children } => {
                BoundingBox::cover(children.iter().map(|&c| &self.nodes[c].bbox))
            }
        };
        if let Some(cover) = cover {
            self.nodes[node].bbox = cover;
        }

        let count = self.nodes[node].children().len();
        for i in 0..count {
            let child = self.nodes[node].children()[i];
            self.nodes[child].parent = Some(node);
        }
    }

    // ========================================================================
    // Traversal and queries
    // ========================================================================

    /// Every `(box, payload)` pair in pre-order.
    pub fn entries(&self) -> Vec<(&BoundingBox, &T)> {
        let mut results = Vec::with_capacity(self.size);
        self.collect_entries(self.root, &mut results);
        results
    }

    fn collect_entries<'a>(&'a self, node: NodeId, results: &mut Vec<(&'a BoundingBox, &'a T)>) {
        match &self.nodes[node].items {
            NodeItems::Leaf { entries } => {
                results.extend(entries.iter().map(|e| (&e.bbox, &e.payload)));
            }
            NodeItems::Internal { children } => {
                for &child in children {
                    self.collect_entries(child, results);
                }
            }
        }
    }

    /// Payloads whose boxes intersect `query` (touching counts).
    pub fn find_intersecting(&self, query: &BoundingBox) -> SpatialResult<Vec<&T>> {
        self.check_query(query)?;
        let mut results = Vec::new();
        self.search_recursive(self.root, query, &mut results);
        Ok(results)
    }

    /// Payloads whose boxes lie entirely inside `query`.
    pub fn find_contained(&self, query: &BoundingBox) -> SpatialResult<Vec<&T>> {
        self.check_query(query)?;
        let mut results = Vec::new();
        self.search_contained_recursive(self.root, query, &mut results);
        Ok(results)
    }

    fn check_query(&self, query: &BoundingBox) -> SpatialResult<()> {
        if query.dimensions() != self.config.dimensions() {
            return Err(SpatialError::MalformedInput(format!(
                "query has {} dimensions, tree has {}",
                query.dimensions(),
                self.config.dimensions()
            )));
        }
        Ok(())
    }

    fn search_recursive<'a>(&'a self, node: NodeId, query: &BoundingBox, results: &mut Vec<&'a T>) {
        match &self.nodes[node].items {
            NodeItems::Leaf { entries } => {
                for entry in entries {
                    if entry.bbox.intersects(query) {
                        results.push(&entry.payload);
                    }
                }
            }
            NodeItems::Internal { children } => {
                for &child in children {
                    if self.nodes[child].bbox.intersects(query) {
                        self.search_recursive(child, query, results);
                    }
                }
            }
        }
    }

    fn search_contained_recursive<'a>(
        &'a self,
        node: NodeId,
        query: &BoundingBox,
        results: &mut Vec<&'a T>,
    ) {
        match &self.nodes[node].items {
            NodeItems::Leaf { entries } => {
                for entry in entries {
                    if query.contains(&entry.bbox) {
                        results.push(&entry.payload);
                    }
                }
            }
            NodeItems::Internal { children } => {
                for &child in children {
                    // a contained entry can sit in a child that only
                    // partially overlaps the query
                    if self.nodes[child].bbox.intersects(query) {
                        self.search_contained_recursive(child, query, results);
                    }
                }
            }
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Counts nodes reachable from the root.
    pub fn stats(&self) -> RTreeStats {
        let mut stats = RTreeStats {
            total_entries: self.size as u64,
            tree_height: self.height() as u32,
            ..Default::default()
        };
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            stats.node_count += 1;
            if self.nodes[node].is_leaf() {
                stats.leaf_count += 1;
            }
            stack.extend_from_slice(self.nodes[node].children());
        }
        stats
    }

    /// Verifies occupancy, tightness, parent links and uniform leaf depth for
    /// every node reachable from the root.
    pub fn check_integrity(&self) -> IntegrityReport {
        let mut report = IntegrityReport::new();
        let max = self.config.max_children();
        let min = self.config.min_children();
        let dims = self.config.dimensions();

        if self.root >= self.nodes.len() {
            report.fail(format!("root {} is outside the arena", self.root));
            return report;
        }
        if self.nodes[self.root].parent.is_some() {
            report.fail(format!("root {} has a parent", self.root));
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut leaf_depth: Option<usize> = None;
        let mut stack = vec![(self.root, 1usize)];

        while let Some((id, depth)) = stack.pop() {
            if visited[id] {
                report.fail(format!("node {} is reachable more than once", id));
                continue;
            }
            visited[id] = true;
            report.nodes_checked += 1;

            if depth > MAX_TREE_HEIGHT {
                report.fail(format!("node {} is deeper than {} levels", id, MAX_TREE_HEIGHT));
                continue;
            }

            let node = &self.nodes[id];
            let is_root = id == self.root;
            let count = node.len();

            if node.bbox.dimensions() != dims {
                report.fail(format!("node {} has {} dimensions", id, node.bbox.dimensions()));
            }
            if count > max {
                report.fail(format!("node {} holds {} items, max is {}", id, count, max));
            }

            match &node.items {
                NodeItems::Leaf { entries } => {
                    if !is_root && count == 0 {
                        report.fail(format!("non-root leaf {} is empty", id));
                    }
                    for entry in entries {
                        report.entries_checked += 1;
                        if entry.bbox.dimensions() != dims {
                            report.fail(format!("entry in leaf {} has wrong dimensions", id));
                        }
                    }
                    if let Some(cover) = BoundingBox::cover(entries.iter().map(|e| &e.bbox)) {
                        if cover != node.bbox {
                            report.fail(format!("leaf {} box {} is not tight", id, node.bbox));
                        }
                    }
                    match leaf_depth {
                        None => leaf_depth = Some(depth),
                        Some(expected) if expected != depth => report.fail(format!(
                            "leaf {} at depth {}, expected {}",
                            id, depth, expected
                        )),
                        Some(_) => {}
                    }
                }
                NodeItems::Internal { children } => {
                    if count == 0 {
                        report.fail(format!("internal node {} has no children", id));
                    } else if !is_root && count < min {
                        report.fail(format!(
                            "internal node {} holds {} children, min is {}",
                            id, count, min
                        ));
                    }
                    for &child in children {
                        if child >= self.nodes.len() {
                            report.fail(format!("node {} links missing child {}", id, child));
                            continue;
                        }
                        if self.nodes[child].parent != Some(id) {
                            report.fail(format!(
                                "child {} of node {} records parent {:?}",
                                child, id, self.nodes[child].parent
                            ));
                        }
                        stack.push((child, depth + 1));
                    }
                    let cover = BoundingBox::cover(
                        children
                            .iter()
                            .filter(|&&c| c < self.nodes.len())
                            .map(|&c| &self.nodes[c].bbox),
                    );
                    if let Some(cover) = cover {
                        if cover != node.bbox {
                            report.fail(format!("internal node {} box {} is not tight", id, node.bbox));
                        }
                    }
                }
            }
        }

        if report.entries_checked != self.size as u64 {
            report.fail(format!(
                "found {} entries, tree records {}",
                report.entries_checked, self.size
            ));
        }
        report
    }
}

impl<T: Display> RTree<T> {
    /// Deterministic, indentation-encoded text form of the whole tree.
    ///
    /// Two trees built from the same insert sequence with the same
    /// configuration produce identical dumps.
    pub fn structural_dump(&self) -> String {
        self.to_string()
    }

    fn write_dump_node(&self, f: &mut Formatter<'_>, node: NodeId, depth: usize) -> std::fmt::Result {
        let n = &self.nodes[node];
        writeln!(
            f,
            "{}RNode{{{}, leaf={}}}",
            DUMP_INDENT.repeat(depth),
            n.bbox,
            n.is_leaf()
        )?;
        match &n.items {
            NodeItems::Leaf { entries } => {
                let indent = DUMP_INDENT.repeat(depth + 1);
                for entry in entries {
                    writeln!(
                        f,
                        "{}Item: {},RNode{{{}, leaf=true}}",
                        indent, entry.payload, entry.bbox
                    )?;
                }
            }
            NodeItems::Internal { children } => {
                for &child in children {
                    self.write_dump_node(f, child, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

impl<T: Display> Display for RTree<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.config)?;
        self.write_dump_node(f, self.root, 0)
    }
}

/// Moves items into two groups following the split's index order.
fn distribute<I>(items: Vec<I>, groups: &SplitGroups) -> (Vec<I>, Vec<I>) {
    let mut slots: Vec<Option<I>> = items.into_iter().map(Some).collect();
    let first = groups
        .first
        .iter()
        .filter_map(|&i| slots[i].take())
        .collect();
    let second = groups
        .second
        .iter()
        .filter_map(|&i| slots[i].take())
        .collect();
    (first, second)
}

fn kept_len<T>(items: &NodeItems<T>) -> usize {
    match items {
        NodeItems::Leaf { entries } => entries.len(),
        NodeItems::Internal { children } => children.len(),
    }
}

// ============================================================================
// Read-only node view
// ============================================================================

/// A borrowed view of one node, for callers that walk the tree themselves.
pub struct NodeRef<'a, T> {
    tree: &'a RTree<T>,
    id: NodeId,
}

impl<T> Clone for NodeRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, T> {}

impl<'a, T> NodeRef<'a, T> {
    /// Arena index of the node. Stable for the lifetime of the tree.
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn bbox(&self) -> &'a BoundingBox {
        &self.tree.nodes[self.id].bbox
    }

    pub fn is_leaf(&self) -> bool {
        self.tree.nodes[self.id].is_leaf()
    }

    pub fn is_root(&self) -> bool {
        self.id == self.tree.root
    }

    /// Number of children (internal) or entries (leaf).
    pub fn len(&self) -> usize {
        self.tree.nodes[self.id].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn parent(&self) -> Option<NodeRef<'a, T>> {
        self.tree.nodes[self.id].parent.map(|id| NodeRef {
            tree: self.tree,
            id,
        })
    }

    /// Child nodes in list order. Empty for a leaf.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a, T>> + 'a {
        let tree = self.tree;
        tree.nodes[self.id]
            .children()
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    /// Entries in list order. Empty for an internal node.
    pub fn entries(&self) -> &'a [Entry<T>] {
        self.tree.nodes[self.id].entries()
    }
}
