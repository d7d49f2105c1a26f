//! Binary serialization of a whole tree.
//!
//! Layout, all values big-endian:
//!
//! ```text
//! header: u32 max_children | u32 min_children | u32 dimensions | u8 seeds picker
//! node:   f32 x dims lower | f32 x dims upper | u8 leaf flag | u32 count
//!         leaf:     count x (f32 x dims lower | f32 x dims upper | payload)
//!         internal: count x node
//! ```
//!
//! Nodes are written in pre-order starting at the root. Payload bytes are
//! produced and consumed entirely by the caller's codec.

use bytes::{Buf, BufMut, Bytes};
use log::debug;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;

use super::rtree_config::{RTreeConfig, SeedsPicker};
use super::rtree_constants::{INTERNAL_FLAG, LEAF_FLAG, MAX_TREE_HEIGHT};
use super::rtree_impl::RTree;
use super::rtree_types::*;
use crate::bounding_box::BoundingBox;

const HEADER_LEN: usize = 4 + 4 + 4 + 1;

/// Result of a structural integrity check.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    /// Nodes reachable from the root
    pub nodes_checked: u64,
    /// Leaf entries reachable from the root
    pub entries_checked: u64,
    /// Summary of findings
    pub is_valid: bool,
    /// Detailed error messages
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn new() -> Self {
        Self {
            nodes_checked: 0,
            entries_checked: 0,
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub(crate) fn fail(&mut self, message: String) {
        self.is_valid = false;
        self.errors.push(message);
    }
}

impl Default for IntegrityReport {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RTree<T> {
    /// Writes the header followed by every node in pre-order.
    ///
    /// `encoder` is called once per entry, in pre-order, and must write the
    /// payload so that the matching decoder can read it back from the same
    /// position.
    pub fn serialize<B, E>(&self, sink: &mut B, mut encoder: E) -> SpatialResult<()>
    where
        B: BufMut,
        E: FnMut(&T, &mut B) -> SpatialResult<()>,
    {
        sink.put_u32(to_u32(self.config.max_children(), "max_children")?);
        sink.put_u32(to_u32(self.config.min_children(), "min_children")?);
        sink.put_u32(to_u32(self.config.dimensions(), "dimensions")?);
        sink.put_u8(self.config.seeds_picker().wire_tag());

        self.write_frame(self.root, sink, &mut encoder)?;
        debug!(
            "Serialized R-Tree with {} entries across {} levels",
            self.size,
            self.height()
        );
        Ok(())
    }

    fn write_frame<B, E>(&self, node: NodeId, sink: &mut B, encoder: &mut E) -> SpatialResult<()>
    where
        B: BufMut,
        E: FnMut(&T, &mut B) -> SpatialResult<()>,
    {
        let n = &self.nodes[node];
        write_box(&n.bbox, sink);
        match &n.items {
            NodeItems::Leaf { entries } => {
                sink.put_u8(LEAF_FLAG);
                sink.put_u32(to_u32(entries.len(), "entry count")?);
                for entry in entries {
                    write_box(&entry.bbox, sink);
                    encoder(&entry.payload, sink)?;
                }
            }
            NodeItems::Internal { children } => {
                sink.put_u8(INTERNAL_FLAG);
                sink.put_u32(to_u32(children.len(), "child count")?);
                for &child in children {
                    self.write_frame(child, sink, encoder)?;
                }
            }
        }
        Ok(())
    }

    /// Rebuilds a tree written by [`RTree::serialize`].
    ///
    /// Fails with [`SpatialError::Serialization`] on truncated or corrupt
    /// input, on a decoder failure, or when the decoded graph breaks a tree
    /// invariant. Nothing is returned unless the whole stream decoded cleanly.
    /// Bytes following the root frame are left in `source`.
    pub fn deserialize<B, D>(source: &mut B, mut decoder: D) -> SpatialResult<Self>
    where
        B: Buf,
        D: FnMut(&mut B) -> SpatialResult<T>,
    {
        ensure_remaining(source, HEADER_LEN, "header")?;
        let max_children = source.get_u32() as usize;
        let min_children = source.get_u32() as usize;
        let dimensions = source.get_u32() as usize;
        let picker = SeedsPicker::from_wire_tag(source.get_u8())?;
        let config = RTreeConfig::new(max_children, min_children, dimensions, picker)
            .map_err(|e| SpatialError::Serialization(format!("invalid header: {}", e)))?;

        let mut reader = FrameReader {
            config,
            nodes: Vec::new(),
            size: 0,
        };
        let root = reader.read_node(source, &mut decoder, None, 1)?;

        let tree = RTree::from_parts(config, reader.nodes, root, reader.size);
        let report = tree.check_integrity();
        if !report.is_valid {
            return Err(SpatialError::Serialization(format!(
                "decoded tree is inconsistent: {}",
                report.errors.join("; ")
            )));
        }

        debug!(
            "Deserialized R-Tree with {} entries in {} nodes",
            tree.size,
            report.nodes_checked
        );
        Ok(tree)
    }

    /// Serializes the tree into `path`, replacing any existing file.
    pub fn write_to_file<P, E>(&self, path: P, encoder: E) -> SpatialResult<()>
    where
        P: AsRef<Path>,
        E: FnMut(&T, &mut Vec<u8>) -> SpatialResult<()>,
    {
        let mut buffer = Vec::new();
        self.serialize(&mut buffer, encoder)?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path.as_ref())?;
        file.write_all(&buffer)?;
        file.sync_all()?;

        debug!(
            "Wrote R-Tree ({} bytes) to {}",
            buffer.len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Reads a tree written by [`RTree::write_to_file`].
    ///
    /// The file must hold exactly one serialized tree; trailing bytes are an
    /// error.
    pub fn read_from_file<P, D>(path: P, decoder: D) -> SpatialResult<Self>
    where
        P: AsRef<Path>,
        D: FnMut(&mut Bytes) -> SpatialResult<T>,
    {
        let mut buffer = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut buffer)?;

        let mut source = Bytes::from(buffer);
        let tree = Self::deserialize(&mut source, decoder)?;
        if source.has_remaining() {
            return Err(SpatialError::Serialization(format!(
                "{} trailing bytes after tree in {}",
                source.remaining(),
                path.as_ref().display()
            )));
        }
        debug!("Read R-Tree from {}", path.as_ref().display());
        Ok(tree)
    }
}

/// Accumulates decoded nodes into a fresh arena.
struct FrameReader<T> {
    config: RTreeConfig,
    nodes: Vec<Node<T>>,
    size: usize,
}

impl<T> FrameReader<T> {
    fn read_node<B, D>(
        &mut self,
        source: &mut B,
        decoder: &mut D,
        parent: Option<NodeId>,
        depth: usize,
    ) -> SpatialResult<NodeId>
    where
        B: Buf,
        D: FnMut(&mut B) -> SpatialResult<T>,
    {
        if depth > MAX_TREE_HEIGHT {
            return Err(SpatialError::Serialization(format!(
                "tree nesting exceeds {} levels",
                MAX_TREE_HEIGHT
            )));
        }

        let dims = self.config.dimensions();
        ensure_remaining(source, dims * 8 + 1 + 4, "node frame")?;
        let (lower, upper) = read_bounds(source, dims);
        let bbox = BoundingBox::from_parts(lower, upper);
        let flag = source.get_u8();
        let count = source.get_u32() as usize;
        if count > self.config.max_children() {
            return Err(SpatialError::Serialization(format!(
                "node holds {} items, max is {}",
                count,
                self.config.max_children()
            )));
        }

        let id = self.nodes.len();
        match flag {
            LEAF_FLAG => {
                let mut node = Node::new_leaf(bbox, parent);
                // a corrupt count must not drive the allocation
                let mut entries = Vec::with_capacity(count.min(source.remaining() / (dims * 8)));
                for _ in 0..count {
                    ensure_remaining(source, dims * 8, "entry box")?;
                    let (lower, upper) = read_bounds(source, dims);
                    let entry_box = BoundingBox::new(lower, upper)
                        .map_err(|e| SpatialError::Serialization(format!("bad entry box: {}", e)))?;
                    let payload = decoder(source).map_err(|e| match e {
                        SpatialError::Serialization(_) => e,
                        other => SpatialError::Serialization(format!(
                            "payload decoder failed: {}",
                            other
                        )),
                    })?;
                    entries.push(Entry::new(entry_box, payload));
                }
                self.size += entries.len();
                node.items = NodeItems::Leaf { entries };
                self.nodes.push(node);
            }
            INTERNAL_FLAG => {
                self.nodes.push(Node::new_internal(bbox, parent));
                let mut children = Vec::with_capacity(count.min(source.remaining()));
                for _ in 0..count {
                    children.push(self.read_node(source, decoder, Some(id), depth + 1)?);
                }
                self.nodes[id].items = NodeItems::Internal { children };
            }
            other => {
                return Err(SpatialError::Serialization(format!(
                    "invalid leaf flag {}",
                    other
                )));
            }
        }
        Ok(id)
    }
}

fn write_box<B: BufMut>(bbox: &BoundingBox, sink: &mut B) {
    for &v in bbox.lower() {
        sink.put_f32(v);
    }
    for &v in bbox.upper() {
        sink.put_f32(v);
    }
}

fn read_bounds<B: Buf>(source: &mut B, dims: usize) -> (Vec<f32>, Vec<f32>) {
    let lower = (0..dims).map(|_| source.get_f32()).collect();
    let upper = (0..dims).map(|_| source.get_f32()).collect();
    (lower, upper)
}

fn ensure_remaining<B: Buf>(source: &B, needed: usize, what: &str) -> SpatialResult<()> {
    if source.remaining() < needed {
        return Err(SpatialError::Serialization(format!(
            "truncated {}: need {} bytes, {} left",
            what,
            needed,
            source.remaining()
        )));
    }
    Ok(())
}

fn to_u32(value: usize, what: &str) -> SpatialResult<u32> {
    u32::try_from(value)
        .map_err(|_| SpatialError::Serialization(format!("{} {} does not fit in u32", what, value)))
}
