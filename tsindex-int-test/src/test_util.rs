use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::{env, fs};
use tsindex_rtree::{
    BoundingBox, NodeRef, RTree, RTreeConfig, SeedsPicker, SharedRTree, SpatialResult,
};

/// Runs `before`, then `test`, then always `after`, and fails the calling
/// test with whichever error came first.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: FnOnce(TestContext) -> SpatialResult<()>,
    B: FnOnce() -> SpatialResult<TestContext>,
    A: FnOnce(TestContext) -> SpatialResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let test_result = test(ctx.clone());
    let after_result = after(ctx);

    if let Err(e) = test_result {
        panic!("Test failed: {:?}", e);
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// A scratch directory plus a shared tree built from one configuration.
#[derive(Clone)]
pub struct TestContext {
    path: PathBuf,
    tree: SharedRTree<u64>,
}

impl TestContext {
    pub fn new(path: PathBuf, tree: SharedRTree<u64>) -> Self {
        Self { path, tree }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A file path inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn tree(&self) -> SharedRTree<u64> {
        self.tree.clone()
    }
}

pub fn random_path() -> PathBuf {
    let id = uuid::Uuid::new_v4();
    env::temp_dir().join(format!("tsindex-{}", id))
}

pub fn create_test_context() -> SpatialResult<TestContext> {
    create_test_context_with(RTreeConfig::default())
}

pub fn create_test_context_with(config: RTreeConfig) -> SpatialResult<TestContext> {
    let path = random_path();
    fs::create_dir_all(&path)?;
    Ok(TestContext::new(path, SharedRTree::new(config)?))
}

pub fn cleanup(ctx: TestContext) -> SpatialResult<()> {
    if ctx.path().exists() {
        fs::remove_dir_all(ctx.path())?;
    }
    Ok(())
}

// ============================================================================
// Deterministic point sequence
// ============================================================================

/// 48-bit linear congruential generator.
///
/// Reproduces the classic `seed * 0x5DEECE66D + 0xB mod 2^48` sequence so
/// that fixtures recorded from other tooling can be regenerated exactly.
pub struct Lcg48 {
    seed: u64,
}

impl Lcg48 {
    const MULTIPLIER: u64 = 0x5DEECE66D;
    const ADDEND: u64 = 0xB;
    const MASK: u64 = (1 << 48) - 1;

    pub fn new(seed: u64) -> Self {
        Self {
            seed: (seed ^ Self::MULTIPLIER) & Self::MASK,
        }
    }

    fn next_bits(&mut self, bits: u32) -> i32 {
        self.seed = self
            .seed
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::ADDEND)
            & Self::MASK;
        (self.seed >> (48 - bits)) as i32
    }

    /// Uniform value in `0..bound`, rejecting the biased tail.
    pub fn next_int(&mut self, bound: i32) -> i32 {
        assert!(bound > 0, "bound must be positive");
        let mut r = self.next_bits(31);
        let m = bound - 1;
        if bound & m == 0 {
            return ((bound as i64 * r as i64) >> 31) as i32;
        }
        let mut u = r;
        loop {
            r = u % bound;
            if u.wrapping_sub(r).wrapping_add(m) >= 0 {
                return r;
            }
            u = self.next_bits(31);
        }
    }
}

/// The twenty points of the reference scenario, in insertion order.
pub fn golden_points() -> Vec<[f32; 2]> {
    let mut lcg = Lcg48::new(0);
    (0..20)
        .map(|_| {
            let x = lcg.next_int(20) as f32;
            let y = lcg.next_int(20) as f32;
            [x, y]
        })
        .collect()
}

/// Builds the reference scenario: `max=4, min=2, dim=2, Linear`, payload `i`
/// for the `i`-th point.
pub fn golden_tree() -> SpatialResult<RTree<i32>> {
    let config = RTreeConfig::new(4, 2, 2, SeedsPicker::Linear)?;
    let mut tree = RTree::new(config)?;
    for (i, p) in golden_points().iter().enumerate() {
        tree.insert_point(p, i as i32)?;
    }
    Ok(tree)
}

pub const GOLDEN_DUMP: &str = "\
nMax:4,nMin:2,dim:2,seedsPicker:LINEAR
RNode{LB=[0.0, 0.0], UB=[19.0, 17.0], leaf=false}
--RNode{LB=[0.0, 8.0], UB=[19.0, 17.0], leaf=false}
----RNode{LB=[15.0, 13.0], UB=[19.0, 17.0], leaf=true}
------Item: 4,RNode{LB=[19.0, 14.0], UB=[19.0, 14.0], leaf=true}
------Item: 2,RNode{LB=[15.0, 13.0], UB=[15.0, 13.0], leaf=true}
------Item: 5,RNode{LB=[17.0, 17.0], UB=[17.0, 17.0], leaf=true}
------Item: 19,RNode{LB=[18.0, 15.0], UB=[18.0, 15.0], leaf=true}
----RNode{LB=[0.0, 8.0], UB=[3.0, 8.0], leaf=true}
------Item: 0,RNode{LB=[0.0, 8.0], UB=[0.0, 8.0], leaf=true}
------Item: 10,RNode{LB=[3.0, 8.0], UB=[3.0, 8.0], leaf=true}
----RNode{LB=[4.0, 13.0], UB=[5.0, 15.0], leaf=true}
------Item: 8,RNode{LB=[4.0, 15.0], UB=[4.0, 15.0], leaf=true}
------Item: 18,RNode{LB=[5.0, 13.0], UB=[5.0, 13.0], leaf=true}
--RNode{LB=[1.0, 0.0], UB=[17.0, 7.0], leaf=false}
----RNode{LB=[11.0, 0.0], UB=[12.0, 1.0], leaf=true}
------Item: 12,RNode{LB=[12.0, 0.0], UB=[12.0, 0.0], leaf=true}
------Item: 3,RNode{LB=[11.0, 1.0], UB=[11.0, 1.0], leaf=true}
----RNode{LB=[12.0, 2.0], UB=[15.0, 4.0], leaf=true}
------Item: 7,RNode{LB=[15.0, 4.0], UB=[15.0, 4.0], leaf=true}
------Item: 6,RNode{LB=[13.0, 2.0], UB=[13.0, 2.0], leaf=true}
------Item: 14,RNode{LB=[12.0, 3.0], UB=[12.0, 3.0], leaf=true}
----RNode{LB=[4.0, 5.0], UB=[17.0, 7.0], leaf=true}
------Item: 1,RNode{LB=[9.0, 7.0], UB=[9.0, 7.0], leaf=true}
------Item: 11,RNode{LB=[4.0, 7.0], UB=[4.0, 7.0], leaf=true}
------Item: 15,RNode{LB=[5.0, 5.0], UB=[5.0, 5.0], leaf=true}
------Item: 16,RNode{LB=[17.0, 7.0], UB=[17.0, 7.0], leaf=true}
----RNode{LB=[1.0, 0.0], UB=[3.0, 2.0], leaf=true}
------Item: 9,RNode{LB=[1.0, 0.0], UB=[1.0, 0.0], leaf=true}
------Item: 13,RNode{LB=[3.0, 2.0], UB=[3.0, 2.0], leaf=true}
------Item: 17,RNode{LB=[2.0, 2.0], UB=[2.0, 2.0], leaf=true}
";

// ============================================================================
// Randomized input
// ============================================================================

/// Seeded random boxes in `[0, 100)` per dimension. Roughly one in four is a
/// degenerate point.
pub fn random_boxes(seed: u64, count: usize, dims: usize) -> Vec<BoundingBox> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let lower: Vec<f32> = (0..dims).map(|_| rng.random_range(0.0f32..100.0)).collect();
            let upper: Vec<f32> = if rng.random_bool(0.25) {
                lower.clone()
            } else {
                lower
                    .iter()
                    .map(|l| l + rng.random_range(0.0f32..10.0))
                    .collect()
            };
            BoundingBox::new(lower, upper).expect("generated box is valid")
        })
        .collect()
}

// ============================================================================
// Invariant checks through the public traversal API
// ============================================================================

/// Asserts occupancy, tightness, parent links and uniform leaf depth.
pub fn assert_tree_invariants<T>(tree: &RTree<T>) {
    let config = *tree.config();
    let mut leaf_depths = Vec::new();
    let entries = check_node(tree.root(), 1, &config, &mut leaf_depths);

    assert_eq!(entries, tree.len(), "entry count mismatch");
    assert!(
        leaf_depths.windows(2).all(|w| w[0] == w[1]),
        "leaves at uneven depths: {:?}",
        leaf_depths
    );
    if let Some(&depth) = leaf_depths.first() {
        assert_eq!(depth, tree.height(), "height disagrees with leaf depth");
    }

    let report = tree.check_integrity();
    assert!(report.is_valid, "integrity errors: {:?}", report.errors);
}

fn check_node<T>(
    node: NodeRef<'_, T>,
    depth: usize,
    config: &RTreeConfig,
    leaf_depths: &mut Vec<usize>,
) -> usize {
    let len = node.len();
    assert!(len <= config.max_children(), "node {} overflows", node.id());
    if node.is_root() {
        assert!(node.parent().is_none(), "root has a parent");
    } else if node.is_leaf() {
        assert!(len >= 1, "non-root leaf {} is empty", node.id());
    } else {
        assert!(
            len >= config.min_children(),
            "internal node {} underflows with {}",
            node.id(),
            len
        );
    }

    if node.is_leaf() {
        leaf_depths.push(depth);
        let boxes: Vec<&BoundingBox> = node.entries().iter().map(|e| e.bbox()).collect();
        if let Some(cover) = cover_of(&boxes) {
            assert_eq!(&cover, node.bbox(), "leaf {} is not tight", node.id());
        }
        return len;
    }

    let mut entries = 0;
    let mut boxes = Vec::with_capacity(len);
    for child in node.children() {
        assert_eq!(
            child.parent().map(|p| p.id()),
            Some(node.id()),
            "child {} does not point back to {}",
            child.id(),
            node.id()
        );
        boxes.push(child.bbox());
        entries += check_node(child, depth + 1, config, leaf_depths);
    }
    let cover = cover_of(&boxes).expect("internal node has children");
    assert_eq!(&cover, node.bbox(), "internal node {} is not tight", node.id());
    entries
}

fn cover_of(boxes: &[&BoundingBox]) -> Option<BoundingBox> {
    let (first, rest) = boxes.split_first()?;
    Some(rest.iter().fold((*first).clone(), |acc, b| acc.union(b)))
}

/// Configurations exercised by the randomized suites.
pub fn test_configs() -> Vec<RTreeConfig> {
    let mut configs = Vec::new();
    for picker in [SeedsPicker::Linear, SeedsPicker::Quadratic] {
        for (max, min, dims) in [(4, 2, 2), (5, 2, 1), (8, 3, 3), (16, 8, 4), (3, 1, 2)] {
            configs.push(RTreeConfig::new(max, min, dims, picker).expect("valid test config"));
        }
    }
    configs
}
