use log::info;
use std::thread;
use std::time::Instant;
use tsindex_int_test::test_util::{assert_tree_invariants, random_boxes};
use tsindex_rtree::codec::{get_u64, put_u64};
use tsindex_rtree::{IndexRTree, RTree, RTreeConfig, SeedsPicker, SharedRTree, SpatialResult};

const WRITERS: u64 = 4;
const INSERTS_PER_WRITER: usize = 25_000;

fn main() -> SpatialResult<()> {
    colog::init();
    println!("Starting stress test...");

    for picker in [SeedsPicker::Linear, SeedsPicker::Quadratic] {
        let config = RTreeConfig::new(16, 6, 3, picker)?;
        let tree: SharedRTree<u64> = SharedRTree::new(config)?;
        let start = Instant::now();

        let handles: Vec<_> = (0..WRITERS)
            .map(|w| {
                let tree = tree.clone();
                thread::spawn(move || -> SpatialResult<()> {
                    for (i, bbox) in random_boxes(w, INSERTS_PER_WRITER, 3).iter().enumerate() {
                        tree.add(bbox, w * INSERTS_PER_WRITER as u64 + i as u64)?;
                    }
                    Ok(())
                })
            })
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => panic!("writer thread panicked"),
            }
        }

        let mut bytes = Vec::new();
        tree.serialize(&mut bytes, put_u64)?;
        let restored = RTree::deserialize(&mut bytes.as_slice(), get_u64)?;
        assert_tree_invariants(&restored);

        info!(
            "{}: {} entries, {:?}, {} bytes serialized in {:?}",
            picker,
            tree.size(),
            restored.stats(),
            bytes.len(),
            start.elapsed()
        );
    }

    println!("Stress test finished");
    Ok(())
}
