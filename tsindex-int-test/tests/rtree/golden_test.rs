//! The reference scenario: twenty seeded points into a `4/2/2 Linear` tree.

use tsindex_int_test::test_util::{
    assert_tree_invariants, cleanup, create_test_context, golden_points, golden_tree, run_test,
    Lcg48, GOLDEN_DUMP,
};
use tsindex_rtree::codec::{get_i32, put_i32};
use tsindex_rtree::{RTree, RTreeConfig, SeedsPicker};

#[test]
fn test_generator_reproduces_reference_points() {
    let points = golden_points();
    assert_eq!(points.len(), 20);
    assert_eq!(points[0], [0.0, 8.0]);
    assert_eq!(points[1], [9.0, 7.0]);
    assert_eq!(points[9], [1.0, 0.0]);
    assert_eq!(points[19], [18.0, 15.0]);
}

#[test]
fn test_generator_power_of_two_bound() {
    let mut a = Lcg48::new(42);
    for _ in 0..1000 {
        let v = a.next_int(16);
        assert!((0..16).contains(&v));
    }
}

#[test]
fn test_golden_dump() {
    let tree = golden_tree().unwrap();
    assert_eq!(tree.structural_dump(), GOLDEN_DUMP);
    assert_eq!(tree.to_string(), GOLDEN_DUMP);
}

#[test]
fn test_golden_shape() {
    let tree = golden_tree().unwrap();
    assert_eq!(tree.len(), 20);
    assert_eq!(tree.height(), 3);

    let stats = tree.stats();
    assert_eq!(stats.total_entries, 20);
    assert_eq!(stats.leaf_count, 7);
    assert_eq!(stats.node_count, 10);
    assert_eq!(stats.tree_height, 3);

    let root = tree.root();
    assert_eq!(root.bbox().lower(), &[0.0, 0.0]);
    assert_eq!(root.bbox().upper(), &[19.0, 17.0]);
    assert_eq!(root.children().count(), 2);
}

#[test]
fn test_invariants_hold_after_every_golden_insert() {
    let config = RTreeConfig::new(4, 2, 2, SeedsPicker::Linear).unwrap();
    let mut tree = RTree::new(config).unwrap();
    for (i, p) in golden_points().iter().enumerate() {
        tree.insert_point(p, i as i32).unwrap();
        assert_tree_invariants(&tree);
    }
}

#[test]
fn test_golden_is_deterministic() {
    let first = golden_tree().unwrap();
    let second = golden_tree().unwrap();

    let mut a = Vec::new();
    let mut b = Vec::new();
    first.serialize(&mut a, put_i32).unwrap();
    second.serialize(&mut b, put_i32).unwrap();
    assert_eq!(a, b);
    assert_eq!(first.structural_dump(), second.structural_dump());
}

#[test]
fn test_golden_round_trip() {
    let tree = golden_tree().unwrap();
    let mut bytes = Vec::new();
    tree.serialize(&mut bytes, put_i32).unwrap();

    let restored = RTree::deserialize(&mut bytes.as_slice(), get_i32).unwrap();
    assert_eq!(restored.structural_dump(), GOLDEN_DUMP);
    assert_tree_invariants(&restored);

    // pre-order payloads come back in the order they were encoded
    let mut encoded = Vec::new();
    tree.serialize(&mut Vec::new(), |p: &i32, sink: &mut Vec<u8>| {
        encoded.push(*p);
        put_i32(p, sink)
    })
    .unwrap();
    let decoded: Vec<i32> = restored.entries().into_iter().map(|(_, p)| *p).collect();
    assert_eq!(decoded, encoded);
    assert_eq!(
        encoded,
        vec![4, 2, 5, 19, 0, 10, 8, 18, 12, 3, 7, 6, 14, 1, 11, 15, 16, 9, 13, 17]
    );
}

#[test]
fn test_golden_through_file() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = golden_tree()?;
            let path = ctx.file("golden.rtree");
            tree.write_to_file(&path, put_i32)?;

            let restored = RTree::read_from_file(&path, get_i32)?;
            assert_eq!(restored.structural_dump(), GOLDEN_DUMP);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
