//! Structural invariants under seeded random insert sequences.

use tsindex_int_test::test_util::{assert_tree_invariants, random_boxes, test_configs};
use tsindex_rtree::{BoundingBox, RTree, RTreeConfig, SeedsPicker, SpatialError};

#[test]
fn test_invariants_after_every_insert() {
    for (seed, config) in test_configs().into_iter().enumerate() {
        let boxes = random_boxes(seed as u64, 300, config.dimensions());
        let mut tree = RTree::new(config).unwrap();
        for (i, bbox) in boxes.into_iter().enumerate() {
            tree.insert(bbox, i).unwrap();
            assert_tree_invariants(&tree);
        }
        assert_eq!(tree.len(), 300);
    }
}

#[test]
fn test_every_payload_stored_once() {
    for (seed, config) in test_configs().into_iter().enumerate() {
        let mut tree = RTree::new(config).unwrap();
        for (i, bbox) in random_boxes(100 + seed as u64, 500, config.dimensions())
            .into_iter()
            .enumerate()
        {
            tree.insert(bbox, i).unwrap();
        }
        let mut payloads: Vec<usize> = tree.entries().into_iter().map(|(_, p)| *p).collect();
        payloads.sort_unstable();
        assert_eq!(payloads, (0..500).collect::<Vec<_>>());
    }
}

#[test]
fn test_height_grows_only_through_root_splits() {
    let mut tree = RTree::new(RTreeConfig::default()).unwrap();
    let mut height = tree.height();
    let mut root = tree.root().id();
    for (i, bbox) in random_boxes(7, 400, 2).into_iter().enumerate() {
        tree.insert(bbox, i).unwrap();
        let new_height = tree.height();
        assert!(new_height == height || new_height == height + 1);
        if new_height > height {
            assert_ne!(tree.root().id(), root, "height grew without a new root");
        } else {
            assert_eq!(tree.root().id(), root, "root replaced without growth");
        }
        height = new_height;
        root = tree.root().id();
    }
    assert!(height >= 4);
}

#[test]
fn test_forced_overflow_splits_leaf() {
    let config = RTreeConfig::new(6, 3, 2, SeedsPicker::Linear).unwrap();
    let mut tree = RTree::new(config).unwrap();
    let points = [
        [0.0, 0.0],
        [1.0, 0.0],
        [0.0, 1.0],
        [50.0, 50.0],
        [51.0, 50.0],
        [50.0, 51.0],
    ];
    for (i, p) in points.iter().enumerate() {
        tree.insert_point(p, i).unwrap();
    }
    assert!(tree.root().is_leaf());

    // the seventh entry overflows the root leaf
    tree.insert_point(&[0.5, 0.5], 6).unwrap();
    let root = tree.root();
    assert!(!root.is_leaf());

    let halves: Vec<_> = root.children().collect();
    assert_eq!(halves.len(), 2);
    let mut all = Vec::new();
    for half in &halves {
        assert!(half.is_leaf());
        assert!(half.len() >= 3 && half.len() <= 6);
        all.extend(half.entries().iter().map(|e| *e.payload()));
    }
    all.sort_unstable();
    assert_eq!(all, (0..7).collect::<Vec<_>>());
    assert_tree_invariants(&tree);
}

#[test]
fn test_identical_points() {
    for picker in [SeedsPicker::Linear, SeedsPicker::Quadratic] {
        let config = RTreeConfig::default().with_seeds_picker(picker);
        let mut tree = RTree::new(config).unwrap();
        for i in 0..100 {
            tree.insert_point(&[3.0, 3.0], i).unwrap();
        }
        assert_tree_invariants(&tree);

        let query = BoundingBox::point(&[3.0, 3.0]).unwrap();
        assert_eq!(tree.find_contained(&query).unwrap().len(), 100);
    }
}

#[test]
fn test_queries_match_linear_scan() {
    for (seed, config) in test_configs().into_iter().enumerate() {
        let dims = config.dimensions();
        let boxes = random_boxes(200 + seed as u64, 400, dims);
        let mut tree = RTree::new(config).unwrap();
        for (i, bbox) in boxes.iter().enumerate() {
            tree.insert(bbox.clone(), i).unwrap();
        }

        for query in random_boxes(900 + seed as u64, 25, dims) {
            let query = BoundingBox::new(
                query.lower().to_vec(),
                query.upper().iter().map(|u| u + 20.0).collect(),
            )
            .unwrap();

            let mut found: Vec<usize> = tree
                .find_intersecting(&query)
                .unwrap()
                .into_iter()
                .copied()
                .collect();
            found.sort_unstable();
            let expected: Vec<usize> = (0..boxes.len())
                .filter(|&i| boxes[i].intersects(&query))
                .collect();
            assert_eq!(found, expected);

            let mut contained: Vec<usize> = tree
                .find_contained(&query)
                .unwrap()
                .into_iter()
                .copied()
                .collect();
            contained.sort_unstable();
            let expected: Vec<usize> = (0..boxes.len())
                .filter(|&i| query.contains(&boxes[i]))
                .collect();
            assert_eq!(contained, expected);
        }
    }
}

#[test]
fn test_rejected_inserts_leave_tree_untouched() {
    let mut tree = RTree::new(RTreeConfig::new(4, 2, 3, SeedsPicker::Linear).unwrap()).unwrap();
    for (i, bbox) in random_boxes(5, 30, 3).into_iter().enumerate() {
        tree.insert(bbox, i).unwrap();
    }
    let before = tree.structural_dump();

    let err = tree.insert_point(&[1.0, 2.0], 99).unwrap_err();
    assert!(matches!(err, SpatialError::MalformedInput(_)));
    let err = tree
        .insert(BoundingBox::point(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 99)
        .unwrap_err();
    assert!(matches!(err, SpatialError::MalformedInput(_)));
    assert!(BoundingBox::new(vec![2.0, 0.0, 0.0], vec![1.0, 1.0, 1.0]).is_err());

    assert_eq!(tree.len(), 30);
    assert_eq!(tree.structural_dump(), before);
}

#[test]
fn test_invalid_configurations() {
    for (max, min, dims) in [(4, 3, 2), (1, 0, 2), (0, 0, 1), (10, 6, 2), (4, 2, 0)] {
        let err = RTreeConfig::new(max, min, dims, SeedsPicker::Linear).unwrap_err();
        assert!(matches!(err, SpatialError::Configuration(_)));
    }
}
