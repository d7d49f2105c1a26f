//! Binary format round trips, codecs and corrupt input.

use bytes::{Buf, BufMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tsindex_int_test::test_util::{
    assert_tree_invariants, cleanup, create_test_context, random_boxes, run_test, test_configs,
};
use tsindex_rtree::codec::{bincode_decode, bincode_encode, get_u64, put_u64};
use tsindex_rtree::{RTree, RTreeConfig, SeedsPicker, SpatialError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SeriesRef {
    path: String,
    sequence: bool,
}

fn build(config: RTreeConfig, seed: u64, count: usize) -> RTree<u64> {
    let mut tree = RTree::new(config).unwrap();
    for (i, bbox) in random_boxes(seed, count, config.dimensions())
        .into_iter()
        .enumerate()
    {
        tree.insert(bbox, i as u64).unwrap();
    }
    tree
}

#[test]
fn test_round_trip_across_configs() {
    for (seed, config) in test_configs().into_iter().enumerate() {
        for count in [0usize, 1, 17, 250] {
            let tree = build(config, seed as u64, count);
            let mut bytes = Vec::new();
            tree.serialize(&mut bytes, put_u64).unwrap();

            let restored = RTree::deserialize(&mut bytes.as_slice(), get_u64).unwrap();
            assert_eq!(restored.config(), tree.config());
            assert_eq!(restored.structural_dump(), tree.structural_dump());
            assert_tree_invariants(&restored);

            let original: Vec<u64> = tree.entries().into_iter().map(|(_, p)| *p).collect();
            let decoded: Vec<u64> = restored.entries().into_iter().map(|(_, p)| *p).collect();
            assert_eq!(decoded, original);

            let mut again = Vec::new();
            restored.serialize(&mut again, put_u64).unwrap();
            assert_eq!(again, bytes);
        }
    }
}

#[test]
fn test_quadratic_picker_survives_round_trip() {
    let config = RTreeConfig::new(6, 2, 2, SeedsPicker::Quadratic).unwrap();
    let tree = build(config, 11, 80);
    let mut bytes = Vec::new();
    tree.serialize(&mut bytes, put_u64).unwrap();

    let mut restored = RTree::deserialize(&mut bytes.as_slice(), get_u64).unwrap();
    assert_eq!(restored.config().seeds_picker(), SeedsPicker::Quadratic);
    assert!(restored
        .structural_dump()
        .starts_with("nMax:6,nMin:2,dim:2,seedsPicker:QUADRATIC\n"));

    // further inserts follow the same split policy as the original
    let mut original = tree.clone();
    for (i, bbox) in random_boxes(12, 40, 2).into_iter().enumerate() {
        original.insert(bbox.clone(), 1000 + i as u64).unwrap();
        restored.insert(bbox, 1000 + i as u64).unwrap();
    }
    assert_eq!(restored.structural_dump(), original.structural_dump());
}

#[test]
fn test_serde_payloads() {
    let mut tree = RTree::new(RTreeConfig::default()).unwrap();
    for (i, bbox) in random_boxes(3, 40, 2).into_iter().enumerate() {
        let payload = SeriesRef {
            path: format!("root.sg{}.d{}.s{}", i % 3, i % 5, i),
            sequence: i % 2 == 0,
        };
        tree.insert(bbox, payload).unwrap();
    }

    let mut bytes = Vec::new();
    tree.serialize(&mut bytes, bincode_encode).unwrap();
    let restored: RTree<SeriesRef> =
        RTree::deserialize(&mut bytes.as_slice(), bincode_decode).unwrap();

    let original: Vec<&SeriesRef> = tree.entries().into_iter().map(|(_, p)| p).collect();
    let decoded: Vec<&SeriesRef> = restored.entries().into_iter().map(|(_, p)| p).collect();
    assert_eq!(decoded, original);
}

#[test]
fn test_outer_container_framing() {
    // a caller may wrap the tree in its own framing, e.g. a leading count
    let trees: Vec<RTree<u64>> = (0..3).map(|s| build(RTreeConfig::default(), s, 30)).collect();
    let mut bytes = Vec::new();
    bytes.put_u32(trees.len() as u32);
    for tree in &trees {
        tree.serialize(&mut bytes, put_u64).unwrap();
    }

    let mut source = bytes.as_slice();
    let count = source.get_u32();
    let mut restored = Vec::new();
    for _ in 0..count {
        restored.push(RTree::deserialize(&mut source, get_u64).unwrap());
    }
    assert!(!source.has_remaining());
    for (a, b) in trees.iter().zip(&restored) {
        assert_eq!(a.structural_dump(), b.structural_dump());
    }
}

#[test]
fn test_truncated_input_fails_cleanly() {
    let tree = build(RTreeConfig::new(5, 2, 3, SeedsPicker::Linear).unwrap(), 21, 60);
    let mut bytes = Vec::new();
    tree.serialize(&mut bytes, put_u64).unwrap();

    for len in (0..bytes.len()).step_by(7) {
        let err = RTree::deserialize(&mut &bytes[..len], get_u64).unwrap_err();
        assert!(matches!(err, SpatialError::Serialization(_)), "length {}", len);
    }
}

#[test]
fn test_corrupt_bytes_never_panic() {
    let tree = build(RTreeConfig::default(), 31, 50);
    let mut bytes = Vec::new();
    tree.serialize(&mut bytes, put_u64).unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    let mut rejected = 0;
    for _ in 0..500 {
        let mut corrupt = bytes.clone();
        let at = rng.random_range(0..corrupt.len());
        corrupt[at] ^= rng.random_range(1..=255u8);

        match RTree::deserialize(&mut corrupt.as_slice(), get_u64) {
            Ok(restored) => assert_tree_invariants(&restored),
            Err(e) => {
                assert!(matches!(e, SpatialError::Serialization(_)));
                rejected += 1;
            }
        }
    }
    // most flips land in structure or boxes rather than payload bytes
    assert!(rejected > 0);

    let mut tree = RTree::new(RTreeConfig::default()).unwrap();
    for (i, bbox) in random_boxes(32, 40, 2).into_iter().enumerate() {
        let payload = SeriesRef {
            path: format!("root.sg1.d{}", i),
            sequence: i % 3 == 0,
        };
        tree.insert(bbox, payload).unwrap();
    }
    let mut bytes = Vec::new();
    tree.serialize(&mut bytes, bincode_encode).unwrap();

    for _ in 0..500 {
        let mut corrupt = bytes.clone();
        let at = rng.random_range(0..corrupt.len());
        corrupt[at] ^= rng.random_range(1..=255u8);

        match RTree::<SeriesRef>::deserialize(&mut corrupt.as_slice(), bincode_decode) {
            Ok(restored) => assert_tree_invariants(&restored),
            Err(e) => assert!(matches!(e, SpatialError::Serialization(_))),
        }
    }
}

#[test]
fn test_huge_bincode_length_is_a_serialization_error() {
    let mut tree = RTree::new(RTreeConfig::default()).unwrap();
    tree.insert_point(&[1.0, 2.0], "root.sg1.d1.s1".to_string())
        .unwrap();
    let mut bytes = Vec::new();
    tree.serialize(&mut bytes, bincode_encode).unwrap();

    // header (13) + root frame (16 + 1 + 4) + entry box (16) + payload
    // prefix (4), then the bincode string length
    let at = 13 + 21 + 16 + 4;
    bytes[at..at + 8].copy_from_slice(&[0xFF; 8]);

    let err = RTree::<String>::deserialize(&mut bytes.as_slice(), bincode_decode).unwrap_err();
    assert!(matches!(err, SpatialError::Serialization(_)));
}

#[test]
fn test_file_round_trip() {
    run_test(
        || create_test_context(),
        |ctx| {
            let tree = build(RTreeConfig::new(8, 3, 2, SeedsPicker::Linear)?, 41, 300);
            let path = ctx.file("series.rtree");
            tree.write_to_file(&path, put_u64)?;

            let restored = RTree::read_from_file(&path, get_u64)?;
            assert_eq!(restored.structural_dump(), tree.structural_dump());

            // writing again replaces the file instead of appending
            tree.write_to_file(&path, put_u64)?;
            let again = RTree::read_from_file(&path, get_u64)?;
            assert_eq!(again.len(), 300);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
