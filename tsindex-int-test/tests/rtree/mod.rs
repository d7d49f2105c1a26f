//! R-Tree integration test module.
//!
//! These tests drive the tree only through its public API: construction,
//! insertion, traversal, queries and the binary format.

mod golden_test;
mod invariants_test;
mod serialization_test;
