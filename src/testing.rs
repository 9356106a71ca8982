//! Test tooling: in-memory graph fixtures plus collection-equality
//! assertions for Group/repeat-class comparisons.

pub mod fixtures;

use std::collections::BTreeSet;
use std::fmt::Debug;

use crate::group::GroupDag;
use crate::ids::{GroupId, OpId};

/// Assert that `group`'s content is exactly `expected`, order-independent.
pub fn assert_group_content(dag: &GroupDag, group: GroupId, expected: &[OpId]) {
    let actual: BTreeSet<OpId> = dag.groups[&group].content.iter().copied().collect();
    let expected: BTreeSet<OpId> = expected.iter().copied().collect();
    assert_eq!(actual, expected, "group {group} content mismatch");
}

/// Assert that two collections contain the same elements, ignoring order
/// and duplicates.
pub fn assert_collections_unordered_equal<T: Ord + Debug + Clone>(actual: &[T], expected: &[T]) {
    let a: BTreeSet<T> = actual.iter().cloned().collect();
    let e: BTreeSet<T> = expected.iter().cloned().collect();
    assert_eq!(a, e, "collections differ: got {actual:?}, expected {expected:?}");
}

/// Assert that a set of `Group`s partitions exactly into the given op-id
/// sets (one set per group, matched by content regardless of order).
pub fn assert_partition_matches(dag: &GroupDag, expected: &[&[OpId]]) {
    let mut actual: Vec<BTreeSet<OpId>> = dag.groups.values().map(|g| g.content.clone()).collect();
    let mut wanted: Vec<BTreeSet<OpId>> = expected.iter().map(|s| s.iter().copied().collect()).collect();
    actual.sort();
    wanted.sort();
    assert_eq!(actual, wanted, "partition does not match expected group content sets");
}
