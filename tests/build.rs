//! `Snapshot::build` and the `isOp` predicate.

use partgraph_core::{PassContext, Snapshot};
use partgraph_core::testing::fixtures::FakeModel;

/// Invariant I1: groups partition exactly the operational nodes.
#[test]
fn groups_partition_operational_nodes_exactly() {
    let mut m = FakeModel::new();
    let c = m.constant("Const");
    let conv = m.convert_of(c);
    let a = m.op("A");
    let b = m.op_with_inputs("B", &[a, conv]);
    let _ = b;

    let snap = Snapshot::build(&m, PassContext::default());
    let operational = snap.op_index.operational_nodes();
    assert!(!operational.contains(&conv), "convert-of-constant is not operational");
    assert!(operational.contains(&a));

    let mut covered = std::collections::BTreeSet::new();
    for g in snap.dag.groups.values() {
        for &op in &g.content {
            assert!(covered.insert(op), "op {op} appears in more than one group");
        }
    }
    let expected: std::collections::BTreeSet<_> = operational.iter().copied().collect();
    assert_eq!(covered, expected);
}

/// Boundary B1: one operational node yields one Group.
#[test]
fn single_op_yields_single_group() {
    let mut m = FakeModel::new();
    let _a = m.op("A");
    let snap = Snapshot::build(&m, PassContext::default());
    assert_eq!(snap.dag.groups.len(), 1);
}

/// Boundary B3: a Convert whose input is a constant gets no Group of its own.
#[test]
fn convert_of_constant_gets_no_group() {
    let mut m = FakeModel::new();
    let c = m.constant("Const");
    let conv = m.convert_of(c);
    let snap = Snapshot::build(&m, PassContext::default());
    assert!(snap.op_index.group_of(conv).is_none());
}

/// Invariant I4: `node_to_group[n]` contains `n` for every operational `n`.
#[test]
fn node_to_group_contains_its_own_node() {
    let mut m = FakeModel::new();
    let a = m.op("A");
    let snap = Snapshot::build(&m, PassContext::default());
    let gid = snap.op_index.group_of(a).unwrap();
    assert!(snap.dag.groups[&gid].content.contains(&a));
}

/// Invariant I3: a Group DAG edge u->v implies some op in u feeds some op in v.
#[test]
fn group_edges_mirror_a_real_op_dependency() {
    let mut m = FakeModel::new();
    let a = m.op("A");
    let b = m.op_with_inputs("B", &[a]);
    let snap = Snapshot::build(&m, PassContext::default());
    let ga = snap.op_index.group_of(a).unwrap();
    let gb = snap.op_index.group_of(b).unwrap();
    assert!(snap.dag.consumers(ga).any(|c| c == gb));
    assert!(!snap.op_index.ports_between(a, b).is_empty());
}
