//! `Group`/`GroupDag` invariants that must hold across arbitrary merges:
//! acyclicity and order-independent content equality.

use partgraph_core::{Group, GroupDag, OpId};

fn mkdag(n: u64) -> (GroupDag, Vec<partgraph_core::GroupId>) {
    let mut dag = GroupDag::new();
    let ids = (0..n)
        .map(|i| {
            let id = dag.fresh_id();
            dag.insert(Group::singleton(id, OpId::new(i)));
            id
        })
        .collect();
    (dag, ids)
}

/// Invariant I2: the Group DAG stays acyclic across a chain of merges.
#[test]
fn stays_acyclic_across_repeated_merges() {
    let (mut dag, ids) = mkdag(5);
    dag.add_edge(ids[0], ids[1]);
    dag.add_edge(ids[1], ids[2]);
    dag.add_edge(ids[2], ids[3]);
    dag.add_edge(ids[3], ids[4]);

    dag.merge_groups(ids[1], ids[0], "t");
    dag.merge_groups(ids[3], ids[2], "t");

    // No group should be able to reach itself.
    for &g in dag.groups.keys() {
        for &other in dag.groups.keys() {
            if g == other {
                continue;
            }
            assert!(!(dag.would_cycle(g, other) && dag.would_cycle(other, g)));
        }
    }
}

/// `merge_groups` never leaves a self-edge behind.
#[test]
fn merge_never_leaves_a_self_loop() {
    let (mut dag, ids) = mkdag(3);
    dag.add_edge(ids[0], ids[1]);
    dag.add_edge(ids[1], ids[2]);
    dag.add_edge(ids[0], ids[2]);
    dag.merge_groups(ids[2], ids[1], "t");
    assert!(!dag.producers(ids[2]).any(|p| p == ids[2]));
    assert!(!dag.consumers(ids[2]).any(|c| c == ids[2]));
}

/// Invariant I5 as a structural guarantee: `meta_multiset` is deterministic
/// regardless of `BTreeSet` iteration, since it's explicitly sorted.
#[test]
fn meta_multiset_is_order_independent() {
    use partgraph_core::op::{ElemType, MetaDescriptor, PortMeta};
    use std::collections::BTreeMap;

    let (dag, ids) = mkdag(2);
    let mut descriptors = BTreeMap::new();
    descriptors.insert(
        OpId::new(0),
        MetaDescriptor {
            kind: "B".into(),
            inputs: vec![],
            outputs: vec![PortMeta {
                elem_type: ElemType::F32,
                shape: vec![],
            }],
        },
    );
    descriptors.insert(
        OpId::new(1),
        MetaDescriptor {
            kind: "A".into(),
            inputs: vec![],
            outputs: vec![PortMeta {
                elem_type: ElemType::F32,
                shape: vec![],
            }],
        },
    );
    let mut g = Group::singleton(ids[0], OpId::new(0));
    g.content.insert(OpId::new(1));
    let multiset = g.meta_multiset(&descriptors);
    assert_eq!(multiset[0].kind, "A");
    assert_eq!(multiset[1].kind, "B");
}
