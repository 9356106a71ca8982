//! `collectLHF` / `fuseRemnantsExtended` end to end via `Snapshot::build`.

use partgraph_core::passes::{lhf, remnants};
use partgraph_core::testing::fixtures::FakeModel;
use partgraph_core::{PassContext, Snapshot};

/// Scenario S1: chain A->B->C->D, min_graph_size=1 -> one Group via LHF.
#[test]
fn s1_straight_chain_collapses_via_lhf() {
    let mut m = FakeModel::new();
    let a = m.op("A");
    let b = m.op_with_inputs("B", &[a]);
    let c = m.op_with_inputs("C", &[b]);
    let _d = m.op_with_inputs("D", &[c]);

    let mut ctx = PassContext::default();
    ctx.min_graph_size = 1;
    let mut snap = Snapshot::build(&m, ctx);
    lhf::collect_lhf(&mut snap.dag, 1);

    assert_eq!(snap.dag.groups.len(), 1);
}

/// Scenario S2: min_graph_size=4 over a 4-op chain -> zero merges.
#[test]
fn s2_min_gate_blocks_lhf_entirely() {
    let mut m = FakeModel::new();
    let a = m.op("A");
    let b = m.op_with_inputs("B", &[a]);
    let c = m.op_with_inputs("C", &[b]);
    let _d = m.op_with_inputs("D", &[c]);

    let mut ctx = PassContext::default();
    ctx.min_graph_size = 4;
    let mut snap = Snapshot::build(&m, ctx);
    lhf::collect_lhf(&mut snap.dag, 4);

    assert_eq!(snap.dag.groups.len(), 4);
}

/// Law L3: structural passes never increase group count.
#[test]
fn l3_group_count_is_monotone_non_increasing() {
    let mut m = FakeModel::new();
    let a = m.op("A");
    let b = m.op_with_inputs("B", &[a]);
    let c = m.op_with_inputs("C", &[a]);
    let _d = m.op_with_inputs("D", &[b, c]);

    let mut snap = Snapshot::build(&m, PassContext::default());
    let before = snap.dag.groups.len();
    lhf::collect_lhf(&mut snap.dag, 1);
    remnants::fuse_remnants_extended(&mut snap.dag, 1);
    assert!(snap.dag.groups.len() <= before);
}

/// Law L4: if group count already <= min, a structural pass performs no merges.
#[test]
fn l4_already_at_minimum_performs_no_merges() {
    let mut m = FakeModel::new();
    let a = m.op("A");
    let _b = m.op_with_inputs("B", &[a]);

    let mut snap = Snapshot::build(&m, PassContext::default());
    let min = snap.dag.groups.len();
    lhf::collect_lhf(&mut snap.dag, min);
    assert_eq!(snap.dag.groups.len(), min);
}

/// `fuseInputs` merges two independent producers of a shared consumer.
#[test]
fn fuse_inputs_merges_a_diamond_s_shoulders() {
    let mut m = FakeModel::new();
    let a = m.op("A");
    let b = m.op_with_inputs("B", &[a]);
    let c = m.op_with_inputs("C", &[a]);
    let _d = m.op_with_inputs("D", &[b, c]);

    let mut snap = Snapshot::build(&m, PassContext::default());
    lhf::collect_lhf(&mut snap.dag, 1);
    remnants::fuse_remnants_extended(&mut snap.dag, 1);

    assert_eq!(snap.dag.groups.len(), 1, "diamond should fully collapse");
}
