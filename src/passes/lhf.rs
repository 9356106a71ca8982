//! `collectLHF` (Linear-Head-Fuse).
//!
//! A topological sweep that collapses straight-line chains: for each
//! `Group` `g` still present with exactly one producer `p` such that `p`
//! has exactly one consumer (namely `g`), and neither is frozen, and the
//! DAG is still above the minimum size, merge `p` into `g` (`g`'s id
//! survives).

use crate::group::GroupDag;

pub fn collect_lhf(dag: &mut GroupDag, min: usize) {
    let order = dag.topological_order();
    for g in order {
        if dag.groups.len() <= min {
            break;
        }
        if !dag.groups.contains_key(&g) {
            continue;
        }
        if dag.groups[&g].frozen {
            continue;
        }
        if dag.producer_count(g) != 1 {
            continue;
        }
        let p = dag.producers(g).next().unwrap();
        if dag.groups[&p].frozen {
            continue;
        }
        if dag.consumer_count(p) != 1 {
            continue;
        }
        dag.merge_groups(g, p, "lhf");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Group;
    use crate::ids::OpId;

    fn mkdag(n: u64) -> (GroupDag, Vec<crate::ids::GroupId>) {
        let mut dag = GroupDag::new();
        let ids: Vec<_> = (0..n)
            .map(|i| {
                let id = dag.fresh_id();
                dag.insert(Group::singleton(id, OpId::new(i)));
                id
            })
            .collect();
        (dag, ids)
    }

    /// Scenario S1: chain A->B->C->D, min_graph_size=1 -> one group {A,B,C,D}.
    #[test]
    fn s1_chain_collapses_to_one_group() {
        let (mut dag, ids) = mkdag(4);
        dag.add_edge(ids[0], ids[1]);
        dag.add_edge(ids[1], ids[2]);
        dag.add_edge(ids[2], ids[3]);
        collect_lhf(&mut dag, 1);
        assert_eq!(dag.groups.len(), 1);
        let only = dag.groups.values().next().unwrap();
        assert_eq!(only.content.len(), 4);
    }

    /// Scenario S2: min_graph_size=4 with 4 ops in a chain -> 0 merges.
    #[test]
    fn s2_min_gate_prevents_any_merge() {
        let (mut dag, ids) = mkdag(4);
        dag.add_edge(ids[0], ids[1]);
        dag.add_edge(ids[1], ids[2]);
        dag.add_edge(ids[2], ids[3]);
        collect_lhf(&mut dag, 4);
        assert_eq!(dag.groups.len(), 4);
    }

    #[test]
    fn does_not_merge_across_a_fan_out() {
        // A -> B, A -> C : A has two consumers, so no LHF merge happens.
        let (mut dag, ids) = mkdag(3);
        dag.add_edge(ids[0], ids[1]);
        dag.add_edge(ids[0], ids[2]);
        collect_lhf(&mut dag, 1);
        assert_eq!(dag.groups.len(), 3);
    }

    #[test]
    fn frozen_groups_never_merge() {
        let (mut dag, ids) = mkdag(2);
        dag.add_edge(ids[0], ids[1]);
        dag.groups.get_mut(&ids[1]).unwrap().frozen = true;
        collect_lhf(&mut dag, 1);
        assert_eq!(dag.groups.len(), 2);
    }
}
