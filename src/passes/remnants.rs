//! `fuseRemnantsExtended` = `fuseRemnants` + `fuseInputs`, each run to a
//! fixed point.

use crate::group::GroupDag;
use crate::ids::GroupId;

/// Topological sweep. For each non-frozen `Group` `g` with at least one
/// consumer, sort consumers ascending by current size (secondary tiebreak
/// on `GroupId` ascending, added since
/// the size-only sort is otherwise unstable), then pick the first consumer `c` such
/// that merging would not create a cycle and `c` is not frozen. `c`
/// absorbs `g` (the downstream absorbs the upstream remnant). Breaks after
/// one merge per `g`; stops the whole sweep once Group count reaches
/// `min`.
pub fn fuse_remnants(dag: &mut GroupDag, min: usize) {
    let order = dag.topological_order();
    for g in order {
        if dag.groups.len() <= min {
            break;
        }
        if !dag.groups.contains_key(&g) || dag.groups[&g].frozen {
            continue;
        }
        let mut consumers: Vec<GroupId> = dag.consumers(g).collect();
        if consumers.is_empty() {
            continue;
        }
        consumers.sort_by_key(|&c| (dag.groups[&c].size(), c));
        for c in consumers {
            if dag.groups[&c].frozen {
                continue;
            }
            if dag.would_cycle(g, c) {
                continue;
            }
            dag.merge_groups(c, g, "fuseRemnants");
            break;
        }
    }
}

/// Topological sweep. For each non-frozen `Group` `g`, scan its producer
/// list for an unordered pair `(p1, p2)` of non-frozen producers that are
/// mutually acyclic (neither reachable from the other), and merge them
/// into one sibling group (the lower `GroupId` survives, for a
/// deterministic tiebreak). Breaks after one merge per `g`; stops the
/// whole sweep once Group count reaches `min`.
pub fn fuse_inputs(dag: &mut GroupDag, min: usize) {
    let order = dag.topological_order();
    for g in order {
        if dag.groups.len() <= min {
            break;
        }
        if !dag.groups.contains_key(&g) || dag.groups[&g].frozen {
            continue;
        }
        let producers: Vec<GroupId> = dag
            .producers(g)
            .filter(|&p| !dag.groups[&p].frozen)
            .collect();
        'outer: for i in 0..producers.len() {
            for j in (i + 1)..producers.len() {
                let (p1, p2) = (producers[i], producers[j]);
                if !dag.groups.contains_key(&p1) || !dag.groups.contains_key(&p2) {
                    continue;
                }
                if dag.would_cycle(p1, p2) {
                    continue;
                }
                let (survivor, absorbed) = if p1 < p2 { (p1, p2) } else { (p2, p1) };
                dag.merge_groups(survivor, absorbed, "fuseInputs");
                break 'outer;
            }
        }
    }
}

/// Run `fuseRemnants` to a fixed point, then `fuseInputs` to a fixed point.
pub fn fuse_remnants_extended(dag: &mut GroupDag, min: usize) {
    super::repeat_until_fixed(dag, min, |dag| fuse_remnants(dag, min));
    super::repeat_until_fixed(dag, min, |dag| fuse_inputs(dag, min));
}
