//! `Group`: one vertex of the partitioning DAG, and `GroupDag`: the DAG
//! itself plus the merge primitives every pass is built from.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::ids::{GroupId, OpId};
use crate::op::MetaDescriptor;
use crate::repeated::{Repeated, Reptrack, ReptrackMap};

/// One vertex of the Group DAG: a non-empty set of `OpId`s that will become
/// one emitted subgraph.
#[derive(Clone)]
pub struct Group {
    pub id: GroupId,
    /// Non-empty; `BTreeSet` so iteration order (and thus anything derived
    /// from it, like a meta-descriptor multiset) is deterministic.
    pub content: BTreeSet<OpId>,
    pub frozen: bool,
    pub no_fold: bool,
    pub avoided_devices: BTreeSet<String>,
    pub isolated_tag: Option<String>,
    /// Small ordered set; kept as a sorted, deduplicated `Vec` since the
    /// only operations performed on it are equality and union.
    pub special_tags: Vec<String>,
    pub repeat_tag: Option<Repeated>,
    pub reptrack: ReptrackMap,
}

impl Group {
    pub fn singleton(id: GroupId, op: OpId) -> Self {
        let mut reptrack = ReptrackMap::new();
        reptrack.insert(op, Reptrack::default());
        let mut content = BTreeSet::new();
        content.insert(op);
        Self {
            id,
            content,
            frozen: false,
            no_fold: false,
            avoided_devices: BTreeSet::new(),
            isolated_tag: None,
            special_tags: Vec::new(),
            repeat_tag: None,
            reptrack,
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }

    pub fn add_special_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if let Err(pos) = self.special_tags.binary_search(&tag) {
            self.special_tags.insert(pos, tag);
        }
    }

    /// The meta-descriptor multiset of this group's content, in a
    /// deterministic (sorted) order -- used both by `identifyUniques`'s
    /// composite key and by invariant G5.
    pub fn meta_multiset(&self, descriptors: &BTreeMap<OpId, MetaDescriptor>) -> Vec<MetaDescriptor> {
        let mut v: Vec<MetaDescriptor> = self
            .content
            .iter()
            .filter_map(|op| descriptors.get(op).cloned())
            .collect();
        v.sort();
        v
    }
}

/// The directed acyclic graph of `Group`s. Edges mirror data dependencies
/// at the group level (invariant G1/G2).
///
/// All three maps are `BTreeMap`/`BTreeSet` so iteration is always ordered
/// by `GroupId` -- determinism falls out of the container choice rather
/// than needing an explicit sort in every pass.
pub struct GroupDag {
    pub groups: BTreeMap<GroupId, Group>,
    out_edges: BTreeMap<GroupId, BTreeSet<GroupId>>,
    in_edges: BTreeMap<GroupId, BTreeSet<GroupId>>,
    next_id: u64,
}

impl GroupDag {
    pub fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
            out_edges: BTreeMap::new(),
            in_edges: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn fresh_id(&mut self) -> GroupId {
        let id = GroupId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn insert(&mut self, group: Group) {
        let id = group.id;
        self.out_edges.entry(id).or_default();
        self.in_edges.entry(id).or_default();
        self.groups.insert(id, group);
    }

    /// Mirror a data-dependency edge at the group level. Idempotent: a
    /// duplicate `(from, to)` is a no-op.
    pub fn add_edge(&mut self, from: GroupId, to: GroupId) {
        if from == to {
            return;
        }
        self.out_edges.entry(from).or_default().insert(to);
        self.in_edges.entry(to).or_default().insert(from);
    }

    pub fn producers(&self, g: GroupId) -> impl Iterator<Item = GroupId> + '_ {
        self.in_edges.get(&g).into_iter().flatten().copied()
    }

    pub fn consumers(&self, g: GroupId) -> impl Iterator<Item = GroupId> + '_ {
        self.out_edges.get(&g).into_iter().flatten().copied()
    }

    /// All group-level edges, `(from, to)`, ordered by `from` then `to`.
    pub fn edges(&self) -> Vec<(GroupId, GroupId)> {
        self.out_edges
            .iter()
            .flat_map(|(&from, tos)| tos.iter().map(move |&to| (from, to)))
            .collect()
    }

    pub fn producer_count(&self, g: GroupId) -> usize {
        self.in_edges.get(&g).map_or(0, BTreeSet::len)
    }

    pub fn consumer_count(&self, g: GroupId) -> usize {
        self.out_edges.get(&g).map_or(0, BTreeSet::len)
    }

    /// Deterministic topological order (Kahn's algorithm over a `BTreeSet`
    /// ready-queue, so ties break ascending by `GroupId`).
    pub fn topological_order(&self) -> Vec<GroupId> {
        let mut indegree: BTreeMap<GroupId, usize> = self
            .groups
            .keys()
            .map(|&g| (g, self.producer_count(g)))
            .collect();
        let mut ready: BTreeSet<GroupId> = indegree
            .iter()
            .filter(|&(_, &d)| d == 0)
            .map(|(&g, _)| g)
            .collect();
        let mut order = Vec::with_capacity(self.groups.len());
        while let Some(&g) = ready.iter().next() {
            ready.remove(&g);
            order.push(g);
            for c in self.consumers(g).collect::<Vec<_>>() {
                if let Some(d) = indegree.get_mut(&c) {
                    *d -= 1;
                    if *d == 0 {
                        ready.insert(c);
                    }
                }
            }
        }
        order
    }

    /// Would merging `a` and `b` create a cycle? Tests reachability in the
    /// Group DAG *ignoring the direct edge between the two*, so this
    /// single routine covers both an adjacent producer/consumer pair
    /// (`a -> b`) and an unordered sibling pair with no direct edge at
    /// all (`fuseInputs`).
    pub fn would_cycle(&self, a: GroupId, b: GroupId) -> bool {
        self.reachable_ignoring_edge(b, a, a, b) || self.reachable_ignoring_edge(a, b, b, a)
    }

    fn reachable_ignoring_edge(
        &self,
        start: GroupId,
        target: GroupId,
        ignore_from: GroupId,
        ignore_to: GroupId,
    ) -> bool {
        if start == target {
            return true;
        }
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        seen.insert(start);
        queue.push_back(start);
        while let Some(cur) = queue.pop_front() {
            for next in self.consumers(cur) {
                if cur == ignore_from && next == ignore_to {
                    continue;
                }
                if next == target {
                    return true;
                }
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// The single rewrite primitive every merge funnels through:
    /// `absorbed` is removed from the DAG, every edge incident to it is
    /// redirected onto `survivor`, and
    /// `survivor` gains `absorbed`'s content, `avoided_devices` and
    /// `special_tags` (union), keeping its own `isolated_tag`.
    ///
    /// `marker` is appended to the reptrack of every op moved from
    /// `absorbed` into `survivor`.
    pub fn merge_groups(&mut self, survivor: GroupId, absorbed: GroupId, marker: &str) {
        assert_ne!(survivor, absorbed, "merge_groups: cannot merge a group into itself");
        let absorbed_group = self
            .groups
            .remove(&absorbed)
            .expect("merge_groups: absorbed group missing");

        // Redirect edges.
        let absorbed_producers: Vec<GroupId> =
            self.in_edges.remove(&absorbed).into_iter().flatten().collect();
        let absorbed_consumers: Vec<GroupId> =
            self.out_edges.remove(&absorbed).into_iter().flatten().collect();

        for p in absorbed_producers {
            if let Some(s) = self.out_edges.get_mut(&p) {
                s.remove(&absorbed);
            }
            self.add_edge(p, survivor);
        }
        for c in absorbed_consumers {
            if let Some(s) = self.in_edges.get_mut(&c) {
                s.remove(&absorbed);
            }
            self.add_edge(survivor, c);
        }
        self.out_edges.entry(survivor).or_default().remove(&survivor);
        self.in_edges.entry(survivor).or_default().remove(&survivor);

        let survivor_group = self.groups.get_mut(&survivor).expect("merge_groups: survivor missing");
        for op in absorbed_group.content {
            let mut track = absorbed_group
                .reptrack
                .get(&op)
                .cloned()
                .unwrap_or_default();
            track.push(marker);
            survivor_group.reptrack.insert(op, track);
            survivor_group.content.insert(op);
        }
        for d in absorbed_group.avoided_devices {
            survivor_group.avoided_devices.insert(d);
        }
        for t in absorbed_group.special_tags {
            survivor_group.add_special_tag(t);
        }
        survivor_group.no_fold = survivor_group.no_fold || absorbed_group.no_fold;
    }
}

impl Default for GroupDag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkdag(n: u64) -> (GroupDag, Vec<GroupId>) {
        let mut dag = GroupDag::new();
        let ids: Vec<GroupId> = (0..n)
            .map(|i| {
                let id = dag.fresh_id();
                dag.insert(Group::singleton(id, OpId::new(i)));
                id
            })
            .collect();
        (dag, ids)
    }

    #[test]
    fn chain_topological_order_is_source_to_sink() {
        let (mut dag, ids) = mkdag(3);
        dag.add_edge(ids[0], ids[1]);
        dag.add_edge(ids[1], ids[2]);
        assert_eq!(dag.topological_order(), ids);
    }

    #[test]
    fn would_cycle_detects_back_edge() {
        let (mut dag, ids) = mkdag(3);
        dag.add_edge(ids[0], ids[1]);
        dag.add_edge(ids[1], ids[2]);
        // merging ids[2] and ids[0] directly would create a cycle through ids[1]
        assert!(dag.would_cycle(ids[2], ids[0]));
        assert!(!dag.would_cycle(ids[0], ids[1]));
    }

    #[test]
    fn merge_groups_rewires_edges_and_unions_content() {
        let (mut dag, ids) = mkdag(3);
        dag.add_edge(ids[0], ids[1]);
        dag.add_edge(ids[1], ids[2]);
        dag.merge_groups(ids[2], ids[1], "test");
        assert!(!dag.groups.contains_key(&ids[1]));
        assert_eq!(dag.groups[&ids[2]].content.len(), 2);
        assert!(dag.producers(ids[2]).any(|p| p == ids[0]));
    }

    #[test]
    fn add_edge_is_idempotent() {
        let (mut dag, ids) = mkdag(2);
        dag.add_edge(ids[0], ids[1]);
        dag.add_edge(ids[0], ids[1]);
        assert_eq!(dag.consumer_count(ids[0]), 1);
    }
}
