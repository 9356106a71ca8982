//! `Snapshot`: the one object the core operates on.
//!
//! Bundles the operation index, the Group DAG, the pass pipeline's shared
//! state and the repeat registry. Built once from a [`SourceModel`] and
//! driven to completion by [`crate::passes::run_pipeline`]; there is no
//! `Arc<Mutex<_>>` here because nothing about this object is shared
//! across threads -- the whole pipeline runs on one caller's stack.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::config::PassContext;
use crate::group::{Group, GroupDag};
use crate::ids::{GroupId, OpId};
use crate::op::{MetaDescriptor, ModelNode, NodeCategory, SourceModel};
use crate::repeated::Repeated;

/// Every `OpNode`, plus the producer/consumer index that covers constants
/// and parameters too, plus the port map.
pub struct OpIndex {
    nodes: BTreeMap<OpId, Rc<dyn ModelNode>>,
    operational: Vec<OpId>,
    producers: BTreeMap<OpId, Vec<OpId>>,
    consumers: BTreeMap<OpId, Vec<OpId>>,
    /// `(src, dst) -> (src_port, dst_port)` pairs, one per OpNode-level
    /// edge; a given `(src, dst)` pair may carry more than one port
    /// connection if the producer feeds the same consumer on two ports.
    ports: BTreeMap<(OpId, OpId), Vec<(u32, u32)>>,
    node_to_group: BTreeMap<OpId, GroupId>,
}

impl OpIndex {
    pub fn node(&self, id: OpId) -> &Rc<dyn ModelNode> {
        self.nodes.get(&id).expect("OpIndex: unknown OpId")
    }

    pub fn category(&self, id: OpId) -> NodeCategory {
        self.node(id).category()
    }

    pub fn meta(&self, id: OpId) -> MetaDescriptor {
        self.node(id).meta().clone()
    }

    pub fn producers_of(&self, id: OpId) -> &[OpId] {
        self.producers.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn consumers_of(&self, id: OpId) -> &[OpId] {
        self.consumers.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn ports_between(&self, src: OpId, dst: OpId) -> &[(u32, u32)] {
        self.ports.get(&(src, dst)).map_or(&[], Vec::as_slice)
    }

    pub fn operational_nodes(&self) -> &[OpId] {
        &self.operational
    }

    pub fn group_of(&self, id: OpId) -> Option<GroupId> {
        self.node_to_group.get(&id).copied()
    }

    pub fn set_group(&mut self, id: OpId, group: GroupId) {
        self.node_to_group.insert(id, group);
    }

    pub fn node_to_group(&self) -> &BTreeMap<OpId, GroupId> {
        &self.node_to_group
    }

    /// Re-derive `node_to_group` from the Group DAG's current content.
    /// Every structural merge changes which `Group` an absorbed op now
    /// belongs to; passes operate on `GroupDag` directly for the common
    /// case (no `OpIndex` access needed), so this is called once at the
    /// end of the pipeline rather than kept in sync merge-by-merge.
    pub fn rebuild_group_index(&mut self, dag: &GroupDag) {
        self.node_to_group.clear();
        for g in dag.groups.values() {
            for &op in &g.content {
                self.node_to_group.insert(op, g.id);
            }
        }
    }

    /// Producer/consumer sets for every node, operational or not.
    pub fn node_to_prod_cons(&self) -> BTreeMap<OpId, (Vec<OpId>, Vec<OpId>)> {
        self.nodes
            .keys()
            .map(|&id| {
                (
                    id,
                    (
                        self.producers_of(id).to_vec(),
                        self.consumers_of(id).to_vec(),
                    ),
                )
            })
            .collect()
    }

    pub fn ports_map(&self) -> BTreeMap<(OpId, OpId), Vec<(u32, u32)>> {
        self.ports.clone()
    }
}

/// Every repeat token ever allocated during a run, so `afterUniques` can
/// address a cohort by its tag name when applying `nofolds`.
pub struct RepeatRegistry {
    /// All tokens ever allocated, in allocation order (`BTreeMap` over a
    /// monotonically increasing ordinal, not over the token itself --
    /// `Repeated` has no total order, only identity equality).
    tokens: BTreeMap<u64, Repeated>,
    next_ordinal: u64,
}

impl RepeatRegistry {
    pub fn new() -> Self {
        Self {
            tokens: BTreeMap::new(),
            next_ordinal: 0,
        }
    }

    pub fn allocate(&mut self, hint: &str) -> Repeated {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        let t = Repeated::fresh(format!("{hint}_{ordinal}"));
        self.tokens.insert(ordinal, t.clone());
        t
    }

    pub fn all(&self) -> impl Iterator<Item = &Repeated> {
        self.tokens.values()
    }
}

impl Default for RepeatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Snapshot {
    pub op_index: OpIndex,
    pub dag: GroupDag,
    pub registry: RepeatRegistry,
    pub config: PassContext,
}

impl Snapshot {
    /// Build: wrap every operational `OpNode` in a singleton `Group`,
    /// mirror the OpNode-level edges as Group-level edges, and populate
    /// the producer/consumer index and port map for every node, including
    /// non-operational ones.
    pub fn build(model: &dyn SourceModel, config: PassContext) -> Self {
        let ordered = model.nodes_topological();

        let mut nodes: BTreeMap<OpId, Rc<dyn ModelNode>> = BTreeMap::new();
        for n in &ordered {
            nodes.insert(n.id(), Rc::clone(n));
        }

        let mut producers: BTreeMap<OpId, Vec<OpId>> = BTreeMap::new();
        let mut consumers: BTreeMap<OpId, Vec<OpId>> = BTreeMap::new();
        let mut ports: BTreeMap<(OpId, OpId), Vec<(u32, u32)>> = BTreeMap::new();

        for n in &ordered {
            let dst = n.id();
            for (dst_port, input) in n.inputs().iter().enumerate() {
                let src = input.producer;
                producers.entry(dst).or_default().push(src);
                consumers.entry(src).or_default().push(dst);
                ports
                    .entry((src, dst))
                    .or_default()
                    .push((input.producer_port, dst_port as u32));
            }
        }
        for v in producers.values_mut() {
            v.sort();
            v.dedup();
        }
        for v in consumers.values_mut() {
            v.sort();
            v.dedup();
        }

        let mut dag = GroupDag::new();
        let mut node_to_group = BTreeMap::new();

        for n in &ordered {
            if is_operational(n.as_ref(), &nodes) {
                let gid = dag.fresh_id();
                dag.insert(Group::singleton(gid, n.id()));
                node_to_group.insert(n.id(), gid);
            }
        }
        // Mirror OpNode edges as Group edges, idempotently, only between
        // operational endpoints.
        for n in &ordered {
            let Some(&to_group) = node_to_group.get(&n.id()) else {
                continue;
            };
            for input in n.inputs() {
                if let Some(&from_group) = node_to_group.get(&input.producer) {
                    dag.add_edge(from_group, to_group);
                }
            }
        }

        let operational: Vec<OpId> = node_to_group.keys().copied().collect();

        let op_index = OpIndex {
            nodes,
            operational,
            producers,
            consumers,
            ports,
            node_to_group,
        };

        Self {
            op_index,
            dag,
            registry: RepeatRegistry::new(),
            config,
        }
    }
}

/// The `isOp` predicate: operational iff not a constant, parameter or
/// output, *except* a `Convert` with exactly one input whose sole
/// producer is a constant, which counts as a constant and is skipped.
pub fn is_operational(node: &dyn ModelNode, nodes: &BTreeMap<OpId, Rc<dyn ModelNode>>) -> bool {
    match node.category() {
        NodeCategory::Constant | NodeCategory::Parameter | NodeCategory::Output => false,
        NodeCategory::Convert => {
            let Some(sole_input) = node.inputs().first() else {
                return true;
            };
            if node.inputs().len() != 1 {
                return true;
            }
            match nodes.get(&sole_input.producer) {
                Some(producer) => producer.category() != NodeCategory::Constant,
                None => true,
            }
        }
        NodeCategory::Operational => true,
    }
}
