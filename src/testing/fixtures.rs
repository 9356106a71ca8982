//! `FakeModel`: an in-memory [`SourceModel`] builder for hand-constructed
//! test graphs (chains, forks, diamonds, repeated branches, triangles),
//! plus `TestPatternRewriter`, a [`PatternRewriter`] test double that can
//! be told up front which ops a given pattern name should match.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ids::OpId;
use crate::op::{BasicNode, ElemType, InputPort, MetaDescriptor, ModelNode, NodeCategory, PortMeta, SourceModel};
use crate::pattern::PatternRewriter;

fn default_port() -> PortMeta {
    PortMeta {
        elem_type: ElemType::F32,
        shape: Vec::new(),
    }
}

/// An in-memory graph builder. Nodes are appended in the order they are
/// created, so callers must build producers before their consumers --
/// the same contract `nodes_topological` promises downstream.
pub struct FakeModel {
    nodes: Vec<Rc<BasicNode>>,
    next_id: u64,
}

impl FakeModel {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            next_id: 0,
        }
    }

    fn push(&mut self, desc: impl Into<String>, inputs: Vec<InputPort>, category: NodeCategory) -> OpId {
        let id = OpId::new(self.next_id);
        self.next_id += 1;
        let desc = desc.into();
        let meta = MetaDescriptor {
            kind: desc.clone(),
            inputs: vec![default_port(); inputs.len()],
            outputs: vec![default_port()],
        };
        let node = Rc::new(BasicNode::new(id, desc, inputs, vec![Vec::new()], meta, category));
        self.nodes.push(node);
        id
    }

    /// An operational node with no inputs (a graph source).
    pub fn op(&mut self, desc: impl Into<String>) -> OpId {
        self.push(desc, Vec::new(), NodeCategory::Operational)
    }

    /// An operational node consuming `producers[i]`'s sole output on port `i`.
    pub fn op_with_inputs(&mut self, desc: impl Into<String>, producers: &[OpId]) -> OpId {
        let inputs = producers
            .iter()
            .map(|&p| InputPort {
                producer: p,
                producer_port: 0,
            })
            .collect();
        self.push(desc, inputs, NodeCategory::Operational)
    }

    /// A constant node (always non-operational).
    pub fn constant(&mut self, desc: impl Into<String>) -> OpId {
        self.push(desc, Vec::new(), NodeCategory::Constant)
    }

    /// A `Convert` node with a single input from `producer` -- skipped by
    /// `isOp` only when `producer` is itself a `Constant`.
    pub fn convert_of(&mut self, producer: OpId) -> OpId {
        self.push(
            "Convert",
            vec![InputPort {
                producer,
                producer_port: 0,
            }],
            NodeCategory::Convert,
        )
    }
}

impl Default for FakeModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceModel for FakeModel {
    fn nodes_topological(&self) -> Vec<Rc<dyn ModelNode>> {
        self.nodes.iter().map(|n| Rc::clone(n) as Rc<dyn ModelNode>).collect()
    }
}

/// A [`PatternRewriter`] test double preloaded with fixed answers: given a
/// pattern name upfront, return that fixed set of matched `OpId`s (or
/// `None` to simulate an unrecognized pattern name).
pub struct TestPatternRewriter {
    answers: BTreeMap<String, std::collections::BTreeSet<OpId>>,
}

impl TestPatternRewriter {
    pub fn new() -> Self {
        Self {
            answers: BTreeMap::new(),
        }
    }

    pub fn with_match(mut self, pattern: impl Into<String>, matched: impl IntoIterator<Item = OpId>) -> Self {
        self.answers.insert(pattern.into(), matched.into_iter().collect());
        self
    }
}

impl Default for TestPatternRewriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternRewriter for TestPatternRewriter {
    fn apply(&self, name: &str, _model: &dyn SourceModel) -> Option<std::collections::BTreeSet<OpId>> {
        self.answers.get(name).cloned()
    }
}
