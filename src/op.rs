//! The source-model collaborator seam.
//!
//! The core never constructs operation nodes itself; it consumes whatever
//! implements [`SourceModel`]/[`ModelNode`] -- a type-erased view over a
//! graph the core does not own the construction of.

use std::cell::{Ref, RefCell};

use crate::ids::OpId;

/// Element type of a tensor port. Only identity matters for structural
/// equality; the core never computes with these values.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize)]
pub enum ElemType {
    F16,
    BF16,
    F32,
    I8,
    I32,
    I64,
    Bool,
    Other(String),
}

/// Element type + shape of one tensor port, used as the atomic unit of
/// structural (meta-descriptor / MIC) comparison.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize)]
pub struct PortMeta {
    pub elem_type: ElemType,
    pub shape: Vec<i64>,
}

/// Captures element type and shape of every input/output port plus the
/// operation kind. Two ops with equal `MetaDescriptor`s are structurally
/// interchangeable as far as repeat discovery is concerned.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, serde::Serialize)]
pub struct MetaDescriptor {
    pub kind: String,
    pub inputs: Vec<PortMeta>,
    pub outputs: Vec<PortMeta>,
}

/// One input port: the op producing it, and that producer's output port
/// index.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InputPort {
    pub producer: OpId,
    pub producer_port: u32,
}

/// One consumer of an output port: the consuming op, and the port index on
/// that consumer's input list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct OutputConsumer {
    pub consumer: OpId,
    pub consumer_port: u32,
}

/// Where a node falls in the `isOp` predicate's classification.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeCategory {
    Constant,
    Parameter,
    Output,
    /// An elementwise type-conversion op; gets special-cased by `isOp`.
    Convert,
    Operational,
}

/// Side-effect tags the external pattern rewriter attaches to a node's
/// metadata. Written by `earlyAvoids`/`earlyRegroup` (via the rewriter),
/// read when the matched node's hosting `Group` is created or annotated.
#[derive(Clone, Default, Debug)]
pub struct NodeTags {
    pub avoided_devices: Vec<String>,
    pub isolated_tag: Option<String>,
}

/// One operation node as exposed by the source model.
///
/// Implementors are shared (`Rc<dyn ModelNode>`) because the same node is
/// referenced from the op index, from producer/consumer sets, and
/// (transiently) from the external pattern matcher. The tag channel is
/// interior-mutable because the writer (the rewriter) and the readers
/// (the annotation passes) do not otherwise share a mutable reference.
pub trait ModelNode {
    fn id(&self) -> OpId;
    fn description(&self) -> &str;
    fn inputs(&self) -> &[InputPort];
    /// Per output port, the list of consumers fed by it (the fan-out).
    fn outputs(&self) -> &[Vec<OutputConsumer>];
    fn meta(&self) -> &MetaDescriptor;
    fn category(&self) -> NodeCategory;
    fn tags(&self) -> Ref<'_, NodeTags>;
    fn tags_mut(&self) -> std::cell::RefMut<'_, NodeTags>;
}

/// A source model: a topologically-ordered sequence of [`ModelNode`]s.
///
/// The only contract the core relies on is that `nodes_topological` returns
/// every node before any of its consumers.
pub trait SourceModel {
    fn nodes_topological(&self) -> Vec<std::rc::Rc<dyn ModelNode>>;
}

/// A plain, owned implementation of [`ModelNode`] good enough for any
/// concrete source model adapter (and for the `testing` fixtures) to build
/// on without re-deriving the interior-mutable tag channel each time.
pub struct BasicNode {
    id: OpId,
    description: String,
    inputs: Vec<InputPort>,
    outputs: Vec<Vec<OutputConsumer>>,
    meta: MetaDescriptor,
    category: NodeCategory,
    tags: RefCell<NodeTags>,
}

impl BasicNode {
    pub fn new(
        id: OpId,
        description: impl Into<String>,
        inputs: Vec<InputPort>,
        outputs: Vec<Vec<OutputConsumer>>,
        meta: MetaDescriptor,
        category: NodeCategory,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            inputs,
            outputs,
            meta,
            category,
            tags: RefCell::new(NodeTags::default()),
        }
    }
}

impl ModelNode for BasicNode {
    fn id(&self) -> OpId {
        self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn inputs(&self) -> &[InputPort] {
        &self.inputs
    }

    fn outputs(&self) -> &[Vec<OutputConsumer>] {
        &self.outputs
    }

    fn meta(&self) -> &MetaDescriptor {
        &self.meta
    }

    fn category(&self) -> NodeCategory {
        self.category
    }

    fn tags(&self) -> Ref<'_, NodeTags> {
        self.tags.borrow()
    }

    fn tags_mut(&self) -> std::cell::RefMut<'_, NodeTags> {
        self.tags.borrow_mut()
    }
}
