//! Online partitioning core for a neural-network compiler backend.
//!
//! Given a frozen computation graph (anything implementing
//! [`op::SourceModel`]), groups its operation nodes into connected
//! subgraphs and identifies groups that are structural repeats of each
//! other, respecting data dependencies, user directives, and a minimum
//! group-count floor, deterministically.
//!
//! The core does not load the source model, match operation patterns
//! against the host graph, or build downstream subgraphs/functions --
//! those are the caller's responsibility, addressed through the
//! [`op::SourceModel`]/[`op::ModelNode`]/[`pattern::PatternRewriter`]
//! seams. It is also not a cost model or a scheduler: it only decides
//! how to group and which groups repeat.

pub mod config;
pub mod error;
pub mod export;
pub mod group;
pub mod ids;
pub mod mic;
pub mod op;
pub mod passes;
pub mod pattern;
pub mod repeated;
pub mod snapshot;
pub mod testing;

pub use config::{AvoidDirective, AvoidKind, IsolateDirective, PassContext};
pub use error::PartitionError;
pub use export::{export, GroupExport, PartitioningOutput};
pub use group::{Group, GroupDag};
pub use ids::{GroupId, OpId};
pub use op::{BasicNode, InputPort, ModelNode, NodeCategory, OutputConsumer, SourceModel};
pub use passes::run_pipeline;
pub use pattern::{NoopPatternRewriter, PatternRewriter};
pub use repeated::Repeated;
pub use snapshot::Snapshot;
