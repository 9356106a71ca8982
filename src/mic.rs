//! Meta-Interconnect (MIC): the canonical key for deciding whether two
//! group-to-group edges "look the same" at the port-metadata level.

use crate::group::Group;
use crate::op::PortMeta;
use crate::snapshot::OpIndex;

/// A sorted sequence of `(src_port_meta, dst_port_meta)` pairs, one per
/// OpNode-level edge crossing the two groups' boundary. Sorted so that
/// equality is a plain lexicographic comparison.
pub type Mic = Vec<(PortMeta, PortMeta)>;

/// Compute the MIC of the edge from `a` to `b`: every OpNode-level edge
/// whose producer is in `a.content` and whose consumer is in `b.content`.
pub fn compute_mic(op_index: &OpIndex, a: &Group, b: &Group) -> Mic {
    let mut pairs: Mic = Vec::new();
    for &src in &a.content {
        for &dst in op_index.consumers_of(src) {
            if !b.content.contains(&dst) {
                continue;
            }
            let src_meta = op_index.meta(src);
            let dst_meta = op_index.meta(dst);
            for &(src_port, dst_port) in op_index.ports_between(src, dst) {
                pairs.push((
                    src_meta.outputs.get(src_port as usize).cloned().unwrap_or(PortMeta {
                        elem_type: crate::op::ElemType::Other("?".into()),
                        shape: Vec::new(),
                    }),
                    dst_meta.inputs.get(dst_port as usize).cloned().unwrap_or(PortMeta {
                        elem_type: crate::op::ElemType::Other("?".into()),
                        shape: Vec::new(),
                    }),
                ));
            }
        }
    }
    pairs.sort();
    pairs
}
