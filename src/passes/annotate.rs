//! `earlyAvoids` / `earlyRegroup`: apply user directives by
//! invoking the external pattern matcher, before any merge runs so that
//! matching against initial single-node groups is unambiguous.

use crate::config::AvoidKind;
use crate::op::SourceModel;
use crate::pattern::PatternRewriter;
use crate::snapshot::Snapshot;

/// For every `AVOID` directive: `OP` directives match by the *initial*
/// OpNode's description; `PATTERN` directives enqueue the external
/// rewriter. Unknown pattern names are warned and skipped.
pub fn early_avoids(snapshot: &mut Snapshot, model: &dyn SourceModel, rewriter: &dyn PatternRewriter) {
    let avoids = snapshot.config.avoids.clone();
    for directive in &avoids {
        match directive.kind {
            AvoidKind::Op => {
                let matches: Vec<_> = snapshot
                    .dag
                    .groups
                    .values()
                    .filter(|g| {
                        g.content.len() == 1
                            && g.content.iter().next().is_some_and(|&op| {
                                snapshot.op_index.node(op).description() == directive.pattern
                            })
                    })
                    .map(|g| g.id)
                    .collect();
                for gid in matches {
                    snapshot
                        .dag
                        .groups
                        .get_mut(&gid)
                        .unwrap()
                        .avoided_devices
                        .insert(directive.device.clone());
                }
            }
            AvoidKind::Pattern => match rewriter.apply(&directive.pattern, model) {
                Some(matched_ops) => {
                    for op in matched_ops {
                        if let Some(gid) = snapshot.op_index.group_of(op) {
                            snapshot
                                .dag
                                .groups
                                .get_mut(&gid)
                                .unwrap()
                                .avoided_devices
                                .insert(directive.device.clone());
                        }
                    }
                }
                None => {
                    log::warn!(
                        "earlyAvoids: unknown PATTERN directive {:?}, skipping",
                        directive.pattern
                    );
                }
            },
        }
    }
}

/// For every `ISOLATE` directive: enqueue the matching pattern rewriter;
/// matched nodes mark their Groups with `isolated_tag := tag`.
pub fn early_regroup(snapshot: &mut Snapshot, model: &dyn SourceModel, rewriter: &dyn PatternRewriter) {
    let isolates = snapshot.config.isolates.clone();
    for directive in &isolates {
        match rewriter.apply(&directive.pattern, model) {
            Some(matched_ops) => {
                for op in matched_ops {
                    if let Some(gid) = snapshot.op_index.group_of(op) {
                        snapshot.dag.groups.get_mut(&gid).unwrap().isolated_tag =
                            Some(directive.tag.clone());
                    }
                }
            }
            None => {
                log::warn!(
                    "earlyRegroup: unknown ISOLATE pattern {:?}, skipping",
                    directive.pattern
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AvoidDirective, IsolateDirective, PassContext};
    use crate::pattern::NoopPatternRewriter;
    use crate::testing::fixtures::FakeModel;

    #[test]
    fn avoid_op_tags_matching_initial_groups() {
        let mut m = FakeModel::new();
        let a = m.op("MatMul");
        let _b = m.op("Relu");
        let mut ctx = PassContext::default();
        ctx.avoids.push(AvoidDirective {
            kind: AvoidKind::Op,
            pattern: "MatMul".into(),
            device: "NPU".into(),
        });
        let mut snap = Snapshot::build(&m, ctx);
        early_avoids(&mut snap, &m, &NoopPatternRewriter);
        let gid = snap.op_index.group_of(a).unwrap();
        assert!(snap.dag.groups[&gid].avoided_devices.contains("NPU"));
    }

    #[test]
    fn unknown_pattern_is_warned_and_skipped() {
        let m = FakeModel::new();
        let mut ctx = PassContext::default();
        ctx.isolates.push(IsolateDirective {
            pattern: "TotallyUnknown".into(),
            tag: "x".into(),
        });
        let mut snap = Snapshot::build(&m, ctx);
        // Should not panic; the directive is simply skipped.
        early_regroup(&mut snap, &m, &NoopPatternRewriter);
    }
}
