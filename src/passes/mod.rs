//! The pass pipeline: an ordered, restartable sequence of rewrite passes
//! over the Group DAG.

pub mod annotate;
pub mod cleanup;
pub mod lhf;
pub mod remnants;
pub mod repeats;
pub mod triangles;

use anyhow::Result;

use crate::op::SourceModel;
use crate::pattern::PatternRewriter;
use crate::snapshot::Snapshot;

/// Run `pass` repeatedly to a fixed point, with one very specific quirk
/// preserved deliberately: the `min_graph_size` gate is checked *before*
/// `pass` runs on every iteration, including the first, so a graph that
/// already starts at or below `min` never runs `pass` even once.
pub fn repeat_until_fixed<F>(dag: &mut crate::group::GroupDag, min: usize, mut pass: F)
where
    F: FnMut(&mut crate::group::GroupDag),
{
    let mut prev: Option<usize> = None;
    loop {
        let curr = dag.groups.len();
        if curr <= min {
            break;
        }
        if prev == Some(curr) {
            break;
        }
        prev = Some(curr);
        pass(dag);
    }
}

/// Run the full pipeline in order: build (already done by
/// [`Snapshot::build`]) -> early annotation -> structural merges ->
/// repeated-block discovery -> (export is the caller's job).
pub fn run_pipeline(
    snapshot: &mut Snapshot,
    model: &dyn SourceModel,
    rewriter: &dyn PatternRewriter,
) -> Result<()> {
    annotate::early_avoids(snapshot, model, rewriter);
    annotate::early_regroup(snapshot, model, rewriter);

    let min = snapshot.config.min_graph_size;
    lhf::collect_lhf(&mut snapshot.dag, min);
    remnants::fuse_remnants_extended(&mut snapshot.dag, min);

    repeats::identify_uniques(snapshot);
    repeats::merge_uniques(snapshot)?;
    triangles::merge_triangles(snapshot)?;
    cleanup::clean_up_uniques(snapshot)?;

    snapshot.op_index.rebuild_group_index(&snapshot.dag);

    Ok(())
}
