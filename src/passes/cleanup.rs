//! `cleanUpUniques` / `completeRepeating` / `afterUniques`: decide which
//! repeat classes survive, populate their archetype tables,
//! and apply the `nofolds` directive.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::error::PartitionError;
use crate::ids::GroupId;
use crate::op::MetaDescriptor;
use crate::repeated::{ArchetypeEntry, Repeated, Reptrack};
use crate::snapshot::Snapshot;

pub fn clean_up_uniques(snapshot: &mut Snapshot) -> Result<()> {
    let tokens: Vec<Repeated> = snapshot.registry.all().cloned().collect();
    for t in &tokens {
        let members: Vec<GroupId> = snapshot
            .dag
            .groups
            .values()
            .filter(|g| g.repeat_tag.as_ref() == Some(t))
            .map(|g| g.id)
            .collect();
        if members.is_empty() {
            continue;
        }

        let has_flag = members.iter().any(|gid| {
            let g = &snapshot.dag.groups[gid];
            !g.avoided_devices.is_empty() || g.no_fold
        });
        let meets_size = members.len() >= snapshot.config.keep_blocks
            && members
                .iter()
                .all(|gid| snapshot.dag.groups[gid].size() >= snapshot.config.keep_block_size);

        if has_flag || meets_size {
            for gid in &members {
                snapshot.dag.groups.get_mut(gid).unwrap().frozen = true;
            }
            complete_repeating(snapshot, &members, t)?;
        } else {
            for gid in &members {
                snapshot.dag.groups.get_mut(gid).unwrap().repeat_tag = None;
            }
        }
    }
    after_uniques(snapshot);
    Ok(())
}

/// Build, for each OpNode in each member Group, the composite key
/// `(node_meta_desc, reptrack)`, inverse-index into a layer-matches
/// table. Every key must occur exactly `members.len()` times; the number
/// of distinct keys must equal the content size shared by every member.
fn complete_repeating(snapshot: &mut Snapshot, members: &[GroupId], t: &Repeated) -> Result<()> {
    let expected_count = members.len();
    let mut keyed: BTreeMap<(MetaDescriptor, Reptrack), ArchetypeEntry> = BTreeMap::new();

    for &gid in members {
        let group = &snapshot.dag.groups[&gid];
        for &op in &group.content {
            let meta = snapshot.op_index.meta(op);
            let reptrack = group.reptrack.get(&op).cloned().unwrap_or_default();
            let name = snapshot.op_index.node(op).description().to_string();
            keyed.entry((meta, reptrack)).or_default().insert(gid, name);
        }
    }

    for entry in keyed.values() {
        if entry.len() != expected_count {
            return Err(PartitionError::ArchetypeCountMismatch {
                observed: entry.len(),
                expected: expected_count,
            }
            .into());
        }
    }

    let expected_size = snapshot.dag.groups[&members[0]].size();
    if keyed.len() != expected_size {
        return Err(PartitionError::ArchetypeKeyCountMismatch {
            distinct: keyed.len(),
            expected: expected_size,
        }
        .into());
    }

    let archetype: Vec<ArchetypeEntry> = keyed.into_values().collect();
    t.set_archetype(archetype);
    Ok(())
}

/// For every Group whose `isolated_tag` is listed in the `nofolds`
/// directive, set `no_fold := true`.
fn after_uniques(snapshot: &mut Snapshot) {
    let nofolds = &snapshot.config.nofolds;
    for group in snapshot.dag.groups.values_mut() {
        if let Some(tag) = &group.isolated_tag {
            if nofolds.iter().any(|n| n == tag) {
                group.no_fold = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PassContext;
    use crate::testing::fixtures::FakeModel;

    /// Scenario S3 continued: two disjoint matching chains, kept because
    /// `keep_blocks=2` and `keep_block_size=1`; archetype has 3 positions.
    #[test]
    fn s3_kept_repeat_class_gets_a_three_position_archetype() {
        let mut m = FakeModel::new();
        let a1 = m.op("A");
        let b1 = m.op_with_inputs("B", &[a1]);
        let _c1 = m.op_with_inputs("C", &[b1]);
        let a2 = m.op("A");
        let b2 = m.op_with_inputs("B", &[a2]);
        let _c2 = m.op_with_inputs("C", &[b2]);

        let mut ctx = PassContext::default();
        ctx.min_graph_size = 1;
        ctx.keep_blocks = 2;
        ctx.keep_block_size = 1;
        let mut snap = Snapshot::build(&m, ctx);
        crate::passes::lhf::collect_lhf(&mut snap.dag, 1);
        crate::passes::remnants::fuse_remnants_extended(&mut snap.dag, 1);
        crate::passes::repeats::identify_uniques(&mut snap);
        crate::passes::repeats::merge_uniques(&mut snap).unwrap();

        clean_up_uniques(&mut snap).unwrap();

        let kept: Vec<_> = snap.dag.groups.values().filter(|g| g.repeat_tag.is_some()).collect();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|g| g.frozen));
        let token = kept[0].repeat_tag.clone().unwrap();
        assert_eq!(token.archetype().len(), 3);
    }

    /// Scenario S6: repeat class of 2 groups with `keep_blocks=3` is
    /// dropped; group structure is retained but `repeat_tag` is cleared.
    #[test]
    fn s6_repeat_class_dropped_when_below_keep_blocks() {
        let mut m = FakeModel::new();
        let a1 = m.op("A");
        let a2 = m.op("A");
        let _ = (a1, a2);

        let mut ctx = PassContext::default();
        ctx.keep_blocks = 3;
        let mut snap = Snapshot::build(&m, ctx);
        crate::passes::repeats::identify_uniques(&mut snap);
        crate::passes::repeats::merge_uniques(&mut snap).unwrap();
        assert_eq!(snap.dag.groups.len(), 2);

        clean_up_uniques(&mut snap).unwrap();

        assert_eq!(snap.dag.groups.len(), 2, "group structure retained");
        assert!(snap.dag.groups.values().all(|g| g.repeat_tag.is_none()));
    }

    /// Scenario S5: an `AVOID OP` directive on one instance forces the
    /// whole repeat class to be kept even below `keep_blocks`.
    #[test]
    fn s5_avoided_group_forces_keep_below_threshold() {
        let mut m = FakeModel::new();
        let a1 = m.op("A");
        let a2 = m.op("A");

        let mut ctx = PassContext::default();
        ctx.keep_blocks = 10;
        let mut snap = Snapshot::build(&m, ctx);
        crate::passes::repeats::identify_uniques(&mut snap);
        crate::passes::repeats::merge_uniques(&mut snap).unwrap();
        let gid = snap.op_index.group_of(a1).unwrap();
        snap.dag.groups.get_mut(&gid).unwrap().avoided_devices.insert("NPU".into());
        let _ = a2;

        clean_up_uniques(&mut snap).unwrap();

        assert!(snap.dag.groups.values().all(|g| g.repeat_tag.is_some() && g.frozen));
    }
}
