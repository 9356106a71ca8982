//! Repeated-block discovery, part one: `identifyUniques` and `mergeUniques`
//! -- the heart of the algorithm.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::error::PartitionError;
use crate::group::Group;
use crate::ids::GroupId;
use crate::mic::{compute_mic, Mic};
use crate::op::MetaDescriptor;
use crate::repeated::{Repeated, TouchedThisSweep};
use crate::snapshot::{OpIndex, Snapshot};

type CompositeKey = (Vec<MetaDescriptor>, Vec<String>, Vec<String>);

fn composite_key(g: &Group, op_index: &OpIndex) -> CompositeKey {
    let descriptors: BTreeMap<_, _> = g.content.iter().map(|&op| (op, op_index.meta(op))).collect();
    (
        g.meta_multiset(&descriptors),
        g.avoided_devices.iter().cloned().collect(),
        g.special_tags.clone(),
    )
}

/// Compute `(meta_desc multiset, avoided_devices, special_tags)` for every
/// Group; every bucket with >= 2 members gets a fresh [`Repeated`] token
/// stamped onto each member. Runs exactly once.
pub fn identify_uniques(snapshot: &mut Snapshot) {
    let mut buckets: BTreeMap<CompositeKey, Vec<GroupId>> = BTreeMap::new();
    for g in snapshot.dag.groups.values() {
        buckets
            .entry(composite_key(g, &snapshot.op_index))
            .or_default()
            .push(g.id);
    }
    for ids in buckets.into_values() {
        if ids.len() < 2 {
            continue;
        }
        let token = snapshot.registry.allocate("repeat");
        for id in ids {
            snapshot.dag.groups.get_mut(&id).unwrap().repeat_tag = Some(token.clone());
        }
    }
}

/// Iterate topologically; for each Group with an open token, grow its
/// whole cohort via [`try_grow_repeating_groups`]; repeat sweeps until no
/// token grows in a full sweep.
pub fn merge_uniques(snapshot: &mut Snapshot) -> Result<()> {
    loop {
        let mut grew_any = false;
        let mut touched = TouchedThisSweep::new();
        let order = snapshot.dag.topological_order();
        for g in order {
            let Some(group) = snapshot.dag.groups.get(&g) else {
                continue;
            };
            let Some(t) = group.repeat_tag.clone() else {
                continue;
            };
            if !t.open_for_merge() || touched.contains(&t) {
                continue;
            }
            let cohort: Vec<GroupId> = snapshot
                .dag
                .groups
                .values()
                .filter(|gr| gr.repeat_tag.as_ref() == Some(&t))
                .map(|gr| gr.id)
                .collect();
            match try_grow_repeating_groups(snapshot, &cohort, &t)? {
                Some(new_token) => {
                    touched.mark(&new_token);
                    grew_any = true;
                }
                None => t.exclude(),
            }
        }
        if !grew_any {
            break;
        }
    }
    Ok(())
}

/// The heart of the algorithm: given a cohort all sharing token `t`,
/// look for producers belonging to a *different* open token
/// that bound uniformly into every instance, and grow the cohort by
/// merging them in.
pub fn try_grow_repeating_groups(
    snapshot: &mut Snapshot,
    cohort: &[GroupId],
    t: &Repeated,
) -> Result<Option<Repeated>> {
    let mut sorted_cohort = cohort.to_vec();
    sorted_cohort.sort_by(|a, b| b.cmp(a)); // descending by id

    let cohort_avoids = sorted_cohort
        .first()
        .map(|g| snapshot.dag.groups[g].avoided_devices.clone())
        .unwrap_or_default();
    let cohort_tags = sorted_cohort
        .first()
        .map(|g| snapshot.dag.groups[g].special_tags.clone())
        .unwrap_or_default();

    let mut buckets: BTreeMap<Mic, Vec<(GroupId, GroupId)>> = BTreeMap::new();
    for &g in &sorted_cohort {
        let producers: Vec<GroupId> = snapshot.dag.producers(g).collect();
        for p in producers {
            let pg = &snapshot.dag.groups[&p];
            let Some(p_token) = pg.repeat_tag.as_ref() else {
                continue;
            };
            if p_token == t {
                continue;
            }
            if !p_token.open_for_merge() {
                continue;
            }
            if snapshot.dag.would_cycle(p, g) {
                continue;
            }
            if pg.avoided_devices != cohort_avoids || pg.special_tags != cohort_tags {
                continue;
            }
            let mic = compute_mic(&snapshot.op_index, pg, &snapshot.dag.groups[&g]);
            buckets.entry(mic).or_default().push((p, g));
        }
    }

    // Outer sort: descending by bucket size, then descending by the first
    // (highest-id) producer's id -- candidates inside each bucket are
    // already populated in descending-cohort order, so `first()` is the
    // bucket's max producer id.
    let mut bucket_list: Vec<(Mic, Vec<(GroupId, GroupId)>)> = buckets.into_iter().collect();
    bucket_list.sort_by(|(_, a), (_, b)| {
        b.len()
            .cmp(&a.len())
            .then_with(|| b.first().map(|p| p.0).cmp(&a.first().map(|p| p.0)))
    });

    for (_, pairs) in bucket_list {
        let prods: Vec<GroupId> = pairs.iter().map(|&(p, _)| p).collect();
        let conss: Vec<GroupId> = pairs.iter().map(|&(_, c)| c).collect();
        if let Some(new_token) = try_merge_repeating(snapshot, &prods, &conss)? {
            return Ok(Some(new_token));
        }
    }

    Ok(None)
}

/// Accepts two equal-length lists. Fails (returns `Ok(None)`) on fewer
/// than 2 pairs, or if `prods` contains a repeated group (a triangle
/// shape, left for [`crate::passes::triangles`]). Fatal if any producer
/// equals any consumer. Otherwise merges each `prods[i]` into `conss[i]`
/// and stamps every survivor with a fresh token.
pub fn try_merge_repeating(
    snapshot: &mut Snapshot,
    prods: &[GroupId],
    conss: &[GroupId],
) -> Result<Option<Repeated>> {
    if prods.len() < 2 {
        return Ok(None);
    }
    let distinct: std::collections::BTreeSet<_> = prods.iter().collect();
    if distinct.len() < conss.len() {
        return Ok(None);
    }
    for (&p, &c) in prods.iter().zip(conss.iter()) {
        if p == c {
            return Err(PartitionError::ProducerConsumerOverlap { group: p }.into());
        }
    }

    for (&p, &c) in prods.iter().zip(conss.iter()) {
        snapshot.dag.merge_groups(c, p, "mergeUniques");
    }

    let new_token = snapshot.registry.allocate("repeat");
    for &c in conss {
        if snapshot.dag.producers(c).any(|pp| pp == c) {
            return Err(PartitionError::SelfProducingGroup { group: c }.into());
        }
        snapshot.dag.groups.get_mut(&c).unwrap().repeat_tag = Some(new_token.clone());
    }

    Ok(Some(new_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PassContext;
    use crate::testing::fixtures::FakeModel;

    /// Scenario S3: two disjoint chains A1->B1->C1 and A2->B2->C2 with
    /// matching meta-descs, min_graph_size=1, keep_blocks=2,
    /// keep_block_size=1 -- one repeat class of two groups.
    #[test]
    fn s3_disjoint_matching_chains_form_one_repeat_class() {
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
        assert_eq!(snap.dag.groups.len(), 2, "each chain should collapse to one group");

        identify_uniques(&mut snap);
        merge_uniques(&mut snap).unwrap();

        let tokens: std::collections::BTreeSet<_> = snap
            .dag
            .groups
            .values()
            .filter_map(|g| g.repeat_tag.as_ref().map(Repeated::name))
            .collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(snap.dag.groups.len(), 2);
    }
}
