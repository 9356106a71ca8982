//! `mergeTriangles` / `tryMergeTriangles`: the companion to `mergeUniques`
//! for the shape `mergeUniques` rejects --
//! one repeat-instance producer (the apex) feeding several consumers
//! (the bases) of the *same* token.
//!
//! Runs exactly once, after `mergeUniques` has reached its fixed point
//! (unlike `mergeUniques`, this is not itself iterated to a fixed point).

use std::collections::BTreeMap;

use anyhow::Result;

use crate::error::PartitionError;
use crate::ids::GroupId;
use crate::mic::{compute_mic, Mic};
use crate::repeated::{Repeated, TouchedThisSweep};
use crate::snapshot::Snapshot;

pub fn merge_triangles(snapshot: &mut Snapshot) -> Result<()> {
    let mut touched = TouchedThisSweep::new();
    let order = snapshot.dag.topological_order();
    for g in order {
        let Some(group) = snapshot.dag.groups.get(&g) else {
            continue;
        };
        if group.frozen {
            continue;
        }
        let Some(t) = group.repeat_tag.clone() else {
            continue;
        };
        if touched.contains(&t) {
            continue;
        }
        touched.mark(&t);
        let cohort: Vec<GroupId> = snapshot
            .dag
            .groups
            .values()
            .filter(|gr| gr.repeat_tag.as_ref() == Some(&t))
            .map(|gr| gr.id)
            .collect();
        try_merge_triangles_for_cohort(snapshot, &cohort, &t)?;
    }
    Ok(())
}

fn try_merge_triangles_for_cohort(snapshot: &mut Snapshot, cohort: &[GroupId], t: &Repeated) -> Result<()> {
    let mut sorted_cohort = cohort.to_vec();
    sorted_cohort.sort_by(|a, b| b.cmp(a));

    let mut buckets: BTreeMap<Mic, BTreeMap<GroupId, Vec<GroupId>>> = BTreeMap::new();
    for &g in &sorted_cohort {
        let g_group = &snapshot.dag.groups[&g];
        let consumers: Vec<GroupId> = snapshot.dag.consumers(g).collect();
        for c in consumers {
            let c_group = &snapshot.dag.groups[&c];
            let Some(c_token) = c_group.repeat_tag.as_ref() else {
                continue;
            };
            if c_token == t {
                continue;
            }
            if c_group.avoided_devices != g_group.avoided_devices || c_group.special_tags != g_group.special_tags {
                continue;
            }
            let mic = compute_mic(&snapshot.op_index, g_group, c_group);
            buckets.entry(mic).or_default().entry(g).or_default().push(c);
        }
    }

    let mut bucket_list: Vec<(Mic, BTreeMap<GroupId, Vec<GroupId>>)> = buckets.into_iter().collect();
    bucket_list.sort_by(|(_, a), (_, b)| {
        let max_a = a.keys().next_back().copied();
        let max_b = b.keys().next_back().copied();
        b.len().cmp(&a.len()).then_with(|| max_b.cmp(&max_a))
    });

    for (_, apex_map) in bucket_list {
        let apexes: Vec<GroupId> = apex_map.keys().rev().copied().collect();
        let bases: Vec<Vec<GroupId>> = apexes
            .iter()
            .map(|a| {
                let mut bs = apex_map[a].clone();
                bs.sort();
                bs
            })
            .collect();
        try_merge_triangles(snapshot, &apexes, &bases)?;
    }

    Ok(())
}

/// `apexes`/`bases` aligned by index. Fatal if lengths differ; `Ok(None)`
/// if fewer than 2 apexes, if the per-apex base lists are not all the
/// same length, or if any base is not a "leaf triangle edge" (exactly one
/// consumer and one producer). Otherwise distinguishes base position via
/// a second-order MIC (base -> base's sole consumer) and, for each
/// distinct second-order key, merges every base under that key into its
/// recorded apex and retags the apex with a fresh token.
pub fn try_merge_triangles(
    snapshot: &mut Snapshot,
    apexes: &[GroupId],
    bases: &[Vec<GroupId>],
) -> Result<Option<Repeated>> {
    if apexes.len() != bases.len() {
        return Err(PartitionError::ApexBaseCountMismatch {
            apexes: apexes.len(),
            bases: bases.len(),
        }
        .into());
    }
    if apexes.len() < 2 {
        return Ok(None);
    }
    let expected_len = bases[0].len();
    if bases.iter().any(|b| b.len() != expected_len) {
        return Ok(None);
    }
    for bs in bases {
        for &b in bs {
            if snapshot.dag.consumer_count(b) != 1 || snapshot.dag.producer_count(b) != 1 {
                return Ok(None);
            }
        }
    }

    let mut apex_of: BTreeMap<GroupId, GroupId> = BTreeMap::new();
    for (&apex, bs) in apexes.iter().zip(bases.iter()) {
        for &b in bs {
            apex_of.insert(b, apex);
        }
    }

    let mut by_second_order: BTreeMap<Mic, Vec<GroupId>> = BTreeMap::new();
    for bs in bases {
        for &b in bs {
            let consumer = snapshot.dag.consumers(b).next().expect("leaf-triangle-edge checked above");
            let mic = compute_mic(&snapshot.op_index, &snapshot.dag.groups[&b], &snapshot.dag.groups[&consumer]);
            by_second_order.entry(mic).or_default().push(b);
        }
    }

    if by_second_order.len() != expected_len {
        return Err(PartitionError::SecondOrderKeyCountMismatch {
            distinct: by_second_order.len(),
            expected: expected_len,
        }
        .into());
    }

    let mut last_token = None;
    for bs_under_key in by_second_order.into_values() {
        let new_token = snapshot.registry.allocate("triangle");
        let mut bs_sorted = bs_under_key;
        bs_sorted.sort();
        for b in &bs_sorted {
            let apex = apex_of[b];
            snapshot.dag.merge_groups(apex, *b, "mergeTriangles");
        }
        let mut apexes_in_key: Vec<GroupId> = bs_sorted.iter().map(|b| apex_of[b]).collect();
        apexes_in_key.sort();
        apexes_in_key.dedup();
        for apex in apexes_in_key {
            if let Some(group) = snapshot.dag.groups.get_mut(&apex) {
                group.repeat_tag = Some(new_token.clone());
            }
        }
        last_token = Some(new_token);
    }

    Ok(last_token)
}
