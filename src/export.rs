//! Export surface consumed by downstream collaborators.
//!
//! `PartitioningOutput` bundles the Group DAG, `node_to_group`,
//! `node_to_prod_cons`, `ports_map` and `matches`. The
//! `to_json_pretty`/`write_json_file` pair is a debugging/inspection
//! convenience, not part of the partitioning algorithm itself.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::repeated::Repeated;
use crate::snapshot::Snapshot;

#[derive(Serialize, Debug)]
pub struct GroupExport {
    pub id: u64,
    pub content: Vec<u64>,
    pub frozen: bool,
    pub no_fold: bool,
    pub avoided_devices: Vec<String>,
    pub isolated_tag: Option<String>,
    pub special_tags: Vec<String>,
    pub repeat_tag: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct PartitioningOutput {
    pub groups: Vec<GroupExport>,
    pub edges: Vec<(u64, u64)>,
    pub node_to_group: BTreeMap<u64, u64>,
    pub node_to_prod_cons: BTreeMap<u64, (Vec<u64>, Vec<u64>)>,
    pub ports_map: Vec<((u64, u64), Vec<(u32, u32)>)>,
    /// Repeat-id string -> one friendly-name set per archetype position.
    pub matches: BTreeMap<String, Vec<Vec<String>>>,
}

impl PartitioningOutput {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }
}

pub fn export(snapshot: &Snapshot) -> PartitioningOutput {
    let groups = snapshot
        .dag
        .groups
        .values()
        .map(|g| GroupExport {
            id: g.id.raw(),
            content: g.content.iter().map(|o| o.raw()).collect(),
            frozen: g.frozen,
            no_fold: g.no_fold,
            avoided_devices: g.avoided_devices.iter().cloned().collect(),
            isolated_tag: g.isolated_tag.clone(),
            special_tags: g.special_tags.clone(),
            repeat_tag: g.repeat_tag.as_ref().map(Repeated::name),
        })
        .collect();

    let edges = snapshot
        .dag
        .edges()
        .into_iter()
        .map(|(a, b)| (a.raw(), b.raw()))
        .collect();

    // Derived straight from the Group DAG's current content rather than
    // `op_index.node_to_group()`, so this is correct even if a caller
    // exports mid-pipeline without having synced the index.
    let node_to_group = snapshot
        .dag
        .groups
        .values()
        .flat_map(|g| g.content.iter().map(move |&op| (op.raw(), g.id.raw())))
        .collect();

    let node_to_prod_cons = snapshot
        .op_index
        .node_to_prod_cons()
        .into_iter()
        .map(|(op, (prods, conss))| {
            (
                op.raw(),
                (
                    prods.into_iter().map(|o| o.raw()).collect(),
                    conss.into_iter().map(|o| o.raw()).collect(),
                ),
            )
        })
        .collect();

    let ports_map = snapshot
        .op_index
        .ports_map()
        .into_iter()
        .map(|((s, d), ports)| ((s.raw(), d.raw()), ports))
        .collect();

    // `registry.all()` holds every token ever allocated, including
    // superseded intermediate-growth tokens from `merge_uniques` and
    // tokens `clean_up_uniques` dropped; only a kept repeat class has a
    // populated archetype (`complete_repeating` is the only caller of
    // `set_archetype`), so that's the filter for "is this still a real
    // repeat class".
    let matches = snapshot
        .registry
        .all()
        .filter(|t| !t.archetype().is_empty())
        .map(|t| (t.name(), t.friendly_name_sets()))
        .collect();

    PartitioningOutput {
        groups,
        edges,
        node_to_group,
        node_to_prod_cons,
        ports_map,
        matches,
    }
}
