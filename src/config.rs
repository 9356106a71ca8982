//! `PassContext`: the core's only configuration input.
//!
//! A plain, `serde`-(de)serializable settings struct: the core never
//! reads a config file itself, it just accepts this struct from whatever
//! caller-side loader assembled it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Kind of an `AVOID` directive target.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvoidKind {
    /// Match by exact operation-kind string (the initial node's
    /// `description()`).
    Op,
    /// Match via the external pattern rewriter (only `RMSNorm` is
    /// currently supported; anything else is a skipped warning).
    Pattern,
}

/// `AVOID <kind>=<pattern> device=<device>` directive.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct AvoidDirective {
    pub kind: AvoidKind,
    pub pattern: String,
    pub device: String,
}

/// `ISOLATE <pattern> tag=<tag>` directive.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct IsolateDirective {
    pub pattern: String,
    pub tag: String,
}

/// The full set of caller-tunable knobs for one partitioning run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PassContext {
    /// Target lower bound on Group count; structural passes stop merging
    /// once reached.
    pub min_graph_size: usize,
    /// Minimum cohort size to retain a repeat class that has no special
    /// flags.
    pub keep_blocks: usize,
    /// Minimum per-Group content size to retain such a repeat class.
    pub keep_block_size: usize,
    pub avoids: Vec<AvoidDirective>,
    pub isolates: Vec<IsolateDirective>,
    pub nofolds: Vec<String>,
    /// Tensor axes along which downstream parallel-matmul fusion is
    /// allowed; stored opaquely, never read by this crate.
    pub pmm_dims: BTreeSet<i64>,
}

impl Default for PassContext {
    fn default() -> Self {
        Self {
            min_graph_size: 1,
            keep_blocks: 2,
            keep_block_size: 1,
            avoids: Vec::new(),
            isolates: Vec::new(),
            nofolds: Vec::new(),
            pmm_dims: BTreeSet::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_min_graph_size_is_one() {
        assert_eq!(PassContext::default().min_graph_size, 1);
    }

    #[test]
    fn round_trips_through_json() {
        let mut ctx = PassContext::default();
        ctx.avoids.push(AvoidDirective {
            kind: AvoidKind::Op,
            pattern: "MatMul".into(),
            device: "NPU".into(),
        });
        let json = serde_json::to_string(&ctx).unwrap();
        let back: PassContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back.avoids.len(), 1);
        assert_eq!(back.avoids[0].device, "NPU");
    }
}
