//! Fatal, programmer/invariant-level errors.
//!
//! These signal a bug in the core or corrupted input, never a user mistake.
//! Everything recoverable (cycle avoidance, frozen groups, an undersized
//! cohort) is a silent local skip instead and never reaches this type.

use crate::ids::GroupId;

#[derive(thiserror::Error, Debug)]
pub enum PartitionError {
    #[error(
        "tryMergeRepeating: producer {group} also appears as a consumer in the same candidate set"
    )]
    ProducerConsumerOverlap { group: GroupId },

    #[error(
        "tryMergeRepeating: merged group {group} is its own producer after the merge (sanity check failed)"
    )]
    SelfProducingGroup { group: GroupId },

    #[error(
        "tryMergeTriangles: apex count {apexes} does not match base-list count {bases}"
    )]
    ApexBaseCountMismatch { apexes: usize, bases: usize },

    #[error(
        "tryMergeTriangles: second-order MIC produced {distinct} distinct keys, expected {expected} (one per base position)"
    )]
    SecondOrderKeyCountMismatch { distinct: usize, expected: usize },

    #[error(
        "completeRepeating: archetype key occurred {observed} times, expected exactly {expected} (one per cohort member)"
    )]
    ArchetypeCountMismatch { observed: usize, expected: usize },

    #[error(
        "completeRepeating: {distinct} distinct archetype keys, expected {expected} (the content size of every group in the cohort)"
    )]
    ArchetypeKeyCountMismatch { distinct: usize, expected: usize },

    #[error("Group DAG invariant {name} violated: {detail}")]
    Invariant { name: &'static str, detail: String },
}
