//! Lightweight identifiers used throughout the Group DAG and the operation index.
//!
//! Both ids are small, `Copy`, totally ordered, and hashable, so they can be
//! used as `BTreeMap`/`BTreeSet` keys without extra indirection. Ordering by
//! id is how several passes get a deterministic tiebreak "for free."

use std::fmt;

/// Identity of one source-model operation node.
///
/// Assigned by whatever builds the [`crate::op::SourceModel`] the core
/// consumes; the core never manufactures one, only reads it back.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct OpId(u64);

impl OpId {
    /// Wrap a raw numeric id. Used by `SourceModel` implementations.
    pub fn new(v: u64) -> Self {
        Self(v)
    }

    /// The underlying numeric value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op#{}", self.0)
    }
}

/// Identity of one [`crate::group::Group`] in the Group DAG.
///
/// Assigned monotonically at build time and preserved across merges by
/// convention: the surviving `Group` of a merge keeps its id. Used only for
/// deterministic tiebreaking, never for anything semantic.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct GroupId(u64);

impl GroupId {
    pub(crate) fn new(v: u64) -> Self {
        Self(v)
    }

    /// The underlying numeric value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "group#{}", self.0)
    }
}
