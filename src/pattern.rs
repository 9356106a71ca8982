//! The external operation-pattern-matcher collaborator.
//!
//! Matching patterns like `RMSNorm` or `SwishMultXMM` against the host
//! graph is explicitly out of scope for this crate -- the core only
//! invokes a rewriter and consumes its side effects (which `OpId`s
//! matched). This module defines the seam, not the matching logic.

use std::collections::BTreeSet;

use crate::ids::OpId;
use crate::op::SourceModel;

/// Names the core currently knows how to route to a rewriter at all --
/// currently only `RMSNorm`. Anything else is warned and skipped by the
/// annotation passes.
pub const SUPPORTED_PATTERNS: &[&str] = &["RMSNorm"];

/// A callable pattern rewriter: given a pattern name, return the set of
/// `OpId`s it matched in `model`, or `None` if the name is not recognized.
///
/// `Some(empty set)` is a legitimate "recognized, matched nothing" result
/// and is distinct from `None` ("never heard of this pattern").
pub trait PatternRewriter {
    fn apply(&self, name: &str, model: &dyn SourceModel) -> Option<BTreeSet<OpId>>;
}

/// A rewriter that recognizes every name in [`SUPPORTED_PATTERNS`] but
/// matches nothing. A legitimate default given pattern matching itself is
/// an external collaborator's responsibility, not this crate's.
pub struct NoopPatternRewriter;

impl PatternRewriter for NoopPatternRewriter {
    fn apply(&self, name: &str, _model: &dyn SourceModel) -> Option<BTreeSet<OpId>> {
        if SUPPORTED_PATTERNS.contains(&name) {
            Some(BTreeSet::new())
        } else {
            None
        }
    }
}
