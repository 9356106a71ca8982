//! Shared identity token linking groups that are structural repeats of each
//! other.
//!
//! Distinct tokens compare unequal by identity; multiple `Group`s reference
//! the same token by cloning the handle (an `Rc`, since the core is
//! single-threaded and synchronous -- no `Arc<Mutex<_>>` is needed).
//! Token *contents* are never embedded in a `Group`; only identity
//! comparison matters until `cleanUpUniques` populates the archetype table.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ids::{GroupId, OpId};

/// One archetype position's friendly-name set: one name per repeat
/// instance, keyed by which group in the cohort it came from.
pub type ArchetypeEntry = BTreeMap<GroupId, String>;

struct RepeatedInner {
    /// Human-readable id used downstream as `repeated_id(t)`.
    name: String,
    open_for_merge: bool,
    /// Populated only at `cleanUpUniques` time, one entry per archetype
    /// position (i.e. per op in a single instance of the repeat).
    archetype: Vec<ArchetypeEntry>,
}

/// A shared repeat-class handle. Cheap to clone (`Rc` bump); compares by
/// pointer identity.
#[derive(Clone)]
pub struct Repeated(Rc<RefCell<RepeatedInner>>);

impl Repeated {
    /// Allocate a fresh, distinct token.
    pub fn fresh(name: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(RepeatedInner {
            name: name.into(),
            open_for_merge: true,
            archetype: Vec::new(),
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn open_for_merge(&self) -> bool {
        self.0.borrow().open_for_merge
    }

    /// Mark this cohort as exhausted: it cannot grow further.
    pub fn exclude(&self) {
        self.0.borrow_mut().open_for_merge = false;
    }

    pub fn set_archetype(&self, archetype: Vec<ArchetypeEntry>) {
        self.0.borrow_mut().archetype = archetype;
    }

    pub fn archetype(&self) -> Vec<ArchetypeEntry> {
        self.0.borrow().archetype.clone()
    }

    /// Friendly-name sets for downstream consumption (the exported
    /// `matches` table): one `Vec<String>` per archetype position, one
    /// name per instance,
    /// instances ordered by `GroupId` for determinism.
    pub fn friendly_name_sets(&self) -> Vec<Vec<String>> {
        self.0
            .borrow()
            .archetype
            .iter()
            .map(|entry| entry.values().cloned().collect())
            .collect()
    }
}

impl PartialEq for Repeated {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Repeated {}

/// Tracks, per pass sweep, which tokens have already been attempted --
/// `mergeUniques`/`mergeTriangles` both need "skip further attempts on a
/// token until the next sweep" bookkeeping that is not a property of the
/// token itself.
pub struct TouchedThisSweep {
    touched: Vec<*const ()>,
}

impl TouchedThisSweep {
    pub fn new() -> Self {
        Self { touched: Vec::new() }
    }

    pub fn mark(&mut self, t: &Repeated) {
        self.touched.push(Rc::as_ptr(&t.0) as *const ());
    }

    pub fn contains(&self, t: &Repeated) -> bool {
        let p = Rc::as_ptr(&t.0) as *const ();
        self.touched.contains(&p)
    }
}

impl Default for TouchedThisSweep {
    fn default() -> Self {
        Self::new()
    }
}

/// An op's archetype path: a breadcrumb trail of pass-specific markers
/// recording how it was fused in, used only by `completeRepeating` to
/// distinguish archetype positions across repeat instances. Treated as
/// an opaque, equatable value everywhere else.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Reptrack(pub Vec<String>);

impl Reptrack {
    pub fn push(&mut self, marker: &str) {
        self.0.push(marker.to_string());
    }
}

/// Per-op reptrack storage for one group: every `OpId` in `content` maps to
/// its archetype path.
pub type ReptrackMap = BTreeMap<OpId, Reptrack>;
