//! Per-repository status ledger.
//!
//! Backends report conditions attributable to a single repository (still
//! cloning, missing, hit the result limit, timed out) instead of failing a
//! whole search. Those conditions accumulate here as a compact bit-set per
//! repository, with a running union of all bits for fast any/all queries.

use std::collections::HashMap;
use std::fmt;

use crate::error::RepoErrorKind;
use crate::result::RepoId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RepoStatus(u8);

impl RepoStatus {
    pub const EMPTY: Self = Self(0);
    pub const CLONING: Self = Self(1 << 0);
    pub const MISSING: Self = Self(1 << 1);
    pub const LIMIT_HIT: Self = Self(1 << 2);
    pub const TIMED_OUT: Self = Self(1 << 3);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True if any bit of `mask` is set.
    pub const fn intersects(self, mask: Self) -> bool {
        self.0 & mask.0 != 0
    }

    /// True if every bit of `mask` is set.
    pub const fn contains(self, mask: Self) -> bool {
        self.0 & mask.0 == mask.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl From<RepoErrorKind> for RepoStatus {
    fn from(kind: RepoErrorKind) -> Self {
        match kind {
            RepoErrorKind::Cloning => Self::CLONING,
            RepoErrorKind::Missing => Self::MISSING,
            RepoErrorKind::TimedOut => Self::TIMED_OUT,
            RepoErrorKind::LimitHit => Self::LIMIT_HIT,
        }
    }
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.intersects(Self::CLONING) {
            names.push("cloning");
        }
        if self.intersects(Self::MISSING) {
            names.push("missing");
        }
        if self.intersects(Self::LIMIT_HIT) {
            names.push("limit-hit");
        }
        if self.intersects(Self::TIMED_OUT) {
            names.push("timed-out");
        }
        f.write_str(&names.join("|"))
    }
}

/// Repository ID to status bits, plus a running union of every status seen.
/// Mutated only through [`RepoStatusMap::update`] and
/// [`RepoStatusMap::union`]; `get` on an absent key returns the zero status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoStatusMap {
    entries: HashMap<RepoId, RepoStatus>,
    all: RepoStatus,
}

impl RepoStatusMap {
    pub fn update(&mut self, repo: RepoId, status: RepoStatus) {
        let entry = self.entries.entry(repo).or_default();
        *entry = entry.union(status);
        self.all = self.all.union(status);
    }

    /// Equivalent to replaying every update of `other` into `self`.
    pub fn union(&mut self, other: &RepoStatusMap) {
        for (&repo, &status) in &other.entries {
            self.update(repo, status);
        }
    }

    pub fn get(&self, repo: RepoId) -> RepoStatus {
        self.entries.get(&repo).copied().unwrap_or_default()
    }

    pub fn iterate(&self, mut f: impl FnMut(RepoId, RepoStatus)) {
        for (&repo, &status) in &self.entries {
            f(repo, status);
        }
    }

    /// Invokes `f` for each repository whose status intersects `mask`.
    pub fn filter(&self, mask: RepoStatus, mut f: impl FnMut(RepoId)) {
        for (&repo, &status) in &self.entries {
            if status.intersects(mask) {
                f(repo);
            }
        }
    }

    /// True if any entry's status intersects `mask`.
    pub fn any(&self, mask: RepoStatus) -> bool {
        self.all.intersects(mask)
    }

    /// True iff the map is non-empty and every entry's status is a
    /// superset of `mask`.
    pub fn all(&self, mask: RepoStatus) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        self.entries.values().all(|status| status.contains(mask))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
