//! Search-wide statistics.
//!
//! `update` is a commutative, associative merge with `Stats::default()` as
//! the zero value. That makes accumulation safe under concurrent, unordered
//! delivery: every decorator and combinator merges upward with `update` and
//! the result is independent of arrival order.

use std::collections::HashSet;

use crate::repo_status::RepoStatusMap;
use crate::result::RepoId;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats {
    pub is_limit_hit: bool,
    pub repos: HashSet<RepoId>,
    pub status: RepoStatusMap,
    pub backends_missing: usize,
    pub excluded_forks: usize,
    pub excluded_archived: usize,
}

impl Stats {
    pub fn update(&mut self, other: &Stats) {
        self.is_limit_hit |= other.is_limit_hit;
        self.repos.extend(other.repos.iter().copied());
        self.status.union(&other.status);
        self.backends_missing += other.backends_missing;
        self.excluded_forks += other.excluded_forks;
        self.excluded_archived += other.excluded_archived;
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}
