//! Match records and the events that carry them.
//!
//! A match carries enough identity (repository, revision, path, commit) to
//! be deduplicated and merged across backends; everything else is payload.
//! Events are transient: produced by leaf jobs, transformed by decorator
//! streams, never persisted.

use serde::Serialize;

use crate::stats::Stats;

pub type RepoId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RepoRef {
    pub id: RepoId,
    pub name: String,
}

impl RepoRef {
    pub fn new(id: RepoId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// One matched line within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LineMatch {
    pub line: u32,
    pub offset: u32,
    pub length: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMatch {
    pub repo: RepoRef,
    pub rev: Option<String>,
    pub path: String,
    pub lines: Vec<LineMatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoMatch {
    pub repo: RepoRef,
    pub rev: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitMatch {
    pub repo: RepoRef,
    pub commit: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolMatch {
    pub repo: RepoRef,
    pub rev: Option<String>,
    pub path: String,
    pub name: String,
    pub kind: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Match {
    File(FileMatch),
    Repo(RepoMatch),
    Commit(CommitMatch),
    Symbol(SymbolMatch),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchKind {
    File,
    Repo,
    Commit,
    Symbol,
}

/// Identity used for dedup and merge. Two matches with equal keys refer to
/// the same logical result even when reported by different backends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchKey {
    pub kind: MatchKind,
    pub repo: RepoId,
    pub rev: Option<String>,
    pub path: Option<String>,
    pub commit: Option<String>,
}

impl Match {
    pub fn repo(&self) -> &RepoRef {
        match self {
            Self::File(m) => &m.repo,
            Self::Repo(m) => &m.repo,
            Self::Commit(m) => &m.repo,
            Self::Symbol(m) => &m.repo,
        }
    }

    pub fn key(&self) -> MatchKey {
        match self {
            Self::File(m) => MatchKey {
                kind: MatchKind::File,
                repo: m.repo.id,
                rev: m.rev.clone(),
                path: Some(m.path.clone()),
                commit: None,
            },
            Self::Repo(m) => MatchKey {
                kind: MatchKind::Repo,
                repo: m.repo.id,
                rev: m.rev.clone(),
                path: None,
                commit: None,
            },
            Self::Commit(m) => MatchKey {
                kind: MatchKind::Commit,
                repo: m.repo.id,
                rev: None,
                path: None,
                commit: Some(m.commit.clone()),
            },
            Self::Symbol(m) => MatchKey {
                kind: MatchKind::Symbol,
                repo: m.repo.id,
                rev: m.rev.clone(),
                path: Some(m.path.clone()),
                commit: None,
            },
        }
    }

    /// How many results this match counts for against limits. A file match
    /// counts one per matched line; a file with no line data still counts
    /// one.
    pub fn result_count(&self) -> usize {
        match self {
            Self::File(m) => m.lines.len().max(1),
            _ => 1,
        }
    }

    /// Merges `other` into `self`. Only meaningful when the keys are equal;
    /// file matches union their line matches, other kinds are already whole.
    pub fn merge(&mut self, other: Match) {
        if let (Self::File(mine), Self::File(theirs)) = (&mut *self, other) {
            mine.lines.extend(theirs.lines);
            mine.lines.sort_unstable();
            mine.lines.dedup();
        }
    }

    /// Truncates this match to at most `quota` results and returns how many
    /// it now counts for.
    pub fn limit(&mut self, quota: usize) -> usize {
        match self {
            Self::File(m) => {
                if m.lines.len() > quota {
                    m.lines.truncate(quota.max(1));
                }
                m.lines.len().max(1)
            }
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchEvent {
    pub results: Vec<Match>,
    pub stats: Stats,
}

impl SearchEvent {
    pub fn from_results(results: Vec<Match>) -> Self {
        Self {
            results,
            stats: Stats::default(),
        }
    }

    pub fn from_stats(stats: Stats) -> Self {
        Self {
            results: Vec::new(),
            stats,
        }
    }
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::test_support::file_match;
    use super::test_support::repo_match;
    use super::*;

    #[test]
    fn keys_identify_logical_results() {
        assert_eq!(
            file_match(1, "a.rs", &[1]).key(),
            file_match(1, "a.rs", &[99]).key()
        );
        assert_ne!(
            file_match(1, "a.rs", &[1]).key(),
            file_match(1, "b.rs", &[1]).key()
        );
        assert_ne!(file_match(1, "a.rs", &[1]).key(), repo_match(1).key());
    }

    #[test]
    fn merge_unions_file_lines() {
        let mut left = file_match(1, "a.rs", &[3, 1]);
        left.merge(file_match(1, "a.rs", &[2, 3]));
        let Match::File(file) = left else {
            panic!("expected a file match");
        };
        let lines: Vec<u32> = file.lines.iter().map(|l| l.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn result_counts() {
        assert_eq!(file_match(1, "a.rs", &[1, 2, 3]).result_count(), 3);
        assert_eq!(file_match(1, "a.rs", &[]).result_count(), 1);
        assert_eq!(repo_match(1).result_count(), 1);
    }

    #[test]
    fn limit_truncates_file_lines() {
        let mut m = file_match(1, "a.rs", &[1, 2, 3, 4]);
        assert_eq!(m.limit(2), 2);
        assert_eq!(m.result_count(), 2);
        assert_eq!(repo_match(1).limit(5), 1);
    }
}
