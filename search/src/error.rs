//! Error taxonomy for search execution.
//!
//! Backend failures attributable to one repository are not errors at all at
//! this level; leaf jobs fold them into status bits. Everything else is a
//! [`SearchError`]. Cancellations carry a structured [`CancelReason`]:
//! cancellations the engine triggers on purpose (limit reached, optional
//! budget elapsed, deadline exceeded) are benign and filtered out of
//! aggregates so callers never see spurious errors for intentional early
//! termination.

use std::fmt;

use thiserror::Error;

use quarry_backend::CompileError;

use crate::result::RepoId;

/// Why a scope was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The result quota was reached; producers are expected to stop.
    LimitHit,
    /// The optional side of a required/optional pair outlived its grace
    /// budget.
    OptionalBudgetElapsed,
    /// A per-query deadline expired; partial results were delivered.
    DeadlineExceeded,
    /// The caller cancelled the whole search.
    Upstream,
}

impl CancelReason {
    /// Benign reasons come from the engine's own budget/limit mechanisms.
    pub fn is_benign(self) -> bool {
        matches!(
            self,
            Self::LimitHit | Self::OptionalBudgetElapsed | Self::DeadlineExceeded
        )
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LimitHit => "limit hit",
            Self::OptionalBudgetElapsed => "optional budget elapsed",
            Self::DeadlineExceeded => "deadline exceeded",
            Self::Upstream => "upstream",
        };
        f.write_str(name)
    }
}

/// A per-repository condition reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoErrorKind {
    Cloning,
    Missing,
    TimedOut,
    LimitHit,
}

impl fmt::Display for RepoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cloning => "cloning",
            Self::Missing => "missing",
            Self::TimedOut => "timed out",
            Self::LimitHit => "limit hit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    /// Attributable to a single repository; callers classify it into status
    /// bits instead of failing the search.
    #[error("repository {id}: {kind}")]
    Repo { id: RepoId, kind: RepoErrorKind },
    #[error("backend unreachable: {0}")]
    Unavailable(String),
    #[error("backend request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search canceled: {reason}")]
    Canceled { reason: CancelReason },
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("{}", render_aggregate(.0))]
    Aggregate(Vec<SearchError>),
}

impl SearchError {
    pub fn is_benign_cancel(&self) -> bool {
        matches!(self, Self::Canceled { reason } if reason.is_benign())
    }
}

fn render_aggregate(errors: &[SearchError]) -> String {
    let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
    format!("{} errors occurred: {}", errors.len(), rendered.join("; "))
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Collapses the errors collected from a set of children. Benign
/// cancellations are dropped; real errors are never swallowed.
pub fn aggregate(errors: Vec<SearchError>) -> Result<()> {
    let mut real = Vec::new();
    for error in errors {
        match error {
            e if e.is_benign_cancel() => {}
            SearchError::Aggregate(inner) => {
                for e in inner {
                    if !e.is_benign_cancel() {
                        real.push(e);
                    }
                }
            }
            e => real.push(e),
        }
    }
    match real.len() {
        0 => Ok(()),
        1 => Err(real.remove(0)),
        _ => Err(SearchError::Aggregate(real)),
    }
}
