//! Leaf jobs: the points where the job tree touches a backend.
//!
//! Each leaf races its backend call against scope cancellation. Backend
//! conditions attributable to a single repository never fail the job; they
//! are folded into status bits and streamed as a stats-only event so the
//! rest of the search keeps going.

use async_trait::async_trait;
use tracing::debug;
use tracing::warn;

use crate::alert::Alert;
use crate::clients::CommitRequest;
use crate::clients::IndexedRequest;
use crate::clients::RepoQuery;
use crate::clients::RuntimeClients;
use crate::clients::TextPatternInfo;
use crate::error::BackendError;
use crate::error::RepoErrorKind;
use crate::error::Result;
use crate::error::SearchError;
use crate::job::ExecContext;
use crate::job::Job;
use crate::repo_status::RepoStatus;
use crate::result::SearchEvent;
use crate::stats::Stats;
use crate::stream::Sender;

/// Text or symbol search against the indexed backend.
#[derive(Debug, Clone)]
pub struct IndexedSearchJob {
    pub request: IndexedRequest,
}

#[async_trait]
impl Job for IndexedSearchJob {
    fn name(&self) -> &'static str {
        "IndexedSearch"
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        debug!(query = %self.request.query, "indexed search");
        tokio::select! {
            () = cx.cancelled() => Err(cx.cancellation_error()),
            outcome = clients.indexed.search(&self.request, sender) => {
                absorb_repo_error(outcome, sender)
            }
        }
    }
}

/// Text search against the unindexed backend.
#[derive(Debug, Clone)]
pub struct UnindexedSearchJob {
    pub request: TextPatternInfo,
}

#[async_trait]
impl Job for UnindexedSearchJob {
    fn name(&self) -> &'static str {
        "UnindexedSearch"
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        debug!(limit = self.request.limit, "unindexed search");
        tokio::select! {
            () = cx.cancelled() => Err(cx.cancellation_error()),
            outcome = clients.unindexed.search(&self.request, sender) => {
                absorb_repo_error(outcome, sender)
            }
        }
    }
}

/// Repository listing via the repo store.
#[derive(Debug, Clone)]
pub struct RepoSearchJob {
    pub query: RepoQuery,
}

#[async_trait]
impl Job for RepoSearchJob {
    fn name(&self) -> &'static str {
        "RepoSearch"
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        debug!(
            include = self.query.include.len(),
            exclude = self.query.exclude.len(),
            "repo search"
        );
        tokio::select! {
            () = cx.cancelled() => Err(cx.cancellation_error()),
            outcome = clients.repos.list(&self.query, sender) => {
                absorb_repo_error(outcome, sender)
            }
        }
    }
}

/// Commit or diff search over source-control history.
#[derive(Debug, Clone)]
pub struct CommitSearchJob {
    pub request: CommitRequest,
}

#[async_trait]
impl Job for CommitSearchJob {
    fn name(&self) -> &'static str {
        "CommitSearch"
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        debug!(diff = self.request.diff, "commit search");
        tokio::select! {
            () = cx.cancelled() => Err(cx.cancellation_error()),
            outcome = clients.commits.search(&self.request, sender) => {
                absorb_repo_error(outcome, sender)
            }
        }
    }
}

/// Classifies a backend outcome. Per-repository conditions become status
/// bits on a stats-only event; everything else propagates as an error.
fn absorb_repo_error(
    outcome: std::result::Result<(), BackendError>,
    sender: &dyn Sender,
) -> Result<Option<Alert>> {
    match outcome {
        Ok(()) => Ok(None),
        Err(BackendError::Repo { id, kind }) => {
            warn!(repo = id, %kind, "repository skipped");
            let mut stats = Stats::default();
            stats.repos.insert(id);
            stats.status.update(id, RepoStatus::from(kind));
            if kind == RepoErrorKind::LimitHit {
                stats.is_limit_hit = true;
            }
            sender.send(SearchEvent::from_stats(stats));
            Ok(None)
        }
        Err(err) => Err(SearchError::Backend(err)),
    }
}
