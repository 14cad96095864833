//! Fakes shared by the job and combinator tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use quarry_backend::BackendQuery;

use crate::alert::Alert;
use crate::clients::CommitRequest;
use crate::clients::CommitSearcher;
use crate::clients::IndexedRequest;
use crate::clients::IndexedSearcher;
use crate::clients::RepoQuery;
use crate::clients::RepoStore;
use crate::clients::RuntimeClients;
use crate::clients::TextPatternInfo;
use crate::clients::UnindexedSearcher;
use crate::error::BackendError;
use crate::error::Result;
use crate::error::SearchError;
use crate::job::ExecContext;
use crate::job::Job;
use crate::result::Match;
use crate::result::SearchEvent;
use crate::stream::Sender;
use crate::sync::lock;

/// A job that waits `delay`, emits one event, and finishes. Observes scope
/// cancellation during the wait and between sends.
#[derive(Debug, Default)]
pub(crate) struct StubJob {
    pub matches: Vec<Match>,
    pub delay: Duration,
    pub limit_hit: bool,
    pub fail: bool,
}

impl StubJob {
    pub fn emitting(matches: Vec<Match>) -> Box<dyn Job> {
        Box::new(Self {
            matches,
            ..Self::default()
        })
    }

    pub fn emitting_after(matches: Vec<Match>, delay: Duration) -> Box<dyn Job> {
        Box::new(Self {
            matches,
            delay,
            ..Self::default()
        })
    }

    pub fn limit_hit() -> Box<dyn Job> {
        Box::new(Self {
            limit_hit: true,
            ..Self::default()
        })
    }

    pub fn failing() -> Box<dyn Job> {
        Box::new(Self {
            fail: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl Job for StubJob {
    fn name(&self) -> &'static str {
        "Stub"
    }

    async fn run(
        &self,
        cx: &ExecContext,
        _clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        if !self.delay.is_zero() {
            tokio::select! {
                () = cx.cancelled() => return Err(cx.cancellation_error()),
                () = tokio::time::sleep(self.delay) => {}
            }
        }
        let mut event = SearchEvent::from_results(self.matches.clone());
        event.stats.is_limit_hit = self.limit_hit;
        sender.send(event);
        if self.fail {
            return Err(SearchError::Backend(BackendError::Request(
                "stub failure".to_string(),
            )));
        }
        Ok(None)
    }
}

/// Emits matches one event at a time, yielding and checking cancellation
/// between sends, so limit cutoffs can be exercised.
#[derive(Debug)]
pub(crate) struct RepeatJob {
    pub matches: Vec<Match>,
}

#[async_trait]
impl Job for RepeatJob {
    fn name(&self) -> &'static str {
        "Repeat"
    }

    async fn run(
        &self,
        cx: &ExecContext,
        _clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        for m in &self.matches {
            if cx.is_cancelled() {
                return Err(cx.cancellation_error());
            }
            sender.send(SearchEvent::from_results(vec![m.clone()]));
            tokio::task::yield_now().await;
        }
        Ok(None)
    }
}

struct StubIndexed {
    outcome: Mutex<Option<std::result::Result<Vec<Match>, BackendError>>>,
}

#[async_trait]
impl IndexedSearcher for StubIndexed {
    async fn search(
        &self,
        _request: &IndexedRequest,
        sender: &dyn Sender,
    ) -> std::result::Result<(), BackendError> {
        let outcome = lock(&self.outcome).take();
        match outcome {
            Some(Ok(results)) => {
                sender.send(SearchEvent::from_results(results));
                Ok(())
            }
            Some(Err(err)) => Err(err),
            None => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

struct PendingUnindexed;

#[async_trait]
impl UnindexedSearcher for PendingUnindexed {
    async fn search(
        &self,
        _request: &TextPatternInfo,
        _sender: &dyn Sender,
    ) -> std::result::Result<(), BackendError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

struct PendingRepos;

#[async_trait]
impl RepoStore for PendingRepos {
    async fn list(
        &self,
        _query: &RepoQuery,
        _sender: &dyn Sender,
    ) -> std::result::Result<(), BackendError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

struct PendingCommits;

#[async_trait]
impl CommitSearcher for PendingCommits {
    async fn search(
        &self,
        _request: &CommitRequest,
        _sender: &dyn Sender,
    ) -> std::result::Result<(), BackendError> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Clients whose backends never complete. For tests that exercise the job
/// tree with stub jobs, or cancellation of a pending leaf.
pub(crate) fn stub_clients() -> RuntimeClients {
    RuntimeClients {
        indexed: Arc::new(StubIndexed {
            outcome: Mutex::new(None),
        }),
        unindexed: Arc::new(PendingUnindexed),
        repos: Arc::new(PendingRepos),
        commits: Arc::new(PendingCommits),
    }
}

/// Clients whose indexed backend yields `outcome` once; the other backends
/// never complete.
pub(crate) fn clients_with_indexed(
    outcome: std::result::Result<Vec<Match>, BackendError>,
) -> RuntimeClients {
    RuntimeClients {
        indexed: Arc::new(StubIndexed {
            outcome: Mutex::new(Some(outcome)),
        }),
        unindexed: Arc::new(PendingUnindexed),
        repos: Arc::new(PendingRepos),
        commits: Arc::new(PendingCommits),
    }
}

pub(crate) fn indexed_request() -> IndexedRequest {
    IndexedRequest {
        query: BackendQuery::Substring {
            pattern: "needle".to_string(),
            case_sensitive: false,
            content: true,
            file_name: false,
        },
        max_results: 30,
    }
}
