//! The job execution boundary.
//!
//! `RuntimeClients` bundles the handles leaf jobs search against. The core
//! consumes these traits; collaborators implement them. A leaf job receives
//! the bundle plus a sender for the duration of one `run` call and must not
//! retain either.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use quarry_backend::BackendQuery;
use quarry_query::Node;
use quarry_query::RepoRevFilter;
use quarry_query::YesNoOnly;

use crate::error::BackendError;
use crate::stream::Sender;

#[derive(Clone)]
pub struct RuntimeClients {
    pub indexed: Arc<dyn IndexedSearcher>,
    pub unindexed: Arc<dyn UnindexedSearcher>,
    pub repos: Arc<dyn RepoStore>,
    pub commits: Arc<dyn CommitSearcher>,
}

impl fmt::Debug for RuntimeClients {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeClients").finish_non_exhaustive()
    }
}

/// Request against the indexed backend: a compiled query plus caller-owned
/// limits.
#[derive(Debug, Clone)]
pub struct IndexedRequest {
    pub query: BackendQuery,
    pub max_results: usize,
}

/// Request against the unindexed backend, which matches pattern trees
/// directly rather than compiled queries.
#[derive(Debug, Clone)]
pub struct TextPatternInfo {
    pub pattern: Option<Node>,
    pub case_sensitive: bool,
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    pub limit: usize,
    pub pattern_matches_content: bool,
    pub pattern_matches_path: bool,
}

/// Repository listing request: name filters plus repo-attribute filters.
#[derive(Debug, Clone, Default)]
pub struct RepoQuery {
    pub include: Vec<RepoRevFilter>,
    pub exclude: Vec<String>,
    pub fork: Option<YesNoOnly>,
    pub archived: Option<YesNoOnly>,
    pub limit: usize,
}

/// Commit-log search over source-control history. `diff` switches matching
/// from commit messages to changed content.
#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    pub pattern: Option<Node>,
    pub case_sensitive: bool,
    pub include: Vec<RepoRevFilter>,
    pub exclude: Vec<String>,
    pub diff: bool,
    pub limit: usize,
}

#[async_trait]
pub trait IndexedSearcher: Send + Sync {
    async fn search(
        &self,
        request: &IndexedRequest,
        sender: &dyn Sender,
    ) -> Result<(), BackendError>;
}

#[async_trait]
pub trait UnindexedSearcher: Send + Sync {
    async fn search(
        &self,
        request: &TextPatternInfo,
        sender: &dyn Sender,
    ) -> Result<(), BackendError>;
}

#[async_trait]
pub trait RepoStore: Send + Sync {
    async fn list(&self, query: &RepoQuery, sender: &dyn Sender) -> Result<(), BackendError>;
}

#[async_trait]
pub trait CommitSearcher: Send + Sync {
    async fn search(
        &self,
        request: &CommitRequest,
        sender: &dyn Sender,
    ) -> Result<(), BackendError>;
}
