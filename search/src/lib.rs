//! Concurrent, streaming execution of search plans.
//!
//! [`builder`] turns a [`quarry_query::Plan`] into a tree of [`job::Job`]s:
//! leaf jobs that call backends and combinator jobs that intersect, union,
//! limit, and deadline their children. Results stream through [`stream::Sender`]
//! decorators as they are produced; nothing is held for the end of the
//! search except what merging semantics strictly require.

pub mod alert;
pub mod batching;
pub mod builder;
pub mod clients;
pub mod combinators;
pub mod error;
pub mod job;
pub mod leaf;
pub mod limits;
pub mod repo_status;
pub mod result;
pub mod stats;
pub mod stream;

pub(crate) mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use alert::Alert;
pub use alert::AlertObserver;
pub use alert::ProposedQuery;
pub use batching::BatchingStream;
pub use builder::SearchInputs;
pub use builder::new_basic_job;
pub use builder::new_plan_job;
pub use clients::CommitRequest;
pub use clients::CommitSearcher;
pub use clients::IndexedRequest;
pub use clients::IndexedSearcher;
pub use clients::RepoQuery;
pub use clients::RepoStore;
pub use clients::RuntimeClients;
pub use clients::TextPatternInfo;
pub use clients::UnindexedSearcher;
pub use combinators::AndJob;
pub use combinators::LimitJob;
pub use combinators::NoopJob;
pub use combinators::OrJob;
pub use combinators::ParallelJob;
pub use combinators::RequiredAndOptionalJob;
pub use combinators::TimeoutJob;
pub use error::BackendError;
pub use error::CancelReason;
pub use error::RepoErrorKind;
pub use error::Result;
pub use error::SearchError;
pub use job::CancelHandle;
pub use job::ExecContext;
pub use job::Job;
pub use leaf::CommitSearchJob;
pub use leaf::IndexedSearchJob;
pub use leaf::RepoSearchJob;
pub use leaf::UnindexedSearchJob;
pub use repo_status::RepoStatus;
pub use repo_status::RepoStatusMap;
pub use result::CommitMatch;
pub use result::FileMatch;
pub use result::LineMatch;
pub use result::Match;
pub use result::MatchKey;
pub use result::MatchKind;
pub use result::RepoId;
pub use result::RepoMatch;
pub use result::RepoRef;
pub use result::SearchEvent;
pub use result::SymbolMatch;
pub use stats::Stats;
pub use stream::AggregatingStream;
pub use stream::CallbackSender;
pub use stream::DedupingStream;
pub use stream::LimitStream;
pub use stream::ResultCountingStream;
pub use stream::Sender;
pub use stream::StatsObservingStream;
