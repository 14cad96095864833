//! Result quota enforcement.
//!
//! Wraps the child's sender in a limit stream and runs the child in its own
//! cancellation scope. When the quota is reached the stream cancels that
//! scope with a limit-hit reason, so the resulting cancellation error from
//! the child is benign and swallowed here.

use async_trait::async_trait;

use crate::alert::Alert;
use crate::clients::RuntimeClients;
use crate::error::CancelReason;
use crate::error::Result;
use crate::job::ExecContext;
use crate::job::Job;
use crate::stream::LimitStream;
use crate::stream::Sender;

#[derive(Debug)]
pub struct LimitJob {
    limit: usize,
    child: Box<dyn Job>,
}

impl LimitJob {
    pub fn new(limit: usize, child: Box<dyn Job>) -> Box<dyn Job> {
        if limit == usize::MAX {
            return child;
        }
        Box::new(Self { limit, child })
    }
}

#[async_trait]
impl Job for LimitJob {
    fn name(&self) -> &'static str {
        "Limit"
    }

    fn children(&self) -> Vec<&dyn Job> {
        vec![self.child.as_ref()]
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        let scope = cx.child_scope();
        let handle = scope.cancel_handle();
        let limited = LimitStream::new(
            self.limit,
            sender,
            Box::new(move || handle.cancel(CancelReason::LimitHit)),
        );
        match self.child.run(&scope, clients, &limited).await {
            Err(err) if err.is_benign_cancel() => Ok(None),
            outcome => outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::result::test_support::repo_match;
    use crate::stream::AggregatingStream;
    use crate::testing::RepeatJob;
    use crate::testing::stub_clients;

    #[tokio::test]
    async fn forwards_exactly_the_quota_and_stops_the_child() {
        let job = LimitJob::new(
            5,
            Box::new(RepeatJob {
                matches: (0..20).map(repo_match).collect(),
            }),
        );
        let agg = AggregatingStream::new();
        let alert = job
            .run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        assert_eq!(alert, None, "limit-hit cancellation is benign");
        let event = agg.take();
        assert_eq!(event.results.len(), 5);
        assert!(event.stats.is_limit_hit);
    }

    #[tokio::test]
    async fn under_quota_output_is_untouched() {
        let job = LimitJob::new(
            10,
            Box::new(RepeatJob {
                matches: (0..3).map(repo_match).collect(),
            }),
        );
        let agg = AggregatingStream::new();
        job.run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        let event = agg.take();
        assert_eq!(event.results.len(), 3);
        assert!(!event.stats.is_limit_hit);
    }

    #[tokio::test]
    async fn a_zero_quota_stops_the_child_without_forwarding() {
        let job = LimitJob::new(
            0,
            Box::new(RepeatJob {
                matches: (0..20).map(repo_match).collect(),
            }),
        );
        let agg = AggregatingStream::new();
        let alert = job
            .run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        assert_eq!(alert, None);
        let event = agg.take();
        assert!(event.results.is_empty());
        assert!(event.stats.is_limit_hit);
    }

    #[test]
    fn an_unbounded_limit_collapses_to_the_child() {
        let job = LimitJob::new(
            usize::MAX,
            Box::new(RepeatJob {
                matches: Vec::new(),
            }),
        );
        assert_eq!(job.name(), "Repeat");
    }
}
