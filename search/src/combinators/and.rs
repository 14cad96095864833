//! Streaming intersection.
//!
//! Children run concurrently under one fan-out scope and stream into a
//! shared merger keyed by match identity. A match is forwarded the moment
//! every child has reported it, merged across children, and never twice.
//! Matches some children never report stay buffered and are dropped when
//! the job ends.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use futures::future::join_all;

use crate::alert::Alert;
use crate::alert::AlertObserver;
use crate::clients::RuntimeClients;
use crate::error::Result;
use crate::error::SearchError;
use crate::error::aggregate;
use crate::job::ExecContext;
use crate::job::Job;
use crate::result::Match;
use crate::result::MatchKey;
use crate::result::SearchEvent;
use crate::stream::Sender;
use crate::sync::lock;

#[derive(Debug)]
pub struct AndJob {
    children: Vec<Box<dyn Job>>,
}

impl AndJob {
    /// Zero children collapse to a no-op, one child to itself.
    pub fn new(mut children: Vec<Box<dyn Job>>) -> Box<dyn Job> {
        match children.len() {
            0 => Box::new(super::NoopJob),
            1 => children.remove(0),
            _ => Box::new(Self { children }),
        }
    }
}

#[async_trait]
impl Job for AndJob {
    fn name(&self) -> &'static str {
        "And"
    }

    fn children(&self) -> Vec<&dyn Job> {
        self.children.iter().map(AsRef::as_ref).collect()
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        let scope = cx.fan_out_scope();
        let merger = IntersectMerger::new(self.children.len(), sender);
        let alerts = AlertObserver::default();

        let runs = self.children.iter().enumerate().map(|(index, child)| {
            let scope = &scope;
            let merger = &merger;
            let alerts = &alerts;
            async move {
                let _permit = scope.acquire().await?;
                let source = merger.source(index);
                let alert = child.run(scope, clients, &source).await?;
                alerts.observe(alert);
                Ok::<(), SearchError>(())
            }
        });
        let errors: Vec<SearchError> = join_all(runs)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();

        if merger.saw_limit_hit() && !merger.forwarded_any() {
            alerts.observe(Some(Alert::results_capped_by_and()));
        }
        aggregate(errors)?;
        Ok(alerts.take())
    }
}

struct Pending {
    seen: Vec<bool>,
    merged: Match,
}

/// Shared state behind the per-child senders of one AND run.
struct IntersectMerger<'a> {
    parent: &'a dyn Sender,
    sources: usize,
    state: Mutex<HashMap<MatchKey, Pending>>,
    forwarded: AtomicBool,
    limit_hit: AtomicBool,
}

impl<'a> IntersectMerger<'a> {
    fn new(sources: usize, parent: &'a dyn Sender) -> Self {
        Self {
            parent,
            sources,
            state: Mutex::new(HashMap::new()),
            forwarded: AtomicBool::new(false),
            limit_hit: AtomicBool::new(false),
        }
    }

    fn source(&self, index: usize) -> IntersectSource<'_, 'a> {
        IntersectSource {
            merger: self,
            index,
        }
    }

    fn forwarded_any(&self) -> bool {
        self.forwarded.load(Ordering::Relaxed)
    }

    fn saw_limit_hit(&self) -> bool {
        self.limit_hit.load(Ordering::Relaxed)
    }

    fn send_from(&self, index: usize, mut event: SearchEvent) {
        if event.stats.is_limit_hit {
            self.limit_hit.store(true, Ordering::Relaxed);
        }
        let mut ready = Vec::new();
        {
            let mut state = lock(&self.state);
            for m in event.results.drain(..) {
                let key = m.key();
                match state.get_mut(&key) {
                    Some(pending) => {
                        pending.seen[index] = true;
                        pending.merged.merge(m);
                        if pending.seen.iter().all(|&seen| seen) {
                            if let Some(complete) = state.remove(&key) {
                                ready.push(complete.merged);
                            }
                        }
                    }
                    None => {
                        let mut seen = vec![false; self.sources];
                        seen[index] = true;
                        state.insert(
                            key,
                            Pending {
                                seen,
                                merged: m,
                            },
                        );
                    }
                }
            }
        }
        if !ready.is_empty() {
            self.forwarded.store(true, Ordering::Relaxed);
        }
        event.results = ready;
        self.parent.send(event);
    }
}

struct IntersectSource<'m, 'a> {
    merger: &'m IntersectMerger<'a>,
    index: usize,
}

impl Sender for IntersectSource<'_, '_> {
    fn send(&self, event: SearchEvent) {
        self.merger.send_from(self.index, event);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::result::test_support::file_match;
    use crate::result::test_support::repo_match;
    use crate::stream::AggregatingStream;
    use crate::testing::StubJob;
    use crate::testing::stub_clients;

    #[tokio::test(start_paused = true)]
    async fn a_match_every_child_reports_is_forwarded_once() {
        let job = AndJob::new(vec![
            StubJob::emitting_after(vec![repo_match(1)], Duration::from_millis(10)),
            StubJob::emitting_after(vec![repo_match(1)], Duration::from_millis(10)),
            StubJob::emitting_after(vec![repo_match(1)], Duration::from_millis(10)),
        ]);
        let agg = AggregatingStream::new();
        let alert = job
            .run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        assert_eq!(alert, None);
        assert_eq!(agg.take().results, vec![repo_match(1)]);
    }

    #[tokio::test]
    async fn a_match_missing_from_one_child_is_dropped() {
        let job = AndJob::new(vec![
            StubJob::emitting(vec![repo_match(1), repo_match(2)]),
            StubJob::emitting(vec![repo_match(2)]),
        ]);
        let agg = AggregatingStream::new();
        job.run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        assert_eq!(agg.take().results, vec![repo_match(2)]);
    }

    #[tokio::test]
    async fn intersected_file_matches_merge_their_lines() {
        let job = AndJob::new(vec![
            StubJob::emitting(vec![file_match(1, "a.rs", &[1, 2])]),
            StubJob::emitting(vec![file_match(1, "a.rs", &[2, 3])]),
        ]);
        let agg = AggregatingStream::new();
        job.run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        assert_eq!(agg.take().results, vec![file_match(1, "a.rs", &[1, 2, 3])]);
    }

    #[tokio::test]
    async fn limit_hit_without_any_intersection_raises_an_alert() {
        let job = AndJob::new(vec![
            StubJob::limit_hit(),
            StubJob::emitting(vec![repo_match(1)]),
        ]);
        let agg = AggregatingStream::new();
        let alert = job
            .run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        assert_eq!(alert, Some(Alert::results_capped_by_and()));
        assert!(agg.take().results.is_empty());
    }

    #[tokio::test]
    async fn a_failing_child_fails_the_intersection() {
        let job = AndJob::new(vec![
            StubJob::failing(),
            StubJob::emitting(vec![repo_match(1)]),
        ]);
        let agg = AggregatingStream::new();
        let err = job
            .run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Backend(_)));
    }

    #[tokio::test]
    async fn empty_and_single_child_collapse() {
        assert_eq!(AndJob::new(Vec::new()).name(), "Noop");
        assert_eq!(
            AndJob::new(vec![StubJob::emitting(Vec::new())]).name(),
            "Stub"
        );
    }
}
