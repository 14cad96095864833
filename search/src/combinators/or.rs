//! Streaming union.
//!
//! Children run concurrently under one fan-out scope and stream into a
//! shared merger keyed by match identity. To keep output deduplicated
//! without holding everything until the end, a match is forwarded as soon
//! as every child has had a chance to report it, merged across the children
//! that did. Matches still partial when all children finish are flushed as
//! one final event.

use std::collections::HashMap;
use std::sync::Mutex;

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
pub struct OrJob {
    children: Vec<Box<dyn Job>>,
}

impl OrJob {
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
impl Job for OrJob {
    fn name(&self) -> &'static str {
        "Or"
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
        let merger = UnionMerger::new(self.children.len(), sender);
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

        let leftovers = merger.flush();
        if !leftovers.is_empty() {
            sender.send(SearchEvent::from_results(leftovers));
        }
        aggregate(errors)?;
        Ok(alerts.take())
    }
}

struct Pending {
    seen: Vec<bool>,
    // None once the merged match has been forwarded
    merged: Option<Match>,
}

/// Shared state behind the per-child senders of one OR run.
struct UnionMerger<'a> {
    parent: &'a dyn Sender,
    sources: usize,
    state: Mutex<HashMap<MatchKey, Pending>>,
}

impl<'a> UnionMerger<'a> {
    fn new(sources: usize, parent: &'a dyn Sender) -> Self {
        Self {
            parent,
            sources,
            state: Mutex::new(HashMap::new()),
        }
    }

    fn source(&self, index: usize) -> UnionSource<'_, 'a> {
        UnionSource {
            merger: self,
            index,
        }
    }

    fn send_from(&self, index: usize, mut event: SearchEvent) {
        let mut ready = Vec::new();
        {
            let mut state = lock(&self.state);
            for m in event.results.drain(..) {
                let key = m.key();
                let pending = state.entry(key).or_insert_with(|| Pending {
                    seen: vec![false; self.sources],
                    merged: None,
                });
                pending.seen[index] = true;
                match &mut pending.merged {
                    Some(existing) => existing.merge(m),
                    None if pending.seen.iter().all(|&seen| seen) => {
                        // already forwarded; late duplicate is dropped
                    }
                    slot => *slot = Some(m),
                }
                if pending.seen.iter().all(|&seen| seen) {
                    if let Some(complete) = pending.merged.take() {
                        ready.push(complete);
                    }
                }
            }
        }
        event.results = ready;
        self.parent.send(event);
    }

    /// Matches not yet forwarded when every child has finished.
    fn flush(&self) -> Vec<Match> {
        let mut state = lock(&self.state);
        let mut leftovers: Vec<Match> = state
            .values_mut()
            .filter_map(|pending| pending.merged.take())
            .collect();
        leftovers.sort_by_key(Match::key);
        leftovers
    }
}

struct UnionSource<'m, 'a> {
    merger: &'m UnionMerger<'a>,
    index: usize,
}

impl Sender for UnionSource<'_, '_> {
    fn send(&self, event: SearchEvent) {
        self.merger.send_from(self.index, event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::result::test_support::file_match;
    use crate::result::test_support::repo_match;
    use crate::stream::AggregatingStream;
    use crate::testing::StubJob;
    use crate::testing::stub_clients;

    #[tokio::test]
    async fn distinct_matches_from_all_children_are_forwarded() {
        let job = OrJob::new(vec![
            StubJob::emitting(vec![repo_match(1)]),
            StubJob::emitting(vec![repo_match(2)]),
        ]);
        let agg = AggregatingStream::new();
        job.run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        let mut results = agg.take().results;
        results.sort_by_key(Match::key);
        assert_eq!(results, vec![repo_match(1), repo_match(2)]);
    }

    #[tokio::test]
    async fn a_match_every_child_reports_is_forwarded_once() {
        let job = OrJob::new(vec![
            StubJob::emitting(vec![repo_match(1)]),
            StubJob::emitting(vec![repo_match(1)]),
            StubJob::emitting(vec![repo_match(1)]),
        ]);
        let agg = AggregatingStream::new();
        job.run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        assert_eq!(agg.take().results, vec![repo_match(1)]);
    }

    #[tokio::test]
    async fn duplicate_file_matches_merge_their_lines() {
        let job = OrJob::new(vec![
            StubJob::emitting(vec![file_match(1, "a.rs", &[1])]),
            StubJob::emitting(vec![file_match(1, "a.rs", &[2])]),
        ]);
        let agg = AggregatingStream::new();
        job.run(&ExecContext::new(), &stub_clients(), &agg)
            .await
            .unwrap();
        assert_eq!(agg.take().results, vec![file_match(1, "a.rs", &[1, 2])]);
    }

    #[tokio::test(start_paused = true)]
    async fn partial_matches_flush_after_all_children_finish() {
        let log = Arc::new(AggregatingStream::new());
        let sink = Arc::clone(&log);
        let handle = tokio::spawn(async move {
            let job = OrJob::new(vec![
                StubJob::emitting(vec![repo_match(1)]),
                StubJob::emitting_after(Vec::new(), Duration::from_millis(10)),
                StubJob::emitting_after(Vec::new(), Duration::from_millis(10)),
            ]);
            job.run(&ExecContext::new(), &stub_clients(), &*sink).await
        });
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(
            log.take().results.is_empty(),
            "nothing forwarded while children may still report the match"
        );
        handle.await.unwrap().unwrap();
        assert_eq!(log.take().results, vec![repo_match(1)]);
    }

    #[tokio::test]
    async fn a_failing_child_fails_the_union() {
        let job = OrJob::new(vec![
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
}
