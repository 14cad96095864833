//! Time-windowed batching.
//!
//! The first event carrying results is forwarded immediately, so first
//! result latency is never sacrificed. Everything after that buffers and
//! flushes when `max_delay` elapses or when [`BatchingStream::done`] is
//! called; no event waits longer than `max_delay` past its arrival, and
//! `done` flushes synchronously before returning.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::result::Match;
use crate::result::SearchEvent;
use crate::stats::Stats;
use crate::stream::Sender;
use crate::sync::lock;

pub struct BatchingStream {
    inner: Arc<BatchInner>,
}

struct BatchInner {
    parent: Arc<dyn Sender>,
    max_delay: Duration,
    state: Mutex<BatchState>,
    shutdown: CancellationToken,
}

#[derive(Default)]
struct BatchState {
    results: Vec<Match>,
    stats: Stats,
    sent_first: bool,
    timer_running: bool,
}

impl BatchingStream {
    pub fn new(parent: Arc<dyn Sender>, max_delay: Duration) -> Self {
        Self {
            inner: Arc::new(BatchInner {
                parent,
                max_delay,
                state: Mutex::new(BatchState::default()),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Flushes anything buffered and stops the flush timer. Buffered
    /// results are forwarded before this returns.
    pub fn done(&self) {
        self.inner.shutdown.cancel();
        self.inner.flush();
    }
}

impl Sender for BatchingStream {
    fn send(&self, event: SearchEvent) {
        let mut state = lock(&self.inner.state);
        if !state.sent_first && !event.results.is_empty() {
            state.sent_first = true;
            // stats-only events that arrived earlier ride along
            let mut stats = std::mem::take(&mut state.stats);
            stats.update(&event.stats);
            drop(state);
            self.inner.parent.send(SearchEvent {
                results: event.results,
                stats,
            });
            return;
        }
        state.stats.update(&event.stats);
        state.results.extend(event.results);
        if !state.timer_running {
            state.timer_running = true;
            drop(state);
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::select! {
                    () = tokio::time::sleep(inner.max_delay) => inner.flush(),
                    () = inner.shutdown.cancelled() => {}
                }
            });
        }
    }
}

impl BatchInner {
    fn flush(&self) {
        let event = {
            let mut state = lock(&self.state);
            state.timer_running = false;
            if state.results.is_empty() && state.stats.is_zero() {
                return;
            }
            SearchEvent {
                results: std::mem::take(&mut state.results),
                stats: std::mem::take(&mut state.stats),
            }
        };
        self.parent.send(event);
    }
}
