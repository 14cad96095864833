//! The streaming contract and its decorators.
//!
//! Everything between a leaf job and the caller is a [`Sender`] decorator:
//! each wraps a parent sender, transforms or observes events, and forwards.
//! Sends never block; all internal state is owned by the decorator instance
//! and synchronized by it.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::result::Match;
use crate::result::MatchKey;
use crate::result::SearchEvent;
use crate::stats::Stats;
use crate::sync::lock;

pub trait Sender: Send + Sync {
    fn send(&self, event: SearchEvent);
}

impl<S: Sender + ?Sized> Sender for &S {
    fn send(&self, event: SearchEvent) {
        (**self).send(event);
    }
}

impl<S: Sender + ?Sized> Sender for std::sync::Arc<S> {
    fn send(&self, event: SearchEvent) {
        (**self).send(event);
    }
}

/// Adapts a closure; mostly useful at the outermost caller boundary.
pub struct CallbackSender<F: Fn(SearchEvent) + Send + Sync>(pub F);

impl<F: Fn(SearchEvent) + Send + Sync> Sender for CallbackSender<F> {
    fn send(&self, event: SearchEvent) {
        (self.0)(event);
    }
}

/// Accumulates every event into one. For synchronous callers only; holds
/// all results in memory, so never use it on unbounded streams.
#[derive(Debug, Default)]
pub struct AggregatingStream {
    event: Mutex<SearchEvent>,
}

impl AggregatingStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> SearchEvent {
        std::mem::take(&mut *lock(&self.event))
    }
}

impl Sender for AggregatingStream {
    fn send(&self, event: SearchEvent) {
        let mut aggregated = lock(&self.event);
        aggregated.results.extend(event.results);
        aggregated.stats.update(&event.stats);
    }
}

/// Accumulates a copy of the stats while passing events through unchanged.
pub struct StatsObservingStream<'a> {
    parent: &'a dyn Sender,
    stats: Mutex<Stats>,
}

impl<'a> StatsObservingStream<'a> {
    pub fn new(parent: &'a dyn Sender) -> Self {
        Self {
            parent,
            stats: Mutex::new(Stats::default()),
        }
    }

    pub fn stats(&self) -> Stats {
        lock(&self.stats).clone()
    }
}

impl Sender for StatsObservingStream<'_> {
    fn send(&self, event: SearchEvent) {
        lock(&self.stats).update(&event.stats);
        self.parent.send(event);
    }
}

/// Counts forwarded results while passing events through unchanged.
pub struct ResultCountingStream<'a> {
    parent: &'a dyn Sender,
    count: AtomicUsize,
}

impl<'a> ResultCountingStream<'a> {
    pub fn new(parent: &'a dyn Sender) -> Self {
        Self {
            parent,
            count: AtomicUsize::new(0),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

impl Sender for ResultCountingStream<'_> {
    fn send(&self, event: SearchEvent) {
        let results: usize = event.results.iter().map(Match::result_count).sum();
        self.count.fetch_add(results, Ordering::Relaxed);
        self.parent.send(event);
    }
}

/// Filters out matches already seen, by match identity. One instance serves
/// one logical merge point; the internal lock makes concurrent producers
/// into that point safe.
pub struct DedupingStream<'a> {
    parent: &'a dyn Sender,
    seen: Mutex<HashSet<MatchKey>>,
}

impl<'a> DedupingStream<'a> {
    pub fn new(parent: &'a dyn Sender) -> Self {
        Self {
            parent,
            seen: Mutex::new(HashSet::new()),
        }
    }
}

impl Sender for DedupingStream<'_> {
    fn send(&self, mut event: SearchEvent) {
        {
            let mut seen = lock(&self.seen);
            event.results.retain(|m| seen.insert(m.key()));
        }
        self.parent.send(event);
    }
}

/// Forwards up to `limit` results, truncating the crossing event, then
/// fires the cancellation callback exactly once. Cancellation is
/// cooperative: a producer may complete an in-flight send past the limit,
/// but those results are dropped here, so overshoot never reaches the
/// parent.
pub struct LimitStream<'a> {
    parent: &'a dyn Sender,
    remaining: Mutex<usize>,
    on_limit: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl<'a> LimitStream<'a> {
    pub fn new(limit: usize, parent: &'a dyn Sender, on_limit: Box<dyn FnOnce() + Send>) -> Self {
        Self {
            parent,
            remaining: Mutex::new(limit),
            on_limit: Mutex::new(Some(on_limit)),
        }
    }
}

impl Sender for LimitStream<'_> {
    fn send(&self, mut event: SearchEvent) {
        let crossed;
        {
            let mut remaining = lock(&self.remaining);
            if *remaining == 0 {
                // Results past the limit are dropped; stats still flow so
                // accounting survives the cutoff. With a zero quota this is
                // the first and only path, so the callback fires here.
                event.results.clear();
                event.stats.is_limit_hit = true;
                drop(remaining);
                self.parent.send(event);
                if let Some(cancel) = lock(&self.on_limit).take() {
                    cancel();
                }
                return;
            }
            let mut quota = *remaining;
            let mut kept = 0;
            for m in &mut event.results {
                if quota == 0 {
                    break;
                }
                let used = m.limit(quota);
                quota -= used.min(quota);
                kept += 1;
            }
            if kept < event.results.len() {
                event.results.truncate(kept);
            }
            let used = *remaining - quota;
            *remaining -= used;
            crossed = *remaining == 0;
            if crossed {
                event.stats.is_limit_hit = true;
            }
        }
        self.parent.send(event);
        if crossed {
            if let Some(cancel) = lock(&self.on_limit).take() {
                cancel();
            }
        }
    }
}
