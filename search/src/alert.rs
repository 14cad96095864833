//! Advisory alerts.
//!
//! Alerts are a non-fatal side channel: a job can return matches and still
//! attach an advisory ("results may be capped", "timed out"). Among alerts
//! produced concurrently, exactly one winner is surfaced: highest priority,
//! first seen on ties.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::sync::lock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProposedQuery {
    pub description: String,
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub prometheus_type: String,
    pub title: String,
    pub description: String,
    pub proposed_queries: Vec<ProposedQuery>,
    pub kind: String,
    pub priority: i32,
}

impl Alert {
    /// An AND combinator saw a child hit its limit before any intersected
    /// result could be forwarded.
    pub fn results_capped_by_and() -> Self {
        Self {
            prometheus_type: "results_capped_by_and".to_string(),
            title: "Results may be incomplete".to_string(),
            description:
                "One part of this AND expression hit its result limit before the \
                 intersection produced anything; adding count: may surface more results."
                    .to_string(),
            proposed_queries: Vec::new(),
            kind: "luckySearchQueries".to_string(),
            priority: 1,
        }
    }

    /// A per-query deadline expired before the search finished.
    pub fn timed_out(timeout: Duration) -> Self {
        let doubled = timeout.saturating_mul(2).as_secs().max(1);
        Self {
            prometheus_type: "timed_out".to_string(),
            title: "Search timed out".to_string(),
            description: "The search hit its time budget; partial results are shown."
                .to_string(),
            proposed_queries: vec![ProposedQuery {
                description: "increase the timeout".to_string(),
                query: format!("timeout:{doubled}s"),
            }],
            kind: "timeout".to_string(),
            priority: 5,
        }
    }
}

/// Keeps the winning alert across a set of concurrent producers.
#[derive(Debug, Default)]
pub struct AlertObserver {
    best: Mutex<Option<Alert>>,
}

impl AlertObserver {
    pub fn observe(&self, alert: Option<Alert>) {
        let Some(alert) = alert else {
            return;
        };
        let mut best = lock(&self.best);
        let replace = match best.as_ref() {
            Some(current) => alert.priority > current.priority,
            None => true,
        };
        if replace {
            *best = Some(alert);
        }
    }

    pub fn take(&self) -> Option<Alert> {
        lock(&self.best).take()
    }
}
