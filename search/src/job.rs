//! The unit of concurrent execution.
//!
//! A job is an immutable plan node: it closes over everything it needs at
//! construction (children, queries, limits) and carries no mutable state of
//! its own. `run` is the single execution method; combinators hold children
//! behind `dyn Job` so the tree stays open for new job kinds.

use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::alert::Alert;
use crate::clients::RuntimeClients;
use crate::error::CancelReason;
use crate::error::Result;
use crate::error::SearchError;
use crate::limits::MAX_CONCURRENT_CHILDREN;
use crate::stream::Sender;

#[async_trait]
pub trait Job: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn children(&self) -> Vec<&dyn Job> {
        Vec::new()
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>>;
}

#[async_trait]
impl<J: Job + ?Sized> Job for Box<J> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn children(&self) -> Vec<&dyn Job> {
        (**self).children()
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        (**self).run(cx, clients, sender).await
    }
}

/// Cooperative cancellation scope plus the fan-out ceiling.
///
/// The cancellation token forms the usual parent/child tree. The reason
/// cell is shared across the whole search: the first intentional
/// cancellation records why, and jobs constructing a cancellation error
/// read it back, so benign shutdowns (limits, budgets) are distinguishable
/// from a caller abort without smuggling values through the context.
#[derive(Debug, Clone)]
pub struct ExecContext {
    cancel: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
    fan_out: Arc<Semaphore>,
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecContext {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            reason: Arc::new(OnceLock::new()),
            fan_out: Arc::new(Semaphore::new(MAX_CONCURRENT_CHILDREN)),
        }
    }

    /// A scope that is cancelled when this one is, and can also be
    /// cancelled on its own.
    pub fn child_scope(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            reason: Arc::clone(&self.reason),
            fan_out: Arc::clone(&self.fan_out),
        }
    }

    /// Like [`ExecContext::child_scope`] but with a fresh fan-out
    /// semaphore: each AND/OR combinator bounds its own children rather
    /// than sharing one process-wide budget.
    pub fn fan_out_scope(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            reason: Arc::clone(&self.reason),
            fan_out: Arc::new(Semaphore::new(MAX_CONCURRENT_CHILDREN)),
        }
    }

    pub fn cancel_with(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.cancel.cancel();
    }

    /// A `'static` handle for cancellation callbacks.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancel: self.cancel.clone(),
            reason: Arc::clone(&self.reason),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// The error a job should return when it observes cancellation.
    pub fn cancellation_error(&self) -> SearchError {
        SearchError::Canceled {
            reason: self.reason.get().copied().unwrap_or(CancelReason::Upstream),
        }
    }

    /// Bounds combinator fan-out; holders of a permit count against this
    /// scope's concurrency ceiling until dropped.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        match Arc::clone(&self.fan_out).acquire_owned().await {
            Ok(permit) => Ok(permit),
            Err(_closed) => Err(self.cancellation_error()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel: CancellationToken,
    reason: Arc<OnceLock<CancelReason>>,
}

impl CancelHandle {
    pub fn cancel(&self, reason: CancelReason) {
        let _ = self.reason.set(reason);
        self.cancel.cancel();
    }
}
