//! Per-query deadlines.
//!
//! The child runs in its own cancellation scope under a deadline. On expiry
//! the scope is cancelled with a deadline reason and the job returns a
//! timeout alert instead of an error: results streamed before the deadline
//! already reached the caller, so this is a partial-results condition.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::alert::Alert;
use crate::clients::RuntimeClients;
use crate::error::CancelReason;
use crate::error::Result;
use crate::job::ExecContext;
use crate::job::Job;
use crate::stream::Sender;

#[derive(Debug)]
pub struct TimeoutJob {
    timeout: Duration,
    child: Box<dyn Job>,
}

impl TimeoutJob {
    pub fn new(timeout: Duration, child: Box<dyn Job>) -> Box<dyn Job> {
        Box::new(Self { timeout, child })
    }
}

#[async_trait]
impl Job for TimeoutJob {
    fn name(&self) -> &'static str {
        "Timeout"
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
        match tokio::time::timeout(self.timeout, self.child.run(&scope, clients, sender)).await
        {
            Ok(Err(err)) if err.is_benign_cancel() => Ok(None),
            Ok(outcome) => outcome,
            Err(_elapsed) => {
                scope.cancel_with(CancelReason::DeadlineExceeded);
                warn!(timeout_ms = self.timeout.as_millis() as u64, "search timed out");
                Ok(Some(Alert::timed_out(self.timeout)))
            }
        }
    }
}
