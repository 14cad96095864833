//! Required/optional pairing.
//!
//! The required child determines completion; the optional child enriches
//! the stream for as long as it keeps up. Once the required child finishes,
//! the optional side gets a short grace budget and is then cancelled with a
//! benign reason, so a slow optional child never delays the search and
//! never surfaces an error.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::alert::Alert;
use crate::alert::AlertObserver;
use crate::clients::RuntimeClients;
use crate::error::CancelReason;
use crate::error::Result;
use crate::error::aggregate;
use crate::job::ExecContext;
use crate::job::Job;
use crate::limits::OPTIONAL_BUDGET;
use crate::stream::Sender;

#[derive(Debug)]
pub struct RequiredAndOptionalJob {
    required: Box<dyn Job>,
    optional: Box<dyn Job>,
}

impl RequiredAndOptionalJob {
    pub fn new(required: Box<dyn Job>, optional: Box<dyn Job>) -> Box<dyn Job> {
        Box::new(Self { required, optional })
    }
}

#[async_trait]
impl Job for RequiredAndOptionalJob {
    fn name(&self) -> &'static str {
        "RequiredAndOptional"
    }

    fn children(&self) -> Vec<&dyn Job> {
        vec![self.required.as_ref(), self.optional.as_ref()]
    }

    async fn run(
        &self,
        cx: &ExecContext,
        clients: &RuntimeClients,
        sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        let optional_scope = cx.child_scope();
        let optional_done = CancellationToken::new();
        let required = async {
            let outcome = self.required.run(cx, clients, sender).await;
            // the budget timer only matters while the optional child is
            // still running
            tokio::select! {
                () = optional_done.cancelled() => {}
                () = tokio::time::sleep(OPTIONAL_BUDGET) => {
                    optional_scope.cancel_with(CancelReason::OptionalBudgetElapsed);
                }
            }
            outcome
        };
        let optional = async {
            let outcome = self.optional.run(&optional_scope, clients, sender).await;
            optional_done.cancel();
            outcome
        };
        let (required_outcome, optional_outcome) = tokio::join!(required, optional);

        let alerts = AlertObserver::default();
        let mut errors = Vec::new();
        for outcome in [required_outcome, optional_outcome] {
            match outcome {
                Ok(alert) => alerts.observe(alert),
                Err(err) => errors.push(err),
            }
        }
        aggregate(errors)?;
        Ok(alerts.take())
    }
}
