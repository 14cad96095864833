//! Unmerged concurrency.
//!
//! Children share the scope and the sender; events interleave as produced.
//! Used where the children are already disjoint (different result types or
//! backends) so no merge point is needed.

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
use crate::stream::Sender;

#[derive(Debug)]
pub struct ParallelJob {
    children: Vec<Box<dyn Job>>,
}

impl ParallelJob {
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
impl Job for ParallelJob {
    fn name(&self) -> &'static str {
        "Parallel"
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
        let alerts = AlertObserver::default();
        let runs = self.children.iter().map(|child| {
            let alerts = &alerts;
            async move {
                let alert = child.run(cx, clients, sender).await?;
                alerts.observe(alert);
                Ok::<(), SearchError>(())
            }
        });
        let errors: Vec<SearchError> = join_all(runs)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        aggregate(errors)?;
        Ok(alerts.take())
    }
}
