use async_trait::async_trait;

use crate::alert::Alert;
use crate::clients::RuntimeClients;
use crate::error::Result;
use crate::job::ExecContext;
use crate::job::Job;
use crate::stream::Sender;

/// Produces nothing. Stands in for empty combinators so the tree never has
/// holes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopJob;

#[async_trait]
impl Job for NoopJob {
    fn name(&self) -> &'static str {
        "Noop"
    }

    async fn run(
        &self,
        _cx: &ExecContext,
        _clients: &RuntimeClients,
        _sender: &dyn Sender,
    ) -> Result<Option<Alert>> {
        Ok(None)
    }
}
