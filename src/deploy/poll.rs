// ABOUTME: Status polling bounded by the wait duration.
// ABOUTME: Feeds each status to a progress sink; timing out stops local polling only.

use std::time::Duration;
use tokio::time::Instant;

use crate::progress::ProgressSink;
use crate::transport::{DeployTransport, TransportError};
use crate::types::DeployId;

use super::result::DeployResult;

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Done(DeployResult),
    /// The wait elapsed first. The remote deploy keeps running.
    TimedOut {
        id: DeployId,
        last: Option<DeployResult>,
    },
}

/// Poll until the deploy is terminal or `wait` elapses.
///
/// At least one status call is made. Transport errors end polling.
pub async fn poll_until_done(
    transport: &dyn DeployTransport,
    id: &DeployId,
    wait: Duration,
    interval: Duration,
    progress: &dyn ProgressSink,
) -> Result<PollOutcome, TransportError> {
    // A wait too large to represent has no deadline.
    let deadline = Instant::now().checked_add(wait);

    loop {
        let result = transport.check_status(id).await?;
        if result.is_terminal() {
            progress.finish(&result);
            return Ok(PollOutcome::Done(result));
        }
        progress.update(&result);

        let pause = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    tracing::debug!(%id, status = %result.status, "wait elapsed before completion");
                    return Ok(PollOutcome::TimedOut {
                        id: id.clone(),
                        last: Some(result),
                    });
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        tokio::time::sleep(pause).await;
    }
}

/// Status for the report command.
///
/// Zero wait checks once. A transport timeout while polling is swallowed and
/// the status is fetched once more; so is a local wait timeout.
pub async fn report_status(
    transport: &dyn DeployTransport,
    id: &DeployId,
    wait: Duration,
    interval: Duration,
    progress: &dyn ProgressSink,
) -> Result<DeployResult, TransportError> {
    if wait.is_zero() {
        return transport.check_status(id).await;
    }

    match poll_until_done(transport, id, wait, interval, progress).await {
        Ok(PollOutcome::Done(result)) => Ok(result),
        Ok(PollOutcome::TimedOut { last: Some(last), .. }) => Ok(last),
        Ok(PollOutcome::TimedOut { last: None, .. }) => transport.check_status(id).await,
        Err(e) if e.is_timeout() => {
            tracing::debug!(%id, "status request timed out, fetching once more");
            transport.check_status(id).await
        }
        Err(e) => Err(e),
    }
}
