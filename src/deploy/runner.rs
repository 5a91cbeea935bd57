// ABOUTME: Drives a deploy request through the state machine end to end.
// ABOUTME: Collaborators are passed in explicitly so every seam can be faked.

use std::time::Duration;

use crate::components::ComponentResolver;
use crate::diagnostics::{Diagnostics, Warning};
use crate::hooks::LifecycleHooks;
use crate::progress::ProgressSink;
use crate::tracking::TrackingLoader;
use crate::transport::DeployTransport;
use crate::types::{ApiVersion, DeployId};

use super::Deployment;
use super::cache::SubmissionRecorder;
use super::error::DeployError;
use super::request::DeployRequest;
use super::result::{AsyncDeployHandle, DeployResult};
use super::transitions::{PollTransition, PreCheckRoute};

/// Everything a deploy talks to.
pub struct Collaborators<'a> {
    pub resolver: &'a dyn ComponentResolver,
    pub transport: &'a dyn DeployTransport,
    pub tracking: &'a dyn TrackingLoader,
    pub hooks: &'a dyn LifecycleHooks,
    pub progress: &'a dyn ProgressSink,
    pub recorder: &'a dyn SubmissionRecorder,
}

/// Project-level settings that are not part of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub api_version: ApiVersion,
    pub source_api_version: Option<ApiVersion>,
    pub poll_interval: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            api_version: ApiVersion::default(),
            source_api_version: None,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// How a deploy invocation ended, short of an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DeployOutcome {
    /// Wait was zero: submitted, never polled.
    Async(AsyncDeployHandle),
    /// Wait elapsed before a terminal status.
    Pending {
        id: DeployId,
        last: Option<DeployResult>,
    },
    /// Terminal result after hooks and tracking.
    Completed(DeployResult),
}

impl DeployOutcome {
    pub fn id(&self) -> &DeployId {
        match self {
            DeployOutcome::Async(handle) => &handle.id,
            DeployOutcome::Pending { id, .. } => id,
            DeployOutcome::Completed(result) => &result.id,
        }
    }
}

/// Run one deploy request.
///
/// # Errors
///
/// Returns the first fatal error; a poll timeout is reported as
/// `DeployOutcome::Pending` with a warning instead.
pub async fn run_deploy(
    request: DeployRequest,
    settings: &RunSettings,
    collab: &Collaborators<'_>,
    diag: &mut Diagnostics,
) -> Result<DeployOutcome, DeployError> {
    let submitted = match Deployment::new(request).pre_check(collab.tracking).await? {
        PreCheckRoute::Replay(deployment) => deployment.submit(collab.transport).await?,
        PreCheckRoute::Build(deployment) => {
            deployment
                .resolve(collab.resolver, settings.api_version, settings.source_api_version)?
                .check_conflicts(diag)
                .await?
                .submit(collab.transport, collab.hooks)
                .await?
        }
    };

    if let Err(e) = collab.recorder.submitted(submitted.id()) {
        diag.warn(Warning::not_recorded(submitted.id(), &e));
    }

    if submitted.request().is_async() {
        if submitted.request().reporting.wants_reports() {
            diag.warn(Warning::reports_skipped(submitted.id()));
        }
        return Ok(DeployOutcome::Async(submitted.detach()));
    }

    match submitted
        .poll(collab.transport, collab.progress, settings.poll_interval)
        .await?
    {
        PollTransition::Done(polled) => {
            let completed = polled.post_process(collab.hooks).await?;
            Ok(DeployOutcome::Completed(completed.finish()))
        }
        PollTransition::TimedOut { id, last } => {
            diag.warn(Warning::poll_timeout(&id));
            Ok(DeployOutcome::Pending { id, last })
        }
    }
}
