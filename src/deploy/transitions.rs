// ABOUTME: State transition methods for deploy orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::components::{Component, ComponentResolver, ResolveOptions};
use crate::diagnostics::{Diagnostics, Warning};
use crate::hooks::LifecycleHooks;
use crate::progress::ProgressSink;
use crate::tracking::{ChangeFilter, TrackingLoader};
use crate::transport::DeployTransport;
use crate::types::{ApiVersion, DeployId};

use super::Deployment;
use super::conflicts::find_conflicts;
use super::error::DeployError;
use super::poll::{PollOutcome, poll_until_done};
use super::request::{ConfigurationError, InputMode};
use super::result::{AsyncDeployHandle, DeployResult};
use super::state::{
    Cleared, Completed, Initialized, Polled, PreChecked, ReplayReady, Resolved, Submitted,
};

impl<S> Deployment<S> {
    /// Internal helper to move to the next state.
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            request: self.request,
            tracking: self.tracking,
            state,
        }
    }
}

/// Where pre-checks send the deploy next.
#[derive(Debug)]
pub enum PreCheckRoute {
    /// Resolve components from local source.
    Build(Deployment<PreChecked>),
    /// Replay a validated deploy by id, skipping resolution and conflicts.
    Replay(Deployment<ReplayReady>),
}

/// Result of polling a submitted deploy.
#[derive(Debug)]
pub enum PollTransition {
    Done(Deployment<Polled>),
    /// Wait elapsed. Not an error: the id is kept for `report`.
    TimedOut {
        id: DeployId,
        last: Option<DeployResult>,
    },
}

// =============================================================================
// Initialized -> PreChecked | ReplayReady
// =============================================================================

impl Deployment<Initialized> {
    /// Initialize tracking when requested, then route by input mode.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::TrackingInit` if the tracking context cannot be opened.
    pub async fn pre_check(self, loader: &dyn TrackingLoader) -> Result<PreCheckRoute, DeployError> {
        let mut deployment = self;
        if deployment.request.track_source {
            let tracking = loader.load().await.map_err(DeployError::TrackingInit)?;
            deployment.tracking = Some(tracking);
            tracing::debug!("source tracking initialized");
        }

        let route = match &deployment.request.mode {
            InputMode::ValidatedReplay(id) => {
                let validated_id = id.clone();
                PreCheckRoute::Replay(deployment.transition(ReplayReady { validated_id }))
            }
            _ => PreCheckRoute::Build(deployment.transition(PreChecked)),
        };
        Ok(route)
    }
}

// =============================================================================
// PreChecked -> Resolved
// =============================================================================

impl Deployment<PreChecked> {
    /// Build the component set for the request's input mode.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::NothingToDeploy` if the set is empty.
    pub fn resolve(
        self,
        resolver: &dyn ComponentResolver,
        api_version: ApiVersion,
        source_api_version: Option<ApiVersion>,
    ) -> Result<Deployment<Resolved>, DeployError> {
        let Some(selection) = self.request.mode.selection() else {
            return Err(ConfigurationError::NoInputMode.into());
        };

        let options = ResolveOptions {
            api_version,
            source_api_version,
            selection,
            destructive_pre: self.request.destructive_pre.clone(),
            destructive_post: self.request.destructive_post.clone(),
        };
        let components = resolver.build(&options)?;
        if components.is_empty() {
            return Err(DeployError::NothingToDeploy);
        }

        tracing::debug!(components = components.len(), "component set resolved");
        Ok(self.transition(Resolved { components }))
    }
}

// =============================================================================
// Resolved -> Cleared
// =============================================================================

impl Deployment<Resolved> {
    /// Check tracked changes against the component set.
    ///
    /// Pending local deletions outside the set only produce a warning.
    /// Conflicts fail unless overwrite is forced.
    pub async fn check_conflicts(
        self,
        diag: &mut Diagnostics,
    ) -> Result<Deployment<Cleared>, DeployError> {
        let Some(tracking) = self.tracking.clone() else {
            let components = self.state.components;
            return Ok(Deployment {
                request: self.request,
                tracking: None,
                state: Cleared { components },
            });
        };

        let deletions = tracking
            .changes(ChangeFilter::local_deletions())
            .await
            .map_err(DeployError::Tracking)?;
        let pending: BTreeSet<PathBuf> = deletions
            .into_iter()
            .filter(|c| !self.state.components.contains(&c.key))
            .filter_map(|c| c.path)
            .collect();
        if !pending.is_empty() {
            diag.warn(Warning::pending_deletions(&pending));
        }

        if self.request.force_overwrite {
            tracing::debug!("force overwrite: skipping conflict check");
        } else {
            let changes = tracking
                .changes(ChangeFilter::all())
                .await
                .map_err(DeployError::Tracking)?;
            let conflicts = find_conflicts(&changes, Some(&self.state.components));
            if !conflicts.is_empty() {
                return Err(DeployError::Conflict(conflicts));
            }
        }

        let components = self.state.components.clone();
        Ok(self.transition(Cleared { components }))
    }
}

// =============================================================================
// Cleared | ReplayReady -> Submitted
// =============================================================================

impl Deployment<Cleared> {
    /// Fire `predeploy` with the final component list, then submit.
    ///
    /// # Errors
    ///
    /// Hook and transport errors are returned unmodified; nothing is retried.
    pub async fn submit(
        self,
        transport: &dyn DeployTransport,
        hooks: &dyn LifecycleHooks,
    ) -> Result<Deployment<Submitted>, DeployError> {
        let listed: Vec<Component> = self.state.components.iter().cloned().collect();
        hooks.pre_deploy(&listed).await?;

        let id = transport
            .deploy(&self.state.components, &self.request.options)
            .await?;
        tracing::info!(%id, components = listed.len(), "deploy submitted");

        let components = Some(self.state.components.clone());
        Ok(self.transition(Submitted { id, components }))
    }
}

impl Deployment<ReplayReady> {
    /// Execute the validated deploy by id.
    pub async fn submit(
        self,
        transport: &dyn DeployTransport,
    ) -> Result<Deployment<Submitted>, DeployError> {
        let id = transport
            .deploy_recent_validation(&self.state.validated_id, &self.request.options)
            .await?;
        tracing::info!(%id, validated = %self.state.validated_id, "validated deploy submitted");

        Ok(self.transition(Submitted {
            id,
            components: None,
        }))
    }
}

// =============================================================================
// Submitted -> AsyncDeployHandle | Polled
// =============================================================================

impl Deployment<Submitted> {
    /// Stop here and return only the id. No status is requested.
    pub fn detach(self) -> AsyncDeployHandle {
        AsyncDeployHandle { id: self.state.id }
    }

    /// Poll until terminal or the request's wait elapses.
    pub async fn poll(
        self,
        transport: &dyn DeployTransport,
        progress: &dyn ProgressSink,
        interval: Duration,
    ) -> Result<PollTransition, DeployError> {
        let outcome = poll_until_done(
            transport,
            &self.state.id,
            self.request.wait,
            interval,
            progress,
        )
        .await?;

        Ok(match outcome {
            PollOutcome::Done(result) => {
                let components = self.state.components.clone();
                PollTransition::Done(self.transition(Polled { result, components }))
            }
            PollOutcome::TimedOut { id, last } => PollTransition::TimedOut { id, last },
        })
    }
}

// =============================================================================
// Polled -> Completed
// =============================================================================

impl Deployment<Polled> {
    /// Fire `postdeploy`, then advance tracking unless the deploy failed outright.
    pub async fn post_process(
        self,
        hooks: &dyn LifecycleHooks,
    ) -> Result<Deployment<Completed>, DeployError> {
        hooks.post_deploy(&self.state.result).await?;

        if let Some(tracking) = &self.tracking
            && let Some(components) = &self.state.components
            && !self.state.result.status.failed_outright()
        {
            tracking
                .update_from_deploy(&self.state.result, components)
                .await
                .map_err(DeployError::Tracking)?;
        }

        let result = self.state.result.clone();
        Ok(self.transition(Completed { result }))
    }
}

impl Deployment<Completed> {
    pub fn finish(self) -> DeployResult {
        self.state.result
    }
}
