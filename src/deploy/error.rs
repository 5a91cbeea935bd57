// ABOUTME: Error types for deploy orchestration.
// ABOUTME: Each variant marks the lifecycle stage that failed.

use crate::components::ResolveError;
use crate::hooks::HookError;
use crate::tracking::TrackingError;
use crate::transport::TransportError;

use super::conflicts::Conflict;
use super::request::ConfigurationError;

/// Errors that can occur during deployment state transitions.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Invalid flags, raised before any work.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Tracking was requested but could not be initialized.
    #[error("failed to initialize source tracking: {0}")]
    TrackingInit(#[source] TrackingError),

    /// Tracking failed after initialization.
    #[error("source tracking failed: {0}")]
    Tracking(#[source] TrackingError),

    #[error("failed to resolve components: {0}")]
    Resolve(#[from] ResolveError),

    #[error("no components to deploy")]
    NothingToDeploy,

    /// Local and remote changes overlap. Nothing was submitted.
    #[error("{}", conflict_message(.0))]
    Conflict(Vec<Conflict>),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Coarse classification used for exit handling and JSON output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Configuration,
    TrackingInit,
    Tracking,
    Resolve,
    NothingToDeploy,
    Conflict,
    Transport,
    Hook,
}

impl DeployError {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Configuration(_) => DeployErrorKind::Configuration,
            DeployError::TrackingInit(_) => DeployErrorKind::TrackingInit,
            DeployError::Tracking(_) => DeployErrorKind::Tracking,
            DeployError::Resolve(_) => DeployErrorKind::Resolve,
            DeployError::NothingToDeploy => DeployErrorKind::NothingToDeploy,
            DeployError::Conflict(_) => DeployErrorKind::Conflict,
            DeployError::Transport(_) => DeployErrorKind::Transport,
            DeployError::Hook(_) => DeployErrorKind::Hook,
        }
    }

    /// Conflicting components, if this is a conflict error.
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            DeployError::Conflict(conflicts) => conflicts,
            _ => &[],
        }
    }
}

fn conflict_message(conflicts: &[Conflict]) -> String {
    let mut message = format!(
        "{} component(s) changed both locally and in the org; use --force-overwrite to deploy anyway:",
        conflicts.len()
    );
    for conflict in conflicts {
        message.push_str(&format!("\n  {conflict}"));
    }
    message
}
