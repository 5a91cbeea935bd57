// ABOUTME: Deployment state types for the type state pattern.
// ABOUTME: Each state carries the data that exists at that point of the lifecycle.

use crate::components::ComponentSet;
use crate::deploy::DeployResult;
use crate::types::DeployId;

/// Initial state: request validated, nothing touched yet.
/// Available actions: `pre_check()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Tracking initialized when requested.
/// Available actions: `resolve()`
#[derive(Debug, Clone, Copy, Default)]
pub struct PreChecked;

/// Validated replay: component resolution is skipped entirely.
/// Available actions: `submit()`
#[derive(Debug, Clone)]
pub struct ReplayReady {
    pub(crate) validated_id: DeployId,
}

/// Component set resolved and non-empty.
/// Available actions: `check_conflicts()`
#[derive(Debug, Clone)]
pub struct Resolved {
    pub(crate) components: ComponentSet,
}

/// No blocking conflicts with the org.
/// Available actions: `submit()`
#[derive(Debug, Clone)]
pub struct Cleared {
    pub(crate) components: ComponentSet,
}

/// Deploy accepted by the org. Nothing polled yet.
/// Available actions: `detach()`, `poll()`
#[derive(Debug, Clone)]
pub struct Submitted {
    pub(crate) id: DeployId,
    /// None for a validated replay.
    pub(crate) components: Option<ComponentSet>,
}

/// Polling reached a terminal status.
/// Available actions: `post_process()`
#[derive(Debug, Clone)]
pub struct Polled {
    pub(crate) result: DeployResult,
    pub(crate) components: Option<ComponentSet>,
}

/// Hooks fired and tracking advanced.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) result: DeployResult,
}
