// ABOUTME: Generic deployment struct parameterized by state.
// ABOUTME: State types carry their own data for compile-time guarantees.

use std::sync::Arc;

use crate::tracking::SourceTracking;
use crate::types::DeployId;

use super::request::DeployRequest;
use super::state::{Initialized, Submitted};

/// A deploy in progress, parameterized by its current state.
///
/// Every transition consumes the deployment, so a request can only be
/// submitted once and a result only exists after polling.
pub struct Deployment<S> {
    pub(crate) request: DeployRequest,
    pub(crate) tracking: Option<Arc<dyn SourceTracking>>,
    pub(crate) state: S,
}

impl<S: std::fmt::Debug> std::fmt::Debug for Deployment<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deployment")
            .field("request", &self.request)
            .field("tracking", &self.tracking.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl Deployment<Initialized> {
    pub fn new(request: DeployRequest) -> Self {
        Deployment {
            request,
            tracking: None,
            state: Initialized,
        }
    }
}

impl<S> Deployment<S> {
    pub fn request(&self) -> &DeployRequest {
        &self.request
    }
}

impl Deployment<Submitted> {
    pub fn id(&self) -> &DeployId {
        &self.state.id
    }
}
