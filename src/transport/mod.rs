// ABOUTME: Transport seam between the orchestrator and the org's deploy API.
// ABOUTME: Defines DeployTransport and RemoteMemberSource plus the REST implementation.

mod error;
mod rest;
mod soap;

pub use error::TransportError;
pub use rest::{OrgConnection, RestTransport};

use async_trait::async_trait;

use crate::components::{ComponentKey, ComponentSet};
use crate::deploy::{DeployOptions, DeployResult};
use crate::types::DeployId;

/// Submits deploys and reports their status.
#[async_trait]
pub trait DeployTransport: Send + Sync {
    /// Submit a component set. Returns the id of the new deploy request.
    async fn deploy(
        &self,
        components: &ComponentSet,
        options: &DeployOptions,
    ) -> Result<DeployId, TransportError>;

    /// Execute a previously validated deploy without re-validating it.
    async fn deploy_recent_validation(
        &self,
        validated_id: &DeployId,
        options: &DeployOptions,
    ) -> Result<DeployId, TransportError>;

    /// Fetch the current status of a deploy, including component and test details.
    async fn check_status(&self, id: &DeployId) -> Result<DeployResult, TransportError>;
}

/// A tracked member as the org reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteMember {
    pub key: ComponentKey,
    pub revision: u64,
    pub deleted: bool,
}

/// Lists the org's revision counters for tracked members.
#[async_trait]
pub trait RemoteMemberSource: Send + Sync {
    async fn source_members(&self) -> Result<Vec<RemoteMember>, TransportError>;
}
