// ABOUTME: Source tracking: what changed locally and in the org since the last deploy.
// ABOUTME: Defines the SourceTracking seam and the file-backed ProjectTracking store.

mod error;
mod lock;
mod store;

pub use error::TrackingError;
pub use lock::{LockInfo, TrackingLock};
pub use store::{ProjectTracking, TrackingState};

use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::components::{ComponentKey, ComponentSet};
use crate::deploy::DeployResult;

/// Where a change was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// One change reported by source tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedChange {
    pub origin: ChangeOrigin,
    pub kind: ChangeKind,
    pub key: ComponentKey,
    /// Project-relative file path. Remote changes have none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Selects which changes to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeFilter {
    pub origin: Option<ChangeOrigin>,
    pub deletions_only: bool,
}

impl ChangeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn local() -> Self {
        Self {
            origin: Some(ChangeOrigin::Local),
            deletions_only: false,
        }
    }

    pub fn remote() -> Self {
        Self {
            origin: Some(ChangeOrigin::Remote),
            deletions_only: false,
        }
    }

    pub fn local_deletions() -> Self {
        Self {
            origin: Some(ChangeOrigin::Local),
            deletions_only: true,
        }
    }

    pub fn matches(&self, change: &TrackedChange) -> bool {
        self.origin.is_none_or(|o| o == change.origin)
            && (!self.deletions_only || change.kind == ChangeKind::Deleted)
    }
}

/// Reads tracked changes and advances the baseline after a deploy.
#[async_trait]
pub trait SourceTracking: Send + Sync {
    async fn changes(&self, filter: ChangeFilter) -> Result<Vec<TrackedChange>, TrackingError>;

    /// Record the deployed components as in sync with the org.
    async fn update_from_deploy(
        &self,
        result: &DeployResult,
        components: &ComponentSet,
    ) -> Result<(), TrackingError>;
}

/// Opens a tracking context on demand, so the store is only locked when tracking is requested.
#[async_trait]
pub trait TrackingLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn SourceTracking>, TrackingError>;
}
