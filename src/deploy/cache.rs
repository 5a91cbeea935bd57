// ABOUTME: Remembers the most recent deploy so `report` can find it without an id.
// ABOUTME: Stored as JSON in .orgdeploy/last-deploy.json inside the project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::DeployId;

const CACHE_FILE: &str = ".orgdeploy/last-deploy.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access deploy cache {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("deploy cache {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedDeploy {
    pub id: DeployId,
    pub target: String,
    pub submitted_at: DateTime<Utc>,
}

/// Told about each deploy id as soon as the org accepts it.
pub trait SubmissionRecorder: Send + Sync {
    fn submitted(&self, id: &DeployId) -> Result<(), CacheError>;
}

/// Records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecord;

impl SubmissionRecorder for NoRecord {
    fn submitted(&self, _id: &DeployId) -> Result<(), CacheError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeployCache {
    path: PathBuf,
}

impl DeployCache {
    pub fn new(project_root: &Path) -> Self {
        Self {
            path: project_root.join(CACHE_FILE),
        }
    }

    pub fn record(&self, id: &DeployId, target: &str) -> Result<(), CacheError> {
        let entry = CachedDeploy {
            id: id.clone(),
            target: target.to_string(),
            submitted_at: Utc::now(),
        };
        let io_err = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&entry).map_err(|source| CacheError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(io_err)
    }

    /// A recorder that writes every submission for `target` to this cache.
    pub fn recorder(self, target: impl Into<String>) -> CacheRecorder {
        CacheRecorder {
            cache: self,
            target: target.into(),
        }
    }

    /// The last recorded deploy, if any.
    pub fn latest(&self) -> Result<Option<CachedDeploy>, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }
}

#[derive(Debug, Clone)]
pub struct CacheRecorder {
    cache: DeployCache,
    target: String,
}

impl SubmissionRecorder for CacheRecorder {
    fn submitted(&self, id: &DeployId) -> Result<(), CacheError> {
        self.cache.record(id, &self.target)
    }
}
