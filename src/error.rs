// ABOUTME: Application-wide error types for orgdeploy.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::deploy::{CacheError, DeployError, DeployStatus};
use crate::formatter::FormatError;
use crate::tracking::TrackingError;
use crate::transport::TransportError;
use crate::types::DeployId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("no target selected: pass --target or set default_target")]
    NoTarget,

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no deploy to report on: pass --job-id or run a deploy first")]
    NoRecentDeploy,

    /// The deploy ran to completion but did not succeed.
    #[error("deploy {id} finished with status {status}")]
    DeployFailed { id: DeployId, status: DeployStatus },

    #[error(transparent)]
    Deploy(#[from] DeployError),

    #[error(transparent)]
    Tracking(#[from] TrackingError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
