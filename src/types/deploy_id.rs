// ABOUTME: Deploy request identifier issued by the org.
// ABOUTME: Validates the 15 or 18 character alphanumeric record id format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeployIdError {
    #[error("deploy id cannot be empty")]
    Empty,

    #[error("deploy id must be 15 or 18 characters, got {0}")]
    InvalidLength(usize),

    #[error("invalid character in deploy id: '{0}'")]
    InvalidChar(char),
}

/// Identifier of one deploy request, also used to replay a validated deploy.
#[must_use = "deploy ids reference remote requests and should not be ignored"]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeployId(String);

impl DeployId {
    pub fn new(value: &str) -> Result<Self, DeployIdError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DeployIdError::Empty);
        }

        if let Some(c) = value.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(DeployIdError::InvalidChar(c));
        }

        if value.len() != 15 && value.len() != 18 {
            return Err(DeployIdError::InvalidLength(value.len()));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeployId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DeployId {
    type Err = DeployIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DeployId {
    type Error = DeployIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<DeployId> for String {
    fn from(id: DeployId) -> Self {
        id.0
    }
}
