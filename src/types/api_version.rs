// ABOUTME: Metadata API version in the "NN.0" form.
// ABOUTME: Used for package manifests and REST endpoint paths.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiVersionError {
    #[error("API version must look like \"61.0\", got \"{0}\"")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion(u32);

impl ApiVersion {
    pub const fn new(major: u32) -> Self {
        Self(major)
    }

    pub fn major(&self) -> u32 {
        self.0
    }
}

impl Default for ApiVersion {
    fn default() -> Self {
        Self(61)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.0", self.0)
    }
}

impl FromStr for ApiVersion {
    type Err = ApiVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let major = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        major
            .parse::<u32>()
            .ok()
            .filter(|m| *m > 0)
            .map(Self)
            .ok_or_else(|| ApiVersionError::Malformed(s.to_string()))
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = ApiVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.to_string()
    }
}
