// ABOUTME: Configuration types and parsing for orgdeploy.yml.
// ABOUTME: Handles YAML parsing, env var secrets, and target selection.

mod deserialize;
mod env_value;
mod init;

pub use env_value::EnvValue;
pub use init::init_config;

use deserialize::{
    deserialize_api_version, deserialize_api_version_option, deserialize_package_directories,
};

use crate::error::{Error, Result};
use crate::types::ApiVersion;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "orgdeploy.yml";
pub const CONFIG_FILENAME_ALT: &str = "orgdeploy.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".orgdeploy/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default, deserialize_with = "deserialize_api_version")]
    pub api_version: ApiVersion,

    /// Version written into generated manifests. Defaults to `api_version`.
    #[serde(default, deserialize_with = "deserialize_api_version_option")]
    pub source_api_version: Option<ApiVersion>,

    #[serde(
        default = "default_package_directories",
        deserialize_with = "deserialize_package_directories"
    )]
    pub package_directories: NonEmpty<PathBuf>,

    #[serde(default)]
    pub default_target: Option<String>,

    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,

    /// Directory the config was discovered in.
    #[serde(skip)]
    pub root: PathBuf,
}

/// Connection settings for one org.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub instance_url: String,
    pub access_token: EnvValue,
    #[serde(default)]
    pub username: Option<String>,
}

fn default_package_directories() -> NonEmpty<PathBuf> {
    NonEmpty::new(PathBuf::from("force-app"))
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        if config.poll_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if let Some(name) = &config.default_target
            && !config.targets.contains_key(name)
        {
            return Err(Error::UnknownTarget(name.clone()));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Find the config in `dir`. The project root is `dir`.
    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                let mut config = Self::load(path)?;
                config.root = dir.to_path_buf();
                return Ok(config);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// Select a target: the named one, else `default_target`, else the only one.
    pub fn target(&self, name: Option<&str>) -> Result<(&str, &TargetConfig)> {
        let name = match name.or(self.default_target.as_deref()) {
            Some(name) => name,
            None if self.targets.len() == 1 => {
                return self
                    .targets
                    .iter()
                    .next()
                    .map(|(name, target)| (name.as_str(), target))
                    .ok_or(Error::NoTarget);
            }
            None => return Err(Error::NoTarget),
        };

        self.targets
            .get_key_value(name)
            .map(|(name, target)| (name.as_str(), target))
            .ok_or_else(|| Error::UnknownTarget(name.to_string()))
    }

    pub fn package_directories(&self) -> Vec<PathBuf> {
        self.package_directories.iter().cloned().collect()
    }
}
