// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles API versions written as numbers or strings, and package directory lists.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::PathBuf;

use crate::types::ApiVersion;

#[derive(Deserialize)]
#[serde(untagged)]
enum VersionEntry {
    Text(String),
    Number(f64),
}

impl VersionEntry {
    fn into_version(self) -> Result<ApiVersion, String> {
        let text = match self {
            VersionEntry::Text(s) => s,
            VersionEntry::Number(n) if n.fract() == 0.0 && n > 0.0 => format!("{n:.0}"),
            VersionEntry::Number(n) => return Err(format!("invalid API version {n}")),
        };
        text.parse().map_err(|e: crate::types::ApiVersionError| e.to_string())
    }
}

pub fn deserialize_api_version<'de, D>(deserializer: D) -> Result<ApiVersion, D::Error>
where
    D: serde::Deserializer<'de>,
{
    VersionEntry::deserialize(deserializer)?
        .into_version()
        .map_err(serde::de::Error::custom)
}

pub fn deserialize_api_version_option<'de, D>(
    deserializer: D,
) -> Result<Option<ApiVersion>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<VersionEntry>::deserialize(deserializer)?
        .map(VersionEntry::into_version)
        .transpose()
        .map_err(serde::de::Error::custom)
}

pub fn deserialize_package_directories<'de, D>(
    deserializer: D,
) -> Result<NonEmpty<PathBuf>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<PathBuf> = Vec::deserialize(deserializer)?;
    if let Some(absolute) = values.iter().find(|p| p.is_absolute()) {
        return Err(serde::de::Error::custom(format!(
            "package directory must be relative to the project: {}",
            absolute.display()
        )));
    }
    NonEmpty::from_vec(values)
        .ok_or_else(|| serde::de::Error::custom("at least one package directory is required"))
}
