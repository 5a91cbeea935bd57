// ABOUTME: Metadata name selectors such as "ApexClass" or "ApexClass:Foo*".
// ABOUTME: Matches component keys by type and optional member pattern.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataNameError {
    #[error("metadata name cannot be empty")]
    Empty,

    #[error("metadata type is missing in \"{0}\"")]
    MissingType(String),

    #[error("invalid character in metadata type: '{0}'")]
    InvalidChar(char),
}

/// A `Type` or `Type:Member` selector. A member ending in `*` matches by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetadataName {
    type_name: String,
    member: Option<String>,
}

impl MetadataName {
    pub fn new(value: &str) -> Result<Self, MetadataNameError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(MetadataNameError::Empty);
        }

        let (type_name, member) = match value.split_once(':') {
            Some((t, m)) => (t.trim(), Some(m.trim())),
            None => (value, None),
        };

        if type_name.is_empty() {
            return Err(MetadataNameError::MissingType(value.to_string()));
        }

        if let Some(c) = type_name.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(MetadataNameError::InvalidChar(c));
        }

        Ok(Self {
            type_name: type_name.to_string(),
            member: member.filter(|m| !m.is_empty()).map(str::to_string),
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// Whether this selector covers the given component.
    pub fn matches(&self, type_name: &str, full_name: &str) -> bool {
        if self.type_name != type_name {
            return false;
        }
        match self.member.as_deref() {
            None | Some("*") => true,
            Some(pattern) => match pattern.strip_suffix('*') {
                Some(prefix) => full_name.starts_with(prefix),
                None => pattern == full_name,
            },
        }
    }
}

impl fmt::Display for MetadataName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member {
            Some(m) => write!(f, "{}:{}", self.type_name, m),
            None => write!(f, "{}", self.type_name),
        }
    }
}

impl FromStr for MetadataName {
    type Err = MetadataNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
