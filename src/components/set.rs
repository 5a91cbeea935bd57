// ABOUTME: Ordered set of deployable components keyed by type and name.
// ABOUTME: Tracks the source files behind each component and destructive changes.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::types::ApiVersion;

/// Identity of a component: metadata type plus full name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentKey {
    pub type_name: String,
    pub full_name: String,
}

impl ComponentKey {
    pub fn new(type_name: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            full_name: full_name.into(),
        }
    }

    /// Parse the `Type:Name` form used by tracking files.
    pub fn parse(value: &str) -> Option<Self> {
        let (type_name, full_name) = value.split_once(':')?;
        (!type_name.is_empty() && !full_name.is_empty()).then(|| Self::new(type_name, full_name))
    }
}

impl fmt::Display for ComponentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name, self.full_name)
    }
}

/// A source file that belongs to a component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// Path inside the deploy archive.
    pub archive_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(flatten)]
    pub key: ComponentKey,
    pub files: BTreeSet<SourceFile>,
}

impl Component {
    pub fn new(key: ComponentKey) -> Self {
        Self {
            key,
            files: BTreeSet::new(),
        }
    }
}

/// The resolved collection of components for one deploy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentSet {
    components: BTreeMap<ComponentKey, Component>,
    destructive_pre: BTreeSet<ComponentKey>,
    destructive_post: BTreeSet<ComponentKey>,
    source_api_version: ApiVersion,
}

impl ComponentSet {
    pub fn new(source_api_version: ApiVersion) -> Self {
        Self {
            source_api_version,
            ..Self::default()
        }
    }

    /// Add a file to the set, creating its component if needed.
    pub fn add_file(&mut self, key: ComponentKey, file: SourceFile) {
        self.components
            .entry(key.clone())
            .or_insert_with(|| Component::new(key))
            .files
            .insert(file);
    }

    pub fn insert(&mut self, component: Component) {
        match self.components.get_mut(&component.key) {
            Some(existing) => existing.files.extend(component.files),
            None => {
                self.components.insert(component.key.clone(), component);
            }
        }
    }

    pub fn add_destructive(&mut self, key: ComponentKey, post: bool) {
        if post {
            self.destructive_post.insert(key);
        } else {
            self.destructive_pre.insert(key);
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True when there is nothing to deploy or delete.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
            && self.destructive_pre.is_empty()
            && self.destructive_post.is_empty()
    }

    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.components.contains_key(key)
    }

    pub fn get(&self, key: &ComponentKey) -> Option<&Component> {
        self.components.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ComponentKey> {
        self.components.keys()
    }

    pub fn destructive_pre(&self) -> &BTreeSet<ComponentKey> {
        &self.destructive_pre
    }

    pub fn destructive_post(&self) -> &BTreeSet<ComponentKey> {
        &self.destructive_post
    }

    pub fn has_destructive_changes(&self) -> bool {
        !self.destructive_pre.is_empty() || !self.destructive_post.is_empty()
    }

    pub fn source_api_version(&self) -> ApiVersion {
        self.source_api_version
    }

    pub fn set_source_api_version(&mut self, version: ApiVersion) {
        self.source_api_version = version;
    }

    /// Find the component that owns a project-relative file.
    pub fn key_for_path(&self, path: &Path) -> Option<&ComponentKey> {
        self.components
            .values()
            .find(|c| c.files.iter().any(|f| f.path == path))
            .map(|c| &c.key)
    }

    /// Keep only the components accepted by the predicate.
    pub fn retain(&mut self, mut keep: impl FnMut(&ComponentKey) -> bool) {
        self.components.retain(|key, _| keep(key));
    }

    /// Members grouped by type, the shape a package manifest needs.
    pub fn members_by_type(&self) -> BTreeMap<String, Vec<String>> {
        group_by_type(self.components.keys())
    }
}

pub(crate) fn group_by_type<'a>(
    keys: impl Iterator<Item = &'a ComponentKey>,
) -> BTreeMap<String, Vec<String>> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for key in keys {
        grouped
            .entry(key.type_name.clone())
            .or_default()
            .push(key.full_name.clone());
    }
    grouped
}

impl<'a> IntoIterator for &'a ComponentSet {
    type Item = &'a Component;
    type IntoIter = std::collections::btree_map::Values<'a, ComponentKey, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.values()
    }
}
