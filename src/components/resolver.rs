// ABOUTME: Resolves user selections (paths, metadata names, manifests) into component sets.
// ABOUTME: Defines the ComponentResolver seam and the filesystem-backed SourceResolver.

use nonempty::NonEmpty;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::manifest::{Manifest, ManifestError};
use super::registry::{classify, lookup_type};
use super::set::{ComponentKey, ComponentSet, SourceFile};
use crate::types::{ApiVersion, MetadataName};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("source path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("source path is outside the project: {0}")]
    OutsideProject(PathBuf),

    #[error("unknown metadata type: {0}")]
    UnknownType(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// What the user asked to deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSelection {
    Manifest(PathBuf),
    Metadata(NonEmpty<MetadataName>),
    SourcePaths(NonEmpty<PathBuf>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub api_version: ApiVersion,
    pub source_api_version: Option<ApiVersion>,
    pub selection: SourceSelection,
    pub destructive_pre: Option<PathBuf>,
    pub destructive_post: Option<PathBuf>,
}

/// Builds component sets from a selection.
pub trait ComponentResolver: Send + Sync {
    fn build(&self, options: &ResolveOptions) -> Result<ComponentSet, ResolveError>;
}

/// Resolves components from source files inside the project's package directories.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    project_root: PathBuf,
    package_directories: Vec<PathBuf>,
}

impl SourceResolver {
    pub fn new(project_root: impl Into<PathBuf>, package_directories: Vec<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            package_directories,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Every classifiable component in the package directories.
    pub fn scan_project(&self) -> Result<ComponentSet, ResolveError> {
        let mut set = ComponentSet::default();
        self.scan(&self.package_directories, &mut set)?;
        Ok(set)
    }

    /// Classify every file under the given project-relative roots.
    fn scan(&self, roots: &[PathBuf], set: &mut ComponentSet) -> Result<(), ResolveError> {
        for root in roots {
            let full = self.project_root.join(root);
            if !full.exists() {
                return Err(ResolveError::PathNotFound(root.clone()));
            }
            let mut files = Vec::new();
            collect_files(&full, &mut files)?;
            for file in files {
                let relative = file
                    .strip_prefix(&self.project_root)
                    .map_err(|_| ResolveError::OutsideProject(file.clone()))?
                    .to_path_buf();
                if let Some(classified) = classify(&relative) {
                    set.add_file(
                        classified.key,
                        SourceFile {
                            path: relative,
                            archive_path: classified.archive_path,
                        },
                    );
                }
            }
        }
        Ok(())
    }

    /// Scan all package directories and keep components matching any selector.
    fn select(
        &self,
        selectors: &[MetadataName],
        set: &mut ComponentSet,
    ) -> Result<(), ResolveError> {
        for selector in selectors {
            if lookup_type(selector.type_name()).is_none() {
                return Err(ResolveError::UnknownType(selector.type_name().to_string()));
            }
        }

        self.scan(&self.package_directories, set)?;
        set.retain(|key| {
            selectors
                .iter()
                .any(|s| s.matches(&key.type_name, &key.full_name))
        });
        Ok(())
    }

    /// Make a user-supplied path project-relative.
    fn relative_path(&self, path: &Path) -> Result<PathBuf, ResolveError> {
        if path.is_absolute() {
            path.strip_prefix(&self.project_root)
                .map(Path::to_path_buf)
                .map_err(|_| ResolveError::OutsideProject(path.to_path_buf()))
        } else {
            Ok(path.to_path_buf())
        }
    }

    fn manifest_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    fn add_destructive(
        &self,
        path: &Path,
        post: bool,
        set: &mut ComponentSet,
    ) -> Result<(), ResolveError> {
        let manifest = Manifest::load(&self.manifest_path(path))?;
        for (type_name, members) in &manifest.types {
            for member in members {
                set.add_destructive(ComponentKey::new(type_name.as_str(), member.as_str()), post);
            }
        }
        Ok(())
    }
}

impl ComponentResolver for SourceResolver {
    fn build(&self, options: &ResolveOptions) -> Result<ComponentSet, ResolveError> {
        let version = options.source_api_version.unwrap_or(options.api_version);
        let mut set = ComponentSet::new(version);

        match &options.selection {
            SourceSelection::SourcePaths(paths) => {
                let roots = paths
                    .iter()
                    .map(|p| self.relative_path(p))
                    .collect::<Result<Vec<_>, _>>()?;
                self.scan(&roots, &mut set)?;
            }
            SourceSelection::Metadata(names) => {
                let selectors: Vec<MetadataName> = names.iter().cloned().collect();
                self.select(&selectors, &mut set)?;
            }
            SourceSelection::Manifest(path) => {
                let manifest = Manifest::load(&self.manifest_path(path))?;
                self.select(&manifest.selectors()?, &mut set)?;
                if let Some(version) = manifest.version {
                    set.set_source_api_version(version);
                }
            }
        }

        if let Some(path) = &options.destructive_pre {
            self.add_destructive(path, false, &mut set)?;
        }
        if let Some(path) = &options.destructive_post {
            self.add_destructive(path, true, &mut set)?;
        }

        tracing::debug!(components = set.len(), "resolved component set");
        Ok(set)
    }
}

/// Recursively collect files in sorted order, skipping hidden entries.
fn collect_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<(), ResolveError> {
    if path.is_file() {
        out.push(path.to_path_buf());
        return Ok(());
    }

    let read_err = |source| ResolveError::Read {
        path: path.to_path_buf(),
        source,
    };
    let mut entries = fs::read_dir(path)
        .map_err(read_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(read_err)?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        collect_files(&entry.path(), out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nonempty::nonempty;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("force-app/main/default");
        for (path, content) in [
            ("classes/Foo.cls", "class Foo {}"),
            ("classes/Foo.cls-meta.xml", "<meta/>"),
            ("classes/FooTest.cls", "class FooTest {}"),
            ("triggers/AccountTrigger.trigger", "trigger t on Account {}"),
            ("lwc/hello/hello.js", "export default {}"),
            ("lwc/.eslintrc.json", "{}"),
        ] {
            let full = base.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        dir
    }

    fn options(selection: SourceSelection) -> ResolveOptions {
        ResolveOptions {
            api_version: ApiVersion::new(61),
            source_api_version: None,
            selection,
            destructive_pre: None,
            destructive_post: None,
        }
    }

    #[test]
    fn resolves_source_paths() {
        let dir = project();
        let resolver = SourceResolver::new(dir.path(), vec![PathBuf::from("force-app")]);
        let set = resolver
            .build(&options(SourceSelection::SourcePaths(nonempty![
                PathBuf::from("force-app/main/default/classes")
            ])))
            .unwrap();

        let keys: Vec<String> = set.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["ApexClass:Foo", "ApexClass:FooTest"]);
    }

    #[test]
    fn resolves_metadata_selectors_across_package_directories() {
        let dir = project();
        let resolver = SourceResolver::new(dir.path(), vec![PathBuf::from("force-app")]);
        let set = resolver
            .build(&options(SourceSelection::Metadata(nonempty![
                MetadataName::new("ApexClass:Foo").unwrap(),
                MetadataName::new("LightningComponentBundle").unwrap()
            ])))
            .unwrap();

        let keys: Vec<String> = set.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["ApexClass:Foo", "LightningComponentBundle:hello"]);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let dir = project();
        let resolver = SourceResolver::new(dir.path(), vec![PathBuf::from("force-app")]);
        let err = resolver
            .build(&options(SourceSelection::Metadata(nonempty![
                MetadataName::new("Widget").unwrap()
            ])))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnknownType(t) if t == "Widget"));
    }

    #[test]
    fn missing_source_path_is_an_error() {
        let dir = project();
        let resolver = SourceResolver::new(dir.path(), vec![PathBuf::from("force-app")]);
        let err = resolver
            .build(&options(SourceSelection::SourcePaths(nonempty![
                PathBuf::from("nope")
            ])))
            .unwrap_err();
        assert!(matches!(err, ResolveError::PathNotFound(_)));
    }

    #[test]
    fn manifest_selects_components_and_sets_version() {
        let dir = project();
        fs::write(
            dir.path().join("package.xml"),
            r#"<Package><types><members>Foo*</members><name>ApexClass</name></types><version>59.0</version></Package>"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("destructive.xml"),
            r#"<Package><types><members>Legacy</members><name>ApexClass</name></types></Package>"#,
        )
        .unwrap();

        let resolver = SourceResolver::new(dir.path(), vec![PathBuf::from("force-app")]);
        let mut opts = options(SourceSelection::Manifest(PathBuf::from("package.xml")));
        opts.destructive_post = Some(PathBuf::from("destructive.xml"));
        let set = resolver.build(&opts).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.source_api_version(), ApiVersion::new(59));
        assert!(
            set.destructive_post()
                .contains(&ComponentKey::new("ApexClass", "Legacy"))
        );
    }
}
