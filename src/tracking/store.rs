// ABOUTME: File-backed source tracking store under .orgdeploy/orgs/<target>/.
// ABOUTME: Hashes local files with blake3 and records remote member revisions.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::lock::TrackingLock;
use super::{ChangeFilter, ChangeKind, ChangeOrigin, SourceTracking, TrackedChange, TrackingError};
use crate::components::{ComponentKey, ComponentSet, SourceResolver};
use crate::deploy::{DeployResult, DeployStatus};
use crate::transport::{RemoteMember, RemoteMemberSource};

const STATE_DIR: &str = ".orgdeploy/orgs";

/// Last synced content of one local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: String,
    /// `Type:Name` of the owning component.
    pub component: String,
}

/// Persisted tracking baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingState {
    /// Project-relative path (forward slashes) to its last deployed content.
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
    /// `Type:Name` to the last seen remote revision.
    #[serde(default)]
    pub members: BTreeMap<String, u64>,
}

impl TrackingState {
    pub fn load(path: &Path) -> Result<Option<Self>, TrackingError> {
        match fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content)
                .map(Some)
                .map_err(|source| TrackingError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TrackingError::io(path, e)),
        }
    }

    /// Write via a temporary file and rename so readers never see a partial store.
    pub fn save(&self, path: &Path) -> Result<(), TrackingError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| TrackingError::Corrupt {
            path: path.to_path_buf(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| TrackingError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| TrackingError::io(path, e))
    }

    fn record_members(&mut self, members: &[RemoteMember], keep: impl Fn(&ComponentKey) -> bool) {
        for member in members.iter().filter(|m| keep(&m.key)) {
            let key = member.key.to_string();
            if member.deleted {
                self.members.remove(&key);
            } else {
                self.members.insert(key, member.revision);
            }
        }
    }
}

/// Source tracking persisted in the project directory for one target org.
pub struct ProjectTracking<R> {
    project_root: PathBuf,
    state_path: PathBuf,
    resolver: SourceResolver,
    remote: R,
    state: Mutex<TrackingState>,
    _lock: TrackingLock,
}

impl<R> std::fmt::Debug for ProjectTracking<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectTracking")
            .field("state_path", &self.state_path)
            .finish()
    }
}

impl<R: RemoteMemberSource> ProjectTracking<R> {
    /// Lock and load the store, creating a remote baseline on first use.
    ///
    /// On first use every local file counts as added and no remote change is reported.
    pub async fn open(
        project_root: &Path,
        target: &str,
        resolver: SourceResolver,
        remote: R,
    ) -> Result<Self, TrackingError> {
        let dir = Self::store_dir(project_root, target);
        let lock = TrackingLock::acquire(&dir.join("tracking.lock"), target)?;
        let state_path = dir.join("tracking.json");

        let state = match TrackingState::load(&state_path)? {
            Some(state) => state,
            None => {
                tracing::info!(target, "initializing source tracking baseline");
                let mut state = TrackingState::default();
                let members = remote.source_members().await?;
                state.record_members(&members, |_| true);
                state.save(&state_path)?;
                state
            }
        };

        Ok(Self {
            project_root: project_root.to_path_buf(),
            state_path,
            resolver,
            remote,
            state: Mutex::new(state),
            _lock: lock,
        })
    }

    pub fn store_dir(project_root: &Path, target: &str) -> PathBuf {
        project_root.join(STATE_DIR).join(target)
    }

    pub fn state(&self) -> TrackingState {
        self.state.lock().clone()
    }

    fn local_changes(&self) -> Result<Vec<TrackedChange>, TrackingError> {
        let current = self.resolver.scan_project()?;
        let state = self.state.lock();
        let mut seen = HashSet::new();
        let mut changes = Vec::new();

        for component in current.iter() {
            for file in &component.files {
                let key = store_key(&file.path);
                let hash = hash_file(&self.project_root.join(&file.path))?;
                let kind = match state.files.get(&key) {
                    None => Some(ChangeKind::Added),
                    Some(record) if record.hash != hash => Some(ChangeKind::Modified),
                    Some(_) => None,
                };
                seen.insert(key);
                if let Some(kind) = kind {
                    changes.push(TrackedChange {
                        origin: ChangeOrigin::Local,
                        kind,
                        key: component.key.clone(),
                        path: Some(file.path.clone()),
                    });
                }
            }
        }

        for (path, record) in state.files.iter().filter(|(p, _)| !seen.contains(*p)) {
            if let Some(key) = ComponentKey::parse(&record.component) {
                changes.push(TrackedChange {
                    origin: ChangeOrigin::Local,
                    kind: ChangeKind::Deleted,
                    key,
                    path: Some(PathBuf::from(path)),
                });
            }
        }

        Ok(changes)
    }

    async fn remote_changes(&self) -> Result<Vec<TrackedChange>, TrackingError> {
        let members = self.remote.source_members().await?;
        let state = self.state.lock();

        Ok(members
            .into_iter()
            .filter_map(|member| {
                let recorded = state.members.get(&member.key.to_string()).copied();
                let kind = match recorded {
                    Some(rev) if rev >= member.revision => return None,
                    _ if member.deleted => ChangeKind::Deleted,
                    Some(_) => ChangeKind::Modified,
                    None => ChangeKind::Added,
                };
                Some(TrackedChange {
                    origin: ChangeOrigin::Remote,
                    kind,
                    key: member.key,
                    path: None,
                })
            })
            .collect())
    }
}

#[async_trait]
impl<R: RemoteMemberSource> SourceTracking for ProjectTracking<R> {
    async fn changes(&self, filter: ChangeFilter) -> Result<Vec<TrackedChange>, TrackingError> {
        let mut changes = Vec::new();
        if filter.origin != Some(ChangeOrigin::Remote) {
            changes.extend(self.local_changes()?);
        }
        if filter.origin != Some(ChangeOrigin::Local) {
            changes.extend(self.remote_changes().await?);
        }
        changes.retain(|c| filter.matches(c));
        Ok(changes)
    }

    async fn update_from_deploy(
        &self,
        result: &DeployResult,
        components: &ComponentSet,
    ) -> Result<(), TrackingError> {
        let mut deployed: HashSet<ComponentKey> = if result.status == DeployStatus::Succeeded {
            components.keys().cloned().collect()
        } else {
            result
                .details
                .component_successes
                .iter()
                .map(|c| c.key())
                .filter(|k| components.contains(k))
                .collect()
        };
        let destroyed: HashSet<ComponentKey> = components
            .destructive_pre()
            .iter()
            .chain(components.destructive_post())
            .cloned()
            .collect();

        let members = self.remote.source_members().await?;

        let mut state = self.state.lock();
        for component in components.iter().filter(|c| deployed.contains(&c.key)) {
            let owner = component.key.to_string();
            state.files.retain(|_, record| record.component != owner);
            for file in &component.files {
                let full = self.project_root.join(&file.path);
                if full.exists() {
                    state.files.insert(
                        store_key(&file.path),
                        FileRecord {
                            hash: hash_file(&full)?,
                            component: owner.clone(),
                        },
                    );
                }
            }
        }

        for key in &destroyed {
            let owner = key.to_string();
            state.files.retain(|_, record| record.component != owner);
            state.members.remove(&owner);
        }

        deployed.extend(destroyed);
        state.record_members(&members, |key| deployed.contains(key));
        state.save(&self.state_path)?;

        tracing::debug!(components = deployed.len(), "advanced source tracking");
        Ok(())
    }
}

fn store_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn hash_file(path: &Path) -> Result<String, TrackingError> {
    let bytes = fs::read(path).map_err(|e| TrackingError::io(path, e))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use crate::types::DeployId;

    #[derive(Default)]
    struct StaticRemote {
        members: Mutex<Vec<RemoteMember>>,
    }

    impl StaticRemote {
        fn set(&self, members: Vec<RemoteMember>) {
            *self.members.lock() = members;
        }
    }

    #[async_trait]
    impl RemoteMemberSource for std::sync::Arc<StaticRemote> {
        async fn source_members(&self) -> Result<Vec<RemoteMember>, TransportError> {
            Ok(self.members.lock().clone())
        }
    }

    fn member(name: &str, revision: u64) -> RemoteMember {
        RemoteMember {
            key: ComponentKey::new("ApexClass", name),
            revision,
            deleted: false,
        }
    }

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("force-app/main/default/classes");
        fs::create_dir_all(&classes).unwrap();
        fs::write(classes.join("Foo.cls"), "class Foo {}").unwrap();
        fs::write(classes.join("Bar.cls"), "class Bar {}").unwrap();
        dir
    }

    async fn open(
        dir: &Path,
        remote: &std::sync::Arc<StaticRemote>,
    ) -> ProjectTracking<std::sync::Arc<StaticRemote>> {
        let resolver = SourceResolver::new(dir, vec![PathBuf::from("force-app")]);
        ProjectTracking::open(dir, "dev", resolver, remote.clone())
            .await
            .unwrap()
    }

    fn succeeded(components: &ComponentSet) -> DeployResult {
        let mut result = DeployResult::queued(DeployId::new("0Af000000000001").unwrap());
        result.status = DeployStatus::Succeeded;
        result.done = true;
        result.number_components_total = components.len() as u32;
        result
    }

    #[tokio::test]
    async fn first_use_reports_local_files_as_added_and_no_remote_changes() {
        let dir = project();
        let remote = std::sync::Arc::new(StaticRemote::default());
        remote.set(vec![member("Foo", 3)]);

        let tracking = open(dir.path(), &remote).await;
        let changes = tracking.changes(ChangeFilter::all()).await.unwrap();

        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.origin == ChangeOrigin::Local));
        assert!(changes.iter().all(|c| c.kind == ChangeKind::Added));
        assert_eq!(tracking.state().members.get("ApexClass:Foo"), Some(&3));
    }

    #[tokio::test]
    async fn deploy_advances_local_and_remote_baseline() {
        let dir = project();
        let remote = std::sync::Arc::new(StaticRemote::default());
        let tracking = open(dir.path(), &remote).await;

        let components = SourceResolver::new(dir.path(), vec![PathBuf::from("force-app")])
            .scan_project()
            .unwrap();
        remote.set(vec![member("Foo", 1), member("Bar", 1)]);
        tracking
            .update_from_deploy(&succeeded(&components), &components)
            .await
            .unwrap();

        assert!(tracking.changes(ChangeFilter::all()).await.unwrap().is_empty());

        fs::write(
            dir.path().join("force-app/main/default/classes/Foo.cls"),
            "class Foo { }",
        )
        .unwrap();
        remote.set(vec![member("Foo", 2), member("Bar", 1)]);

        let local = tracking.changes(ChangeFilter::local()).await.unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].kind, ChangeKind::Modified);
        let remote_changes = tracking.changes(ChangeFilter::remote()).await.unwrap();
        assert_eq!(remote_changes.len(), 1);
        assert_eq!(remote_changes[0].key, ComponentKey::new("ApexClass", "Foo"));
    }

    #[tokio::test]
    async fn local_deletions_and_persistence() {
        let dir = project();
        let remote = std::sync::Arc::new(StaticRemote::default());
        {
            let tracking = open(dir.path(), &remote).await;
            let components = SourceResolver::new(dir.path(), vec![PathBuf::from("force-app")])
                .scan_project()
                .unwrap();
            tracking
                .update_from_deploy(&succeeded(&components), &components)
                .await
                .unwrap();
        }

        fs::remove_file(dir.path().join("force-app/main/default/classes/Bar.cls")).unwrap();
        let tracking = open(dir.path(), &remote).await;
        let deletions = tracking
            .changes(ChangeFilter::local_deletions())
            .await
            .unwrap();

        assert_eq!(deletions.len(), 1);
        assert_eq!(deletions[0].key, ComponentKey::new("ApexClass", "Bar"));
        assert_eq!(
            deletions[0].path.as_deref(),
            Some(Path::new("force-app/main/default/classes/Bar.cls"))
        );
    }

    #[tokio::test]
    async fn concurrent_open_is_rejected() {
        let dir = project();
        let remote = std::sync::Arc::new(StaticRemote::default());
        let _held = open(dir.path(), &remote).await;

        let resolver = SourceResolver::new(dir.path(), vec![PathBuf::from("force-app")]);
        let err = ProjectTracking::open(dir.path(), "dev", resolver, remote.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackingError::LockHeld { .. }));
    }

    #[test]
    fn corrupt_store_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracking.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            TrackingState::load(&path),
            Err(TrackingError::Corrupt { .. })
        ));
    }
}
