// ABOUTME: Builds the collaborators a command needs from the discovered config.
// ABOUTME: Target selection, token resolution, transport, resolver, hooks, and tracking loader.

use async_trait::async_trait;
use orgdeploy::components::SourceResolver;
use orgdeploy::config::Config;
use orgdeploy::deploy::RunSettings;
use orgdeploy::error::Result;
use orgdeploy::hooks::{HookContext, ScriptHooks};
use orgdeploy::tracking::{ProjectTracking, SourceTracking, TrackingError, TrackingLoader};
use orgdeploy::transport::{OrgConnection, RestTransport};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A project bound to one target org.
pub struct ProjectContext {
    pub config: Config,
    pub target: String,
    pub transport: RestTransport,
    pub resolver: SourceResolver,
    pub hooks: ScriptHooks,
}

impl ProjectContext {
    pub fn load(cwd: &Path, target: Option<&str>) -> Result<Self> {
        let config = Config::discover(cwd)?;
        let (name, target_config) = config.target(target)?;
        let name = name.to_string();

        let connection = OrgConnection {
            instance_url: target_config.instance_url.clone(),
            access_token: target_config.access_token.resolve()?,
            username: target_config.username.clone(),
        };
        let hooks = ScriptHooks::new(
            &config.root,
            HookContext {
                target: name.clone(),
                instance_url: connection.instance_url.clone(),
                api_version: config.api_version.to_string(),
                username: connection.username.clone(),
            },
        );
        let transport = RestTransport::new(connection, config.api_version, &config.root)?;
        let resolver = SourceResolver::new(&config.root, config.package_directories());

        tracing::debug!(target = %name, root = %config.root.display(), "project context loaded");
        Ok(Self {
            config,
            target: name,
            transport,
            resolver,
            hooks,
        })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn settings(&self) -> RunSettings {
        RunSettings {
            api_version: self.config.api_version,
            source_api_version: self.config.source_api_version,
            poll_interval: self.config.poll_interval,
        }
    }

    pub fn tracking_loader(&self) -> ProjectTrackingLoader {
        ProjectTrackingLoader {
            project_root: self.config.root.clone(),
            target: self.target.clone(),
            resolver: self.resolver.clone(),
            remote: self.transport.clone(),
        }
    }
}

/// Opens the file-backed tracking store only when a deploy asks for it.
pub struct ProjectTrackingLoader {
    project_root: PathBuf,
    target: String,
    resolver: SourceResolver,
    remote: RestTransport,
}

#[async_trait]
impl TrackingLoader for ProjectTrackingLoader {
    async fn load(&self) -> std::result::Result<Arc<dyn SourceTracking>, TrackingError> {
        let tracking = ProjectTracking::open(
            &self.project_root,
            &self.target,
            self.resolver.clone(),
            self.remote.clone(),
        )
        .await?;
        Ok(Arc::new(tracking))
    }
}
