// ABOUTME: Lifecycle hooks fired around deploy submission.
// ABOUTME: Defines the LifecycleHooks seam and the script runner for .orgdeploy/hooks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::components::Component;
use crate::deploy::DeployResult;

/// Hook execution points in the deploy lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    /// Immediately before submission, with the final component list.
    PreDeploy,
    /// After polling reached a terminal result.
    PostDeploy,
}

impl HookPoint {
    /// Get the hook filename for this point.
    pub fn filename(&self) -> &'static str {
        match self {
            HookPoint::PreDeploy => "predeploy",
            HookPoint::PostDeploy => "postdeploy",
        }
    }
}

impl std::fmt::Display for HookPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.filename())
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("{point} hook failed with exit code {exit_code:?}: {stderr}")]
    Failed {
        point: HookPoint,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("failed to execute {point} hook: {source}")]
    Spawn {
        point: HookPoint,
        source: std::io::Error,
    },

    #[error("failed to encode {point} hook payload: {source}")]
    Payload {
        point: HookPoint,
        source: serde_json::Error,
    },
}

/// Receives lifecycle notifications. Errors abort the deploy.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    async fn pre_deploy(&self, components: &[Component]) -> Result<(), HookError>;

    async fn post_deploy(&self, result: &DeployResult) -> Result<(), HookError>;
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

#[async_trait]
impl LifecycleHooks for NoHooks {
    async fn pre_deploy(&self, _components: &[Component]) -> Result<(), HookError> {
        Ok(())
    }

    async fn post_deploy(&self, _result: &DeployResult) -> Result<(), HookError> {
        Ok(())
    }
}

/// Context passed to hooks via environment variables.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub target: String,
    pub instance_url: String,
    pub api_version: String,
    pub username: Option<String>,
}

impl HookContext {
    /// Convert context to environment variables.
    pub fn to_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("ORGDEPLOY_TARGET".to_string(), self.target.clone());
        env.insert("ORGDEPLOY_INSTANCE_URL".to_string(), self.instance_url.clone());
        env.insert("ORGDEPLOY_API_VERSION".to_string(), self.api_version.clone());
        if let Some(ref username) = self.username {
            env.insert("ORGDEPLOY_USERNAME".to_string(), username.clone());
        }
        env
    }
}

/// Result of running a hook.
#[derive(Debug)]
pub struct HookResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Discovers and runs hook scripts from a project directory.
#[derive(Debug, Clone)]
pub struct ScriptHooks {
    hooks_dir: PathBuf,
    context: HookContext,
}

impl ScriptHooks {
    /// Create a runner looking for hooks in the given project directory.
    pub fn new(project_dir: &Path, context: HookContext) -> Self {
        Self {
            hooks_dir: project_dir.join(".orgdeploy").join("hooks"),
            context,
        }
    }

    /// Check if a hook exists for the given point.
    pub fn hook_exists(&self, point: HookPoint) -> bool {
        self.hook_path(point).is_file()
    }

    fn hook_path(&self, point: HookPoint) -> PathBuf {
        self.hooks_dir.join(point.filename())
    }

    /// Run a hook if it exists, passing `payload` as JSON on stdin.
    ///
    /// Returns None if the hook doesn't exist.
    pub async fn run(
        &self,
        point: HookPoint,
        payload: &serde_json::Value,
    ) -> Result<Option<HookResult>, HookError> {
        let hook_path = self.hook_path(point);
        if !hook_path.is_file() {
            return Ok(None);
        }

        tracing::info!("Running {} hook: {}", point, hook_path.display());

        let input =
            serde_json::to_vec(payload).map_err(|source| HookError::Payload { point, source })?;
        let spawn_err = |source| HookError::Spawn { point, source };

        let mut child = Command::new(&hook_path)
            .envs(self.context.to_env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        if let Some(mut stdin) = child.stdin.take() {
            // A hook may exit without reading its input.
            if let Err(e) = stdin.write_all(&input).await
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(spawn_err(e));
            }
        }

        let output = child.wait_with_output().await.map_err(spawn_err)?;
        let result = HookResult {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if result.success {
            tracing::info!("{} hook completed successfully", point);
        } else {
            tracing::warn!("{} hook failed with exit code {:?}", point, result.exit_code);
        }
        Ok(Some(result))
    }

    async fn run_checked(
        &self,
        point: HookPoint,
        payload: serde_json::Value,
    ) -> Result<(), HookError> {
        match self.run(point, &payload).await? {
            Some(result) if !result.success => Err(HookError::Failed {
                point,
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            }),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl LifecycleHooks for ScriptHooks {
    async fn pre_deploy(&self, components: &[Component]) -> Result<(), HookError> {
        self.run_checked(
            HookPoint::PreDeploy,
            serde_json::json!({ "components": components }),
        )
        .await
    }

    async fn post_deploy(&self, result: &DeployResult) -> Result<(), HookError> {
        let payload = serde_json::to_value(result).map_err(|source| HookError::Payload {
            point: HookPoint::PostDeploy,
            source,
        })?;
        self.run_checked(HookPoint::PostDeploy, payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> HookContext {
        HookContext {
            target: "dev".to_string(),
            instance_url: "https://example.my.salesforce.com".to_string(),
            api_version: "61.0".to_string(),
            username: Some("dev@example.com".to_string()),
        }
    }

    #[test]
    fn hook_point_filenames() {
        assert_eq!(HookPoint::PreDeploy.filename(), "predeploy");
        assert_eq!(HookPoint::PostDeploy.filename(), "postdeploy");
    }

    #[test]
    fn hook_context_to_env() {
        let env = context().to_env();
        assert_eq!(env.get("ORGDEPLOY_TARGET"), Some(&"dev".to_string()));
        assert_eq!(
            env.get("ORGDEPLOY_INSTANCE_URL"),
            Some(&"https://example.my.salesforce.com".to_string())
        );
        assert_eq!(env.get("ORGDEPLOY_API_VERSION"), Some(&"61.0".to_string()));
        assert_eq!(
            env.get("ORGDEPLOY_USERNAME"),
            Some(&"dev@example.com".to_string())
        );
    }

    #[test]
    fn hook_context_without_username() {
        let env = HookContext {
            username: None,
            ..context()
        }
        .to_env();
        assert!(!env.contains_key("ORGDEPLOY_USERNAME"));
    }

    #[test]
    fn hook_runner_checks_hooks_dir() {
        let hooks = ScriptHooks::new(Path::new("/nonexistent"), context());
        assert!(!hooks.hook_exists(HookPoint::PreDeploy));
    }

    #[tokio::test]
    async fn missing_hooks_are_a_no_op() {
        let hooks = ScriptHooks::new(Path::new("/nonexistent"), context());
        hooks.pre_deploy(&[]).await.unwrap();
    }
}
