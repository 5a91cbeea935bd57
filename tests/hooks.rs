// ABOUTME: Integration tests for hooks system.
// ABOUTME: Tests hook discovery, execution, stdin payloads, and environment variable passing.

use orgdeploy::components::{Component, ComponentKey};
use orgdeploy::deploy::{DeployResult, DeployStatus};
use orgdeploy::hooks::{HookContext, HookError, HookPoint, LifecycleHooks, ScriptHooks};
use orgdeploy::types::DeployId;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

fn create_hook(dir: &TempDir, name: &str, script: &str) {
    let hooks_dir = dir.path().join(".orgdeploy").join("hooks");
    fs::create_dir_all(&hooks_dir).unwrap();

    let hook_path = hooks_dir.join(name);
    fs::write(&hook_path, script).unwrap();

    // Make executable
    let mut perms = fs::metadata(&hook_path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&hook_path, perms).unwrap();
}

fn test_context() -> HookContext {
    HookContext {
        target: "qa".to_string(),
        instance_url: "https://qa.my.salesforce.com".to_string(),
        api_version: "61.0".to_string(),
        username: Some("qa@example.com".to_string()),
    }
}

fn succeeded() -> DeployResult {
    let mut result = DeployResult::queued(DeployId::new("0Af000000000001").unwrap());
    result.status = DeployStatus::Succeeded;
    result.done = true;
    result.success = true;
    result
}

/// Test: predeploy hook receives the component list on stdin.
#[tokio::test]
async fn predeploy_hook_receives_components() {
    let temp_dir = TempDir::new().unwrap();
    let capture = temp_dir.path().join("payload.json");
    create_hook(
        &temp_dir,
        "predeploy",
        &format!("#!/bin/sh\ncat > '{}'\nexit 0\n", capture.display()),
    );

    let hooks = ScriptHooks::new(temp_dir.path(), test_context());
    assert!(hooks.hook_exists(HookPoint::PreDeploy));

    let components = [Component::new(ComponentKey::new("ApexClass", "Foo"))];
    hooks.pre_deploy(&components).await.unwrap();

    let payload: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&capture).unwrap()).unwrap();
    assert_eq!(payload["components"][0]["fullName"], "Foo");
    assert_eq!(payload["components"][0]["typeName"], "ApexClass");
}

/// Test: postdeploy hook receives the deploy result.
#[tokio::test]
async fn postdeploy_hook_receives_result() {
    let temp_dir = TempDir::new().unwrap();
    let capture = temp_dir.path().join("result.json");
    create_hook(
        &temp_dir,
        "postdeploy",
        &format!("#!/bin/sh\ncat > '{}'\n", capture.display()),
    );

    let hooks = ScriptHooks::new(temp_dir.path(), test_context());
    hooks.post_deploy(&succeeded()).await.unwrap();

    let payload: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&capture).unwrap()).unwrap();
    assert_eq!(payload["id"], "0Af000000000001");
    assert_eq!(payload["status"], "Succeeded");
}

/// Test: a non-zero exit aborts with the hook's stderr.
#[tokio::test]
async fn failing_hook_returns_error() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "predeploy",
        "#!/bin/sh\necho 'not today' >&2\nexit 3\n",
    );

    let hooks = ScriptHooks::new(temp_dir.path(), test_context());
    let err = hooks.pre_deploy(&[]).await.unwrap_err();

    match err {
        HookError::Failed {
            point,
            exit_code,
            stderr,
        } => {
            assert_eq!(point, HookPoint::PreDeploy);
            assert_eq!(exit_code, Some(3));
            assert_eq!(stderr, "not today");
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

/// Test: hooks see the target context in their environment.
#[tokio::test]
async fn hook_receives_environment_variables() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(
        &temp_dir,
        "postdeploy",
        "#!/bin/sh\necho \"$ORGDEPLOY_TARGET $ORGDEPLOY_API_VERSION $ORGDEPLOY_USERNAME\"\n",
    );

    let hooks = ScriptHooks::new(temp_dir.path(), test_context());
    let result = hooks
        .run(HookPoint::PostDeploy, &serde_json::json!({}))
        .await
        .unwrap()
        .unwrap();

    assert!(result.success);
    assert_eq!(result.stdout.trim(), "qa 61.0 qa@example.com");
}

/// Test: a hook that never reads stdin still succeeds.
#[tokio::test]
async fn hook_ignoring_stdin_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    create_hook(&temp_dir, "predeploy", "#!/bin/sh\nexit 0\n");

    let hooks = ScriptHooks::new(temp_dir.path(), test_context());
    let many: Vec<Component> = (0..2000)
        .map(|i| Component::new(ComponentKey::new("ApexClass", format!("Class{i}"))))
        .collect();

    hooks.pre_deploy(&many).await.unwrap();
}

/// Test: missing hook returns None.
#[tokio::test]
async fn missing_hook_returns_none() {
    let temp_dir = TempDir::new().unwrap();
    let hooks = ScriptHooks::new(temp_dir.path(), test_context());

    assert!(!hooks.hook_exists(HookPoint::PostDeploy));
    let result = hooks
        .run(HookPoint::PostDeploy, &serde_json::json!({}))
        .await
        .unwrap();
    assert!(result.is_none());
}
