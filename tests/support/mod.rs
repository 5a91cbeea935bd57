// ABOUTME: Test support utilities.
// ABOUTME: In-memory fakes for the transport, resolver, tracking, and hook seams.

use async_trait::async_trait;
use orgdeploy::components::{
    Component, ComponentKey, ComponentResolver, ComponentSet, ResolveError, ResolveOptions,
    SourceFile,
};
use orgdeploy::deploy::{ComponentOutcome, DeployOptions, DeployResult, DeployStatus};
use orgdeploy::hooks::{HookError, LifecycleHooks};
use orgdeploy::tracking::{
    ChangeFilter, ChangeKind, ChangeOrigin, SourceTracking, TrackedChange, TrackingError,
    TrackingLoader,
};
use orgdeploy::transport::{DeployTransport, TransportError};
use orgdeploy::types::{ApiVersion, DeployId};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env()
            .add_directive("orgdeploy=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Ordered record of calls across every fake sharing it.
pub type EventLog = Arc<Mutex<Vec<String>>>;

#[allow(dead_code)]
pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

#[allow(dead_code)]
pub const SUBMITTED_ID: &str = "0Af000000000001";
#[allow(dead_code)]
pub const VALIDATED_ID: &str = "0Af00000000000V";

pub fn deploy_id(value: &str) -> DeployId {
    DeployId::new(value).unwrap()
}

#[allow(dead_code)]
pub fn key(type_name: &str, name: &str) -> ComponentKey {
    ComponentKey::new(type_name, name)
}

/// A set of Apex classes, one file each.
#[allow(dead_code)]
pub fn class_set(names: &[&str]) -> ComponentSet {
    let mut set = ComponentSet::new(ApiVersion::default());
    for name in names {
        set.add_file(
            key("ApexClass", name),
            SourceFile {
                path: PathBuf::from(format!("force-app/classes/{name}.cls")),
                archive_path: format!("classes/{name}.cls"),
            },
        );
    }
    set
}

/// Build a result with the given status for the submitted id.
pub fn result_with(status: DeployStatus) -> DeployResult {
    let mut result = DeployResult::queued(deploy_id(SUBMITTED_ID));
    result.status = status;
    result.done = status.is_terminal();
    result.success = matches!(
        status,
        DeployStatus::Succeeded | DeployStatus::SucceededPartial
    );
    result
}

// =============================================================================
// Transport
// =============================================================================

/// One scripted answer to a status check.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum StatusReply {
    Result(DeployResult),
    /// The status request timed out.
    Timeout,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    Deploy {
        components: Vec<ComponentKey>,
        options: DeployOptions,
    },
    Replay(DeployId),
    Status(DeployId),
}

/// Records calls and answers status checks from a script.
///
/// The last scripted reply repeats once the script runs out.
pub struct FakeTransport {
    log: EventLog,
    calls: Mutex<Vec<TransportCall>>,
    replies: Mutex<VecDeque<StatusReply>>,
}

#[allow(dead_code)]
impl FakeTransport {
    pub fn new(log: EventLog, statuses: &[DeployStatus]) -> Self {
        Self::with_results(log, statuses.iter().map(|s| result_with(*s)).collect())
    }

    pub fn with_results(log: EventLog, results: Vec<DeployResult>) -> Self {
        Self::with_replies(log, results.into_iter().map(StatusReply::Result).collect())
    }

    pub fn with_replies(log: EventLog, replies: Vec<StatusReply>) -> Self {
        Self {
            log,
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().clone()
    }

    pub fn status_checks(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, TransportCall::Status(_)))
            .count()
    }

    pub fn deploys(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, TransportCall::Deploy { .. }))
            .count()
    }
}

#[async_trait]
impl DeployTransport for FakeTransport {
    async fn deploy(
        &self,
        components: &ComponentSet,
        options: &DeployOptions,
    ) -> Result<DeployId, TransportError> {
        self.log.lock().push("deploy".to_string());
        self.calls.lock().push(TransportCall::Deploy {
            components: components.keys().cloned().collect(),
            options: options.clone(),
        });
        Ok(deploy_id(SUBMITTED_ID))
    }

    async fn deploy_recent_validation(
        &self,
        validated_id: &DeployId,
        _options: &DeployOptions,
    ) -> Result<DeployId, TransportError> {
        self.log.lock().push("replay".to_string());
        self.calls
            .lock()
            .push(TransportCall::Replay(validated_id.clone()));
        Ok(deploy_id(SUBMITTED_ID))
    }

    async fn check_status(&self, id: &DeployId) -> Result<DeployResult, TransportError> {
        self.log.lock().push("status".to_string());
        self.calls.lock().push(TransportCall::Status(id.clone()));
        let mut replies = self.replies.lock();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        match reply {
            Some(StatusReply::Result(result)) => Ok(result),
            Some(StatusReply::Timeout) => Err(TransportError::Timeout {
                url: "https://fake.my.example.com/deployRequest".to_string(),
            }),
            None => Ok(result_with(DeployStatus::Queued)),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Returns a fixed set and counts how often it was asked.
#[allow(dead_code)]
pub struct FakeResolver {
    set: ComponentSet,
    builds: AtomicUsize,
}

#[allow(dead_code)]
impl FakeResolver {
    pub fn new(set: ComponentSet) -> Self {
        Self {
            set,
            builds: AtomicUsize::new(0),
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl ComponentResolver for FakeResolver {
    fn build(&self, _options: &ResolveOptions) -> Result<ComponentSet, ResolveError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(self.set.clone())
    }
}

// =============================================================================
// Tracking
// =============================================================================

/// Serves a fixed change list and records deploy updates.
#[allow(dead_code)]
pub struct FakeTracking {
    log: EventLog,
    changes: Vec<TrackedChange>,
    updates: Mutex<Vec<DeployStatus>>,
}

#[allow(dead_code)]
impl FakeTracking {
    pub fn new(log: EventLog, changes: Vec<TrackedChange>) -> Arc<Self> {
        Arc::new(Self {
            log,
            changes,
            updates: Mutex::new(Vec::new()),
        })
    }

    pub fn updates(&self) -> Vec<DeployStatus> {
        self.updates.lock().clone()
    }
}

#[async_trait]
impl SourceTracking for FakeTracking {
    async fn changes(&self, filter: ChangeFilter) -> Result<Vec<TrackedChange>, TrackingError> {
        Ok(self
            .changes
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn update_from_deploy(
        &self,
        result: &DeployResult,
        _components: &ComponentSet,
    ) -> Result<(), TrackingError> {
        self.log.lock().push("tracking".to_string());
        self.updates.lock().push(result.status);
        Ok(())
    }
}

/// Hands out the same tracking instance and counts loads.
#[allow(dead_code)]
pub struct FakeLoader {
    tracking: Option<Arc<FakeTracking>>,
    loads: AtomicUsize,
}

#[allow(dead_code)]
impl FakeLoader {
    pub fn new(tracking: Arc<FakeTracking>) -> Self {
        Self {
            tracking: Some(tracking),
            loads: AtomicUsize::new(0),
        }
    }

    /// A loader that fails, as when the tracking lock is held elsewhere.
    pub fn failing() -> Self {
        Self {
            tracking: None,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrackingLoader for FakeLoader {
    async fn load(&self) -> Result<Arc<dyn SourceTracking>, TrackingError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        match &self.tracking {
            Some(tracking) => Ok(tracking.clone()),
            None => Err(TrackingError::Lock("tracking unavailable".to_string())),
        }
    }
}

#[allow(dead_code)]
pub fn change(
    origin: ChangeOrigin,
    kind: ChangeKind,
    key: ComponentKey,
    path: Option<&str>,
) -> TrackedChange {
    TrackedChange {
        origin,
        kind,
        key,
        path: path.map(PathBuf::from),
    }
}

// =============================================================================
// Hooks
// =============================================================================

/// Records hook firings into the shared log.
#[allow(dead_code)]
pub struct RecordingHooks {
    log: EventLog,
    fail_pre: bool,
    pre_components: Mutex<Vec<ComponentKey>>,
}

#[allow(dead_code)]
impl RecordingHooks {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_pre: false,
            pre_components: Mutex::new(Vec::new()),
        }
    }

    /// Hooks whose `predeploy` exits non-zero.
    pub fn failing_pre(log: EventLog) -> Self {
        Self {
            fail_pre: true,
            ..Self::new(log)
        }
    }

    pub fn pre_components(&self) -> Vec<ComponentKey> {
        self.pre_components.lock().clone()
    }
}

#[async_trait]
impl LifecycleHooks for RecordingHooks {
    async fn pre_deploy(&self, components: &[Component]) -> Result<(), HookError> {
        self.log.lock().push("predeploy".to_string());
        *self.pre_components.lock() = components.iter().map(|c| c.key.clone()).collect();
        if self.fail_pre {
            return Err(HookError::Failed {
                point: orgdeploy::hooks::HookPoint::PreDeploy,
                exit_code: Some(1),
                stderr: "blocked".to_string(),
            });
        }
        Ok(())
    }

    async fn post_deploy(&self, _result: &DeployResult) -> Result<(), HookError> {
        self.log.lock().push("postdeploy".to_string());
        Ok(())
    }
}

/// A component outcome as the org reports it.
#[allow(dead_code)]
pub fn outcome(type_name: &str, name: &str, success: bool) -> ComponentOutcome {
    ComponentOutcome {
        component_type: type_name.to_string(),
        full_name: name.to_string(),
        file_name: format!("classes/{name}.cls"),
        success,
        changed: success,
        created: false,
        deleted: false,
        problem: (!success).then(|| "compile error".to_string()),
        problem_type: (!success).then(|| "Error".to_string()),
        line_number: None,
        column_number: None,
    }
}
