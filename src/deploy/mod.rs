// ABOUTME: Deploy orchestration using the type state pattern.
// ABOUTME: Exports the request model, state types, transitions, and the runner.

mod cache;
mod conflicts;
mod deployment;
mod error;
mod poll;
mod request;
mod result;
mod runner;
mod state;
mod transitions;

pub use cache::{
    CacheError, CacheRecorder, CachedDeploy, DeployCache, NoRecord, SubmissionRecorder,
};
pub use conflicts::{Conflict, find_conflicts};
pub use deployment::Deployment;
pub use error::{DeployError, DeployErrorKind};
pub use poll::{PollOutcome, poll_until_done, report_status};
pub use request::{
    ApiProtocol, ConfigurationError, DeployFlags, DeployOptions, DeployRequest, InputMode,
    ReportOptions, TestLevel,
};
pub use result::{
    AsyncDeployHandle, CodeCoverage, CodeLocation, ComponentOutcome, DeployDetails, DeployResult,
    DeployStatus, ProgressCounts, RunTestResult, TestFailure, TestSuccess,
};
pub use runner::{Collaborators, DeployOutcome, RunSettings, run_deploy};
pub use state::{
    Cleared, Completed, Initialized, Polled, PreChecked, ReplayReady, Resolved, Submitted,
};
pub use transitions::{PollTransition, PreCheckRoute};
