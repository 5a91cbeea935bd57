// ABOUTME: Deploy status and result model as reported by the org.
// ABOUTME: Terminal once the status reaches a completed state; mutated only by polling.

use serde::{Deserialize, Serialize};

use crate::components::ComponentKey;
use crate::types::DeployId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeployStatus {
    #[serde(alias = "Pending")]
    Queued,
    #[serde(alias = "Canceling")]
    InProgress,
    Succeeded,
    SucceededPartial,
    Failed,
    Canceled,
}

impl DeployStatus {
    /// Whether the deploy has reached a completed state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeployStatus::Succeeded
                | DeployStatus::SucceededPartial
                | DeployStatus::Failed
                | DeployStatus::Canceled
        )
    }

    /// Failed or canceled, as opposed to fully or partially succeeded.
    pub fn failed_outright(&self) -> bool {
        matches!(self, DeployStatus::Failed | DeployStatus::Canceled)
    }
}

impl std::fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DeployStatus::Queued => "Queued",
            DeployStatus::InProgress => "InProgress",
            DeployStatus::Succeeded => "Succeeded",
            DeployStatus::SucceededPartial => "SucceededPartial",
            DeployStatus::Failed => "Failed",
            DeployStatus::Canceled => "Canceled",
        };
        write!(f, "{label}")
    }
}

/// Outcome for a single component within a deploy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentOutcome {
    pub component_type: String,
    pub full_name: String,
    pub file_name: String,
    pub success: bool,
    pub changed: bool,
    pub created: bool,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_number: Option<u32>,
}

impl ComponentOutcome {
    pub fn key(&self) -> ComponentKey {
        ComponentKey::new(self.component_type.as_str(), self.full_name.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestSuccess {
    pub name: String,
    pub method_name: String,
    pub time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestFailure {
    pub name: String,
    pub method_name: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    pub time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeLocation {
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodeCoverage {
    pub name: String,
    pub num_locations: u32,
    pub num_locations_not_covered: u32,
    pub locations_not_covered: Vec<CodeLocation>,
}

impl CodeCoverage {
    pub fn covered(&self) -> u32 {
        self.num_locations.saturating_sub(self.num_locations_not_covered)
    }

    /// Percentage of covered locations, 100 for classes with no locations.
    pub fn percent(&self) -> f64 {
        if self.num_locations == 0 {
            100.0
        } else {
            f64::from(self.covered()) * 100.0 / f64::from(self.num_locations)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunTestResult {
    pub num_tests_run: u32,
    pub num_failures: u32,
    /// Milliseconds.
    pub total_time: f64,
    pub successes: Vec<TestSuccess>,
    pub failures: Vec<TestFailure>,
    pub code_coverage: Vec<CodeCoverage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployDetails {
    pub component_successes: Vec<ComponentOutcome>,
    pub component_failures: Vec<ComponentOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_test_result: Option<RunTestResult>,
}

/// Status of a deploy, complete or in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResult {
    pub id: DeployId,
    pub status: DeployStatus,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub check_only: bool,
    #[serde(default)]
    pub number_components_deployed: u32,
    #[serde(default)]
    pub number_components_total: u32,
    #[serde(default)]
    pub number_component_errors: u32,
    #[serde(default)]
    pub number_tests_completed: u32,
    #[serde(default)]
    pub number_tests_total: u32,
    #[serde(default)]
    pub number_test_errors: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub details: DeployDetails,
}

impl DeployResult {
    /// A freshly queued result with no progress.
    pub fn queued(id: DeployId) -> Self {
        Self {
            id,
            status: DeployStatus::Queued,
            done: false,
            success: false,
            check_only: false,
            number_components_deployed: 0,
            number_components_total: 0,
            number_component_errors: 0,
            number_tests_completed: 0,
            number_tests_total: 0,
            number_test_errors: 0,
            error_message: None,
            details: DeployDetails::default(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn counts(&self) -> ProgressCounts {
        ProgressCounts {
            status: self.status,
            components_deployed: self.number_components_deployed,
            components_total: self.number_components_total,
            component_errors: self.number_component_errors,
            tests_completed: self.number_tests_completed,
            tests_total: self.number_tests_total,
            test_errors: self.number_test_errors,
        }
    }
}

/// The counters a progress view renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressCounts {
    pub status: DeployStatus,
    pub components_deployed: u32,
    pub components_total: u32,
    pub component_errors: u32,
    pub tests_completed: u32,
    pub tests_total: u32,
    pub test_errors: u32,
}

/// Handle returned for an asynchronous submission. No status was polled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsyncDeployHandle {
    pub id: DeployId,
}
